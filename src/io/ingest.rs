//! Revenue export ingest and normalization.
//!
//! This module turns a tabular export (XLSX or CSV) into a clean daily
//! `Series` that is safe to fit.
//!
//! Design goals:
//! - **Strict schema** for the two required columns (clear errors, exit code 4)
//! - **Row-level validation** (drop bad rows with a warning, report what happened)
//! - **Deterministic behavior** (same bytes in, same series out)
//! - **Separation of concerns**: no forecasting logic here

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::aggregate::aggregate_points;
use crate::domain::{ColumnNames, Granularity, MIN_HISTORY_POINTS, Series, TimePoint};
use crate::error::PipelineError;
use crate::storage::{Locator, ObjectStore};

/// Container format of the raw export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Xlsx,
    Csv,
}

impl TableFormat {
    /// XLSX files are ZIP archives; anything else is treated as CSV.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"PK\x03\x04") {
            TableFormat::Xlsx
        } else {
            TableFormat::Csv
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TableFormat::Xlsx => "xlsx",
            TableFormat::Csv => "csv",
        }
    }
}

/// A row that was dropped during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the daily series plus what happened along the way.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: Series,
    pub format: TableFormat,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// One spreadsheet/CSV cell, reduced to what ingest cares about.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
    /// Excel serial date (days since 1899-12-30, fractional part = time of day).
    ExcelDate(f64),
}

struct RawTable {
    headers: Vec<String>,
    /// `(line, cells)`; `line` is 1-based and counts the header row. Records
    /// the reader itself could not decode carry the decode error instead.
    rows: Vec<(usize, Result<Vec<Cell>, String>)>,
}

/// Fetch the export behind `locator` and normalize it to a daily series.
pub fn ingest(
    store: &dyn ObjectStore,
    locator: &Locator,
    columns: &ColumnNames,
) -> Result<IngestedSeries, PipelineError> {
    let bytes = store
        .fetch(locator)
        .map_err(|e| PipelineError::Ingest(format!("source unreachable: {e}")))?;
    log::info!("Fetched source export ({} bytes)", bytes.len());
    ingest_bytes(&bytes, columns)
}

/// Normalize raw export bytes to a daily series.
pub fn ingest_bytes(bytes: &[u8], columns: &ColumnNames) -> Result<IngestedSeries, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::Ingest("source export is empty".to_string()));
    }

    let format = TableFormat::detect(bytes);
    let table = match format {
        TableFormat::Xlsx => read_xlsx(bytes)?,
        TableFormat::Csv => read_csv(bytes)?,
    };

    let header_map = build_header_map(&table.headers);
    let date_idx = require_column(&header_map, &columns.date)?;
    let value_idx = require_column(&header_map, &columns.value)?;

    let mut points = Vec::with_capacity(table.rows.len());
    let mut row_errors = Vec::new();
    let rows_read = table.rows.len();

    for (line, cells) in &table.rows {
        let parsed = cells
            .as_ref()
            .map_err(Clone::clone)
            .and_then(|cells| parse_row(cells, date_idx, value_idx, columns));
        match parsed {
            Ok(point) => points.push(point),
            Err(message) => {
                log::warn!("Dropping row {line}: {message}");
                row_errors.push(RowError {
                    line: *line,
                    message,
                });
            }
        }
    }

    let rows_used = points.len();
    let series = aggregate_points(points, Granularity::Day)
        .map_err(|e| PipelineError::Ingest(format!("daily totals overflow: {e}")))?;

    if series.len() < MIN_HISTORY_POINTS {
        return Err(PipelineError::Ingest(format!(
            "need at least {MIN_HISTORY_POINTS} distinct days of data, got {} ({rows_used} of {rows_read} rows usable)",
            series.len()
        )));
    }

    log::info!(
        "Ingested {rows_used}/{rows_read} rows into {} daily points ({} dropped)",
        series.len(),
        row_errors.len()
    );

    Ok(IngestedSeries {
        series,
        format,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn read_csv(bytes: &[u8]) -> Result<RawTable, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::Ingest(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; lines are 1-based.
        let line = idx + 2;
        let cells = result
            .map(|record| csv_cells(&record))
            .map_err(|e| format!("CSV parse error: {e}"));
        rows.push((line, cells));
    }

    Ok(RawTable { headers, rows })
}

fn csv_cells(record: &StringRecord) -> Vec<Cell> {
    record
        .iter()
        .map(|s| {
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.to_string())
            }
        })
        .collect()
}

fn read_xlsx(bytes: &[u8]) -> Result<RawTable, PipelineError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::Ingest(format!("Failed to open XLSX workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::Ingest("XLSX workbook has no worksheets".to_string()))?
        .map_err(|e| PipelineError::Ingest(format!("Failed to read first worksheet: {e}")))?;

    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut rows_iter = range.rows();
    let headers = rows_iter
        .next()
        .ok_or_else(|| PipelineError::Ingest("first worksheet is empty".to_string()))?
        .iter()
        .map(ToString::to_string)
        .collect();

    let rows = rows_iter
        .enumerate()
        .map(|(idx, row)| (first_line + idx + 1, Ok(row.iter().map(xlsx_cell).collect())))
        .collect();

    Ok(RawTable { headers, rows })
}

fn xlsx_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::DateTime(dt) => Cell::ExcelDate(dt.as_f64()),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated header names.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel-produced CSVs often carry a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn require_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, PipelineError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| PipelineError::Ingest(format!("Missing required column: `{name}`")))
}

fn parse_row(
    cells: &[Cell],
    date_idx: usize,
    value_idx: usize,
    columns: &ColumnNames,
) -> Result<TimePoint, String> {
    let date_cell = cells.get(date_idx).unwrap_or(&Cell::Empty);
    let value_cell = cells.get(value_idx).unwrap_or(&Cell::Empty);

    let date = parse_date_cell(date_cell).map_err(|e| format!("`{}`: {e}", columns.date))?;
    let value = parse_value_cell(value_cell).map_err(|e| format!("`{}`: {e}", columns.value))?;

    Ok(TimePoint { date, value })
}

fn parse_date_cell(cell: &Cell) -> Result<NaiveDate, String> {
    match cell {
        Cell::Empty => Err("missing date".to_string()),
        Cell::Number(serial) | Cell::ExcelDate(serial) => excel_serial_to_date(*serial),
        Cell::Text(s) => parse_date(s),
    }
}

/// Parse a textual timestamp, truncating any time-of-day.
///
/// ISO dates are preferred, but exports commonly carry `DD/MM/YYYY` or full
/// timestamps. We accept a small fixed set of formats so parsing stays
/// deterministic.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];

    let s = s.trim();
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD or an ISO timestamp."
    ))
}

/// Convert an Excel (1900 date system) serial number to a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Result<NaiveDate, String> {
    // 1..=2958465 covers 1900-01-01 through 9999-12-31.
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return Err(format!("Excel date serial {serial} out of range"));
    }
    let day = serial.floor();
    // Serial 60 is 1900-02-29, which Excel counts but the calendar lacks.
    let epoch = if day < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)
    } else if day > 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    } else {
        return Err("Excel date serial 60 is the nonexistent 1900-02-29".to_string());
    }
    .ok_or("invalid Excel epoch")?;
    epoch
        .checked_add_days(Days::new(day as u64))
        .ok_or_else(|| format!("Excel date serial {serial} out of range"))
}

fn parse_value_cell(cell: &Cell) -> Result<f64, String> {
    let v = match cell {
        Cell::Empty => return Err("missing value".to_string()),
        Cell::Number(v) => *v,
        Cell::ExcelDate(_) => return Err("expected a number, found a date".to_string()),
        Cell::Text(s) => parse_amount(s)?,
    };
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("non-finite value {v}"))
    }
}

/// Parse a numeric amount, tolerating `$` and thousands separators.
fn parse_amount(s: &str) -> Result<f64, String> {
    let trimmed = s.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let v = cleaned
        .parse::<f64>()
        .map_err(|_| format!("Invalid number '{trimmed}'"))?;
    Ok(if negative { -v } else { v })
}
