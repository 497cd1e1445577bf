//! Spreadsheet export.
//!
//! One workbook, one worksheet per report section, columns `ds` and the
//! section's value column. Dates are written as Excel serial numbers with a
//! `yyyy-mm-dd` format so spreadsheet tools treat them as real dates.

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::PipelineError;
use crate::report::ReportBundle;

pub const DATE_COLUMN: &str = "ds";

const DATE_COLUMN_WIDTH: f64 = 12.0;
const VALUE_COLUMN_WIDTH: f64 = 16.0;

/// Encode every section of `bundle` as a sheet of one XLSX workbook.
pub fn write_workbook(bundle: &ReportBundle) -> Result<Vec<u8>, PipelineError> {
    encode(bundle).map_err(|e| PipelineError::Assembly(format!("Failed to encode spreadsheet: {e}")))
}

fn encode(bundle: &ReportBundle) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date_fmt = Format::new().set_num_format("yyyy-mm-dd");
    let value_fmt = Format::new().set_num_format("#,##0.00");

    for section in &bundle.sections {
        let sheet = workbook.add_worksheet();
        sheet.set_name(section.name)?;
        sheet.set_column_width(0, DATE_COLUMN_WIDTH)?;
        sheet.set_column_width(1, VALUE_COLUMN_WIDTH)?;
        sheet.write_string_with_format(0, 0, DATE_COLUMN, &header)?;
        sheet.write_string_with_format(0, 1, section.value_column, &header)?;

        for (i, point) in section.series.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_number_with_format(row, 0, date_to_excel_serial(point.date), &date_fmt)?;
            sheet.write_number_with_format(row, 1, point.value, &value_fmt)?;
        }
    }

    workbook.save_to_buffer()
}

/// Excel (1900 date system) serial number for `date`.
pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    // Excel counts a nonexistent 1900-02-29, so dates from March 1900 on are
    // offset from 1899-12-30 and earlier ones from 1899-12-31.
    let (y, m, d) = if date < NaiveDate::from_ymd_opt(1900, 3, 1).unwrap_or(NaiveDate::MIN) {
        (1899, 12, 31)
    } else {
        (1899, 12, 30)
    };
    let epoch = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}
