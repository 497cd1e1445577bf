//! Terminal run summary.
//!
//! The summary is a plain value so the binary can print it and optionally
//! write it as JSON for whatever scheduled the run.

use chrono::NaiveDate;
use serde::Serialize;

use super::ReportBundle;

/// Monthly table overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub rows: usize,
    pub total: f64,
}

impl SectionSummary {
    pub fn from_bundle(bundle: &ReportBundle) -> Vec<Self> {
        bundle
            .sections
            .iter()
            .map(|s| SectionSummary {
                name: s.name.to_string(),
                rows: s.series.len(),
                total: s.series.total(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub source: String,
    pub format: String,
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub history_points: usize,
    pub history_start: Option<NaiveDate>,
    pub history_end: Option<NaiveDate>,
    pub model: String,
    pub horizon_days: u32,
    pub forecast_start: Option<NaiveDate>,
    pub forecast_end: Option<NaiveDate>,
    pub sections: Vec<SectionSummary>,
    pub uploaded: Vec<String>,
}

/// Format the run summary for the terminal.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("=== revcast - revenue forecast report ===\n");
    out.push_str(&format!("Source: {} ({})\n", summary.source, summary.format));
    out.push_str(&format!(
        "Rows: read={} used={} dropped={}\n",
        summary.rows_read, summary.rows_used, summary.rows_dropped
    ));
    out.push_str(&format!(
        "History: {} daily points [{} .. {}]\n",
        summary.history_points,
        fmt_date(summary.history_start),
        fmt_date(summary.history_end)
    ));
    out.push_str(&format!(
        "Forecast: {} ({} days) [{} .. {}]\n",
        summary.model,
        summary.horizon_days,
        fmt_date(summary.forecast_start),
        fmt_date(summary.forecast_end)
    ));

    out.push_str("\nMonthly tables:\n");
    for s in &summary.sections {
        out.push_str(&format!("  {:<18} rows={:<4} total={:.2}\n", s.name, s.rows, s.total));
    }

    out.push_str("\nUploaded:\n");
    if summary.uploaded.is_empty() {
        out.push_str("  (nothing)\n");
    }
    for key in &summary.uploaded {
        out.push_str(&format!("  {key}\n"));
    }

    out
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}
