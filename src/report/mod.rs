//! Report assembly: monthly tables plus the comparison chart.
//!
//! Each input series is month-aggregated on its own, so the three tables keep
//! their native ranges (the in-sample and actual tables cover the history; the
//! forecast table covers the horizon).

pub mod chart;
pub mod format;

pub use chart::{ChartLine, render_chart};
pub use format::*;

use plotters::style::{BLUE, GREEN, RED};

use crate::aggregate::aggregate;
use crate::domain::{Granularity, Series};
use crate::error::PipelineError;

pub const ACTUAL: &str = "Actual";
pub const ACTUAL_PREDICTION: &str = "Actual Prediction";
pub const FORECAST: &str = "Forecast";

/// Chart legend label for the forecast table.
pub const FUTURE_PREDICTION: &str = "Future Prediction";

/// Value column for observed revenue.
pub const ACTUAL_VALUE_COLUMN: &str = "y";
/// Value column for model output.
pub const PREDICTED_VALUE_COLUMN: &str = "yhat1";

/// One named monthly table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub name: &'static str,
    pub value_column: &'static str,
    pub series: Series,
}

/// Everything the publisher uploads, fully materialized.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    /// In order: "Actual Prediction", "Actual", "Forecast".
    pub sections: Vec<ReportSection>,
    /// Rendered SVG document.
    pub chart: Vec<u8>,
}

impl ReportBundle {
    pub fn section(&self, name: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Month-aggregate the three series, build the named tables and render the chart.
pub fn assemble(actual: &Series, in_sample: &Series, future: &Series) -> Result<ReportBundle, PipelineError> {
    let monthly = |label: &str, series: &Series| {
        aggregate(series, Granularity::Month)
            .map_err(|e| PipelineError::Assembly(format!("{label} monthly totals overflow: {e}")))
    };
    let actual_monthly = monthly(ACTUAL, actual)?;
    let in_sample_monthly = monthly(ACTUAL_PREDICTION, in_sample)?;
    let future_monthly = monthly(FORECAST, future)?;

    if actual_monthly.is_empty() && in_sample_monthly.is_empty() && future_monthly.is_empty() {
        return Err(PipelineError::Assembly(
            "nothing to report: actual, in-sample and future series are all empty".to_string(),
        ));
    }

    let chart = render_chart(&[
        ChartLine {
            label: ACTUAL_PREDICTION,
            color: RED,
            series: &in_sample_monthly,
        },
        ChartLine {
            label: FUTURE_PREDICTION,
            color: BLUE,
            series: &future_monthly,
        },
        ChartLine {
            label: ACTUAL,
            color: GREEN,
            series: &actual_monthly,
        },
    ])?;

    log::info!(
        "Assembled report: {} actual, {} in-sample and {} forecast months",
        actual_monthly.len(),
        in_sample_monthly.len(),
        future_monthly.len()
    );

    Ok(ReportBundle {
        sections: vec![
            ReportSection {
                name: ACTUAL_PREDICTION,
                value_column: PREDICTED_VALUE_COLUMN,
                series: in_sample_monthly,
            },
            ReportSection {
                name: ACTUAL,
                value_column: ACTUAL_VALUE_COLUMN,
                series: actual_monthly,
            },
            ReportSection {
                name: FORECAST,
                value_column: PREDICTED_VALUE_COLUMN,
                series: future_monthly,
            },
        ],
        chart: chart.into_bytes(),
    })
}
