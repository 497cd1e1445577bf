//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the time series model (`TimePoint`, `Series`, `Granularity`)
//! - the forecast output (`ForecastResult`)
//! - run configuration (`PipelineConfig`, `ModelConfig`, `ColumnNames`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
