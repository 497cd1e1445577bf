//! Forecast models.
//!
//! `model` defines the capability the pipeline depends on; `trend_seasonal`
//! is the built-in implementation used by the binary.

pub mod model;
pub mod trend_seasonal;

pub use model::*;
pub use trend_seasonal::{FittedTrendSeasonal, TrendSeasonalModel};
