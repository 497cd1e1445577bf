//! Forecast model capability.
//!
//! The pipeline never depends on a concrete algorithm. It sees two operations:
//!
//! - `ForecastModel::fit(history, frequency, config) -> FittedModel`
//! - `FittedModel::predict(dates) -> Series`
//!
//! Fitting may be expensive; a fitted model is reused for every prediction of
//! a run.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Granularity, ModelConfig, Series};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("insufficient history: need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("unsupported frequency: {}", .0.display_name())]
    UnsupportedFrequency(Granularity),
    #[error("invalid model parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("solver failed: {0}")]
    Solver(String),
    #[error("prediction failed: {0}")]
    Prediction(String),
}

/// A forecasting algorithm that can be trained on a series.
pub trait ForecastModel {
    /// Short human-readable name used in logs and the run summary.
    fn name(&self) -> &str;

    /// Train on `history` sampled at `frequency`.
    ///
    /// `config` is passed through from the run configuration untouched.
    fn fit(
        &self,
        history: &Series,
        frequency: Granularity,
        config: &ModelConfig,
    ) -> Result<Box<dyn FittedModel>, ModelError>;
}

/// A trained model.
pub trait FittedModel {
    /// Predict one value per requested date.
    ///
    /// Implementations must return exactly the requested dates, in order.
    fn predict(&self, dates: &[NaiveDate]) -> Result<Series, ModelError>;
}
