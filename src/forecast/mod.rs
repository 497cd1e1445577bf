//! Forecast orchestration: one fit, two predictions.
//!
//! The orchestrator owns the date contract around an injected model:
//!
//! - in-sample predictions cover exactly the history's dates
//! - future predictions cover `horizon_days` consecutive days after the last
//!   history date
//!
//! A model that returns anything else is treated as a failure rather than
//! being trusted downstream.

use chrono::{Days, NaiveDate};

use crate::domain::{ForecastResult, Granularity, MIN_HISTORY_POINTS, ModelConfig, Series};
use crate::error::PipelineError;
use crate::models::ForecastModel;

/// Fit `model` once on the daily `history` and predict in-sample plus `horizon_days` ahead.
pub fn forecast(
    history: &Series,
    horizon_days: u32,
    config: &ModelConfig,
    model: &dyn ForecastModel,
) -> Result<ForecastResult, PipelineError> {
    if history.len() < MIN_HISTORY_POINTS {
        return Err(PipelineError::Forecast(format!(
            "need at least {MIN_HISTORY_POINTS} daily points, got {}",
            history.len()
        )));
    }
    if horizon_days == 0 {
        return Err(PipelineError::Forecast("horizon must be at least one day".to_string()));
    }
    let Some(last) = history.last() else {
        return Err(PipelineError::Forecast("history is empty".to_string()));
    };

    log::info!(
        "Fitting {} on {} daily points ({} .. {})",
        model.name(),
        history.len(),
        history.first().map(|p| p.date).unwrap_or(last.date),
        last.date
    );

    let fitted = model
        .fit(history, Granularity::Day, config)
        .map_err(|e| PipelineError::Forecast(format!("{}: {e}", model.name())))?;

    let history_dates = history.dates();
    let in_sample = fitted
        .predict(&history_dates)
        .map_err(|e| PipelineError::Forecast(format!("in-sample prediction: {e}")))?;
    check_dates("in-sample", &in_sample, &history_dates)?;

    let wanted = future_dates(last.date, horizon_days)?;
    let future = fitted
        .predict(&wanted)
        .map_err(|e| PipelineError::Forecast(format!("future prediction: {e}")))?;
    check_dates("future", &future, &wanted)?;

    log::info!(
        "Forecast {} days: {} .. {}",
        horizon_days,
        wanted[0],
        wanted[wanted.len() - 1]
    );

    Ok(ForecastResult {
        in_sample,
        future,
        horizon_days,
    })
}

/// The `horizon_days` calendar days following `last`.
pub fn future_dates(last: NaiveDate, horizon_days: u32) -> Result<Vec<NaiveDate>, PipelineError> {
    (1..=u64::from(horizon_days))
        .map(|offset| {
            last.checked_add_days(Days::new(offset)).ok_or_else(|| {
                PipelineError::Forecast(format!("date overflow {offset} days after {last}"))
            })
        })
        .collect()
}

fn check_dates(label: &str, got: &Series, wanted: &[NaiveDate]) -> Result<(), PipelineError> {
    if got.len() != wanted.len() {
        return Err(PipelineError::Forecast(format!(
            "{label} prediction returned {} points, expected {}",
            got.len(),
            wanted.len()
        )));
    }
    if let Some((p, w)) = got.iter().zip(wanted).find(|(p, w)| p.date != **w) {
        return Err(PipelineError::Forecast(format!(
            "{label} prediction returned {} where {w} was expected",
            p.date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::domain::TimePoint;
    use crate::models::{FittedModel, ModelError};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn history(n: u64) -> Series {
        Series::from_pairs((0..n).map(|i| (d(2024, 1, 1) + Days::new(i), i as f64 + 1.0))).unwrap()
    }

    /// Predicts a constant; optionally drops the last requested date.
    struct Constant {
        fits: Cell<usize>,
        seen_trend_reg: Cell<f64>,
        truncate: bool,
        fail: bool,
    }

    impl Constant {
        fn new() -> Self {
            Self {
                fits: Cell::new(0),
                seen_trend_reg: Cell::new(f64::NAN),
                truncate: false,
                fail: false,
            }
        }
    }

    struct ConstantFit {
        truncate: bool,
    }

    impl ForecastModel for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn fit(
            &self,
            _history: &Series,
            _frequency: Granularity,
            config: &ModelConfig,
        ) -> Result<Box<dyn FittedModel>, ModelError> {
            self.fits.set(self.fits.get() + 1);
            self.seen_trend_reg.set(config.trend_reg);
            if self.fail {
                return Err(ModelError::Solver("boom".to_string()));
            }
            Ok(Box::new(ConstantFit {
                truncate: self.truncate,
            }))
        }
    }

    impl FittedModel for ConstantFit {
        fn predict(&self, dates: &[NaiveDate]) -> Result<Series, ModelError> {
            let take = if self.truncate {
                dates.len().saturating_sub(1)
            } else {
                dates.len()
            };
            Series::new(dates[..take].iter().map(|&d| TimePoint::new(d, 42.0)).collect())
                .map_err(|e| ModelError::Prediction(e.to_string()))
        }
    }

    #[test]
    fn fits_once_and_honours_date_contract() {
        let model = Constant::new();
        let hist = history(100);
        let out = forecast(&hist, 30, &ModelConfig::default(), &model).unwrap();

        assert_eq!(model.fits.get(), 1);
        assert_eq!(out.in_sample.dates(), hist.dates());
        assert_eq!(out.future.len(), 30);
        assert_eq!(out.future.first().unwrap().date, d(2024, 4, 10));
        assert_eq!(out.future.last().unwrap().date, d(2024, 5, 9));
        assert_eq!(out.horizon_days, 30);
    }

    #[test]
    fn default_horizon_spans_a_year() {
        let out = forecast(&history(10), 365, &ModelConfig::default(), &Constant::new()).unwrap();
        assert_eq!(out.future.len(), 365);
        assert_eq!(out.future.first().unwrap().date, d(2024, 1, 11));
        assert_eq!(out.future.last().unwrap().date, d(2025, 1, 9));
    }

    #[test]
    fn model_config_is_forwarded() {
        let model = Constant::new();
        let config = ModelConfig {
            trend_reg: 3.25,
            ..ModelConfig::default()
        };
        forecast(&history(5), 1, &config, &model).unwrap();
        assert_eq!(model.seen_trend_reg.get(), 3.25);
    }

    #[test]
    fn short_history_is_rejected_before_fitting() {
        let model = Constant::new();
        let err = forecast(&history(1), 30, &ModelConfig::default(), &model).unwrap_err();
        assert!(matches!(err, PipelineError::Forecast(_)));
        assert_eq!(model.fits.get(), 0);
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let err = forecast(&history(5), 0, &ModelConfig::default(), &Constant::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Forecast(_)));
    }

    #[test]
    fn wrong_length_prediction_is_an_error() {
        let model = Constant {
            truncate: true,
            ..Constant::new()
        };
        let err = forecast(&history(5), 3, &ModelConfig::default(), &model).unwrap_err();
        assert!(err.to_string().contains("expected 5"));
    }

    #[test]
    fn fit_failure_names_the_model() {
        let model = Constant {
            fail: true,
            ..Constant::new()
        };
        let err = forecast(&history(5), 3, &ModelConfig::default(), &model).unwrap_err();
        assert!(err.to_string().contains("constant"));
    }

    #[test]
    fn future_dates_are_consecutive() {
        let dates = future_dates(d(2024, 2, 28), 3).unwrap();
        assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 1), d(2024, 3, 2)]);
    }
}
