//! Built-in additive trend + seasonality model.
//!
//! `y(d) = trend(t) + weekly(d) + yearly(d)` where
//!
//! - `trend(t) = β0 + β1 t + Σ δ_i max(0, t - c_i)` (piecewise linear, `t` in
//!   `[0, 1]` over the training range, changepoints over the first 80%)
//! - `weekly` / `yearly` are Fourier series, enabled when the history is long
//!   enough to observe at least two cycles
//!
//! The changepoint adjustments `δ_i` are ridge-penalized by `trend_reg` and
//! the Fourier coefficients by `seasonality_reg`. Everything is linear in the
//! coefficients, so a fit is one least squares solve.
//!
//! `ModelConfig::extra` knobs: `changepoints`, `weekly_order`, `yearly_order`
//! (non-negative integers; 0 disables the component).

use chrono::{Datelike, NaiveDate};
use nalgebra::{DMatrix, DVector};

use super::model::{FittedModel, ForecastModel, ModelError};
use crate::domain::{Granularity, MIN_HISTORY_POINTS, ModelConfig, Series, TimePoint};
use crate::math::{WEEK_DAYS, YEAR_DAYS, changepoints, fill_fourier, hinge, solve_ridge};

const MAX_AUTO_CHANGEPOINTS: usize = 10;
/// Fraction of the training range that may hold changepoints.
const CHANGEPOINT_RANGE: f64 = 0.8;
const WEEKLY_ORDER: usize = 3;
const YEARLY_ORDER: usize = 6;
const MIN_WEEKLY_SPAN_DAYS: i64 = 14;
const MIN_YEARLY_SPAN_DAYS: i64 = 730;
/// Ridge weight per unit of `*_reg`, per training observation.
const REG_SCALE: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrendSeasonalModel;

impl TrendSeasonalModel {
    pub fn new() -> Self {
        Self
    }
}

/// Which columns the design matrix has, in order.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    changepoints: Vec<f64>,
    weekly_order: usize,
    yearly_order: usize,
}

impl Layout {
    fn len(&self) -> usize {
        2 + self.changepoints.len() + 2 * self.weekly_order + 2 * self.yearly_order
    }

    /// Fill a design row. `t` is scaled time, `day` an absolute day number.
    fn fill_row(&self, t: f64, day: f64, out: &mut [f64]) {
        out[0] = 1.0;
        out[1] = t;
        let mut at = 2;
        for &c in &self.changepoints {
            out[at] = hinge(t, c);
            at += 1;
        }
        if self.weekly_order > 0 {
            let end = at + 2 * self.weekly_order;
            fill_fourier(day, WEEK_DAYS, self.weekly_order, &mut out[at..end]);
            at = end;
        }
        if self.yearly_order > 0 {
            let end = at + 2 * self.yearly_order;
            fill_fourier(day, YEAR_DAYS, self.yearly_order, &mut out[at..end]);
        }
    }

    fn penalties(&self, trend: f64, seasonality: f64) -> Vec<f64> {
        let mut out = vec![0.0, 0.0];
        out.extend(std::iter::repeat_n(trend, self.changepoints.len()));
        out.extend(std::iter::repeat_n(
            seasonality,
            2 * (self.weekly_order + self.yearly_order),
        ));
        out
    }
}

/// Trained coefficients plus the scaling needed to evaluate new dates.
#[derive(Debug, Clone)]
pub struct FittedTrendSeasonal {
    origin: NaiveDate,
    span_days: f64,
    y_scale: f64,
    layout: Layout,
    betas: Vec<f64>,
}

impl FittedTrendSeasonal {
    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.origin).num_days() as f64 / self.span_days
    }

    fn predict_one(&self, date: NaiveDate, row: &mut [f64]) -> f64 {
        self.layout
            .fill_row(self.scaled_time(date), absolute_day(date), row);
        let y: f64 = row.iter().zip(&self.betas).map(|(x, b)| x * b).sum();
        y * self.y_scale
    }
}

impl ForecastModel for TrendSeasonalModel {
    fn name(&self) -> &str {
        "trend+seasonality ridge"
    }

    fn fit(
        &self,
        history: &Series,
        frequency: Granularity,
        config: &ModelConfig,
    ) -> Result<Box<dyn FittedModel>, ModelError> {
        if frequency != Granularity::Day {
            return Err(ModelError::UnsupportedFrequency(frequency));
        }
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Err(ModelError::InsufficientData {
                needed: MIN_HISTORY_POINTS,
                got: 0,
            });
        };
        let n = history.len();
        if n < MIN_HISTORY_POINTS {
            return Err(ModelError::InsufficientData {
                needed: MIN_HISTORY_POINTS,
                got: n,
            });
        }
        for (name, value) in [
            ("trend_reg", config.trend_reg),
            ("seasonality_reg", config.seasonality_reg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("must be finite and >= 0, got {value}"),
                });
            }
        }

        let span = (last.date - first.date).num_days();
        let layout = Layout {
            changepoints: changepoints(
                extra_count(config, "changepoints")?
                    .unwrap_or_else(|| (n - 2).div_euclid(5).min(MAX_AUTO_CHANGEPOINTS)),
                CHANGEPOINT_RANGE,
            ),
            weekly_order: extra_count(config, "weekly_order")?.unwrap_or(
                if span >= MIN_WEEKLY_SPAN_DAYS { WEEKLY_ORDER } else { 0 },
            ),
            yearly_order: extra_count(config, "yearly_order")?.unwrap_or(
                if span >= MIN_YEARLY_SPAN_DAYS { YEARLY_ORDER } else { 0 },
            ),
        };

        if !config.early_stopping {
            log::debug!("early_stopping disabled; the closed-form solver ignores it");
        }

        let y_scale = history
            .iter()
            .map(|p| p.value.abs())
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let mut fitted = FittedTrendSeasonal {
            origin: first.date,
            span_days: span.max(1) as f64,
            y_scale,
            layout,
            betas: Vec::new(),
        };

        let p = fitted.layout.len();
        let mut x = DMatrix::<f64>::zeros(n, p);
        let mut row = vec![0.0; p];
        for (i, point) in history.iter().enumerate() {
            fitted
                .layout
                .fill_row(fitted.scaled_time(point.date), absolute_day(point.date), &mut row);
            for (j, v) in row.iter().enumerate() {
                x[(i, j)] = *v;
            }
        }
        let y = DVector::from_iterator(n, history.iter().map(|pt| pt.value / y_scale));

        let weight = n as f64 * REG_SCALE;
        let penalties = fitted
            .layout
            .penalties(config.trend_reg * weight, config.seasonality_reg * weight);

        let betas = solve_ridge(&x, &y, &penalties)
            .ok_or_else(|| ModelError::Solver("least squares solve did not converge".to_string()))?;
        fitted.betas = betas.iter().copied().collect();

        log::debug!(
            "Fitted trend+seasonality: {} changepoints, weekly order {}, yearly order {}",
            fitted.layout.changepoints.len(),
            fitted.layout.weekly_order,
            fitted.layout.yearly_order
        );

        Ok(Box::new(fitted))
    }
}

impl FittedModel for FittedTrendSeasonal {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Series, ModelError> {
        let mut row = vec![0.0; self.layout.len()];
        let mut points = Vec::with_capacity(dates.len());
        for &date in dates {
            let value = self.predict_one(date, &mut row);
            if !value.is_finite() {
                return Err(ModelError::Prediction(format!("non-finite prediction at {date}")));
            }
            points.push(TimePoint { date, value });
        }
        Series::new(points).map_err(|e| ModelError::Prediction(e.to_string()))
    }
}

/// Calendar-anchored day number so seasonal phase does not depend on the training start.
fn absolute_day(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn extra_count(config: &ModelConfig, name: &str) -> Result<Option<usize>, ModelError> {
    let Some(&v) = config.extra.get(name) else {
        return Ok(None);
    };
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > 1_000.0 {
        return Err(ModelError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected a whole number in 0..=1000, got {v}"),
        });
    }
    Ok(Some(v as usize))
}
