//! Shared domain types.
//!
//! These types are intentionally small and serializable so they can be:
//!
//! - passed between pipeline stages by reference
//! - written to the spreadsheet / run summary
//! - constructed directly in tests

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewest daily points a trend can be estimated from.
pub const MIN_HISTORY_POINTS: usize = 2;

/// A single dated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimePoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Why a list of points could not become a `Series`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("non-finite value {value} at {date}")]
    NonFinite { date: NaiveDate, value: f64 },
    #[error("dates are not strictly increasing at {date} (previous {previous})")]
    Unordered { previous: NaiveDate, date: NaiveDate },
}

/// Ordered, deduplicated date -> value sequence.
///
/// Invariants (enforced by every constructor):
/// - dates strictly increasing (so unique)
/// - every value finite
///
/// A `Series` is never mutated after construction; transformations produce a
/// new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    points: Vec<TimePoint>,
}

impl Series {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from points that must already satisfy the invariants.
    pub fn new(points: Vec<TimePoint>) -> Result<Self, SeriesError> {
        for (i, p) in points.iter().enumerate() {
            if !p.value.is_finite() {
                return Err(SeriesError::NonFinite {
                    date: p.date,
                    value: p.value,
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(SeriesError::Unordered {
                    previous: points[i - 1].date,
                    date: p.date,
                });
            }
        }
        Ok(Self { points })
    }

    /// Convenience for `(date, value)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| TimePoint { date, value })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimePoint> {
        self.points.iter()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first(&self) -> Option<&TimePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimePoint> {
        self.points.last()
    }

    /// Sum of all values (0.0 for an empty series).
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a TimePoint;
    type IntoIter = std::slice::Iter<'a, TimePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Bucketing resolution used by the aggregator (and as the model's frequency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
}

impl Granularity {
    /// Canonical start date of the bucket containing `date`.
    ///
    /// `Month` truncates to the first calendar day of the month.
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Month => date - Days::new(u64::from(date.day0())),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Granularity::Day => "daily",
            Granularity::Month => "monthly",
        }
    }
}

/// Output of the forecast orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    /// Model reconstruction over exactly the training dates.
    pub in_sample: Series,
    /// Prediction over `horizon_days` consecutive days after the last training date.
    pub future: Series,
    pub horizon_days: u32,
}
