//! Temporal aggregation.
//!
//! Collapses dated values into one point per bucket (day or calendar month) by
//! summation. Both functions are pure: they read their input and return a new
//! `Series`.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{Granularity, Series, SeriesError, TimePoint};

/// Re-bucket a series at `granularity`.
///
/// Each output point is labelled with its bucket's start date. An empty input
/// yields an empty output.
pub fn aggregate(series: &Series, granularity: Granularity) -> Result<Series, SeriesError> {
    aggregate_points(series.points().iter().copied(), granularity)
}

/// Bucket arbitrary (unsorted, possibly duplicated) points.
///
/// Fails with `SeriesError::NonFinite` when a bucket's sum overflows.
pub fn aggregate_points<I>(points: I, granularity: Granularity) -> Result<Series, SeriesError>
where
    I: IntoIterator<Item = TimePoint>,
{
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for p in points {
        *buckets.entry(granularity.bucket_start(p.date)).or_insert(0.0) += p.value;
    }

    // BTreeMap keys are unique and ascending; only a non-finite sum can fail.
    Series::new(
        buckets
            .into_iter()
            .map(|(date, value)| TimePoint { date, value })
            .collect(),
    )
}
