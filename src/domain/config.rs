//! Run configuration.
//!
//! `PipelineConfig` is resolved once (from CLI flags and the environment, see
//! `crate::cli`) and then passed by reference into every stage. Nothing below
//! the binary reads the environment directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const DEFAULT_DATE_COLUMN: &str = "Date Created";
pub const DEFAULT_VALUE_COLUMN: &str = "Total Revenue";
pub const DEFAULT_HORIZON_DAYS: u32 = 365;
pub const DEFAULT_TREND_REG: f64 = 0.5;
pub const DEFAULT_SEASONALITY_REG: f64 = 0.5;
pub const DEFAULT_EXPIRATION_SECS: u64 = 1200;
/// Longest validity AWS accepts for a presigned URL (7 days).
pub const MAX_EXPIRATION_SECS: u64 = 604_800;

/// A `(bucket, key)` pair in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Source column names for the timestamp and value fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    pub date: String,
    pub value: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_COLUMN.to_string(),
            value: DEFAULT_VALUE_COLUMN.to_string(),
        }
    }
}

/// Parameters handed to the forecasting model.
///
/// The orchestrator forwards this value untouched; only the model reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Penalty on trend changepoint adjustments.
    pub trend_reg: f64,
    /// Penalty on seasonal Fourier coefficients.
    pub seasonality_reg: f64,
    pub early_stopping: bool,
    /// Model-specific knobs not covered above.
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            trend_reg: DEFAULT_TREND_REG,
            seasonality_reg: DEFAULT_SEASONALITY_REG,
            early_stopping: true,
            extra: BTreeMap::new(),
        }
    }
}

/// Everything one pipeline run needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: ObjectRef,
    pub destination_bucket: String,
    pub destination_prefix: String,
    pub horizon_days: u32,
    pub model: ModelConfig,
    pub columns: ColumnNames,
    /// Validity of the source retrieval locator.
    pub expiration_secs: u64,
    pub spreadsheet_name: String,
    pub chart_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: ObjectRef::new("pimis-ml", "reports/export.xlsx"),
            destination_bucket: "pimis-ml".to_string(),
            destination_prefix: "results".to_string(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            model: ModelConfig::default(),
            columns: ColumnNames::default(),
            expiration_secs: DEFAULT_EXPIRATION_SECS,
            spreadsheet_name: "results.xlsx".to_string(),
            chart_name: "graph.svg".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Reject values no stage could run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let non_empty = [
            ("source bucket", &self.source.bucket),
            ("source key", &self.source.key),
            ("destination bucket", &self.destination_bucket),
            ("date column", &self.columns.date),
            ("value column", &self.columns.value),
            ("spreadsheet name", &self.spreadsheet_name),
            ("chart name", &self.chart_name),
        ];
        for (what, value) in non_empty {
            if value.trim().is_empty() {
                return Err(PipelineError::Config(format!("{what} must not be empty")));
            }
        }

        if self.horizon_days == 0 {
            return Err(PipelineError::Config("horizon days must be > 0".to_string()));
        }

        for (what, value) in [
            ("trend_reg", self.model.trend_reg),
            ("seasonality_reg", self.model.seasonality_reg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::Config(format!(
                    "{what} must be finite and >= 0 (got {value})"
                )));
            }
        }

        if self.expiration_secs == 0 || self.expiration_secs > MAX_EXPIRATION_SECS {
            return Err(PipelineError::Config(format!(
                "expiration seconds must be in 1..={MAX_EXPIRATION_SECS} (got {})",
                self.expiration_secs
            )));
        }

        Ok(())
    }

    /// Storage key for a published file: `{prefix}/{file_name}`.
    pub fn destination_key(&self, file_name: &str) -> String {
        let prefix = self.destination_prefix.trim_matches('/');
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        }
    }
}
