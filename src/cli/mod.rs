//! Command-line parsing for the revenue forecast reporter.
//!
//! Every option can also come from the environment (or a `.env` file loaded
//! before parsing), which is how scheduled runs configure the job.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::domain::{
    ColumnNames, DEFAULT_DATE_COLUMN, DEFAULT_EXPIRATION_SECS, DEFAULT_HORIZON_DAYS,
    DEFAULT_SEASONALITY_REG, DEFAULT_TREND_REG, DEFAULT_VALUE_COLUMN, ModelConfig, ObjectRef,
    PipelineConfig,
};
use crate::storage::S3Settings;

/// Top-level CLI.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "revcast",
    version,
    about = "Forecast daily revenue and publish monthly report artifacts"
)]
pub struct Cli {
    /// Access key for the object store.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    /// Secret key for the object store.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials.
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Path-style endpoint for S3-compatible services (e.g. http://localhost:9000).
    #[arg(long, env = "S3_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "SOURCE_BUCKET", default_value = "pimis-ml")]
    pub source_bucket: String,

    #[arg(long, env = "SOURCE_KEY", default_value = "reports/export.xlsx")]
    pub source_key: String,

    #[arg(long = "dest-bucket", env = "DEST_BUCKET", default_value = "pimis-ml")]
    pub destination_bucket: String,

    #[arg(long = "dest-prefix", env = "DEST_PREFIX", default_value = "results")]
    pub destination_prefix: String,

    /// Days to forecast after the last observed day.
    #[arg(long = "horizon", env = "FORECAST_HORIZON_DAYS", default_value_t = DEFAULT_HORIZON_DAYS)]
    pub horizon_days: u32,

    /// Regularization of trend changes.
    #[arg(long, env = "TREND_REG", default_value_t = DEFAULT_TREND_REG)]
    pub trend_reg: f64,

    /// Regularization of seasonal terms.
    #[arg(long, env = "SEASONALITY_REG", default_value_t = DEFAULT_SEASONALITY_REG)]
    pub seasonality_reg: f64,

    #[arg(long, env = "EARLY_STOPPING", default_value_t = true, action = ArgAction::Set)]
    pub early_stopping: bool,

    /// Extra model parameter, repeatable (e.g. `--model-param changepoints=5`).
    #[arg(long = "model-param", value_name = "KEY=VALUE", value_parser = parse_model_param)]
    pub model_params: Vec<(String, f64)>,

    /// Validity of presigned URLs, in seconds.
    #[arg(long = "expiration", env = "PRESIGN_EXPIRATION_SECS", default_value_t = DEFAULT_EXPIRATION_SECS)]
    pub expiration_secs: u64,

    #[arg(long, env = "DATE_COLUMN", default_value = DEFAULT_DATE_COLUMN)]
    pub date_column: String,

    #[arg(long, env = "VALUE_COLUMN", default_value = DEFAULT_VALUE_COLUMN)]
    pub value_column: String,

    #[arg(long, default_value = "results.xlsx")]
    pub spreadsheet_name: String,

    #[arg(long, default_value = "graph.svg")]
    pub chart_name: String,

    /// Run against a local directory tree instead of S3 (buckets are subdirectories).
    #[arg(long = "local-root", env = "LOCAL_STORAGE_ROOT")]
    pub local_root: Option<PathBuf>,

    #[arg(long = "timeout", env = "HTTP_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Also write the run summary as JSON.
    #[arg(long = "summary-json")]
    pub summary_json: Option<PathBuf>,
}

impl Cli {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            source: ObjectRef::new(&self.source_bucket, &self.source_key),
            destination_bucket: self.destination_bucket.clone(),
            destination_prefix: self.destination_prefix.clone(),
            horizon_days: self.horizon_days,
            model: ModelConfig {
                trend_reg: self.trend_reg,
                seasonality_reg: self.seasonality_reg,
                early_stopping: self.early_stopping,
                extra: self.model_params.iter().cloned().collect::<BTreeMap<_, _>>(),
            },
            columns: ColumnNames {
                date: self.date_column.clone(),
                value: self.value_column.clone(),
            },
            expiration_secs: self.expiration_secs,
            spreadsheet_name: self.spreadsheet_name.clone(),
            chart_name: self.chart_name.clone(),
        }
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            region: self.region.clone(),
            endpoint: self.endpoint.clone().filter(|e| !e.trim().is_empty()),
            timeout_secs: self.timeout_secs,
            upload_expiration_secs: self.expiration_secs,
        }
    }
}

fn parse_model_param(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("parameter '{key}' needs a number, got '{}'", value.trim()))?;
    Ok((key.to_string(), value))
}
