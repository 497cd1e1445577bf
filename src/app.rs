//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI/environment configuration
//! - resolves storage (S3 with explicit credentials, or a local directory)
//! - runs the report pipeline with the built-in model
//! - prints the run summary and optionally writes it as JSON

use std::path::Path;

use clap::Parser;

use crate::cli::Cli;
use crate::error::PipelineError;
use crate::models::TrendSeasonalModel;
use crate::report::{RunSummary, format_run_summary};
use crate::storage::{LocalStore, ObjectStore, S3Store, StorageCredentials};

pub mod pipeline;

/// Entry point for the `revcast` binary.
pub fn run() -> Result<(), PipelineError> {
    // `.env` is optional; real environment variables take precedence.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = cli.pipeline_config();
    config.validate()?;

    let store = open_store(&cli)?;
    let model = TrendSeasonalModel::new();

    let run = pipeline::run_pipeline(&config, store.as_ref(), &model)?;

    println!("{}", format_run_summary(&run.summary));

    // Artifacts are already published at this point; summary write failures only warn.
    if let Some(path) = &cli.summary_json {
        if let Err(e) = write_summary_json(path, &run.summary) {
            log::warn!("Run summary not written: {e}");
        }
    }

    Ok(())
}

/// Pick the storage backend. Credentials are resolved here, before any I/O.
fn open_store(cli: &Cli) -> Result<Box<dyn ObjectStore>, PipelineError> {
    if let Some(root) = &cli.local_root {
        log::info!("Using local storage under {}", root.display());
        return Ok(Box::new(LocalStore::new(root)));
    }

    let credentials = StorageCredentials::new(
        cli.access_key_id.clone(),
        cli.secret_access_key.clone(),
        cli.session_token.clone(),
    )?;
    let settings = cli.s3_settings();
    log::info!(
        "Using S3 in {}{}",
        settings.region,
        settings
            .endpoint
            .as_deref()
            .map(|e| format!(" via {e}"))
            .unwrap_or_default()
    );
    Ok(Box::new(S3Store::new(credentials, settings)?))
}

fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), String> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| format!("Failed to serialize run summary: {e}"))?;
    std::fs::write(path, json)
        .map_err(|e| format!("Failed to write run summary '{}': {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            source: "pimis-ml/reports/export.xlsx".to_string(),
            format: "csv".to_string(),
            rows_read: 3,
            rows_used: 3,
            rows_dropped: 0,
            history_points: 3,
            history_start: None,
            history_end: None,
            model: "mean".to_string(),
            horizon_days: 1,
            forecast_start: None,
            forecast_end: None,
            sections: Vec::new(),
            uploaded: vec!["pimis-ml/results/graph.svg".to_string()],
        }
    }

    #[test]
    fn summary_json_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary_json(&path, &summary()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["uploaded"][0], "pimis-ml/results/graph.svg");
    }

    #[test]
    fn unwritable_summary_is_a_plain_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("summary.json");
        let err = write_summary_json(&path, &summary()).unwrap_err();
        assert!(err.contains("summary.json"));
    }
}
