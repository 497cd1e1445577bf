//! The report pipeline, independent of how storage and the model are chosen.
//!
//! validate -> presign -> ingest -> forecast -> assemble -> publish
//!
//! Each stage consumes the previous stage's output by reference and fails
//! with its own `PipelineError` variant. Nothing survives between runs.

use crate::domain::{ForecastResult, PipelineConfig};
use crate::error::PipelineError;
use crate::forecast::forecast;
use crate::io::ingest::{IngestedSeries, ingest};
use crate::models::ForecastModel;
use crate::publish::publish;
use crate::report::{ReportBundle, RunSummary, SectionSummary, assemble};
use crate::storage::{ObjectStore, PublishAck};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedSeries,
    pub forecast: ForecastResult,
    pub bundle: ReportBundle,
    pub acks: Vec<PublishAck>,
    pub summary: RunSummary,
}

/// Execute the full pipeline against `store` with `model`.
pub fn run_pipeline(
    config: &PipelineConfig,
    store: &dyn ObjectStore,
    model: &dyn ForecastModel,
) -> Result<RunOutput, PipelineError> {
    config.validate()?;

    // 1) Resolve the source export to a time-limited locator.
    let locator = store
        .presign(&config.source, config.expiration_secs)
        .map_err(|e| PipelineError::Ingest(format!("Failed to create locator for {}: {e}", config.source)))?;
    if let Some(expires_at) = locator.expires_at {
        log::debug!("Source locator for {} valid until {expires_at}", config.source);
    }

    // 2) Ingest and normalize to a daily series.
    let ingest = ingest(store, &locator, &config.columns)?;

    // 3) Fit once, predict in-sample and over the horizon.
    let forecast = forecast(&ingest.series, config.horizon_days, &config.model, model)?;

    // 4) Monthly tables and chart.
    let bundle = assemble(&ingest.series, &forecast.in_sample, &forecast.future)?;

    // 5) Upload both artifacts.
    let acks = publish(&bundle, config, store)?;

    let summary = RunSummary {
        source: config.source.to_string(),
        format: ingest.format.display_name().to_string(),
        rows_read: ingest.rows_read,
        rows_used: ingest.rows_used,
        rows_dropped: ingest.row_errors.len(),
        history_points: ingest.series.len(),
        history_start: ingest.series.first().map(|p| p.date),
        history_end: ingest.series.last().map(|p| p.date),
        model: model.name().to_string(),
        horizon_days: forecast.horizon_days,
        forecast_start: forecast.future.first().map(|p| p.date),
        forecast_end: forecast.future.last().map(|p| p.date),
        sections: SectionSummary::from_bundle(&bundle),
        uploaded: acks.iter().map(|a| a.object.to_string()).collect(),
    };

    Ok(RunOutput {
        ingest,
        forecast,
        bundle,
        acks,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectRef;
    use crate::models::TrendSeasonalModel;
    use crate::storage::MemoryStore;

    #[test]
    fn invalid_config_fails_before_any_io() {
        let store = MemoryStore::new();
        let config = PipelineConfig {
            horizon_days: 0,
            ..PipelineConfig::default()
        };
        let err = run_pipeline(&config, &store, &TrendSeasonalModel).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn missing_source_is_an_ingest_error() {
        let store = MemoryStore::new();
        let err = run_pipeline(&PipelineConfig::default(), &store, &TrendSeasonalModel).unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn summary_reflects_the_run() {
        let store = MemoryStore::new();
        let mut csv = String::from("Date Created,Total Revenue\n");
        for day in 1..=31 {
            csv.push_str(&format!("2024-01-{day:02},{}\n", day * 10));
        }
        csv.push_str("not a date,5\n");
        store.insert(&ObjectRef::new("pimis-ml", "reports/export.xlsx"), csv);

        let config = PipelineConfig {
            horizon_days: 10,
            ..PipelineConfig::default()
        };
        let out = run_pipeline(&config, &store, &TrendSeasonalModel).unwrap();

        assert_eq!(out.summary.rows_read, 32);
        assert_eq!(out.summary.rows_used, 31);
        assert_eq!(out.summary.rows_dropped, 1);
        assert_eq!(out.summary.uploaded.len(), 2);
        assert_eq!(out.forecast.future.len(), 10);
    }
}
