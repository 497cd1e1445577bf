//! Artifact publishing.
//!
//! The workbook is encoded before anything is uploaded. Each artifact is then
//! uploaded independently, so one failing upload never prevents the other from
//! being attempted. Nothing is rolled back.

use crate::domain::{ObjectRef, PipelineConfig};
use crate::error::{Artifact, PipelineError, PublishFailure};
use crate::io::export::write_workbook;
use crate::report::ReportBundle;
use crate::storage::{ObjectStore, PublishAck};

/// Upload the spreadsheet and the chart under `{prefix}/{file_name}`.
pub fn publish(
    bundle: &ReportBundle,
    config: &PipelineConfig,
    store: &dyn ObjectStore,
) -> Result<Vec<PublishAck>, PipelineError> {
    let workbook = write_workbook(bundle)?;

    let artifacts = [
        (Artifact::Spreadsheet, &config.spreadsheet_name, workbook.as_slice()),
        (Artifact::Chart, &config.chart_name, bundle.chart.as_slice()),
    ];

    let mut acks = Vec::with_capacity(artifacts.len());
    let mut failed = Vec::new();
    for (artifact, file_name, bytes) in artifacts {
        let object = ObjectRef::new(&config.destination_bucket, config.destination_key(file_name));
        match store.store(bytes, &object) {
            Ok(ack) => {
                log::info!("Uploaded {artifact} ({} bytes) to {}", ack.bytes, ack.object);
                acks.push(ack);
            }
            Err(e) => {
                log::error!("Failed to upload {artifact} to {object}: {e}");
                failed.push(PublishFailure {
                    artifact,
                    key: object.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    if failed.is_empty() {
        Ok(acks)
    } else if acks.is_empty() {
        Err(PipelineError::Publish { failed })
    } else {
        Err(PipelineError::PartialPublish {
            uploaded: acks.iter().map(|a| a.object.to_string()).collect(),
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Series;
    use crate::report::assemble;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    fn bundle() -> ReportBundle {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let actual = Series::from_pairs([(day, 1.0), (day.succ_opt().unwrap(), 2.0)]).unwrap();
        assemble(&actual, &actual, &Series::empty()).unwrap()
    }

    #[test]
    fn uploads_both_artifacts_under_prefix() {
        let store = MemoryStore::new();
        let acks = publish(&bundle(), &PipelineConfig::default(), &store).unwrap();

        assert_eq!(acks.len(), 2);
        let xlsx = store
            .get(&ObjectRef::new("pimis-ml", "results/results.xlsx"))
            .unwrap();
        assert!(xlsx.starts_with(b"PK\x03\x04"));
        let svg = store.get(&ObjectRef::new("pimis-ml", "results/graph.svg")).unwrap();
        assert!(String::from_utf8(svg).unwrap().contains("<svg"));
    }

    #[test]
    fn partial_failure_names_each_side() {
        let store = MemoryStore::new();
        store.fail_uploads_to("results/graph.svg");

        let err = publish(&bundle(), &PipelineConfig::default(), &store).unwrap_err();
        match err {
            PipelineError::PartialPublish { uploaded, failed } => {
                assert_eq!(uploaded, vec!["pimis-ml/results/results.xlsx".to_string()]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].artifact, Artifact::Chart);
            }
            other => panic!("expected partial publish, got {other:?}"),
        }
        // The spreadsheet stays published.
        assert!(store.get(&ObjectRef::new("pimis-ml", "results/results.xlsx")).is_some());
    }

    #[test]
    fn total_failure_lists_both_artifacts() {
        let store = MemoryStore::new();
        store.fail_uploads_to("results/graph.svg");
        store.fail_uploads_to("results/results.xlsx");

        let err = publish(&bundle(), &PipelineConfig::default(), &store).unwrap_err();
        match err {
            PipelineError::Publish { failed } => {
                let artifacts: Vec<Artifact> = failed.iter().map(|f| f.artifact).collect();
                assert_eq!(artifacts, vec![Artifact::Spreadsheet, Artifact::Chart]);
            }
            other => panic!("expected publish failure, got {other:?}"),
        }
    }
}
