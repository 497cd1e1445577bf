//! Pipeline error taxonomy.
//!
//! Every stage either returns a typed result or fails with exactly one of the
//! variants below. The binary maps each variant to a distinct exit code so a
//! scheduler can tell which stage failed without parsing the message.

use thiserror::Error;

/// Which generated file a publish outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Spreadsheet,
    Chart,
}

impl Artifact {
    pub fn display_name(self) -> &'static str {
        match self {
            Artifact::Spreadsheet => "spreadsheet",
            Artifact::Chart => "chart",
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One failed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    pub artifact: Artifact,
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}: {}", self.artifact, self.key, self.message)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage credentials not configured: {0}")]
    Credential(String),

    #[error("Ingest failed: {0}")]
    Ingest(String),

    #[error("Forecast failed: {0}")]
    Forecast(String),

    #[error("Report assembly failed: {0}")]
    Assembly(String),

    /// Every artifact failed to upload.
    #[error("Publish failed: {}", join_failures(.failed))]
    Publish { failed: Vec<PublishFailure> },

    /// Some artifacts were uploaded and some were not; only `failed` needs a retry.
    #[error(
        "Partial publish: uploaded [{}], failed [{}]",
        .uploaded.join(", "),
        join_failures(.failed)
    )]
    PartialPublish {
        uploaded: Vec<String>,
        failed: Vec<PublishFailure>,
    },
}

impl PipelineError {
    /// Name of the pipeline stage that produced the error.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Credential(_) => "credentials",
            PipelineError::Ingest(_) => "ingest",
            PipelineError::Forecast(_) => "forecast",
            PipelineError::Assembly(_) => "assemble",
            PipelineError::Publish { .. } | PipelineError::PartialPublish { .. } => "publish",
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Credential(_) => 3,
            PipelineError::Ingest(_) => 4,
            PipelineError::Forecast(_) => 5,
            PipelineError::Assembly(_) => 6,
            PipelineError::Publish { .. } | PipelineError::PartialPublish { .. } => 7,
        }
    }
}

fn join_failures(failed: &[PublishFailure]) -> String {
    failed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_publish_names_both_sides() {
        let err = PipelineError::PartialPublish {
            uploaded: vec!["results/results.xlsx".to_string()],
            failed: vec![PublishFailure {
                artifact: Artifact::Chart,
                key: "results/graph.svg".to_string(),
                message: "status 403".to_string(),
            }],
        };

        let msg = err.to_string();
        assert!(msg.contains("results/results.xlsx"));
        assert!(msg.contains("chart -> results/graph.svg: status 403"));
        assert_eq!(err.exit_code(), 7);
        assert_eq!(err.stage(), "publish");
    }

    #[test]
    fn exit_codes_are_distinct_per_stage() {
        let codes = [
            PipelineError::Config(String::new()).exit_code(),
            PipelineError::Credential(String::new()).exit_code(),
            PipelineError::Ingest(String::new()).exit_code(),
            PipelineError::Forecast(String::new()).exit_code(),
            PipelineError::Assembly(String::new()).exit_code(),
            PipelineError::Publish { failed: vec![] }.exit_code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(codes.iter().all(|&c| c != 0));
    }
}
