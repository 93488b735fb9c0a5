// components/media_pipeline/src/error.rs
use crate::children::Stage;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to start {stage} ({program})")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} exited with {status}")]
    StageFailed { stage: Stage, status: ExitStatus },

    #[error("expected output file {} is missing after the run", path.display())]
    MissingOutput { path: PathBuf },

    #[error("{player} cannot record streams; recording requires mpv")]
    RecordingUnsupported { player: String },

    #[error("no output path was resolved for a file-writing mode")]
    NoOutputPath,

    #[error("interrupted")]
    Interrupted,

    #[error("io error while {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            operation: operation.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
