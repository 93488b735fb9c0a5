// bases/download_cli/src/error.rs
use media_pipeline::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("required program not found: {0}")]
    DependencyMissing(String),

    #[error("{} already exists; use --resume to continue it, or run without --silent to overwrite it", path.display())]
    ConflictUnresolved { path: PathBuf },

    #[error("--record needs a player that can record streams (mpv), not {player}")]
    UnsupportedModeCombination { player: String },

    #[error("interrupted")]
    Interrupted,

    #[error("failed to read an answer from the terminal")]
    Prompt(#[source] std::io::Error),

    #[error(transparent)]
    Pipeline(PipelineError),
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Interrupted => CliError::Interrupted,
            PipelineError::RecordingUnsupported { player } => {
                CliError::UnsupportedModeCombination { player }
            }
            other => CliError::Pipeline(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
