// bases/download_cli/src/guard.rs
use crate::error::{CliError, Result};
use crate::prompt::Prompter;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// What to do about the output path before anything is downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing there yet.
    Fresh,
    /// Continue the existing file.
    Resume,
    /// The user agreed to replace it.
    Overwrite,
    /// The user wants to keep it; the run ends without doing anything.
    Declined,
}

pub struct ConflictGuard {
    prompter: Arc<dyn Prompter>,
}

impl ConflictGuard {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter }
    }

    pub async fn check(&self, path: &Path, resume: bool, silent: bool) -> Result<Decision> {
        if tokio::fs::metadata(path).await.is_err() {
            return Ok(Decision::Fresh);
        }
        if resume {
            info!("{} exists, resuming", path.display());
            return Ok(Decision::Resume);
        }
        if silent {
            return Err(CliError::ConflictUnresolved {
                path: path.to_path_buf(),
            });
        }

        let overwrite = self
            .prompter
            .confirm_overwrite(path)
            .await
            .map_err(CliError::Prompt)?;
        Ok(if overwrite {
            Decision::Overwrite
        } else {
            Decision::Declined
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::stub::ScriptedPrompter;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use tempfile::TempDir;

    fn guard(overwrite: bool) -> (ConflictGuard, Arc<ScriptedPrompter>) {
        let prompter = Arc::new(ScriptedPrompter {
            overwrite,
            ..Default::default()
        });
        (ConflictGuard::new(prompter.clone()), prompter)
    }

    #[rstest]
    #[case(false, false)]
    #[case(true, false)]
    #[case(false, true)]
    #[tokio::test]
    async fn missing_file_is_fresh(#[case] resume: bool, #[case] silent: bool) {
        let dir = TempDir::new().unwrap();
        let (guard, prompter) = guard(false);

        let decision = guard.check(&dir.path().join("out.mkv"), resume, silent).await.unwrap();

        assert_eq!(decision, Decision::Fresh);
        assert!(!prompter.asked_anything());
    }

    #[rstest]
    #[case(true, false, Decision::Resume)]
    #[case(true, true, Decision::Resume)]
    #[case(false, false, Decision::Overwrite)]
    #[tokio::test]
    async fn existing_file(#[case] resume: bool, #[case] silent: bool, #[case] expected: Decision) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        std::fs::write(&path, b"partial").unwrap();
        let (guard, _) = guard(true);

        assert_eq!(guard.check(&path, resume, silent).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn silent_conflict_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        std::fs::write(&path, b"partial").unwrap();
        let (guard, prompter) = guard(true);

        let result = guard.check(&path, false, true).await;

        assert_matches!(result, Err(CliError::ConflictUnresolved { path: p }) if p == path);
        assert!(!prompter.asked_anything());
    }

    #[tokio::test]
    async fn declining_keeps_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        std::fs::write(&path, b"partial").unwrap();
        let (guard, prompter) = guard(false);

        assert_eq!(guard.check(&path, false, false).await.unwrap(), Decision::Declined);
        assert_eq!(*prompter.overwrite_asked.lock(), vec![path.clone()]);
        assert_eq!(std::fs::read(&path).unwrap(), b"partial");
    }
}
