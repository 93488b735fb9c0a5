// bases/download_cli/src/app.rs
use crate::config::RunConfig;
use crate::error::{CliError, Result};
use crate::guard::{ConflictGuard, Decision};
use crate::probe::probe_dependencies;
use crate::prompt::{Prompter, TerminalPrompter};
use crate::resolve::{FilenameResolver, FormatResolver};
use media_downloader::{Downloader, YtDlp};
use media_pipeline::{
    player_for, ChildProcessSet, Mode, OutcomeReport, PipelineExecutor, Player, ResolvedPlan,
    Supervisor,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long children get to exit after a failed or interrupted run.
const CLEANUP_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(OutcomeReport),
    /// The user chose to keep an existing file; nothing was run.
    Declined { path: PathBuf },
}

pub struct App {
    config: RunConfig,
    downloader: Arc<dyn Downloader + Send + Sync>,
    player: Arc<dyn Player>,
    prompter: Arc<dyn Prompter>,
    children: ChildProcessSet,
    cancel: CancellationToken,
}

impl App {
    pub fn new(config: RunConfig) -> Self {
        let player = player_for(&config.player);
        Self::with_collaborators(
            config,
            Arc::new(YtDlp::new()),
            player,
            Arc::new(TerminalPrompter::new()),
        )
    }

    pub fn with_collaborators(
        config: RunConfig,
        downloader: Arc<dyn Downloader + Send + Sync>,
        player: Arc<dyn Player>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            config,
            downloader,
            player,
            prompter,
            children: ChildProcessSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// A supervisor tearing down this app's children on interrupt.
    pub fn supervisor(&self) -> Supervisor {
        Supervisor::new(self.children.clone(), self.cancel.clone())
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CliError::Interrupted),
            result = self.run_to_completion() => result,
        };

        if result.is_err() && !self.children.shutdown(CLEANUP_GRACE).await {
            warn!(
                "{} child processes did not exit within {:?}",
                self.children.len(),
                CLEANUP_GRACE
            );
        }
        result
    }

    async fn run_to_completion(&self) -> Result<RunOutcome> {
        let config = &self.config;
        if config.mode == Mode::Record && !self.player.supports_recording() {
            return Err(CliError::UnsupportedModeCombination {
                player: self.player.program().to_string(),
            });
        }

        probe_dependencies(self.downloader.as_ref(), self.player.as_ref(), config.mode).await?;

        let format = FormatResolver::new(self.downloader.clone(), self.prompter.clone())
            .resolve(config.format.as_deref(), config.silent, config.mode, &config.url)
            .await?;

        let output = if config.mode.writes_file() {
            let path = FilenameResolver::new(self.downloader.clone(), self.prompter.clone())
                .resolve(
                    config.output.as_deref(),
                    config.silent,
                    &config.url,
                    &config.container,
                )
                .await?;
            Some(path)
        } else {
            None
        };

        let mut overwrite = false;
        if let (Some(path), true) = (&output, config.mode.guards_existing_file()) {
            match ConflictGuard::new(self.prompter.clone())
                .check(path, config.resume, config.silent)
                .await?
            {
                Decision::Declined => return Ok(RunOutcome::Declined { path: path.clone() }),
                Decision::Overwrite => overwrite = true,
                Decision::Fresh | Decision::Resume => {}
            }
        }

        let plan = ResolvedPlan {
            url: config.url.clone(),
            mode: config.mode,
            format,
            output,
            container: config.container.clone(),
            resume: config.resume,
            overwrite,
        };
        debug!(?plan, "resolved");

        let executor = PipelineExecutor::new(
            self.downloader.clone(),
            self.player.clone(),
            self.children.clone(),
            self.cancel.clone(),
        );
        let report = executor.execute(&plan).await?;
        Ok(RunOutcome::Completed(report))
    }
}
