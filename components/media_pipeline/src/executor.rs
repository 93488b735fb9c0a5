// components/media_pipeline/src/executor.rs
use crate::children::{ChildProcessSet, Stage, StageHandle};
use crate::error::{PipelineError, Result};
use crate::fanout::FanOut;
use crate::player::Player;
use media_downloader::{DownloadRequest, Downloader, FormatSpec, SourceUrl};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a run does with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Save to a file, nothing else.
    #[default]
    Download,
    /// Save to a file and play the same bytes while they arrive.
    Play,
    /// Play the URL directly, never touching disk.
    Stream,
    /// Let the player capture the stream it is playing.
    Record,
}

impl Mode {
    pub fn writes_file(self) -> bool {
        !matches!(self, Mode::Stream)
    }

    /// Modes in which an existing output file needs a resume/overwrite decision.
    pub fn guards_existing_file(self) -> bool {
        matches!(self, Mode::Download | Mode::Record)
    }

    pub fn needs_player(self) -> bool {
        !matches!(self, Mode::Download)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Download => write!(f, "download"),
            Mode::Play => write!(f, "play"),
            Mode::Stream => write!(f, "stream"),
            Mode::Record => write!(f, "record"),
        }
    }
}

/// Everything the executor needs, after prompts and conflict checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub url: SourceUrl,
    pub mode: Mode,
    pub format: FormatSpec,
    /// Absent exactly when `mode` is [`Mode::Stream`].
    pub output: Option<PathBuf>,
    pub container: String,
    pub resume: bool,
    pub overwrite: bool,
}

impl ResolvedPlan {
    fn output_path(&self) -> Result<&Path> {
        self.output.as_deref().ok_or(PipelineError::NoOutputPath)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeReport {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub size_bytes: Option<u64>,
}

impl OutcomeReport {
    fn saved(path: &Path, size: u64) -> Self {
        Self {
            success: true,
            output_path: Some(path.to_path_buf()),
            size_bytes: Some(size),
        }
    }

    fn streamed(player_status: ExitStatus) -> Self {
        Self {
            success: player_status.success(),
            output_path: None,
            size_bytes: None,
        }
    }
}

pub struct PipelineExecutor {
    downloader: Arc<dyn Downloader + Send + Sync>,
    player: Arc<dyn Player>,
    children: ChildProcessSet,
    cancel: CancellationToken,
    fan_out: FanOut,
}

impl PipelineExecutor {
    pub fn new(
        downloader: Arc<dyn Downloader + Send + Sync>,
        player: Arc<dyn Player>,
        children: ChildProcessSet,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            downloader,
            player,
            children,
            cancel,
            fan_out: FanOut::default(),
        }
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Run the plan to completion.
    ///
    /// On any error every child started so far is asked to terminate before
    /// the error is returned.
    pub async fn execute(&self, plan: &ResolvedPlan) -> Result<OutcomeReport> {
        if plan.mode == Mode::Record && !self.player.supports_recording() {
            return Err(PipelineError::RecordingUnsupported {
                player: self.player.program().to_string(),
            });
        }

        info!(mode = %plan.mode, url = %plan.url, format = %plan.format, "starting pipeline");
        let result = match plan.mode {
            Mode::Stream => self.stream(plan).await,
            Mode::Download => self.download(plan).await,
            Mode::Play => self.play(plan).await,
            Mode::Record => self.record(plan).await,
        };

        if let Err(e) = &result {
            let pending = self.children.terminate_all();
            debug!("pipeline failed ({}), terminated {} child processes", e, pending);
        }
        result
    }

    async fn stream(&self, plan: &ResolvedPlan) -> Result<OutcomeReport> {
        if let (Some(spec), false) = (plan.format.explicit(), self.player.accepts_format_hint()) {
            warn!("{} does not take format hints; format {} is ignored", self.player.program(), spec);
        }
        let mut command = self.player.stream_command(&plan.url, &plan.format);
        let player = self.spawn(Stage::Player, &mut command)?;
        let status = self.wait(self.children.track(Stage::Player, player)).await?;

        if !status.success() {
            // Quitting a player is often reported as a non-zero exit.
            info!("player exited with {}", status);
        }
        Ok(OutcomeReport::streamed(status))
    }

    async fn download(&self, plan: &ResolvedPlan) -> Result<OutcomeReport> {
        let path = plan.output_path()?;
        let request = DownloadRequest::to_file(
            plan.url.clone(),
            plan.format.clone(),
            path,
            &plan.container,
        )
        .resume(plan.resume)
        .overwrite(plan.overwrite);

        let mut command = self.downloader.download_command(&request);
        command.stdin(Stdio::null());
        let downloader = self.spawn(Stage::Downloader, &mut command)?;
        let status = self
            .wait(self.children.track(Stage::Downloader, downloader))
            .await?;

        if !status.success() {
            return Err(PipelineError::StageFailed {
                stage: Stage::Downloader,
                status,
            });
        }
        verify_output(path).await
    }

    async fn play(&self, plan: &ResolvedPlan) -> Result<OutcomeReport> {
        let path = plan.output_path()?;
        if plan.resume {
            warn!("--resume is ignored while playing during download; {} will be rewritten", path.display());
        }

        let request = DownloadRequest::to_stdout(plan.url.clone(), plan.format.clone());
        let mut command = self.downloader.download_command(&request);
        command.stdin(Stdio::null()).stdout(Stdio::piped());
        let mut downloader = self.spawn(Stage::Downloader, &mut command)?;
        let source = downloader.stdout.take();
        let downloader = self.children.track(Stage::Downloader, downloader);
        let source = source.ok_or_else(|| not_piped("downloader stdout"))?;

        let mut command = self.player.stdin_command();
        command.stdin(Stdio::piped());
        let mut player = self.spawn(Stage::Player, &mut command)?;
        let sink = player.stdin.take();
        let player = self.children.track(Stage::Player, player);
        let sink = sink.ok_or_else(|| not_piped("player stdin"))?;

        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| PipelineError::io(format!("creating {}", path.display()), e))?;

        let (fan_out, downloaded, played) = tokio::try_join!(
            self.fan_out.run(source, file, Some(sink), &self.cancel),
            self.wait(downloader),
            self.wait(player),
        )?;

        if fan_out.player_detached {
            info!("playback ended early; {} bytes saved", fan_out.bytes_written);
        }
        if !played.success() {
            info!("player exited with {}", played);
        }
        if !downloaded.success() {
            return Err(PipelineError::StageFailed {
                stage: Stage::Downloader,
                status: downloaded,
            });
        }
        verify_output(path).await
    }

    async fn record(&self, plan: &ResolvedPlan) -> Result<OutcomeReport> {
        let path = plan.output_path()?;
        let mut command = self
            .player
            .record_command(&plan.url, &plan.format, path)
            .ok_or_else(|| PipelineError::RecordingUnsupported {
                player: self.player.program().to_string(),
            })?;

        let recorder = self.spawn(Stage::Recorder, &mut command)?;
        let status = self.wait(self.children.track(Stage::Recorder, recorder)).await?;
        if !status.success() {
            // The player decides how quitting a recording is reported; the file check below is what counts.
            info!("recorder exited with {}", status);
        }
        verify_output(path).await
    }

    fn spawn(&self, stage: Stage, command: &mut Command) -> Result<Child> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Interrupted);
        }
        debug!(%stage, command = ?command.as_std(), "launching");
        command
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                stage,
                program: command.as_std().get_program().to_string_lossy().into_owned(),
                source,
            })
    }

    async fn wait(&self, handle: StageHandle) -> Result<ExitStatus> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Interrupted),
            status = handle.wait() => status,
        }
    }
}

async fn verify_output(path: &Path) -> Result<OutcomeReport> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(OutcomeReport::saved(path, meta.len())),
        Ok(_) => Err(PipelineError::MissingOutput {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::MissingOutput {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(PipelineError::io(format!("inspecting {}", path.display()), e)),
    }
}

fn not_piped(what: &str) -> PipelineError {
    PipelineError::io(
        format!("connecting {}", what),
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "not piped"),
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::player::{ExternalPlayer, Mpv};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use media_downloader::{DownloadError, DownloadTarget, FormatEntry};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Runs a shell script as the "download"; `$1` is the target path or `-`.
    struct ScriptDownloader {
        script: &'static str,
    }

    #[async_trait]
    impl Downloader for ScriptDownloader {
        fn program(&self) -> &str {
            "sh"
        }

        async fn list_formats(&self, _url: &SourceUrl) -> std::result::Result<Vec<FormatEntry>, DownloadError> {
            Ok(Vec::new())
        }

        async fn fetch_title(&self, _url: &SourceUrl) -> std::result::Result<String, DownloadError> {
            Ok(String::new())
        }

        fn download_command(&self, request: &DownloadRequest) -> Command {
            let target = match &request.target {
                DownloadTarget::File { path, .. } => path.clone().into_os_string(),
                DownloadTarget::Stdout => "-".into(),
            };
            let mut command = Command::new("sh");
            command.arg("-c").arg(self.script).arg("sh").arg(target);
            command
        }
    }

    /// A player made of shell scripts. Never records.
    struct ScriptPlayer {
        stream: &'static str,
        stdin: &'static str,
    }

    impl Player for ScriptPlayer {
        fn program(&self) -> &str {
            "sh"
        }

        fn stream_command(&self, _url: &SourceUrl, _format: &FormatSpec) -> Command {
            let mut command = Command::new("sh");
            command.arg("-c").arg(self.stream);
            command
        }

        fn stdin_command(&self) -> Command {
            let mut command = Command::new("sh");
            command.arg("-c").arg(self.stdin).stdout(Stdio::null());
            command
        }
    }

    fn executor(
        downloader: &'static str,
        player: ScriptPlayer,
    ) -> (PipelineExecutor, ChildProcessSet, CancellationToken) {
        let children = ChildProcessSet::new();
        let cancel = CancellationToken::new();
        let executor = PipelineExecutor::new(
            Arc::new(ScriptDownloader { script: downloader }),
            Arc::new(player),
            children.clone(),
            cancel.clone(),
        );
        (executor, children, cancel)
    }

    fn idle_player() -> ScriptPlayer {
        ScriptPlayer {
            stream: "exit 0",
            stdin: "cat > /dev/null",
        }
    }

    fn plan(mode: Mode, output: Option<PathBuf>) -> ResolvedPlan {
        ResolvedPlan {
            url: SourceUrl::parse("https://example.com/watch?v=1").unwrap(),
            mode,
            format: FormatSpec::Default,
            output,
            container: "mkv".to_string(),
            resume: false,
            overwrite: false,
        }
    }

    #[tokio::test]
    async fn download_reports_saved_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        let (executor, children, _) = executor("printf hello > \"$1\"", idle_player());

        let report = executor
            .execute(&plan(Mode::Download, Some(path.clone())))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.output_path.as_deref(), Some(path.as_path()));
        assert_eq!(report.size_bytes, Some(5));
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn download_without_file_is_a_postcondition_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        let (executor, _, _) = executor("exit 0", idle_player());

        let result = executor.execute(&plan(Mode::Download, Some(path.clone()))).await;
        assert_matches!(result, Err(PipelineError::MissingOutput { path: p }) if p == path);
    }

    #[tokio::test]
    async fn failing_downloader_is_a_stage_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        let (executor, _, _) = executor("printf partial > \"$1\"; exit 3", idle_player());

        let result = executor.execute(&plan(Mode::Download, Some(path))).await;
        assert_matches!(
            result,
            Err(PipelineError::StageFailed { stage: Stage::Downloader, status }) if status.code() == Some(3)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn play_saves_everything_even_when_player_quits_early() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        let (executor, children, _) = executor(
            "head -c 4194304 /dev/zero",
            ScriptPlayer {
                stream: "exit 0",
                stdin: "head -c 1000 > /dev/null; exit 4",
            },
        );

        let report = executor
            .execute(&plan(Mode::Play, Some(path.clone())))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.size_bytes, Some(4 * 1024 * 1024));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4 * 1024 * 1024);
        assert!(children.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn play_with_resume_still_downloads_from_scratch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        std::fs::write(&path, b"stale bytes that must disappear").unwrap();
        let (executor, _, _) = executor("printf fresh", idle_player());

        let mut plan = plan(Mode::Play, Some(path.clone()));
        plan.resume = true;
        let report = executor.execute(&plan).await.unwrap();

        assert_eq!(report.size_bytes, Some(5));
        assert_eq!(std::fs::read(&path).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn stream_never_creates_a_file_and_tolerates_player_exit_codes() {
        let dir = TempDir::new().unwrap();
        let (executor, children, _) = executor(
            "echo should-not-run > unexpected",
            ScriptPlayer {
                stream: "exit 4",
                stdin: "cat > /dev/null",
            },
        );

        let report = executor.execute(&plan(Mode::Stream, None)).await.unwrap();

        assert!(!report.success);
        assert_eq!(report.output_path, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn stream_with_other_player_ignores_the_format() {
        let executor = PipelineExecutor::new(
            Arc::new(ScriptDownloader { script: "exit 0" }),
            Arc::new(ExternalPlayer::new("true")),
            ChildProcessSet::new(),
            CancellationToken::new(),
        );
        let mut plan = plan(Mode::Stream, None);
        plan.format = FormatSpec::Explicit("22".to_string());

        let report = executor.execute(&plan).await.unwrap();
        assert!(report.success);
    }

    #[tokio::test]
    async fn record_with_unsupported_player_fails_before_spawning() {
        let children = ChildProcessSet::new();
        let executor = PipelineExecutor::new(
            Arc::new(ScriptDownloader { script: "exit 0" }),
            Arc::new(ExternalPlayer::new("vlc")),
            children.clone(),
            CancellationToken::new(),
        );

        let result = executor
            .execute(&plan(Mode::Record, Some(PathBuf::from("never.mkv"))))
            .await;
        assert_matches!(result, Err(PipelineError::RecordingUnsupported { player }) if player == "vlc");
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn record_requires_an_output_path() {
        let executor = PipelineExecutor::new(
            Arc::new(ScriptDownloader { script: "exit 0" }),
            Arc::new(Mpv::new("mpv")),
            ChildProcessSet::new(),
            CancellationToken::new(),
        );
        let result = executor.execute(&plan(Mode::Record, None)).await;
        assert_matches!(result, Err(PipelineError::NoOutputPath));
    }

    #[tokio::test]
    async fn cancellation_interrupts_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        let (executor, children, cancel) = executor("sleep 30", idle_player());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            executor.execute(&plan(Mode::Download, Some(path))),
        )
        .await
        .expect("cancellation should end the run");
        canceller.await.unwrap();

        assert_matches!(result, Err(PipelineError::Interrupted));
        tokio::time::timeout(Duration::from_secs(5), children.drained())
            .await
            .expect("children should be reaped");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelling_a_running_play_tears_down_every_stage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mkv");
        let (executor, children, cancel) = executor(
            "while true; do printf data; sleep 0.05; done",
            idle_player(),
        );

        let watched = children.clone();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let running = watched.stages();
            cancel.cancel();
            running
        });

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            executor.execute(&plan(Mode::Play, Some(path.clone()))),
        )
        .await
        .expect("cancellation should end the run");
        let running = canceller.await.unwrap();

        assert_matches!(result, Err(PipelineError::Interrupted));
        assert_eq!(
            running.iter().map(|(stage, _)| *stage).collect::<Vec<_>>(),
            vec![Stage::Downloader, Stage::Player]
        );
        tokio::time::timeout(Duration::from_secs(5), children.drained())
            .await
            .expect("downloader and player should be reaped");
        let saved = std::fs::read(&path).unwrap();
        assert!(saved.chunks(4).all(|chunk| chunk == &b"data"[..chunk.len()]));
    }

    #[tokio::test]
    async fn nothing_starts_once_cancelled() {
        let dir = TempDir::new().unwrap();
        let (executor, children, cancel) = executor("printf x > \"$1\"", idle_player());
        cancel.cancel();

        let result = executor
            .execute(&plan(Mode::Download, Some(dir.path().join("out.mkv"))))
            .await;
        assert_matches!(result, Err(PipelineError::Interrupted));
        assert!(children.is_empty());
        assert!(!dir.path().join("out.mkv").exists());
    }
}
