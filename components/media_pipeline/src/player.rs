// components/media_pipeline/src/player.rs
use media_downloader::{FormatSpec, SourceUrl};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

/// An external media player.
///
/// Like [`media_downloader::Downloader`], implementations only build commands;
/// the executor decides how their stdio is wired and supervises them.
pub trait Player: Send + Sync {
    fn program(&self) -> &str;

    fn is_available(&self) -> bool {
        which::which(self.program()).is_ok()
    }

    /// Play a URL directly.
    fn stream_command(&self, url: &SourceUrl, format: &FormatSpec) -> Command;

    /// Play media piped into standard input.
    fn stdin_command(&self) -> Command;

    /// Capture a stream to `path` while playing it, if the player can.
    fn record_command(&self, _url: &SourceUrl, _format: &FormatSpec, _path: &Path) -> Option<Command> {
        None
    }

    fn supports_recording(&self) -> bool {
        false
    }

    /// Whether an explicit format specifier reaches the player when streaming.
    fn accepts_format_hint(&self) -> bool {
        false
    }
}

pub struct Mpv {
    program: String,
}

impl Mpv {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn base_command(&self, format: &FormatSpec) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(spec) = format.explicit() {
            command.arg(format!("--ytdl-format={}", spec));
        }
        command
    }
}

impl Player for Mpv {
    fn program(&self) -> &str {
        &self.program
    }

    fn stream_command(&self, url: &SourceUrl, format: &FormatSpec) -> Command {
        let mut command = self.base_command(format);
        command.arg("--").arg(url.as_str());
        command
    }

    fn stdin_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-");
        command
    }

    fn record_command(&self, url: &SourceUrl, format: &FormatSpec, path: &Path) -> Option<Command> {
        let mut record = OsString::from("--stream-record=");
        record.push(path.as_os_str());

        let mut command = self.base_command(format);
        command.arg(record).arg("--").arg(url.as_str());
        Some(command)
    }

    fn supports_recording(&self) -> bool {
        true
    }

    fn accepts_format_hint(&self) -> bool {
        true
    }
}

/// Any other player: gets the URL or `-` as its only argument.
pub struct ExternalPlayer {
    program: String,
}

impl ExternalPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Player for ExternalPlayer {
    fn program(&self) -> &str {
        &self.program
    }

    fn stream_command(&self, url: &SourceUrl, _format: &FormatSpec) -> Command {
        let mut command = Command::new(&self.program);
        command.arg(url.as_str());
        command
    }

    fn stdin_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-");
        command
    }
}

/// Pick the integration for a player name or path (`mpv`, `/usr/bin/mpv`, `vlc`, ...).
pub fn player_for(program: &str) -> Arc<dyn Player> {
    let is_mpv = Path::new(program)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem == "mpv");

    if is_mpv {
        Arc::new(Mpv::new(program))
    } else {
        Arc::new(ExternalPlayer::new(program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(command: &Command) -> Vec<String> {
        command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn url() -> SourceUrl {
        SourceUrl::parse("https://example.com/live").unwrap()
    }

    #[rstest]
    #[case("mpv", true)]
    #[case("/usr/local/bin/mpv", true)]
    #[case("mpv.exe", true)]
    #[case("vlc", false)]
    #[case("mpvx", false)]
    fn only_mpv_records(#[case] program: &str, #[case] records: bool) {
        let player = player_for(program);
        assert_eq!(player.supports_recording(), records);
        assert_eq!(player.program(), program);
    }

    #[test]
    fn mpv_streams_with_format_hint() {
        let mpv = Mpv::new("mpv");
        let command = mpv.stream_command(&url(), &FormatSpec::Explicit("137+140".into()));
        assert_eq!(
            args(&command),
            ["--ytdl-format=137+140", "--", "https://example.com/live"]
        );

        let command = mpv.stream_command(&url(), &FormatSpec::Default);
        assert_eq!(args(&command), ["--", "https://example.com/live"]);
    }

    #[test]
    fn mpv_records_to_path() {
        let mpv = Mpv::new("mpv");
        let command = mpv
            .record_command(&url(), &FormatSpec::Default, Path::new("capture.mkv"))
            .unwrap();
        assert_eq!(
            args(&command),
            ["--stream-record=capture.mkv", "--", "https://example.com/live"]
        );
    }

    #[test]
    fn only_mpv_takes_format_hints() {
        let spec = FormatSpec::Explicit("22".into());
        let vlc = ExternalPlayer::new("vlc");
        assert!(!vlc.accepts_format_hint());
        assert_eq!(args(&vlc.stream_command(&url(), &spec)), ["https://example.com/live"]);
        assert!(Mpv::new("mpv").accepts_format_hint());
    }

    #[test]
    fn external_player_reads_stdin_from_dash() {
        let vlc = ExternalPlayer::new("vlc");
        assert_eq!(args(&vlc.stdin_command()), ["-"]);
        assert_eq!(
            args(&vlc.stream_command(&url(), &FormatSpec::Default)),
            ["https://example.com/live"]
        );
        assert!(vlc
            .record_command(&url(), &FormatSpec::Default, Path::new("x.mkv"))
            .is_none());
    }
}
