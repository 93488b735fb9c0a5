// components/media_downloader/src/ytdlp.rs
use crate::types::{DownloadError, DownloadRequest, DownloadTarget, FormatEntry, SourceUrl};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait Downloader {
    /// Executable name or path
    fn program(&self) -> &str;

    /// Check if the downloader is installed
    async fn check_available(&self) -> Result<(), DownloadError> {
        which::which(self.program())
            .map(|_| ())
            .map_err(|_| DownloadError::DependencyNotFound(self.program().to_string()))
    }

    /// List the streams available for a URL
    async fn list_formats(&self, url: &SourceUrl) -> Result<Vec<FormatEntry>, DownloadError>;

    /// Fetch the human-readable title of a URL
    async fn fetch_title(&self, url: &SourceUrl) -> Result<String, DownloadError>;

    /// Build (but do not spawn) the command performing a download
    fn download_command(&self, request: &DownloadRequest) -> Command;
}

pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_program("yt-dlp")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn fetch_info(&self, url: &SourceUrl) -> Result<YtDlpInfo, DownloadError> {
        debug!("Querying {} for {}", self.program, url);

        let output = Command::new(&self.program)
            .arg("--dump-json")
            .arg("--no-playlist")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--")
            .arg(url.as_str())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::QueryFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let first_line = output
            .stdout
            .split(|b| *b == b'\n')
            .find(|line| !line.iter().all(u8::is_ascii_whitespace))
            .ok_or_else(|| DownloadError::QueryFailed(format!("{} printed nothing", self.program)))?;

        Ok(serde_json::from_slice(first_line)?)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for YtDlp {
    fn program(&self) -> &str {
        &self.program
    }

    async fn list_formats(&self, url: &SourceUrl) -> Result<Vec<FormatEntry>, DownloadError> {
        let info = self.fetch_info(url).await?;
        debug!("{} formats available", info.formats.len());
        Ok(info.formats)
    }

    async fn fetch_title(&self, url: &SourceUrl) -> Result<String, DownloadError> {
        let info = self.fetch_info(url).await?;
        Ok(info.title.unwrap_or_default())
    }

    fn download_command(&self, request: &DownloadRequest) -> Command {
        let mut command = Command::new(&self.program);
        command.args(download_args(request));
        command
    }
}

/// Arguments for a yt-dlp download, in the order they are passed.
pub fn download_args(request: &DownloadRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    if let Some(spec) = request.format.explicit() {
        args.push("--format".into());
        args.push(spec.into());
    }

    match &request.target {
        DownloadTarget::File {
            path,
            merge_container,
            resume,
            overwrite,
        } => {
            if *resume {
                args.push("--continue".into());
            } else if *overwrite {
                args.push("--force-overwrites".into());
            }
            if let Some(container) = merge_container {
                args.push("--merge-output-format".into());
                args.push(container.into());
            }
            args.push("--output".into());
            args.push(path.into());
        }
        DownloadTarget::Stdout => {
            args.push("--output".into());
            args.push("-".into());
        }
    }

    args.push("--".into());
    args.push(request.url.as_str().into());
    args
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    formats: Vec<FormatEntry>,
}
