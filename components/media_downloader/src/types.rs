// components/media_downloader/src/types.rs
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::utils::needs_merge;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unexpected downloader output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A validated `http://` or `https://` source address.
///
/// The original text is kept as typed so that the external tools see exactly
/// what the user passed, not the normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    raw: String,
    url: Url,
}

impl SourceUrl {
    pub fn parse(input: &str) -> Result<Self, DownloadError> {
        if !(input.starts_with("http://") || input.starts_with("https://")) {
            return Err(DownloadError::InvalidUrl(format!(
                "'{}' must start with http:// or https://",
                input
            )));
        }

        let url = Url::parse(input)
            .map_err(|e| DownloadError::InvalidUrl(format!("'{}': {}", input, e)))?;

        if url.host_str().map_or(true, str::is_empty) {
            return Err(DownloadError::InvalidUrl(format!("'{}' has no host", input)));
        }

        Ok(Self {
            raw: input.to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Which source streams the downloader should fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormatSpec {
    /// Let the downloader pick its own default.
    #[default]
    Default,
    /// One identifier, or several joined with `+` to be merged.
    Explicit(String),
}

impl FormatSpec {
    pub const DEFAULT_TOKEN: &'static str = "default";

    pub fn from_flag(flag: &str) -> Self {
        let flag = flag.trim();
        if flag.is_empty() || flag == Self::DEFAULT_TOKEN {
            FormatSpec::Default
        } else {
            FormatSpec::Explicit(flag.to_string())
        }
    }

    /// Join selected format identifiers with `+`; an empty selection is the default.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect::<Vec<_>>()
            .join("+");

        if joined.is_empty() {
            FormatSpec::Default
        } else {
            FormatSpec::Explicit(joined)
        }
    }

    pub fn explicit(&self) -> Option<&str> {
        match self {
            FormatSpec::Default => None,
            FormatSpec::Explicit(spec) => Some(spec),
        }
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatSpec::Default => f.write_str(Self::DEFAULT_TOKEN),
            FormatSpec::Explicit(spec) => f.write_str(spec),
        }
    }
}

/// One downloadable stream as reported by the downloader.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatEntry {
    #[serde(rename = "format_id")]
    pub id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default, rename = "format_note")]
    pub note: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

impl FormatEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ext: None,
            resolution: None,
            note: None,
            vcodec: None,
            acodec: None,
            filesize: None,
        }
    }

    fn kind(&self) -> &'static str {
        let has = |codec: &Option<String>| codec.as_deref().is_some_and(|c| c != "none");
        match (has(&self.vcodec), has(&self.acodec)) {
            (true, true) => "video+audio",
            (true, false) => "video only",
            (false, true) => "audio only",
            (false, false) => "",
        }
    }
}

impl fmt::Display for FormatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} {:<5} {:<11} {:<11}",
            self.id,
            self.ext.as_deref().unwrap_or("?"),
            self.resolution.as_deref().unwrap_or(""),
            self.kind(),
        )?;
        if let Some(note) = &self.note {
            write!(f, " {}", note)?;
        }
        if let Some(size) = self.filesize {
            write!(f, " ({:.1} MiB)", size as f64 / (1024.0 * 1024.0))?;
        }
        Ok(())
    }
}

/// Where downloaded bytes should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    File {
        path: PathBuf,
        /// Container to remux into when the path's extension does not match it.
        merge_container: Option<String>,
        resume: bool,
        overwrite: bool,
    },
    Stdout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: SourceUrl,
    pub format: FormatSpec,
    pub target: DownloadTarget,
}

impl DownloadRequest {
    pub fn to_file(
        url: SourceUrl,
        format: FormatSpec,
        path: impl AsRef<Path>,
        container: &str,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        let merge_container = needs_merge(&path, container).then(|| container.to_string());
        Self {
            url,
            format,
            target: DownloadTarget::File {
                path,
                merge_container,
                resume: false,
                overwrite: false,
            },
        }
    }

    pub fn to_stdout(url: SourceUrl, format: FormatSpec) -> Self {
        Self {
            url,
            format,
            target: DownloadTarget::Stdout,
        }
    }

    /// Ask the downloader to continue a partial file. No effect on stdout targets.
    pub fn resume(mut self, enabled: bool) -> Self {
        if let DownloadTarget::File { resume, .. } = &mut self.target {
            *resume = enabled;
        }
        self
    }

    /// Replace an existing file instead of skipping it. No effect on stdout targets.
    pub fn overwrite(mut self, enabled: bool) -> Self {
        if let DownloadTarget::File { overwrite, .. } = &mut self.target {
            *overwrite = enabled;
        }
        self
    }
}
