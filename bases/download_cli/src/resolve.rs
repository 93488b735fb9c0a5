// bases/download_cli/src/resolve.rs
use crate::error::{CliError, Result};
use crate::prompt::Prompter;
use chrono::Local;
use media_downloader::{
    ensure_extension, sanitize_title, timestamp_filename, Downloader, FormatSpec, SourceUrl,
};
use media_pipeline::Mode;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides which source streams to fetch.
pub struct FormatResolver {
    downloader: Arc<dyn Downloader + Send + Sync>,
    prompter: Arc<dyn Prompter>,
}

impl FormatResolver {
    pub fn new(downloader: Arc<dyn Downloader + Send + Sync>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            downloader,
            prompter,
        }
    }

    pub async fn resolve(
        &self,
        flag: Option<&str>,
        silent: bool,
        mode: Mode,
        url: &SourceUrl,
    ) -> Result<FormatSpec> {
        if let Some(flag) = flag {
            return Ok(FormatSpec::from_flag(flag));
        }
        if silent || mode == Mode::Stream {
            return Ok(FormatSpec::Default);
        }

        let formats = match self.downloader.list_formats(url).await {
            Ok(formats) if !formats.is_empty() => formats,
            Ok(_) => {
                warn!("no formats listed for {}, using the default", url);
                return Ok(FormatSpec::Default);
            }
            Err(e) => {
                warn!("could not list formats ({}), using the default", e);
                return Ok(FormatSpec::Default);
            }
        };

        let selected = self
            .prompter
            .select_formats(&formats)
            .await
            .map_err(CliError::Prompt)?;
        let spec = FormatSpec::from_ids(selected);
        debug!("selected format {}", spec);
        Ok(spec)
    }
}

/// Decides the output filename.
pub struct FilenameResolver {
    downloader: Arc<dyn Downloader + Send + Sync>,
    prompter: Arc<dyn Prompter>,
}

impl FilenameResolver {
    pub fn new(downloader: Arc<dyn Downloader + Send + Sync>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            downloader,
            prompter,
        }
    }

    pub async fn resolve(
        &self,
        flag: Option<&str>,
        silent: bool,
        url: &SourceUrl,
        container: &str,
    ) -> Result<PathBuf> {
        if let Some(name) = flag {
            return Ok(PathBuf::from(ensure_extension(name.trim(), container)));
        }

        let derived = self.derive_name(url).await;
        let name = if silent {
            derived
        } else {
            let answer = self
                .prompter
                .edit_filename(&derived)
                .await
                .map_err(CliError::Prompt)?;
            if answer.trim().is_empty() {
                derived
            } else {
                answer.trim().to_string()
            }
        };

        Ok(PathBuf::from(ensure_extension(&name, container)))
    }

    async fn derive_name(&self, url: &SourceUrl) -> String {
        match self.downloader.fetch_title(url).await {
            Ok(title) => {
                let name = sanitize_title(&title);
                if !name.is_empty() {
                    return name;
                }
                warn!("{} has an empty title, naming the file by time", url);
            }
            Err(e) => warn!("could not fetch the title ({}), naming the file by time", e),
        }
        timestamp_filename(Local::now())
    }
}
