// bases/download_cli/src/probe.rs
use crate::error::{CliError, Result};
use media_downloader::{DownloadError, Downloader};
use media_pipeline::{Mode, Player};
use tracing::debug;

/// Make sure the external programs a run needs are on `PATH`.
///
/// The downloader is always required: it answers title and format queries,
/// and players hand URLs to it too.
pub async fn probe_dependencies(
    downloader: &(dyn Downloader + Send + Sync),
    player: &dyn Player,
    mode: Mode,
) -> Result<()> {
    downloader.check_available().await.map_err(|e| match e {
        DownloadError::DependencyNotFound(program) => CliError::DependencyMissing(program),
        other => CliError::DependencyMissing(format!("{} ({})", downloader.program(), other)),
    })?;

    if mode.needs_player() && !player.is_available() {
        return Err(CliError::DependencyMissing(player.program().to_string()));
    }

    debug!("found {} and {}", downloader.program(), player.program());
    Ok(())
}
