// components/media_downloader/src/lib.rs
//! Thin, testable wrapper around an external downloader (yt-dlp).
//!
//! Nothing here spawns a long-running download on its own: [`Downloader`]
//! answers metadata queries and *builds* download commands, leaving process
//! supervision to the caller.
mod types;
mod utils;
mod ytdlp;

pub use types::{DownloadError, DownloadRequest, DownloadTarget, FormatEntry, FormatSpec, SourceUrl};
pub use utils::{ensure_extension, needs_merge, sanitize_title, timestamp_filename};
pub use ytdlp::{download_args, Downloader, YtDlp};
