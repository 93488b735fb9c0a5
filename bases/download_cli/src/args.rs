// bases/download_cli/src/args.rs
use clap::Parser;

/// Download a video, stream it, or watch it while it downloads
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Container (file extension) of the saved file
    #[arg(short, long, value_name = "FORMAT", default_value = "mkv")]
    pub container: String,

    /// Format specifier for the downloader; skips format selection
    #[arg(short, long, value_name = "SPEC")]
    pub format: Option<String>,

    /// Output filename; the container extension is appended if missing
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<String>,

    /// Never prompt; use defaults for everything not given on the command line
    #[arg(short, long)]
    pub silent: bool,

    /// Continue a partially downloaded file (ignored with --play)
    #[arg(short, long)]
    pub resume: bool,

    /// Player executable
    #[arg(long, value_name = "NAME", default_value = "mpv")]
    pub player: String,

    /// Play while downloading
    #[arg(long, conflicts_with_all = ["stream", "record"])]
    pub play: bool,

    /// Only play, never save
    #[arg(long, conflicts_with = "record")]
    pub stream: bool,

    /// Let the player record the stream it plays (mpv only)
    #[arg(long)]
    pub record: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// URL of the video or stream (http:// or https://)
    pub url: String,
}
