// bases/download_cli/src/config.rs
use crate::args::CliArgs;
use crate::error::{CliError, Result};
use media_downloader::SourceUrl;
use media_pipeline::Mode;

/// Everything a run needs to know, fixed once the command line is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Container extension, without the leading dot
    pub container: String,
    /// Output name as given, before extension normalization
    pub output: Option<String>,
    pub silent: bool,
    pub resume: bool,
    pub url: SourceUrl,
    pub format: Option<String>,
    pub mode: Mode,
    pub player: String,
}

impl RunConfig {
    /// Validate command-line arguments into a configuration
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let url = SourceUrl::parse(&args.url).map_err(|e| CliError::InvalidInput(e.to_string()))?;

        let container = args.container.trim().trim_start_matches('.').to_string();
        if container.is_empty() || container.contains(['/', '\\']) {
            return Err(CliError::InvalidInput(format!(
                "'{}' is not a usable container extension",
                args.container
            )));
        }

        if let Some(output) = &args.output {
            if output.trim().is_empty() {
                return Err(CliError::InvalidInput("output name must not be empty".to_string()));
            }
        }

        let player = args.player.trim().to_string();
        if player.is_empty() {
            return Err(CliError::InvalidInput("player name must not be empty".to_string()));
        }

        let mode = if args.play {
            Mode::Play
        } else if args.stream {
            Mode::Stream
        } else if args.record {
            Mode::Record
        } else {
            Mode::Download
        };

        Ok(Self {
            container,
            output: args.output,
            silent: args.silent,
            resume: args.resume,
            url,
            format: args.format,
            mode,
            player,
        })
    }
}
