// bases/download_cli/src/main.rs
mod app;
mod args;
mod config;
mod error;
mod guard;
mod output;
mod probe;
mod prompt;
mod resolve;

use app::App;
use args::CliArgs;
use clap::error::ErrorKind;
use clap::Parser;
use color_eyre::Result;
use config::RunConfig;
use output::OutputHandler;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_tracing(args.verbose);
    let output = OutputHandler::new(args.verbose);

    let config = match RunConfig::from_args(args) {
        Ok(config) => config,
        Err(error) => {
            output.print_error(&error.into());
            std::process::exit(1);
        }
    };

    let app = App::new(config);
    app.supervisor().spawn();

    match app.run().await {
        Ok(outcome) => output.print_outcome(&outcome),
        Err(error) => {
            output.print_error(&error.into());
            std::process::exit(1);
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,dlplay=info,media_pipeline=info,media_downloader=info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}
