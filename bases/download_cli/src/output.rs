// bases/download_cli/src/output.rs
use crate::app::RunOutcome;
use tracing::debug;

pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn print_outcome(&self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed(report) => match (&report.output_path, report.size_bytes) {
                (Some(path), Some(size)) => {
                    println!("Saved: {} ({})", path.display(), human_size(size));
                }
                (Some(path), None) => println!("Saved: {}", path.display()),
                (None, _) => debug!("stream finished (player success: {})", report.success),
            },
            RunOutcome::Declined { path } => {
                println!("Kept existing {}; nothing downloaded", path.display());
            }
        }
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        eprintln!("Error: {}", error);

        if self.verbose {
            eprintln!("\nError details:");
            error.chain().skip(1).for_each(|cause| {
                eprintln!("  caused by: {}", cause);
            });
        }
    }
}

/// Format a byte count with binary units, e.g. `1.5 MiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
