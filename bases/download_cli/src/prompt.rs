// bases/download_cli/src/prompt.rs
use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect};
use media_downloader::FormatEntry;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Questions the CLI may ask the user. Never consulted in silent mode.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Pick zero or more format identifiers; an empty list means "use the default".
    async fn select_formats(&self, formats: &[FormatEntry]) -> io::Result<Vec<String>>;

    /// Let the user edit `suggested`; an empty answer keeps it.
    async fn edit_filename(&self, suggested: &str) -> io::Result<String>;

    async fn confirm_overwrite(&self, path: &Path) -> io::Result<bool>;
}

/// Interactive prompts on the terminal; format selection goes through `fzf` when installed.
pub struct TerminalPrompter {
    use_fzf: bool,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            use_fzf: which::which("fzf").is_ok(),
        }
    }

    async fn select_with_fzf(&self, formats: &[FormatEntry]) -> io::Result<Vec<String>> {
        let mut child = Command::new("fzf")
            .arg("--multi")
            .arg("--prompt=format> ")
            .arg("--header=TAB to mark several streams, ESC for the default")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let listing: String = formats.iter().map(|f| format!("{}\n", f)).collect();
            stdin.write_all(listing.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            // ESC, Ctrl-C and an empty match all end here
            debug!("fzf exited with {}, using the default format", output.status);
            return Ok(Vec::new());
        }
        Ok(fzf_selection(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a blocking terminal interaction off the async runtime.
async fn interact<T, F>(prompt: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(prompt)
        .await
        .map_err(io::Error::other)?
        .map_err(|dialoguer::Error::IO(e)| e)
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select_formats(&self, formats: &[FormatEntry]) -> io::Result<Vec<String>> {
        if self.use_fzf {
            match self.select_with_fzf(formats).await {
                Ok(selected) => return Ok(selected),
                Err(e) => warn!("fzf failed ({}), falling back to a list", e),
            }
        }

        let items: Vec<String> = formats.iter().map(ToString::to_string).collect();
        let picked = interact(move || {
            MultiSelect::with_theme(&ColorfulTheme::default())
                .with_prompt("Formats to download (space to mark, enter for the default)")
                .items(&items)
                .interact_opt()
        })
        .await?;
        Ok(ids_at(formats, &picked.unwrap_or_default()))
    }

    async fn edit_filename(&self, suggested: &str) -> io::Result<String> {
        let initial = suggested.to_string();
        let answer: String = interact(move || {
            Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Filename")
                .with_initial_text(initial)
                .allow_empty(true)
                .interact_text()
        })
        .await?;

        let answer = answer.trim();
        Ok(if answer.is_empty() {
            suggested.to_string()
        } else {
            answer.to_string()
        })
    }

    async fn confirm_overwrite(&self, path: &Path) -> io::Result<bool> {
        let question = format!("{} already exists. Overwrite?", path.display());
        interact(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(question)
                .default(false)
                .interact()
        })
        .await
    }
}

/// Format identifiers from the lines fzf printed; each line starts with one.
pub fn fzf_selection(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Format identifiers at the list positions the user marked.
pub fn ids_at(formats: &[FormatEntry], picked: &[usize]) -> Vec<String> {
    picked
        .iter()
        .filter_map(|&index| formats.get(index))
        .map(|format| format.id.clone())
        .collect()
}
