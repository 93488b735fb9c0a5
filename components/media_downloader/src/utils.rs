// components/media_downloader/src/utils.rs
use chrono::{DateTime, Local};
use std::path::Path;

/// Turn a free-form title into a filesystem-safe token.
///
/// Keeps ASCII alphanumerics, `.`, `_` and `-`; every other character becomes `_`.
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// Append `.<container>` unless the name already ends with it (case-sensitive).
pub fn ensure_extension(name: &str, container: &str) -> String {
    let suffix = format!(".{}", container);
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Whether the downloader must be told to remux into `container`.
pub fn needs_merge(path: &Path, container: &str) -> bool {
    path.extension().and_then(|ext| ext.to_str()) != Some(container)
}

/// Name used when no title could be obtained.
pub fn timestamp_filename(now: DateTime<Local>) -> String {
    format!("video_{}", now.format("%Y%m%d_%H%M%S"))
}
