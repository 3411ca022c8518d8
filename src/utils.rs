//! Small helpers: output directory checks, URL joining, log truncation and timestamps.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with
/// `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Join URL path segments onto a base, normalizing slashes between them.
///
/// ```ignore
/// assert_eq!(join_url("https://x.dev/", &["/episodes/", "a.mp3"]), "https://x.dev/episodes/a.mp3");
/// ```
pub fn join_url(base: &str, parts: &[&str]) -> String {
    let path = parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// RFC 2822 timestamp as used by RSS `pubDate` / `lastBuildDate`.
pub fn to_rfc2822(at: DateTime<Utc>) -> String {
    at.to_rfc2822()
}

pub async fn file_exists(path: impl AsRef<Path>) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    // A small sync write keeps the error surface simple.
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
