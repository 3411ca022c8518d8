//! `index.json` generation for the static site.
//!
//! The index is rebuilt from scratch after every published episode by reading
//! the front matter of each post under `{public_dir}/posts/`:
//!
//! ```text
//! public/
//! ├── index.json
//! └── posts/
//!     ├── 20240305-2401.12345v2.md
//!     └── 20240304-2401.00001v1.md
//! ```
//!
//! Items are sorted by slug, newest first. Posts without a title or date in
//! their front matter fall back to the slug and the rebuild time.

use super::markdown::parse_front_matter;
use crate::error::Result;
use crate::models::{IndexItem, SiteIndex};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Build the site index from the posts in `posts_dir`.
pub async fn collect_index(posts_dir: &Path, now: DateTime<Utc>) -> Result<SiteIndex> {
    let now = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut items = Vec::new();

    let mut dir = fs::read_dir(posts_dir).await?;
    while let Some(file) = dir.next_entry().await? {
        let path = file.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Some(slug) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            warn!(path = %path.display(), "Skipping post with non UTF-8 name");
            continue;
        };
        let mut meta = parse_front_matter(&fs::read_to_string(&path).await?);
        items.push(IndexItem {
            title: meta.remove("title").filter(|t| !t.is_empty()).unwrap_or_else(|| slug.clone()),
            date: meta.remove("date").filter(|d| !d.is_empty()).unwrap_or_else(|| now.clone()),
            path: format!("posts/{slug}.md"),
            slug,
        });
    }

    items.sort_by(|a, b| b.slug.cmp(&a.slug));
    Ok(SiteIndex {
        updated_at: now,
        items,
    })
}

/// Rebuild `{public_dir}/index.json` from `{public_dir}/posts/`.
#[instrument(level = "info", skip_all, fields(public_dir = %public_dir.display()))]
pub async fn rebuild_index(public_dir: &Path, now: DateTime<Utc>) -> Result<SiteIndex> {
    let index = collect_index(&public_dir.join("posts"), now).await?;
    let json = serde_json::to_string_pretty(&index)?;
    let path = public_dir.join("index.json");
    fs::write(&path, json).await?;
    info!(path = %path.display(), items = index.items.len(), "Wrote site index");
    Ok(index)
}
