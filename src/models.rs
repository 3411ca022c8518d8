//! Data models shared across the pipeline.
//!
//! - [`PaperEntry`]: one arXiv paper revision as returned by the search service
//! - [`SiteIndex`] / [`IndexItem`]: the `index.json` document the static site reads
//!
//! Site index fields use camelCase on the wire because the front-end reads
//! them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A paper as fetched from the search service. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperEntry {
    /// Globally unique per paper revision, e.g. `http://arxiv.org/abs/2401.12345v2`.
    pub id: String,
    pub title: String,
    /// Abstract text.
    pub summary: String,
    pub authors: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Canonical landing page.
    pub link: String,
    pub categories: Vec<String>,
}

impl PaperEntry {
    /// Recency used for pool ordering: published, else updated, else the epoch.
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.published
            .or(self.updated)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// The `index.json` document listing every published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteIndex {
    /// RFC 3339 time of the rebuild.
    pub updated_at: String,
    pub items: Vec<IndexItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    pub slug: String,
    pub title: String,
    pub date: String,
    /// Path relative to the public directory, e.g. `posts/20240305-2401.12345v2.md`.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(published: Option<i64>, updated: Option<i64>) -> PaperEntry {
        PaperEntry {
            id: "http://arxiv.org/abs/2401.00001v1".to_string(),
            title: "T".to_string(),
            summary: "S".to_string(),
            authors: vec![],
            published: published.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            updated: updated.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            link: String::new(),
            categories: vec![],
        }
    }

    #[test]
    fn test_effective_time_prefers_published() {
        assert_eq!(entry(Some(200), Some(300)).effective_time().timestamp(), 200);
    }

    #[test]
    fn test_effective_time_falls_back_to_updated_then_epoch() {
        assert_eq!(entry(None, Some(300)).effective_time().timestamp(), 300);
        assert_eq!(entry(None, None).effective_time().timestamp(), 0);
    }

    #[test]
    fn test_site_index_serializes_camel_case() {
        let index = SiteIndex {
            updated_at: "2024-03-05T00:00:00Z".to_string(),
            items: vec![IndexItem {
                slug: "20240305-x".to_string(),
                title: "X".to_string(),
                date: "2024-03-05T00:00:00Z".to_string(),
                path: "posts/20240305-x.md".to_string(),
            }],
        };
        let json = serde_json::to_string(&index).unwrap();
        assert!(json.contains("\"updatedAt\""));
        assert!(json.contains("\"path\":\"posts/20240305-x.md\""));
    }
}
