//! arXiv API client.
//!
//! Queries `https://export.arxiv.org/api/query` and turns the Atom response
//! into [`PaperEntry`] values. Results are requested newest-submission first.
//!
//! # Query syntax
//!
//! The query string is passed through untouched as `search_query`, so the full
//! arXiv syntax works: `cat:cs.LG`, `ti:diffusion AND cat:cs.CV`, and so on.

use super::PaperSearch;
use crate::error::{Error, Result};
use crate::models::PaperEntry;
use crate::utils::truncate_for_log;
use crate::xml::{self, Element};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_ENDPOINT: &str = "https://export.arxiv.org/api/query";
const USER_AGENT: &str = "ArxivCaster/0.1 (+https://github.com/)";

#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ArxivClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

impl PaperSearch for ArxivClient {
    #[instrument(level = "info", skip(self), fields(endpoint = %self.endpoint))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperEntry>> {
        let t0 = Instant::now();
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("search_query", query),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
                ("start", "0"),
            ])
            .query(&[("max_results", max_results)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                service: "arXiv API",
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let entries = parse_feed(&body)?;
        info!(
            count = entries.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched arXiv entries"
        );
        Ok(entries)
    }
}

/// Parse an arXiv Atom document.
///
/// The API reports query errors as a single entry whose id points at
/// `/api/errors`; that becomes an error instead of a bogus paper.
pub fn parse_feed(body: &str) -> Result<Vec<PaperEntry>> {
    let root = xml::parse(body)?;
    if root.local_name() != "feed" {
        return Err(Error::BadResponse {
            service: "arXiv API",
            reason: format!("expected an Atom <feed>, found <{}>", root.name),
        });
    }

    let mut entries = Vec::new();
    for node in root.elements().filter(|e| e.local_name() == "entry") {
        let id = node.child_text("id").unwrap_or_default().trim().to_string();
        if id.contains("/api/errors") {
            return Err(Error::BadResponse {
                service: "arXiv API",
                reason: node.child_text("summary").unwrap_or(id).trim().to_string(),
            });
        }
        if id.is_empty() {
            warn!("Skipping arXiv entry without an id");
            continue;
        }
        entries.push(normalize_entry(node, id));
    }
    debug!(count = entries.len(), "Parsed Atom entries");
    Ok(entries)
}

fn normalize_entry(node: &Element, id: String) -> PaperEntry {
    let title = node
        .child_text("title")
        .unwrap_or_default()
        .split_whitespace()
        .join(" ");
    let summary = node.child_text("summary").unwrap_or_default().trim().to_string();
    let authors = node
        .children_named("author")
        .filter_map(|a| a.child_text("name"))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    let links: Vec<&Element> = node.children_named("link").collect();
    let link = links
        .iter()
        .find(|l| l.attr("rel") == Some("alternate"))
        .or_else(|| links.first())
        .and_then(|l| l.attr("href"))
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());

    let categories = node
        .children_named("category")
        .filter_map(|c| c.attr("term"))
        .map(str::to_string)
        .collect();

    PaperEntry {
        title,
        summary,
        authors,
        published: node.child_text("published").and_then(|s| parse_time(&s)),
        updated: node.child_text("updated").and_then(|s| parse_time(&s)),
        link,
        categories,
        id,
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=cat:cs.LG</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/2401.12345v2</id>
    <updated>2024-01-20T10:00:00Z</updated>
    <published>2024-01-18T09:30:00Z</published>
    <title>Sparse   Attention
      for Long Contexts</title>
    <summary>  We study attention &amp; memory.
    </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2401.12345v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2401.12345v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>not a date</published>
    <title>Second</title>
    <summary>S</summary>
    <author><name>Solo</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_maps_entry_fields() {
        let entries = parse_feed(SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);

        let e = &entries[0];
        assert_eq!(e.id, "http://arxiv.org/abs/2401.12345v2");
        assert_eq!(e.title, "Sparse Attention for Long Contexts");
        assert_eq!(e.summary, "We study attention & memory.");
        assert_eq!(e.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(e.link, "http://arxiv.org/abs/2401.12345v2");
        assert_eq!(e.categories, vec!["cs.LG", "cs.CL"]);
        assert_eq!(e.published, Some(Utc.with_ymd_and_hms(2024, 1, 18, 9, 30, 0).unwrap()));
        assert_eq!(e.updated, Some(Utc.with_ymd_and_hms(2024, 1, 20, 10, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_feed_tolerates_missing_fields() {
        let entries = parse_feed(SAMPLE).unwrap();
        let e = &entries[1];
        assert_eq!(e.published, None);
        assert_eq!(e.updated, None);
        assert_eq!(e.link, e.id);
        assert!(e.categories.is_empty());
    }

    #[test]
    fn test_parse_feed_empty_result() {
        let body = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_feed(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_feed_surfaces_api_error_entry() {
        let body = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
  </entry>
</feed>"#;
        let err = parse_feed(body).unwrap_err();
        assert!(err.to_string().contains("incorrect id format"));
    }

    #[test]
    fn test_parse_feed_rejects_non_atom() {
        assert!(parse_feed("<html><body>busy</body></html>").is_err());
    }
}
