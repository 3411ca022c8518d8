//! Optional cross-posting of episodes to Qiita.
//!
//! Runs last, after every local artifact is written, so a failure here never
//! leaves the site half-updated. When cross-posting is enabled but no access
//! token is configured the step is skipped with a warning.
//!
//! # Article layout
//!
//! ```text
//! > この記事は自動生成されています — ArxivCaster
//! > 論文: <paper title>
//! > 著者: <authors>
//! > arXiv: <paper link>
//! > Canonical: <site>/viewer.html?slug=<slug>
//! > Audio: <audio url>
//!
//! <post markdown>
//! ```
//!
//! Header lines with nothing to show are left out.

use crate::error::{Error, Result};
use crate::models::PaperEntry;
use crate::utils::{join_url, truncate_for_log};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const QIITA_ITEMS_URL: &str = "https://qiita.com/api/v2/items";
const MAX_TITLE_CHARS: usize = 120;
const MAX_TAGS: usize = 8;

/// Cross-posting options from the command line.
#[derive(Debug, Clone)]
pub struct QiitaSettings {
    pub enabled: bool,
    pub access_token: Option<String>,
    pub tags: Vec<String>,
    pub private: bool,
    pub title_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QiitaTag {
    pub name: String,
    pub versions: Vec<String>,
}

/// Request body for `POST /api/v2/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QiitaArticle {
    pub title: String,
    pub body: String,
    pub tags: Vec<QiitaTag>,
    pub private: bool,
    pub coediting: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishedArticle {
    pub id: String,
    pub url: String,
}

/// Split a comma separated tag list, dropping blanks and keeping at most eight.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

/// Viewer page for a post, when the site has an absolute base URL.
pub fn canonical_url(base_url: Option<&str>, slug: &str) -> Option<String> {
    base_url.map(|base| {
        format!(
            "{}?slug={}",
            join_url(base, &["viewer.html"]),
            urlencoding::encode(slug)
        )
    })
}

pub fn build_article(
    settings: &QiitaSettings,
    entry: &PaperEntry,
    markdown: &str,
    canonical_url: Option<&str>,
    audio_url: &str,
) -> QiitaArticle {
    let title: String = format!("{}{}", settings.title_prefix, entry.title)
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();

    let mut header = vec![
        "> この記事は自動生成されています — ArxivCaster".to_string(),
        format!("> 論文: {}", entry.title),
    ];
    if !entry.authors.is_empty() {
        header.push(format!("> 著者: {}", entry.authors.join(", ")));
    }
    if !entry.link.is_empty() {
        header.push(format!("> arXiv: {}", entry.link));
    }
    if let Some(url) = canonical_url {
        header.push(format!("> Canonical: {url}"));
    }
    if !audio_url.is_empty() {
        header.push(format!("> Audio: {audio_url}"));
    }

    QiitaArticle {
        title,
        body: format!("{}\n{}", header.join("\n"), markdown),
        tags: settings
            .tags
            .iter()
            .take(MAX_TAGS)
            .map(|name| QiitaTag {
                name: name.clone(),
                versions: Vec::new(),
            })
            .collect(),
        private: settings.private,
        coediting: false,
    }
}

#[derive(Debug, Clone)]
pub struct QiitaClient {
    http: reqwest::Client,
    endpoint: String,
}

impl QiitaClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            endpoint: QIITA_ITEMS_URL.to_string(),
        })
    }

    #[instrument(level = "info", skip_all, fields(title = %article.title))]
    pub async fn create_item(&self, token: &str, article: &QiitaArticle) -> Result<PublishedArticle> {
        let t0 = Instant::now();
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(article)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status {
                service: "Qiita API",
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        let published: PublishedArticle = resp.json().await?;
        info!(
            url = %published.url,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Posted Qiita article"
        );
        Ok(published)
    }
}

/// Cross-post when enabled. Returns `None` when the step was skipped.
pub async fn maybe_publish(
    settings: &QiitaSettings,
    entry: &PaperEntry,
    markdown: &str,
    canonical_url: Option<&str>,
    audio_url: &str,
) -> Result<Option<PublishedArticle>> {
    if !settings.enabled {
        return Ok(None);
    }
    let Some(token) = settings.access_token.as_deref().filter(|t| !t.is_empty()) else {
        warn!("Qiita publishing enabled but QIITA_ACCESS_TOKEN is missing; skipping");
        return Ok(None);
    };
    let article = build_article(settings, entry, markdown, canonical_url, audio_url);
    let published = QiitaClient::new()?.create_item(token, &article).await?;
    Ok(Some(published))
}
