//! Post rendering and front matter parsing.
//!
//! A post is a Markdown file under `{public_dir}/posts/{slug}.md`:
//!
//! ```text
//! ---
//! title: "Sparse Attention for Long Contexts"
//! date: 2024-03-05T06:07:08.000Z
//! slug: 20240305-2401.12345v2
//! ---
//!
//! # Sparse Attention for Long Contexts
//!
//! - 著者: Ada Lovelace, Alan Turing
//! - arXiv: http://arxiv.org/abs/2401.12345v2
//!
//! ## エピソード音声
//! ...
//! ```

use crate::models::PaperEntry;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---\n(.*?)\n---").expect("static regex"));
static FRONT_MATTER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+):\s*(.*)$").expect("static regex"));

/// Everything a post page shows.
#[derive(Debug, Clone, Copy)]
pub struct Post<'a> {
    pub entry: &'a PaperEntry,
    pub slug: &'a str,
    pub published_at: DateTime<Utc>,
    pub summary_ja: &'a str,
    pub script_ja: &'a str,
    pub audio_url: &'a str,
}

fn escape_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

pub fn render_post(post: &Post<'_>) -> String {
    let title = escape_quotes(&post.entry.title);
    format!(
        "---\n\
         title: \"{title}\"\n\
         date: {date}\n\
         slug: {slug}\n\
         ---\n\
         \n\
         # {title}\n\
         \n\
         - 著者: {authors}\n\
         - arXiv: {link}\n\
         \n\
         ## エピソード音声\n\
         \n\
         <audio controls src=\"{audio}\"></audio>\n\
         \n\
         ## 要約 (日本語)\n\
         \n\
         {summary}\n\
         \n\
         ## Podcast 台本 (全文)\n\
         \n\
         {script}\n",
        date = post.published_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        slug = post.slug,
        authors = post.entry.authors.join(", "),
        link = post.entry.link,
        audio = post.audio_url,
        summary = post.summary_ja,
        script = post.script_ja,
    )
}

/// Read `key: value` pairs from a leading `---` block.
///
/// One pair of surrounding double quotes is stripped from values. Documents
/// without front matter yield an empty map.
pub fn parse_front_matter(text: &str) -> HashMap<String, String> {
    let Some(block) = FRONT_MATTER.captures(text).and_then(|c| c.get(1)) else {
        return HashMap::new();
    };
    block
        .as_str()
        .lines()
        .filter_map(|line| FRONT_MATTER_LINE.captures(line.trim()))
        .map(|c| {
            let value = &c[2];
            let value = value.strip_prefix('"').unwrap_or(value);
            let value = value.strip_suffix('"').unwrap_or(value);
            (c[1].to_string(), value.to_string())
        })
        .collect()
}
