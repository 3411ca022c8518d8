//! Podcast RSS feed maintenance.
//!
//! The feed lives at `{public_dir}/podcast.xml` and is only ever changed in
//! two ways:
//!
//! - **Ensure**: create the document with the channel metadata if it does not
//!   exist, otherwise upsert metadata fields without touching items.
//! - **Append**: add one `<item>` after the existing ones and refresh
//!   `<lastBuildDate>`. An item with a guid already in the feed replaces the
//!   old one where it stands.
//!
//! Both operations read the whole document into an element tree, mutate the
//! tree and write it back through a temp file plus rename, so a failed call
//! leaves the previous document in place. Elements this module does not know
//! about are carried through untouched.
//!
//! # Channel fields
//!
//! | Element | Source | On an existing feed |
//! |---------|--------|---------------------|
//! | `title`, `description`, `language`, `generator` | config | added if missing |
//! | `link` | config | always refreshed |
//! | `lastBuildDate` | run time | always refreshed |
//! | `itunes:author`, `itunes:summary`, `itunes:image`, `itunes:owner`, `itunes:category`, `itunes:explicit` | config, optional | added if missing |

use crate::error::{Error, Result};
use crate::xml::{self, Element, Node};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const GENERATOR: &str = "ArxivCaster";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub email: Option<String>,
}

/// Channel-level metadata. `None` fields are left out of the document entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    /// RFC 2822.
    pub last_build_date: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub owner: Option<Owner>,
    pub category: Option<String>,
    pub explicit: Option<bool>,
}

/// One episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Written with `isPermaLink="false"`.
    pub guid: String,
    /// RFC 2822.
    pub pub_date: String,
    pub description: String,
    pub enclosure_url: String,
    /// Audio size in bytes.
    pub enclosure_length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    /// Replace an existing element.
    Refresh,
    /// Only add when missing.
    KeepExisting,
}

fn text_el(name: &str, text: &str) -> Element {
    Element::new(name).with_text(text)
}

/// Channel fields in document order, each with its upsert policy.
fn channel_fields(meta: &ChannelMeta) -> Vec<(Element, Upsert)> {
    use Upsert::*;

    let mut fields = vec![
        (text_el("title", &meta.title), KeepExisting),
        (text_el("link", &meta.link), Refresh),
        (text_el("description", &meta.description), KeepExisting),
        (text_el("language", &meta.language), KeepExisting),
        (text_el("generator", GENERATOR), KeepExisting),
    ];
    if let Some(date) = &meta.last_build_date {
        fields.push((text_el("lastBuildDate", date), Refresh));
    }
    if let Some(author) = &meta.author {
        fields.push((text_el("itunes:author", author), KeepExisting));
    }
    if !meta.description.is_empty() {
        fields.push((text_el("itunes:summary", &meta.description), KeepExisting));
    }
    if let Some(url) = &meta.image_url {
        fields.push((Element::new("itunes:image").with_attr("href", url), KeepExisting));
    }
    if let Some(owner) = &meta.owner {
        let mut el = Element::new("itunes:owner").with_child(text_el("itunes:name", &owner.name));
        if let Some(email) = &owner.email {
            el = el.with_child(text_el("itunes:email", email));
        }
        fields.push((el, KeepExisting));
    }
    if let Some(category) = &meta.category {
        fields.push((Element::new("itunes:category").with_attr("text", category), KeepExisting));
    }
    if let Some(explicit) = meta.explicit {
        fields.push((text_el("itunes:explicit", if explicit { "true" } else { "false" }), KeepExisting));
    }
    fields
}

fn item_element(item: &FeedItem) -> Element {
    Element::new("item")
        .with_child(text_el("title", &item.title))
        .with_child(text_el("link", &item.link))
        .with_child(text_el("guid", &item.guid).with_attr("isPermaLink", "false"))
        .with_child(text_el("pubDate", &item.pub_date))
        .with_child(text_el("description", &item.description))
        .with_child(
            Element::new("enclosure")
                .with_attr("url", &item.enclosure_url)
                .with_attr("length", item.enclosure_length.to_string())
                .with_attr("type", "audio/mpeg"),
        )
}

fn read_item(el: &Element) -> FeedItem {
    let enclosure = el.child("enclosure");
    FeedItem {
        title: el.child_text("title").unwrap_or_default(),
        link: el.child_text("link").unwrap_or_default(),
        guid: el.child_text("guid").unwrap_or_default(),
        pub_date: el.child_text("pubDate").unwrap_or_default(),
        description: el.child_text("description").unwrap_or_default(),
        enclosure_url: enclosure
            .and_then(|e| e.attr("url"))
            .unwrap_or_default()
            .to_string(),
        enclosure_length: enclosure
            .and_then(|e| e.attr("length"))
            .and_then(|l| l.parse().ok())
            .unwrap_or(0),
    }
}

fn is_item(node: &Node) -> bool {
    matches!(node, Node::Element(e) if e.name == "item")
}

/// Insert a channel-level element ahead of the first item so items stay last.
fn insert_before_items(channel: &mut Element, el: Element) {
    let at = channel
        .children
        .iter()
        .position(is_item)
        .unwrap_or(channel.children.len());
    channel.children.insert(at, Node::Element(el));
}

/// Replace the first child named like `el`, or insert it ahead of the items.
fn upsert(channel: &mut Element, el: Element, policy: Upsert) {
    let existing = channel
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(e) if e.name == el.name));
    match (existing, policy) {
        (Some(i), Upsert::Refresh) => channel.children[i] = Node::Element(el),
        (Some(_), Upsert::KeepExisting) => {}
        (None, _) => insert_before_items(channel, el),
    }
}

/// An RSS 2.0 podcast feed held as an element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    root: Element,
}

impl FeedDocument {
    /// A fresh document with the given metadata and no items.
    pub fn new(meta: &ChannelMeta) -> Self {
        let mut channel = Element::new("channel");
        for (el, _) in channel_fields(meta) {
            channel.children.push(Node::Element(el));
        }
        let root = Element::new("rss")
            .with_attr("version", "2.0")
            .with_attr("xmlns:itunes", ITUNES_NS)
            .with_child(channel);
        Self { root }
    }

    /// Parse an existing feed. Fails unless it is an `<rss>` root with a `<channel>`.
    pub fn parse(xml_text: &str) -> Result<Self> {
        let root = xml::parse(xml_text).map_err(|e| Error::MalformedFeed(e.to_string()))?;
        if root.name != "rss" {
            return Err(Error::MalformedFeed(format!(
                "expected <rss> root, found <{}>",
                root.name
            )));
        }
        let doc = Self { root };
        doc.channel()?;
        Ok(doc)
    }

    pub fn to_xml(&self) -> Result<String> {
        xml::to_string(&self.root)
    }

    fn channel(&self) -> Result<&Element> {
        self.root
            .child("channel")
            .ok_or_else(|| Error::MalformedFeed("no <channel> element".to_string()))
    }

    fn channel_mut(&mut self) -> Result<&mut Element> {
        self.root
            .child_mut("channel")
            .ok_or_else(|| Error::MalformedFeed("no <channel> element".to_string()))
    }

    /// Upsert channel metadata. Items are never touched.
    pub fn upsert_channel(&mut self, meta: &ChannelMeta) -> Result<()> {
        if self.root.attr("xmlns:itunes").is_none() {
            self.root.set_attr("xmlns:itunes", ITUNES_NS);
        }
        let channel = self.channel_mut()?;
        for (el, policy) in channel_fields(meta) {
            upsert(channel, el, policy);
        }
        Ok(())
    }

    /// Add `item` after all existing items and set `lastBuildDate`.
    ///
    /// An item whose guid is already in the feed replaces that item in place,
    /// so guids stay unique. Returns `false` in that case.
    pub fn append_item(&mut self, item: &FeedItem, last_build_date: &str) -> Result<bool> {
        let channel = self.channel_mut()?;
        let existing = channel.children.iter().position(|node| match node {
            Node::Element(el) if el.name == "item" => read_item(el).guid == item.guid,
            _ => false,
        });
        let appended = match existing {
            Some(at) => {
                channel.children[at] = Node::Element(item_element(item));
                false
            }
            None => {
                let at = channel
                    .children
                    .iter()
                    .rposition(is_item)
                    .map_or(channel.children.len(), |i| i + 1);
                channel.children.insert(at, Node::Element(item_element(item)));
                true
            }
        };
        upsert(channel, text_el("lastBuildDate", last_build_date), Upsert::Refresh);
        Ok(appended)
    }

    /// Items in document order.
    pub fn items(&self) -> Vec<FeedItem> {
        self.channel()
            .map(|c| c.children_named("item").map(read_item).collect())
            .unwrap_or_default()
    }

    /// Text of a direct channel child, e.g. `lastBuildDate` or `itunes:author`.
    pub fn channel_field(&self, name: &str) -> Option<String> {
        self.channel().ok()?.child_text(name)
    }

    pub fn last_build_date(&self) -> Option<String> {
        self.channel_field("lastBuildDate")
    }
}

/// Write `contents` next to `path` and rename it into place.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Create the feed at `path` if missing, otherwise upsert its channel metadata.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_feed(path: &Path, meta: &ChannelMeta) -> Result<FeedDocument> {
    let doc = match fs::read_to_string(path).await {
        Ok(existing) => {
            let mut doc = FeedDocument::parse(&existing)?;
            doc.upsert_channel(meta)?;
            info!(items = doc.items().len(), "Updated existing feed metadata");
            doc
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Creating new feed document");
            FeedDocument::new(meta)
        }
        Err(e) => return Err(e.into()),
    };
    write_atomic(path, &doc.to_xml()?).await?;
    Ok(doc)
}

/// Append one item to the feed at `path`. The feed must already exist and be well formed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), guid = %item.guid))]
pub async fn append_to_feed(path: &Path, item: &FeedItem, last_build_date: &str) -> Result<FeedDocument> {
    let existing = fs::read_to_string(path).await?;
    let mut doc = FeedDocument::parse(&existing)?;
    let appended = doc.append_item(item, last_build_date)?;
    write_atomic(path, &doc.to_xml()?).await?;
    if appended {
        info!(
            items = doc.items().len(),
            last_build = ?doc.last_build_date(),
            "Appended feed item"
        );
    } else {
        warn!(items = doc.items().len(), "Replaced feed item with the same guid");
    }
    Ok(doc)
}
