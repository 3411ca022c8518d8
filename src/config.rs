//! Podcast channel configuration.
//!
//! Loaded from an optional YAML file. Every key is optional:
//!
//! ```yaml
//! title: ArxivCaster
//! link: https://caster.example.com
//! description: Daily summaries of arXiv papers with podcast audio.
//! language: ja-jp
//! author: ArxivCaster
//! image_url: https://caster.example.com/cover.png
//! owner_name: Caster
//! owner_email: caster@example.com
//! category: Science
//! explicit: false
//! ```

use crate::error::Result;
use crate::outputs::rss::{ChannelMeta, Owner};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

pub const DEFAULT_TITLE: &str = "ArxivCaster";
pub const DEFAULT_LINK: &str = "https://example.com";
pub const DEFAULT_DESCRIPTION: &str = "Daily summaries of arXiv papers with podcast audio.";
pub const DEFAULT_LANGUAGE: &str = "ja-jp";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub title: Option<String>,
    /// Falls back to the site base URL, then [`DEFAULT_LINK`].
    pub link: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub category: Option<String>,
    pub explicit: bool,
}

impl ChannelConfig {
    /// Read a config file. An explicitly named file must exist.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&text)?;
        info!("Loaded channel configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Channel metadata with defaults filled in.
    pub fn channel_meta(&self, base_url: Option<&str>, last_build_date: String) -> ChannelMeta {
        let owner = self.owner_name.as_ref().map(|name| Owner {
            name: name.clone(),
            email: self.owner_email.clone(),
        });
        ChannelMeta {
            title: self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            link: self
                .link
                .clone()
                .or_else(|| base_url.map(str::to_string))
                .unwrap_or_else(|| DEFAULT_LINK.to_string()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            language: self
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            last_build_date: Some(last_build_date),
            author: self.author.clone(),
            image_url: self.image_url.clone(),
            owner,
            category: self.category.clone(),
            explicit: Some(self.explicit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_without_base_url() {
        let meta = ChannelConfig::default().channel_meta(None, "now".to_string());
        assert_eq!(meta.title, "ArxivCaster");
        assert_eq!(meta.link, "https://example.com");
        assert_eq!(meta.description, DEFAULT_DESCRIPTION);
        assert_eq!(meta.language, "ja-jp");
        assert_eq!(meta.explicit, Some(false));
        assert_eq!(meta.owner, None);
        assert_eq!(meta.last_build_date.as_deref(), Some("now"));
    }

    #[test]
    fn test_link_falls_back_to_base_url() {
        let meta = ChannelConfig::default().channel_meta(Some("https://caster.example.com"), String::new());
        assert_eq!(meta.link, "https://caster.example.com");
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = ChannelConfig::from_yaml(
            "title: My Cast\nauthor: Ada\nowner_name: Ada\nowner_email: ada@example.com\nexplicit: true\n",
        )
        .unwrap();
        let meta = config.channel_meta(Some("https://b.example.com"), String::new());
        assert_eq!(meta.title, "My Cast");
        assert_eq!(meta.author.as_deref(), Some("Ada"));
        assert_eq!(
            meta.owner,
            Some(Owner {
                name: "Ada".to_string(),
                email: Some("ada@example.com".to_string())
            })
        );
        assert_eq!(meta.explicit, Some(true));
        assert_eq!(meta.language, "ja-jp");
    }

    #[test]
    fn test_from_yaml_empty_and_invalid() {
        assert_eq!(ChannelConfig::from_yaml("").unwrap(), ChannelConfig::default());
        assert!(ChannelConfig::from_yaml("title: [unclosed").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ChannelConfig::load(&dir.path().join("nope.yaml")).await.is_err());
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.yaml");
        std::fs::write(&path, "language: en-us\ncategory: Technology\n").unwrap();
        let config = ChannelConfig::load(&path).await.unwrap();
        assert_eq!(config.language.as_deref(), Some("en-us"));
        assert_eq!(config.category.as_deref(), Some("Technology"));
    }
}
