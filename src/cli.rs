//! Command-line interface definitions for ArxivCaster.
//!
//! Every option can also come from an environment variable, which is how the
//! scheduled job is normally configured.

use crate::api::DEFAULT_BASE_URL;
use crate::selector::SelectionMode;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Command-line arguments for one ArxivCaster run.
///
/// Switches read from the environment accept `1`/`0`, `yes`/`no`, `on`/`off`
/// and `true`/`false` in any case.
///
/// # Examples
///
/// ```sh
/// # Default query, daily selection, relative URLs
/// OPENAI_API_KEY=sk-... arxiv_caster
///
/// # Two categories, no repeats within a week, absolute URLs
/// arxiv_caster -q 'cat:cs.LG|cat:cs.CL' --dedup-window-days 7 \
///     --site-base-url https://caster.example.com
///
/// # Also cross-post to Qiita
/// arxiv_caster --qiita-publish --qiita-access-token TOKEN
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Site root: posts/, episodes/, podcast.xml and index.json live here
    #[arg(short, long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// Optional path to a YAML channel config
    #[arg(short, long, env = "ARXIV_CASTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// arXiv search query; several queries are joined with the separator
    #[arg(short, long, env = "ARXIV_QUERY", default_value = "cat:cs.LG")]
    pub query: String,

    /// Separator between queries in --query
    #[arg(long, env = "ARXIV_QUERY_SEPARATOR", default_value = "|")]
    pub query_separator: String,

    /// Maximum number of candidate papers
    #[arg(
        short = 'n',
        long,
        env = "ARXIV_POOL_SIZE",
        default_value_t = 50,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub pool_size: u32,

    /// How the paper is picked from the pool
    #[arg(long, env = "SELECTION_MODE", value_enum, default_value_t = SelectionMode::Daily)]
    pub selection_mode: SelectionMode,

    /// Skip papers published within this many days; 0 means ever
    #[arg(long, env = "DEDUP_WINDOW_DAYS", default_value_t = 0)]
    pub dedup_window_days: u32,

    /// Absolute base URL of the published site
    #[arg(long, env = "SITE_BASE_URL", default_value = "")]
    pub site_base_url: String,

    /// Publish again even if today's post for the chosen paper exists
    #[arg(long, env = "FORCE_RUN", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub force: bool,

    /// OpenAI API key, required once a paper is chosen
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Text model for summary and script
    #[arg(long, env = "OPENAI_LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// Speech model
    #[arg(long, env = "OPENAI_TTS_MODEL", default_value = "gpt-4o-mini-tts")]
    pub tts_model: String,

    /// Speech voice
    #[arg(long, env = "OPENAI_TTS_VOICE", default_value = "alloy")]
    pub tts_voice: String,

    /// Cross-post the episode to Qiita
    #[arg(long, env = "QIITA_PUBLISH", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub qiita_publish: bool,

    /// Qiita access token
    #[arg(long, env = "QIITA_ACCESS_TOKEN", hide_env_values = true)]
    pub qiita_access_token: Option<String>,

    /// Comma separated Qiita tags (at most 8 are used)
    #[arg(long, env = "QIITA_TAGS", default_value = "arxiv,podcast,ml")]
    pub qiita_tags: String,

    /// Post the Qiita article as private
    #[arg(long, env = "QIITA_PRIVATE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub qiita_private: bool,

    /// Prefix for the Qiita article title
    #[arg(long, env = "QIITA_TITLE_PREFIX", default_value = "[ArxivCaster] ")]
    pub qiita_title_prefix: String,
}

impl Cli {
    /// The site base URL, or `None` when URLs should stay relative.
    pub fn base_url(&self) -> Option<&str> {
        let base = self.site_base_url.trim();
        (!base.is_empty()).then_some(base)
    }
}

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
