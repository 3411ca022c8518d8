//! # ArxivCaster
//!
//! A once-per-run batch job that turns one recent arXiv paper into a Japanese
//! podcast episode and publishes it to a static site.
//!
//! ## Features
//!
//! - Searches arXiv with one or more queries and pools the newest results
//! - Skips papers already published (optionally only within a day window)
//! - Picks one paper reproducibly per day, or at random
//! - Generates a Japanese summary and podcast script with an OpenAI-compatible API
//! - Synthesizes MP3 audio and appends it to a podcast RSS feed
//! - Writes a Markdown post and rebuilds the site's `index.json`
//! - Optionally cross-posts the episode to Qiita
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=sk-... arxiv_caster -p ./public -q 'cat:cs.LG|cat:cs.CL'
//! ```
//!
//! ## Architecture
//!
//! 1. **Selection**: pool search results, drop published papers, pick one, derive the slug
//! 2. **Feed**: make sure `podcast.xml` exists with current channel metadata
//! 3. **Generation**: summary, script and audio for the chosen paper
//! 4. **Output**: audio file, Markdown post, feed item, site index, optional cross-post
//!
//! A run that finds nothing to publish, or finds today's post for the chosen
//! paper already on disk, exits successfully without touching the site.

use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod history;
mod models;
mod outputs;
mod pipeline;
mod pool;
mod publish;
mod search;
mod selector;
mod slug;
mod utils;
mod xml;

use api::{OpenAiClient, SpeechSynthesizer, TextGenerator};
use cli::Cli;
use config::ChannelConfig;
use history::{HistoryStore, PostDirHistory};
use outputs::markdown::{Post, render_post};
use outputs::rss::{FeedItem, append_to_feed, ensure_feed};
use outputs::json;
use pipeline::{SelectionPolicy, choose_paper, produce_episode};
use publish::{QiitaSettings, canonical_url, maybe_publish, parse_tags};
use search::PaperSearch;
use search::arxiv::ArxivClient;
use utils::{ensure_writable_dir, file_exists, join_url, to_rfc2822};

const FEED_FILE: &str = "podcast.xml";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "arxiv_caster starting up");

    let args = Cli::parse();
    debug!(
        public_dir = %args.public_dir.display(),
        query = %args.query,
        pool_size = args.pool_size,
        mode = ?args.selection_mode,
        "Parsed CLI arguments"
    );

    if let Err(e) = run(&args).await {
        error!(error = %e, elapsed_ms = start_time.elapsed().as_millis() as u64, "Run failed");
        return Err(e.into());
    }

    info!(
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "arxiv_caster finished"
    );
    Ok(())
}

async fn run(args: &Cli) -> error::Result<()> {
    let search = ArxivClient::new()?;
    run_with(args, Utc::now(), &search, |api_key| {
        OpenAiClient::new(
            api_key,
            &args.openai_base_url,
            &args.llm_model,
            &args.tts_model,
            &args.tts_voice,
        )
    })
    .await
}

/// One run against the given paper search. `connect` builds the model client
/// from the API key and is only called once there is something to publish.
#[instrument(level = "info", skip_all, fields(public_dir = %args.public_dir.display()))]
async fn run_with<S, M, F>(args: &Cli, run_at: DateTime<Utc>, search: &S, connect: F) -> error::Result<()>
where
    S: PaperSearch,
    M: TextGenerator + SpeechSynthesizer,
    F: FnOnce(&str) -> error::Result<M>,
{
    let public_dir = args.public_dir.as_path();
    let posts_dir = public_dir.join("posts");
    let episodes_dir = public_dir.join("episodes");
    let feed_path = public_dir.join(FEED_FILE);
    let base_url = args.base_url();
    if let Some(base) = base_url {
        url::Url::parse(base)?;
    }

    // ---- Channel config & output directories ----
    let channel = match &args.config {
        Some(path) => ChannelConfig::load(path).await?,
        None => ChannelConfig::default(),
    };
    ensure_writable_dir(&posts_dir).await?;
    ensure_writable_dir(&episodes_dir).await?;

    // ---- Selection ----
    let queries = pool::split_queries(&args.query, &args.query_separator);
    info!(?queries, "Searching arXiv");

    let mut history = PostDirHistory::load(&posts_dir).await?;
    let policy = SelectionPolicy {
        pool_size: args.pool_size as usize,
        window_days: args.dedup_window_days,
        mode: args.selection_mode,
        seed_key: selector::seed_key(run_at.date_naive(), &args.query),
    };
    let Some(choice) = choose_paper(search, &queries, &history, &policy, run_at).await else {
        info!("No arXiv results; nothing to publish");
        return Ok(());
    };

    let post_path = posts_dir.join(format!("{}.md", choice.slug));
    if !args.force && file_exists(&post_path).await {
        info!(slug = %choice.slug, "Already published; skipping");
        return Ok(());
    }

    // ---- Generation ----
    let api_key = args
        .openai_api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(error::Error::MissingConfig("OPENAI_API_KEY"))?;
    let model = connect(api_key)?;

    // Ensure runs before any generation call.
    ensure_feed(&feed_path, &channel.channel_meta(base_url, to_rfc2822(run_at))).await?;

    let episode = produce_episode(&model, &model, &choice.entry).await?;

    // ---- Output ----
    let mp3_name = format!("{}.mp3", choice.slug);
    let mp3_path = episodes_dir.join(&mp3_name);
    tokio::fs::write(&mp3_path, &episode.audio).await?;
    info!(path = %mp3_path.display(), bytes = episode.audio.len(), "Wrote episode audio");

    let audio_url = site_url(base_url, &["episodes", &mp3_name]);
    let markdown = render_post(&Post {
        entry: &choice.entry,
        slug: &choice.slug,
        published_at: run_at,
        summary_ja: &episode.summary_ja,
        script_ja: &episode.script_ja,
        audio_url: &audio_url,
    });
    tokio::fs::write(&post_path, &markdown).await?;
    info!(path = %post_path.display(), "Wrote post");

    let pub_date = to_rfc2822(Utc::now());
    let item = FeedItem {
        title: choice.entry.title.clone(),
        link: base_url
            .map(|base| join_url(base, &["posts", &format!("{}.html", choice.slug)]))
            .unwrap_or_else(|| choice.entry.link.clone()),
        guid: format!("arxivcaster-{}", choice.slug),
        pub_date: pub_date.clone(),
        description: episode.summary_ja.clone(),
        enclosure_url: audio_url.clone(),
        enclosure_length: episode.audio.len() as u64,
    };
    append_to_feed(&feed_path, &item, &pub_date).await?;

    history.record(&choice.safe_id, run_at.date_naive());
    debug!(dir = %history.dir().display(), safe_id = %choice.safe_id, "Recorded publication");

    json::rebuild_index(public_dir, Utc::now()).await?;

    // ---- Cross-posting ----
    let qiita = QiitaSettings {
        enabled: args.qiita_publish,
        access_token: args.qiita_access_token.clone(),
        tags: parse_tags(&args.qiita_tags),
        private: args.qiita_private,
        title_prefix: args.qiita_title_prefix.clone(),
    };
    let canonical = canonical_url(base_url, &choice.slug);
    if let Some(published) =
        maybe_publish(&qiita, &choice.entry, &markdown, canonical.as_deref(), &audio_url).await?
    {
        info!(id = %published.id, url = %published.url, "Cross-posted to Qiita");
    }

    info!(
        slug = %choice.slug,
        date = %run_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "Episode published"
    );
    Ok(())
}

/// Absolute URL under the site base, or a path relative to the public directory.
fn site_url(base_url: Option<&str>, parts: &[&str]) -> String {
    match base_url {
        Some(base) => join_url(base, parts),
        None => parts.join("/"),
    }
}
