//! Paper selection and episode production.
//!
//! ```text
//! queries ──► build_pool ──► filter_seen ──► select ──► slug_for ──► produce_episode
//!              (search)       (history)      (mode, seed key)          (text, speech)
//! ```
//!
//! Selection is pure given the search results and the history, so a rerun on
//! the same day against the same pool chooses the same paper and lands on the
//! same slug.

use crate::api::{SpeechSynthesizer, TextGenerator, generate_script_ja, generate_summary_ja};
use crate::error::Result;
use crate::history::{HistoryStore, HistoryWindow, filter_seen};
use crate::models::PaperEntry;
use crate::pool::build_pool;
use crate::search::PaperSearch;
use crate::selector::{SelectionMode, select};
use crate::slug::{safe_id, slug_for};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

/// Selection policy for one run.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub pool_size: usize,
    pub window_days: u32,
    pub mode: SelectionMode,
    /// Seed for [`SelectionMode::Daily`].
    pub seed_key: String,
}

/// The paper chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub entry: PaperEntry,
    /// Position in the filtered pool.
    pub index: usize,
    pub pool_len: usize,
    pub safe_id: String,
    pub slug: String,
}

/// Pick today's paper. Returns `None` when the searches produced nothing.
#[instrument(level = "info", skip_all, fields(queries = queries.len(), mode = ?policy.mode))]
pub async fn choose_paper<S, H>(
    search: &S,
    queries: &[String],
    history: &H,
    policy: &SelectionPolicy,
    run_at: DateTime<Utc>,
) -> Option<Choice>
where
    S: PaperSearch,
    H: HistoryStore + ?Sized,
{
    let pool = build_pool(search, queries, policy.pool_size).await;
    if pool.is_empty() {
        return None;
    }

    let window = HistoryWindow::new(policy.window_days, run_at.date_naive());
    let candidates = filter_seen(pool, history, window);
    let picked = select(&candidates, policy.mode, &policy.seed_key)?;

    let choice = Choice {
        safe_id: safe_id(&picked.entry.id),
        slug: slug_for(&picked.entry.id, run_at),
        index: picked.index,
        pool_len: candidates.len(),
        entry: picked.entry.clone(),
    };
    info!(
        index = choice.index,
        pool = choice.pool_len,
        slug = %choice.slug,
        title = %choice.entry.title,
        "Chose paper"
    );
    Some(choice)
}

/// Generated content for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub summary_ja: String,
    pub script_ja: String,
    /// MP3 bytes.
    pub audio: Vec<u8>,
}

/// Summary, then script from the summary, then speech from the script.
#[instrument(level = "info", skip_all, fields(id = %entry.id))]
pub async fn produce_episode<G, T>(generator: &G, speech: &T, entry: &PaperEntry) -> Result<Episode>
where
    G: TextGenerator,
    T: SpeechSynthesizer,
{
    let summary_ja = generate_summary_ja(generator, entry).await?;
    let script_ja = generate_script_ja(generator, entry, &summary_ja).await?;
    let audio = speech.synthesize(&script_ja).await?;
    info!(
        summary_chars = summary_ja.chars().count(),
        script_chars = script_ja.chars().count(),
        audio_bytes = audio.len(),
        "Episode content ready"
    );
    Ok(Episode {
        summary_ja,
        script_ja,
        audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatPrompt;
    use crate::error::Error;
    use crate::history::MemoryHistory;
    use crate::selector::seed_key;
    use chrono::{Days, NaiveDate, TimeZone};
    use std::collections::HashMap;

    struct FakeSearch(HashMap<String, Vec<PaperEntry>>);

    impl PaperSearch for FakeSearch {
        async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<PaperEntry>> {
            Ok(self.0.get(query).cloned().unwrap_or_default())
        }
    }

    fn entry(id: &str, day: NaiveDate) -> PaperEntry {
        PaperEntry {
            id: id.to_string(),
            title: format!("Paper {id}"),
            summary: String::new(),
            authors: vec![],
            published: Some(day.and_hms_opt(12, 0, 0).unwrap().and_utc()),
            updated: None,
            link: id.to_string(),
            categories: vec![],
        }
    }

    fn policy(raw_query: &str, today: NaiveDate) -> SelectionPolicy {
        SelectionPolicy {
            pool_size: 10,
            window_days: 0,
            mode: SelectionMode::Daily,
            seed_key: seed_key(today, raw_query),
        }
    }

    #[tokio::test]
    async fn test_scenario_dedup_then_pick_remaining_paper() {
        let run_at = Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap();
        let today = run_at.date_naive();
        let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day3 = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let a = "http://arxiv.org/abs/2403.00001v1";
        let b = "http://arxiv.org/abs/2403.00002v1";

        let search = FakeSearch(HashMap::from([
            ("q1".to_string(), vec![entry(a, day3), entry(b, day1)]),
            ("q2".to_string(), vec![entry(a, day3)]),
        ]));
        let queries = vec!["q1".to_string(), "q2".to_string()];

        let mut history = MemoryHistory::new();
        history.record(&safe_id(a), today.checked_sub_days(Days::new(10)).unwrap());

        let choice = choose_paper(&search, &queries, &history, &policy("q1|q2", today), run_at)
            .await
            .unwrap();
        assert_eq!(choice.entry.id, b);
        assert_eq!(choice.index, 0);
        assert_eq!(choice.pool_len, 1);
        assert_eq!(choice.slug, "20240305-2403.00002v1");
        assert_eq!(choice.safe_id, "2403.00002v1");
    }

    #[tokio::test]
    async fn test_daily_choice_is_stable_across_runs() {
        let run_at = Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap();
        let today = run_at.date_naive();
        let results = (0..7)
            .map(|i| entry(&format!("http://arxiv.org/abs/2403.{i:05}v1"), today))
            .collect();
        let search = FakeSearch(HashMap::from([("cat:cs.LG".to_string(), results)]));
        let queries = vec!["cat:cs.LG".to_string()];
        let history = MemoryHistory::new();
        let p = policy("cat:cs.LG", today);

        let first = choose_paper(&search, &queries, &history, &p, run_at).await.unwrap();
        let later = run_at + chrono::Duration::hours(5);
        let second = choose_paper(&search, &queries, &history, &p, later).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_everything_seen_falls_back_to_full_pool() {
        let run_at = Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap();
        let today = run_at.date_naive();
        let a = "http://arxiv.org/abs/2403.00001v1";
        let search = FakeSearch(HashMap::from([("q".to_string(), vec![entry(a, today)])]));
        let mut history = MemoryHistory::new();
        history.record(&safe_id(a), today);

        let choice = choose_paper(&search, &["q".to_string()], &history, &policy("q", today), run_at)
            .await
            .unwrap();
        assert_eq!(choice.entry.id, a);
    }

    /// Answers by temperature so the summary and script prompts are distinguishable.
    struct ByTemperature;

    impl TextGenerator for ByTemperature {
        async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
            if prompt.temperature < 0.5 {
                Ok("SUMMARY-7f3a".to_string())
            } else {
                Ok(format!("台本 based on {}", prompt.user.contains("SUMMARY-7f3a")))
            }
        }
    }

    struct FakeSpeech;

    impl SpeechSynthesizer for FakeSpeech {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    struct FailingSpeech;

    impl SpeechSynthesizer for FailingSpeech {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
            Err(Error::BadResponse {
                service: "fake",
                reason: "no audio".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_produce_episode_chains_summary_script_and_speech() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let paper = entry("http://arxiv.org/abs/2403.00001v1", today);
        let episode = produce_episode(&ByTemperature, &FakeSpeech, &paper).await.unwrap();
        assert_eq!(episode.summary_ja, "SUMMARY-7f3a");
        assert_eq!(episode.script_ja, "台本 based on true");
        assert_eq!(episode.audio, episode.script_ja.as_bytes());
    }

    #[tokio::test]
    async fn test_produce_episode_propagates_speech_failure() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let paper = entry("http://arxiv.org/abs/2403.00001v1", today);
        assert!(produce_episode(&ByTemperature, &FailingSpeech, &paper).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_search_results_choose_nothing() {
        let run_at = Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap();
        let search = FakeSearch(HashMap::new());
        let history = MemoryHistory::new();
        let p = policy("q", run_at.date_naive());
        assert!(choose_paper(&search, &["q".to_string()], &history, &p, run_at).await.is_none());
    }
}
