//! Publication history and the dedup filter.
//!
//! History is a set of `(day, safe_id)` records, one per completed run. The
//! pipeline only talks to the [`HistoryStore`] trait; [`PostDirHistory`]
//! backs it with the post directory, where every `{YYYYMMDD}-{safe_id}.md`
//! file is one record.

use crate::error::Result;
use crate::models::PaperEntry;
use crate::slug::{parse_slug, safe_id};
use chrono::{Days, NaiveDate};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Which history records count as "seen".
///
/// With `days == 0` every record counts. Otherwise only records whose day is
/// within the last `days` calendar days ending at `today` (inclusive) count,
/// so `days == 1` means "published today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    days: u32,
    today: NaiveDate,
}

impl HistoryWindow {
    pub fn new(days: u32, today: NaiveDate) -> Self {
        Self { days, today }
    }

    pub fn unbounded(today: NaiveDate) -> Self {
        Self::new(0, today)
    }

    pub fn admits(&self, day: NaiveDate) -> bool {
        if self.days == 0 {
            return true;
        }
        match self.today.checked_sub_days(Days::new(u64::from(self.days - 1))) {
            Some(cutoff) => day >= cutoff,
            None => true,
        }
    }
}

pub trait HistoryStore {
    /// Whether `safe_id` was published on a day the window admits.
    fn contains(&self, safe_id: &str, window: HistoryWindow) -> bool;

    /// Note a completed publication.
    fn record(&mut self, safe_id: &str, day: NaiveDate);
}

/// In-memory history, also the record set behind [`PostDirHistory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    records: Vec<(NaiveDate, String)>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl HistoryStore for MemoryHistory {
    fn contains(&self, safe_id: &str, window: HistoryWindow) -> bool {
        self.records
            .iter()
            .any(|(day, id)| id == safe_id && window.admits(*day))
    }

    fn record(&mut self, safe_id: &str, day: NaiveDate) {
        self.records.push((day, safe_id.to_string()));
    }
}

/// History read from post file names in a directory.
///
/// The post file written at the end of a run is the durable record, so
/// [`HistoryStore::record`] only updates the loaded set.
#[derive(Debug, Clone)]
pub struct PostDirHistory {
    dir: PathBuf,
    records: MemoryHistory,
}

impl PostDirHistory {
    /// Scan `dir` for `*.md` files named like slugs. A missing directory is an empty history.
    #[instrument(level = "info", skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut records = MemoryHistory::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Post directory missing; history is empty");
                return Ok(Self { dir, records });
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match parse_slug(stem) {
                Some((day, id)) => records.record(id, day),
                None => debug!(file = %path.display(), "Skipping non-slug post file"),
            }
        }

        info!(records = records.len(), "Loaded publication history");
        Ok(Self { dir, records })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl HistoryStore for PostDirHistory {
    fn contains(&self, safe_id: &str, window: HistoryWindow) -> bool {
        self.records.contains(safe_id, window)
    }

    fn record(&mut self, safe_id: &str, day: NaiveDate) {
        self.records.record(safe_id, day);
    }
}

/// Drop pool entries already in history.
///
/// If that would leave nothing, the unfiltered pool is returned instead so a
/// small pool can never stall publication. The result is non-empty whenever
/// the input is.
pub fn filter_seen<H>(pool: Vec<PaperEntry>, history: &H, window: HistoryWindow) -> Vec<PaperEntry>
where
    H: HistoryStore + ?Sized,
{
    let (fresh, seen): (Vec<PaperEntry>, Vec<PaperEntry>) = pool
        .into_iter()
        .partition(|entry| !history.contains(&safe_id(&entry.id), window));

    if fresh.is_empty() && !seen.is_empty() {
        warn!(
            pool = seen.len(),
            "Every pool entry is already published; falling back to the unfiltered pool"
        );
        return seen;
    }

    info!(fresh = fresh.len(), seen = seen.len(), "Filtered pool against history");
    fresh
}
