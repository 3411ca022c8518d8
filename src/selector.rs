//! Picks one paper from the filtered pool.
//!
//! # Daily mode
//!
//! The generator is seeded from the seed key (run day + raw query string) and
//! is fully reproducible across processes and platforms:
//!
//! 1. Seed: 64-bit FNV-1a over the UTF-8 bytes of the key.
//! 2. Step: SplitMix64. The state advances by `0x9E3779B97F4A7C15` and the
//!    output is the state passed through the SplitMix64 finalizer.
//! 3. Float: the top 53 bits of a step output scaled by `2^-53`, uniform in `[0, 1)`.
//!
//! The index is `floor(u * len)`. Same key and same pool always give the same
//! index, which keeps reruns on one day stable without any stored state.
//!
//! This is not a cryptographic generator and must not be used where an
//! adversary could profit from predicting the choice.

use crate::models::PaperEntry;
use crate::slug::day_stamp;
use chrono::NaiveDate;
use clap::ValueEnum;
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectionMode {
    /// Reproducible pick seeded by day and query.
    #[value(name = "daily")]
    Daily,
    /// Unseeded pick from the thread-local generator.
    #[value(name = "true_random", alias = "true-random")]
    TrueRandom,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seeded SplitMix64 generator for daily selection.
#[derive(Debug, Clone)]
pub struct DailyRng {
    state: u64,
}

impl DailyRng {
    pub fn from_seed_key(key: &str) -> Self {
        let state = key.bytes().fold(FNV_OFFSET, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(FNV_PRIME)
        });
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Seed key for daily mode: `YYYYMMDD` of the run day followed by the raw query string.
pub fn seed_key(day: NaiveDate, raw_query: &str) -> String {
    format!("{}{}", day_stamp(day), raw_query)
}

/// `floor(u * len)`, clamped so a `u` of exactly 1.0 can never index past the end.
pub fn index_for(u: f64, len: usize) -> usize {
    ((u * len as f64).floor() as usize).min(len.saturating_sub(1))
}

/// The chosen entry and its position in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub entry: &'a PaperEntry,
    /// Reported for logging only.
    pub index: usize,
}

/// Pick one entry. Returns `None` only for an empty pool.
pub fn select<'a>(
    pool: &'a [PaperEntry],
    mode: SelectionMode,
    seed_key: &str,
) -> Option<Selection<'a>> {
    if pool.is_empty() {
        return None;
    }
    let u = match mode {
        SelectionMode::Daily => DailyRng::from_seed_key(seed_key).next_f64(),
        SelectionMode::TrueRandom => rand::rng().random::<f64>(),
    };
    let index = index_for(u, pool.len());
    debug!(?mode, index, pool = pool.len(), "Selected pool index");
    Some(Selection {
        entry: &pool[index],
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<PaperEntry> {
        (0..n)
            .map(|i| PaperEntry {
                id: format!("http://arxiv.org/abs/2401.{i:05}v1"),
                title: format!("Paper {i}"),
                summary: String::new(),
                authors: vec![],
                published: None,
                updated: None,
                link: String::new(),
                categories: vec![],
            })
            .collect()
    }

    #[test]
    fn test_fnv_seed_matches_reference_values() {
        assert_eq!(DailyRng::from_seed_key("").state, 0xcbf29ce484222325);
        assert_eq!(DailyRng::from_seed_key("a").state, 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_daily_rng_sequence_is_pinned() {
        let mut rng = DailyRng::from_seed_key("x");
        assert_eq!(rng.next_u64(), 0x338262d8f096398f);

        let mut rng = DailyRng::from_seed_key("20240305cat:cs.LG");
        let picks: Vec<usize> = (0..3).map(|_| index_for(rng.next_f64(), 7)).collect();
        assert_eq!(picks, vec![4, 3, 1]);
    }

    #[test]
    fn test_daily_select_is_reproducible() {
        let p = pool(10);
        let key = seed_key(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), "cat:cs.LG");
        assert_eq!(key, "20240305cat:cs.LG");
        let a = select(&p, SelectionMode::Daily, &key).unwrap();
        let same_pool = p.clone();
        let b = select(&same_pool, SelectionMode::Daily, &key).unwrap();
        assert_eq!(a.index, b.index);
        assert_eq!(a.index, 5);
        assert_eq!(a.entry.id, p[5].id);
    }

    #[test]
    fn test_floats_stay_in_unit_interval() {
        let mut rng = DailyRng::from_seed_key("bounds");
        for _ in 0..10_000 {
            let u = rng.next_f64();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_true_random_returns_member_of_pool() {
        let p = pool(3);
        for _ in 0..50 {
            let s = select(&p, SelectionMode::TrueRandom, "").unwrap();
            assert!(s.index < 3);
            assert_eq!(s.entry, &p[s.index]);
        }
    }

    #[test]
    fn test_single_entry_pool_always_picks_it() {
        let p = pool(1);
        assert_eq!(select(&p, SelectionMode::Daily, "anything").unwrap().index, 0);
    }

    #[test]
    fn test_empty_pool_selects_nothing() {
        assert!(select(&[], SelectionMode::Daily, "k").is_none());
    }

    #[test]
    fn test_index_for_clamps_upper_edge() {
        assert_eq!(index_for(0.0, 4), 0);
        assert_eq!(index_for(0.9999, 4), 3);
        assert_eq!(index_for(1.0, 4), 3);
    }
}
