//! Candidate pool construction.
//!
//! Every query is run once (concurrently, one in flight per query), the
//! results are merged in query order, deduplicated by paper id with the first
//! occurrence winning, sorted newest first and cut to the pool size.
//!
//! A failing query is logged and contributes nothing; it never fails the run.

use crate::models::PaperEntry;
use crate::search::PaperSearch;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{error, info, instrument};

/// Fewest results requested per query, however small the pool.
const MIN_FETCH_PER_QUERY: usize = 50;
/// Over-fetch to cover losses from cross-query and history dedup.
const OVERFETCH_FACTOR: f64 = 1.4;

/// Split the raw query setting on `separator`, trimming parts and dropping blanks.
pub fn split_queries(raw: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        let q = raw.trim();
        return if q.is_empty() { vec![] } else { vec![q.to_string()] };
    }
    raw.split(separator)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

/// Results to request per query: `max(50, ceil(pool_size / query_count * 1.4))`.
pub fn fetch_count(pool_size: usize, query_count: usize) -> usize {
    let per_query = pool_size as f64 / query_count.max(1) as f64;
    ((per_query * OVERFETCH_FACTOR).ceil() as usize).max(MIN_FETCH_PER_QUERY)
}

/// Merge per-query results into a pool: unique by id (first wins), newest
/// first by [`PaperEntry::effective_time`], at most `pool_size` long.
///
/// The sort is stable, so entries with equal timestamps keep merge order.
pub fn merge_pool(results: Vec<Vec<PaperEntry>>, pool_size: usize) -> Vec<PaperEntry> {
    let mut pool: Vec<PaperEntry> = results
        .into_iter()
        .flatten()
        .unique_by(|e| e.id.clone())
        .collect();
    pool.sort_by(|a, b| b.effective_time().cmp(&a.effective_time()));
    pool.truncate(pool_size);
    pool
}

/// Run all queries against `search` and build the pool.
///
/// An empty result means there is nothing to publish this run.
#[instrument(level = "info", skip(search, queries), fields(queries = queries.len()))]
pub async fn build_pool<S>(search: &S, queries: &[String], pool_size: usize) -> Vec<PaperEntry>
where
    S: PaperSearch,
{
    if queries.is_empty() {
        return Vec::new();
    }
    let per_query = fetch_count(pool_size, queries.len());
    info!(per_query, pool_size, "Building entry pool");

    let results: Vec<Vec<PaperEntry>> = stream::iter(queries)
        .map(|query| async move {
            match search.search(query, per_query).await {
                Ok(entries) => {
                    info!(%query, count = entries.len(), "Query returned entries");
                    entries
                }
                Err(e) => {
                    error!(%query, error = %e, "Query failed; continuing without it");
                    Vec::new()
                }
            }
        })
        .buffered(queries.len())
        .collect()
        .await;

    let pool = merge_pool(results, pool_size);
    info!(count = pool.len(), "Entry pool built");
    pool
}
