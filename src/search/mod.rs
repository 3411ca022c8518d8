//! Paper search services.
//!
//! The pool builder only needs "give me up to N papers for this query", which
//! is the [`PaperSearch`] trait. [`arxiv::ArxivClient`] implements it against
//! the arXiv Atom API; tests implement it with canned results.
//!
//! | Service | Module | Method |
//! |---------|--------|--------|
//! | arXiv | [`arxiv`] | Atom feed from `export.arxiv.org/api/query` |

use crate::error::Result;
use crate::models::PaperEntry;

pub mod arxiv;

pub trait PaperSearch {
    /// Run one query and return up to `max_results` entries, newest submissions first.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperEntry>>;
}
