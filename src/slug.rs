//! Safe-id and slug derivation.
//!
//! A slug is `{YYYYMMDD}-{safe_id}` where the date is the run's UTC day and
//! the safe-id is the paper's local identifier with everything outside
//! `[A-Za-z0-9_.-]` replaced by `-`, lower-cased. Slugs name the post file,
//! the audio file and the feed guid, and the history store reads them back
//! from post file names.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("static regex"));

/// The local part of a paper identifier: after the last `/abs/`, else after the last `/`.
pub fn local_id(identifier: &str) -> &str {
    if let Some(pos) = identifier.rfind("/abs/") {
        return &identifier[pos + "/abs/".len()..];
    }
    identifier
        .rsplit_once('/')
        .map_or(identifier, |(_, tail)| tail)
}

/// Filesystem- and guid-safe form of a paper identifier.
pub fn safe_id(identifier: &str) -> String {
    UNSAFE_CHARS
        .replace_all(local_id(identifier), "-")
        .to_lowercase()
}

/// `YYYYMMDD` for a calendar day.
pub fn day_stamp(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// Slug for a paper published on the UTC day of `run_at`.
pub fn slug_for(identifier: &str, run_at: DateTime<Utc>) -> String {
    format!("{}-{}", day_stamp(run_at.date_naive()), safe_id(identifier))
}

/// Split a slug (or post file stem) back into its day and safe-id.
///
/// Returns `None` for names that were not produced by [`slug_for`].
pub fn parse_slug(stem: &str) -> Option<(NaiveDate, &str)> {
    let (day, id) = stem.split_once('-')?;
    if day.len() != 8 || !day.bytes().all(|b| b.is_ascii_digit()) || id.is_empty() {
        return None;
    }
    let day = NaiveDate::parse_from_str(day, "%Y%m%d").ok()?;
    Some((day, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slug_for_arxiv_abs_url() {
        let run_at = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 0).unwrap();
        assert_eq!(
            slug_for("http://arxiv.org/abs/2401.12345v2", run_at),
            "20240305-2401.12345v2"
        );
    }

    #[test]
    fn test_slug_is_stable_within_a_day() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 3, 5, 23, 0, 0).unwrap();
        let id = "http://arxiv.org/abs/2401.12345v2";
        assert_eq!(slug_for(id, morning), slug_for(id, night));
    }

    #[test]
    fn test_local_id_variants() {
        assert_eq!(local_id("http://arxiv.org/abs/math/0601001v1"), "math/0601001v1");
        assert_eq!(local_id("https://example.org/papers/XYZ"), "XYZ");
        assert_eq!(local_id("2401.00001"), "2401.00001");
    }

    #[test]
    fn test_safe_id_replaces_and_lowercases() {
        assert_eq!(safe_id("http://arxiv.org/abs/math/0601001v1"), "math-0601001v1");
        assert_eq!(safe_id("http://x/abs/Foo Bar?v=1"), "foo-bar-v-1");
        assert_eq!(safe_id("a_b.c-D"), "a_b.c-d");
    }

    #[test]
    fn test_parse_slug_round_trip() {
        let run_at = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let slug = slug_for("http://arxiv.org/abs/math/0601001v1", run_at);
        let (day, id) = parse_slug(&slug).unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(id, "math-0601001v1");
    }

    #[test]
    fn test_parse_slug_rejects_foreign_names() {
        assert_eq!(parse_slug("README"), None);
        assert_eq!(parse_slug("2024-03-05-x"), None);
        assert_eq!(parse_slug("20241399-x"), None);
        assert_eq!(parse_slug("20240305-"), None);
    }
}
