//! Case-insensitive substring filtering over content records.
//!
//! There is no scoring: matches keep the artifact's order.

use crate::models::ContentRecord;

/// Keep the records containing `query` in their title, content or module,
/// preserving order. An empty query matches every record.
pub fn filter_records(records: Vec<ContentRecord>, query: &str) -> Vec<ContentRecord> {
    let needle = query.to_lowercase();
    records
        .into_iter()
        .filter(|r| matches_lower(r, &needle))
        .collect()
}

/// Records matching any term of at least `min_len` characters, in order.
///
/// Used where a whole question is the input rather than a single phrase.
pub fn match_any_term<'a>(
    records: &'a [ContentRecord],
    query: &str,
    min_len: usize,
) -> Vec<&'a ContentRecord> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= min_len)
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| terms.iter().any(|t| matches_lower(r, t)))
        .collect()
}

fn matches_lower(record: &ContentRecord, needle: &str) -> bool {
    contains_lower(&record.title, needle)
        || contains_lower(&record.content, needle)
        || contains_lower(&record.module, needle)
}

fn contains_lower(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
