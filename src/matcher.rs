//! Match engine: trailing search token extraction and library
//! filtering.
//!
//! Everything operates on code points, the same granularity as the
//! caret model, so multi-byte scripts match at the positions the caret
//! reports.

use serde::Serialize;

use crate::library::PromptEntry;

/// A library entry matching the in-progress search token.
/// `match_start..match_end` is the code-point span of the token in the
/// input, i.e. the span a confirmation replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate {
    pub label: String,
    pub body: String,
    pub match_start: usize,
    pub match_end: usize,
}

/// Matching thresholds, sourced from the site catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Tokens shorter than this never match
    pub min_token_len: usize,
    /// Result list length cap
    pub max_results: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            max_results: 5,
        }
    }
}

/// Find library entries matching the trailing token before the caret.
///
/// The token is the maximal trailing run of non-whitespace code points;
/// matching is case-insensitive substring containment against each
/// entry's label, preserving library order.
pub fn find_matches(
    content: &str,
    caret_offset: usize,
    entries: &[PromptEntry],
    config: &MatchConfig,
) -> Vec<MatchCandidate> {
    let chars: Vec<char> = content.chars().collect();
    let caret = caret_offset.min(chars.len());

    let mut start = caret;
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    let token_len = caret - start;
    if token_len < config.min_token_len {
        return Vec::new();
    }

    let needle: String = chars[start..caret]
        .iter()
        .collect::<String>()
        .to_lowercase();

    let mut matches = Vec::new();
    for entry in entries {
        if entry.label.to_lowercase().contains(&needle) {
            matches.push(MatchCandidate {
                label: entry.label.clone(),
                body: entry.body.clone(),
                match_start: start,
                match_end: caret,
            });
            if matches.len() >= config.max_results {
                break;
            }
        }
    }
    matches
}
