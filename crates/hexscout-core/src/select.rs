//! Snippet scoring, deduplication, and selection.
//!
//! Candidates are ranked by estimated informativeness, then walked in score
//! order: a snippet is accepted only if its normalized comparison key is
//! unseen and it is not judged similar to anything already accepted.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::SelectionConfig;
use crate::models::ScoredSnippet;
use crate::sanitize::TARGET_MARKER;
use crate::similarity::are_similar;

static DECLARATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(function|contract|class)\s+\w+").expect("declaration pattern is valid")
});

static QUOTED_LITERAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"].*?['"]"#).expect("quoted literal pattern is valid"));

/// Informativeness estimate: capped length component plus fixed bonuses for
/// a declaration-like pattern and for the sanitizer's marker token.
#[must_use]
pub fn score_snippet(snippet: &str, config: &SelectionConfig) -> f64 {
    let length_score = (snippet.chars().count() as f64 / config.length_cap).min(1.0);
    let mut score = length_score;
    if DECLARATION_PATTERN.is_match(snippet) {
        score += config.declaration_bonus;
    }
    if snippet.contains(TARGET_MARKER) {
        score += config.marker_bonus;
    }
    score
}

/// Normalized key for exact-duplicate detection: trimmed, lower-cased,
/// whitespace-collapsed, with quoted string literals masked so literal
/// values do not dominate the key.
#[must_use]
pub fn comparison_key(snippet: &str) -> String {
    let collapsed = snippet
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    QUOTED_LITERAL_PATTERN
        .replace_all(&collapsed, "\"...\"")
        .into_owned()
}

/// Order, deduplicate, and return accepted snippets in non-increasing score
/// order. No two accepted snippets share a comparison key or are judged
/// similar by the comparator.
#[must_use]
pub fn deduplicate_snippets(snippets: &[String], config: &SelectionConfig) -> Vec<String> {
    let mut candidates: Vec<ScoredSnippet> = snippets
        .iter()
        .filter(|snippet| snippet.trim().chars().count() >= config.min_snippet_len)
        .map(|snippet| ScoredSnippet {
            text: snippet.clone(),
            score: score_snippet(snippet, config),
            key: comparison_key(snippet),
        })
        .collect();

    // Stable sort keeps input order among equal scores.
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut accepted: Vec<String> = Vec::new();
    let mut seen_keys: HashSet<String> = HashSet::new();
    for candidate in candidates {
        if seen_keys.contains(&candidate.key) {
            continue;
        }
        if accepted
            .iter()
            .any(|kept| are_similar(&candidate.text, kept, &config.similarity))
        {
            continue;
        }
        seen_keys.insert(candidate.key);
        accepted.push(candidate.text);
    }
    accepted
}

/// The caller-facing hard cap: keep the `max` longest snippets, longest first.
#[must_use]
pub fn top_snippets(mut snippets: Vec<String>, max: usize) -> Vec<String> {
    snippets.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    snippets.truncate(max);
    snippets
}
