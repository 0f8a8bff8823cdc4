//! Approximate snippet similarity.
//!
//! Two snippets count as the same evidence when their comment-stripped,
//! whitespace-collapsed forms are close under a character-level
//! longest-common-subsequence ratio. Short strings are too ambiguous for
//! fuzzy matching and require exact equality instead.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SimilarityConfig;

static COMMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)/\*.*?\*/|//.*$").expect("comment pattern is valid"));

/// Whether `a` and `b` should be treated as duplicate evidence.
/// Symmetric: `are_similar(a, b, c) == are_similar(b, a, c)`.
#[must_use]
pub fn are_similar(a: &str, b: &str, config: &SimilarityConfig) -> bool {
    let a_norm = normalize_code(a);
    let b_norm = normalize_code(b);

    if a_norm.chars().count() < config.min_fuzzy_len
        || b_norm.chars().count() < config.min_fuzzy_len
    {
        return a_norm == b_norm;
    }

    similarity_ratio(&a_norm, &b_norm) >= config.threshold
}

/// Strip comments, lower-case, and collapse whitespace runs to single spaces.
#[must_use]
pub fn normalize_code(text: &str) -> String {
    let stripped = COMMENT_PATTERN.replace_all(text, "");
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Character-level LCS similarity: `2 * lcs(a, b) / (|a| + |b|)`, in `0.0..=1.0`.
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }

    let lcs = lcs_len(&a_chars, &b_chars);
    2.0 * lcs as f64 / (a_chars.len() + b_chars.len()) as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Two-row DP; rows sized by the shorter side to bound memory.
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for &lc in long {
        for (j, &sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}
