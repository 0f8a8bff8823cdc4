//! Boundary-aware snippet compression.
//!
//! Excerpts are cut along heuristically detected code-structure boundaries
//! so a compressed snippet never ends mid-construct. Boundary detection is a
//! pluggable predicate; the default vocabulary is tuned for smart-contract
//! source text.

use crate::config::CompressionConfig;

pub trait BoundaryMatcher {
    /// `true` when `line` marks the start or end of a logical code block.
    fn is_boundary(&self, line: &str) -> bool;
}

/// Structural tokens for smart-contract-like source: declaration keywords
/// plus block and statement terminators.
const BOUNDARY_TOKENS: &[&str] = &[
    "function",
    "contract",
    "library",
    "interface",
    "constructor",
    "modifier",
    "event",
    "{",
    "}",
    "};",
    ");",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ContractBoundaries;

impl BoundaryMatcher for ContractBoundaries {
    fn is_boundary(&self, line: &str) -> bool {
        let stripped = line.trim();
        BOUNDARY_TOKENS
            .iter()
            .any(|token| stripped.starts_with(token) || stripped.ends_with(token))
    }
}

/// Shrink `snippet` to at most `config.max_chars` characters, centered on the
/// first line containing `marker` when present.
///
/// With a marker: seed a window of a few lines around the marker line, extend
/// outward in each direction until a boundary line is reached, then
/// hard-truncate with a trailing ellipsis if the block is still too long.
/// Without a marker: accumulate lines and cut at the last boundary seen once
/// the running length would exceed the maximum. Empty input yields an empty
/// string.
#[must_use]
pub fn compress_snippet(
    snippet: &str,
    marker: &str,
    config: &CompressionConfig,
    boundaries: &dyn BoundaryMatcher,
) -> String {
    if snippet.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = snippet.lines().collect();

    if let Some(marker_idx) = lines.iter().position(|line| line.contains(marker)) {
        let (start, end) = block_bounds(&lines, marker_idx, config, boundaries);
        let block = lines[start..end].join("\n");
        if block.chars().count() <= config.max_chars {
            return block;
        }
        return truncate_with_ellipsis(&block, config.max_chars);
    }

    let mut total_chars = 0usize;
    let mut last_boundary = 0usize;
    for (idx, line) in lines.iter().enumerate() {
        total_chars += line.chars().count() + 1;
        if boundaries.is_boundary(line) {
            last_boundary = idx;
        }
        if total_chars > config.max_chars {
            let break_idx = if last_boundary > 0 { last_boundary } else { idx };
            let mut out = lines[..break_idx].join("\n");
            out.push_str("\n...");
            return out;
        }
    }

    snippet.to_string()
}

/// Expand a seed window around `idx` until a boundary line is reached on
/// each side (or the snippet's edge).
fn block_bounds(
    lines: &[&str],
    idx: usize,
    config: &CompressionConfig,
    boundaries: &dyn BoundaryMatcher,
) -> (usize, usize) {
    let mut start = idx.saturating_sub(config.context_before);
    let mut end = (idx + config.context_after).min(lines.len());

    while start > 0 {
        if boundaries.is_boundary(lines[start - 1]) {
            break;
        }
        start -= 1;
    }

    while end < lines.len() {
        if boundaries.is_boundary(lines[end - 1]) {
            break;
        }
        end += 1;
    }

    (start, end)
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let Some((clip_idx, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let mut out = text[..clip_idx].to_string();
    out.push_str("\n...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(snippet: &str, max_chars: usize) -> String {
        let config = CompressionConfig {
            max_chars,
            ..CompressionConfig::default()
        };
        compress_snippet(snippet, "target_SC", &config, &ContractBoundaries)
    }

    #[test]
    fn empty_snippet_compresses_to_empty_string() {
        assert_eq!(compress("", 400), "");
    }

    #[test]
    fn short_snippet_without_marker_is_returned_whole() {
        let snippet = "uint256 supply;\naddress owner;";
        assert_eq!(compress(snippet, 400), snippet);
    }

    #[test]
    fn marker_window_stays_within_enclosing_boundaries() {
        // Marker on line 10 (index 9), block-closing boundaries on lines 7
        // and 13. The window must not reach outside lines 7..=13.
        let mut lines = vec!["line"; 16];
        lines[6] = "}";
        lines[9] = "balances[target_SC] = 1;";
        lines[12] = "}";
        let snippet = lines.join("\n");

        let out = compress(&snippet, 4000);
        let out_lines: Vec<&str> = out.lines().collect();
        assert!(out_lines.contains(&"balances[target_SC] = 1;"));
        // Window starts after the line-7 boundary and ends at the line-13 one.
        assert!(out_lines.len() <= 7);
        assert_eq!(out_lines.last(), Some(&"}"));
        assert!(!out.starts_with("line\nline\nline\nline"));
    }

    #[test]
    fn oversized_marker_block_is_hard_truncated_with_ellipsis() {
        let long_line = "x".repeat(300);
        let snippet = format!("{long_line}\ntarget_SC here\n{long_line}");
        let out = compress(&snippet, 100);
        assert!(out.ends_with("\n..."));
        assert!(out.chars().count() <= 100 + "\n...".chars().count());
    }

    #[test]
    fn fallback_cuts_at_last_boundary_seen() {
        let snippet = [
            "function setOwner(address a) {",
            "    owner = a;",
            "}",
            "uint256 padding_line_one;",
            "uint256 padding_line_two;",
            "uint256 padding_line_three;",
        ]
        .join("\n");

        let out = compress(&snippet, 60);
        assert!(out.ends_with("\n..."));
        // Cut lands at the `}` boundary, not mid-padding.
        assert_eq!(out, "function setOwner(address a) {\n    owner = a;\n...");
    }

    #[test]
    fn output_never_exceeds_maximum_plus_ellipsis() {
        let snippet = "abcdefghij\n".repeat(100);
        for max_chars in [10, 50, 120, 400] {
            let out = compress(&snippet, max_chars);
            assert!(
                out.chars().count() <= max_chars + "\n...".chars().count(),
                "max_chars={max_chars} len={}",
                out.chars().count()
            );
        }
    }

    #[test]
    fn custom_boundary_matcher_is_honored() {
        struct SemicolonBoundaries;
        impl BoundaryMatcher for SemicolonBoundaries {
            fn is_boundary(&self, line: &str) -> bool {
                line.trim().ends_with(';')
            }
        }

        let snippet = "first statement\nsecond statement;\nthird statement\nfourth statement";
        let config = CompressionConfig {
            max_chars: 40,
            ..CompressionConfig::default()
        };
        // The default vocabulary sees no boundary here; the custom matcher
        // moves the cut to the semicolon line.
        let out = compress_snippet(snippet, "target_SC", &config, &SemicolonBoundaries);
        assert_eq!(out, "first statement\n...");
    }
}
