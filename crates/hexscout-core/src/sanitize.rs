//! Address sanitization.
//!
//! Every 40-hex-digit `0x` token in a fragment is rewritten before anything
//! leaves the pipeline: the address under investigation becomes the fixed
//! marker [`TARGET_MARKER`], every other address becomes a short
//! head-and-tail display form that cannot be reversed into the original.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Placeholder substituted for the address being investigated.
pub const TARGET_MARKER: &str = "target_SC";

/// Misspelled marker observed in upstream fragments; normalized before
/// sanitizing so scoring and compression see one token.
const MARKER_TYPO: &str = "Targer_SC";

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[a-fA-F0-9]{40}").expect("address pattern is valid"));

/// Replace every address-shaped token in `text`.
///
/// The occurrence matching `target` (case-insensitively) maps to
/// [`TARGET_MARKER`]; any other address maps to `0x1234...abcd`. The
/// replacement cache is local to one call, so repeated invocations for
/// different targets never leak mappings between each other. Distinct
/// addresses sharing head and tail collapse to the same display form; that
/// loss is accepted.
///
/// Output contains no address-shaped token, so sanitizing twice equals
/// sanitizing once.
#[must_use]
pub fn sanitize_addresses(text: &str, target: &str) -> String {
    let target_lower = target.to_lowercase();
    let mut cache: HashMap<&str, String> = HashMap::new();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in ADDRESS_PATTERN.find_iter(text) {
        out.push_str(&text[last..found.start()]);
        let addr = found.as_str();
        let replacement = cache
            .entry(addr)
            .or_insert_with(|| display_form(addr, &target_lower));
        out.push_str(replacement);
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Rewrite the known marker misspelling to the canonical marker.
#[must_use]
pub fn normalize_marker_typos(text: &str) -> String {
    text.replace(MARKER_TYPO, TARGET_MARKER)
}

/// `true` when `value` is exactly one address-shaped token.
#[must_use]
pub fn is_address(value: &str) -> bool {
    ADDRESS_PATTERN
        .find(value)
        .is_some_and(|found| found.start() == 0 && found.end() == value.len())
}

fn display_form(addr: &str, target_lower: &str) -> String {
    if addr.to_lowercase() == target_lower {
        TARGET_MARKER.to_string()
    } else {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    }
}
