//! Tuning knobs for the evidence pipeline.
//!
//! Every empirical constant (scoring weights, similarity threshold, window
//! sizes) lives here as a named field with an env override, so the selection
//! policy can be tuned without touching the algorithms.

const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
const ENV_SEARCH_BASE_URL: &str = "HEXSCOUT_SEARCH_URL";
const ENV_PER_PAGE: &str = "HEXSCOUT_PER_PAGE";
const ENV_TIMEOUT_MS: &str = "HEXSCOUT_TIMEOUT_MS";
const ENV_EXCLUDED_REPOS: &str = "HEXSCOUT_EXCLUDED_REPOS";
const ENV_MAX_SNIPPETS: &str = "HEXSCOUT_MAX_SNIPPETS";
const ENV_MAX_SNIPPET_CHARS: &str = "HEXSCOUT_MAX_SNIPPET_CHARS";
const ENV_SIMILARITY_THRESHOLD: &str = "HEXSCOUT_SIMILARITY_THRESHOLD";

const DEFAULT_SEARCH_BASE_URL: &str = "https://api.github.com";
const DEFAULT_PER_PAGE: u32 = 100;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
const DEFAULT_RATE_LIMIT_FALLBACK_SECS: u64 = 10;

/// Repositories known to mirror raw contract dumps; their hits are pure noise.
/// A trailing `/` marks an owner prefix, anything else is an exact match.
const DEFAULT_EXCLUDED_REPOS: &[&str] = &[
    "HelayLiu/utils_download",
    "KeystoneHQ/Smart-Contract-Metadata-Registry",
    "tangtj/",
    "0xtorch/datasource",
    "fireblocks/recovery",
    "enzymefinance/sdk",
    "MyEtherWallet/ethereum-lists",
];

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub per_page: u32,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub rate_limit_fallback_secs: u64,
    pub excluded_repos: Vec<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            token: None,
            per_page: DEFAULT_PER_PAGE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            rate_limit_fallback_secs: DEFAULT_RATE_LIMIT_FALLBACK_SECS,
            excluded_repos: DEFAULT_EXCLUDED_REPOS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl GithubConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self {
            token: read_non_empty_env(ENV_GITHUB_TOKEN),
            ..Self::default()
        };
        if let Some(base_url) = read_non_empty_env(ENV_SEARCH_BASE_URL) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(per_page) = read_env_u32(ENV_PER_PAGE).filter(|value| *value > 0) {
            config.per_page = per_page;
        }
        if let Some(timeout_ms) = read_env_u64(ENV_TIMEOUT_MS) {
            config.timeout_ms = timeout_ms;
        }
        if let Some(raw) = read_non_empty_env(ENV_EXCLUDED_REPOS) {
            config.excluded_repos = raw
                .split(',')
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect();
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    /// LCS ratio at or above which two normalized snippets count as duplicates.
    pub threshold: f64,
    /// Below this normalized length, only exact equality counts as similar.
    pub min_fuzzy_len: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            min_fuzzy_len: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Snippets shorter than this after trimming are discarded outright.
    pub min_snippet_len: usize,
    /// Characters needed for the length component to saturate at 1.0.
    pub length_cap: f64,
    /// Bonus for a declaration-like pattern (`function Foo`, `contract Bar`).
    pub declaration_bonus: f64,
    /// Bonus for containing the sanitizer's marker token.
    pub marker_bonus: f64,
    /// Hard cap applied after deduplication.
    pub max_snippets: usize,
    pub similarity: SimilarityConfig,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_snippet_len: 10,
            length_cap: 1000.0,
            declaration_bonus: 0.5,
            marker_bonus: 0.3,
            max_snippets: 10,
            similarity: SimilarityConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Maximum compressed snippet length in characters, ellipsis excluded.
    pub max_chars: usize,
    /// Seed window lines kept above the marker line.
    pub context_before: usize,
    /// Seed window lines kept below the marker line (exclusive bound).
    pub context_after: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_chars: 400,
            context_before: 2,
            context_after: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub github: GithubConfig,
    pub compression: CompressionConfig,
    pub selection: SelectionConfig,
}

impl PipelineConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self {
            github: GithubConfig::from_env(),
            ..Self::default()
        };
        if let Some(max_snippets) = read_env_usize(ENV_MAX_SNIPPETS) {
            config.selection.max_snippets = max_snippets;
        }
        if let Some(max_chars) = read_env_usize(ENV_MAX_SNIPPET_CHARS).filter(|value| *value > 0) {
            config.compression.max_chars = max_chars;
        }
        if let Some(threshold) = read_env_f64(ENV_SIMILARITY_THRESHOLD)
            .filter(|value| (0.0..=1.0).contains(value))
        {
            config.selection.similarity.threshold = threshold;
        }
        config
    }
}

#[must_use]
fn read_non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
fn read_env_u32(name: &str) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
}

#[must_use]
fn read_env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
}

#[must_use]
fn read_env_usize(name: &str) -> Option<usize> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
}

#[must_use]
fn read_env_f64(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let selection = SelectionConfig::default();
        assert_eq!(selection.min_snippet_len, 10);
        assert_eq!(selection.max_snippets, 10);
        assert!((selection.declaration_bonus - 0.5).abs() < f64::EPSILON);
        assert!((selection.marker_bonus - 0.3).abs() < f64::EPSILON);

        let similarity = SimilarityConfig::default();
        assert!((similarity.threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(similarity.min_fuzzy_len, 50);

        let compression = CompressionConfig::default();
        assert_eq!(compression.max_chars, 400);
    }

    #[test]
    fn default_denylist_carries_owner_prefix_entries() {
        let config = GithubConfig::default();
        assert!(config.excluded_repos.iter().any(|entry| entry.ends_with('/')));
    }
}
