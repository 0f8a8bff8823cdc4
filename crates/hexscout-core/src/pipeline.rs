//! End-to-end evidence collection for one contract address.
//!
//! Strictly sequential: fetch, sanitize, compress, deduplicate, cap. Every
//! failure path degrades to fewer or no snippets; a batch caller never sees
//! an error from `collect`.

use tracing::info;

use crate::compress::{ContractBoundaries, compress_snippet};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::github::{CodeSearchFetcher, HttpSearchTransport, SearchTransport};
use crate::models::{EvidenceReport, RepoRecord, SearchHit};
use crate::sanitize::{TARGET_MARKER, normalize_marker_typos, sanitize_addresses};
use crate::select::{deduplicate_snippets, top_snippets};

/// Fragments containing these (lowercased) substrings are ABI dumps or
/// transaction receipts, not source evidence.
const NOISE_SUBSTRINGS: &[&str] = &["abi", "receipt", "logsbloom", "0x0000"];

/// Minimum non-padding size for a sanitized snippet to be worth compressing.
const RELEVANCE_MIN_CHARS: usize = 50;
const RELEVANCE_MIN_LINES: usize = 3;

pub struct EvidencePipeline<T> {
    fetcher: CodeSearchFetcher<T>,
    config: PipelineConfig,
}

impl EvidencePipeline<HttpSearchTransport> {
    pub fn from_env() -> Result<Self> {
        Self::from_config(PipelineConfig::from_env())
    }

    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let transport = HttpSearchTransport::new(&config.github)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: SearchTransport> EvidencePipeline<T> {
    pub fn with_transport(transport: T, config: PipelineConfig) -> Self {
        Self {
            fetcher: CodeSearchFetcher::new(transport, config.github.clone()),
            config,
        }
    }

    pub fn transport(&self) -> &T {
        self.fetcher.transport()
    }

    /// Collect, sanitize, and reduce code-search evidence for `address`.
    pub fn collect(&mut self, address: &str) -> EvidenceReport {
        let hits = self.fetcher.search(address);
        let snippets = self.reduce_fragments(&hits, address);
        let repos = rank_repositories(hits);
        info!(
            address,
            repos = repos.len(),
            snippets = snippets.len(),
            "evidence collected"
        );

        EvidenceReport {
            address: address.to_string(),
            snippets,
            repos,
        }
    }

    fn reduce_fragments(&self, hits: &[SearchHit], address: &str) -> Vec<String> {
        let mut prepared: Vec<String> = Vec::new();
        for fragment in hits.iter().flat_map(|hit| hit.fragments.iter()) {
            if is_noise_fragment(fragment) {
                continue;
            }
            let sanitized = sanitize_addresses(&normalize_marker_typos(fragment), address);
            if !passes_relevance_floor(&sanitized) {
                continue;
            }
            let compressed = compress_snippet(
                &sanitized,
                TARGET_MARKER,
                &self.config.compression,
                &ContractBoundaries,
            );
            if !compressed.is_empty() {
                prepared.push(compressed);
            }
        }

        let unique = deduplicate_snippets(&prepared, &self.config.selection);
        top_snippets(unique, self.config.selection.max_snippets)
    }
}

fn is_noise_fragment(fragment: &str) -> bool {
    let lowered = fragment.to_lowercase();
    NOISE_SUBSTRINGS
        .iter()
        .any(|needle| lowered.contains(needle))
}

fn passes_relevance_floor(snippet: &str) -> bool {
    snippet.trim().chars().count() >= RELEVANCE_MIN_CHARS
        && snippet.lines().count() >= RELEVANCE_MIN_LINES
}

/// Order repositories for downstream prompting: contract-focused names
/// first, then proxy registries, then shallower paths. Raw fragments stop
/// here; only repository metadata crosses into the report.
fn rank_repositories(hits: Vec<SearchHit>) -> Vec<RepoRecord> {
    let mut repos: Vec<RepoRecord> = hits.into_iter().map(RepoRecord::from).collect();
    repos.sort_by(|a, b| {
        repo_rank_score(&b.repo_name)
            .partial_cmp(&repo_rank_score(&a.repo_name))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| path_depth(&a.repo_name).cmp(&path_depth(&b.repo_name)))
            .then_with(|| a.repo_name.cmp(&b.repo_name))
    });
    repos
}

fn repo_rank_score(repo_name: &str) -> f64 {
    let lowered = repo_name.to_lowercase();
    let mut score = 0.0;
    if lowered.contains("contract") {
        score += 2.0;
    }
    if lowered.contains("proxy") {
        score += 1.0;
    }
    if path_depth(repo_name) < 2 {
        score += 0.5;
    }
    score
}

fn path_depth(repo_name: &str) -> usize {
    repo_name.matches('/').count()
}
