use serde::Serialize;

/// One repository-level code-search hit. Repository full name is the
/// identity: the fetcher keeps the first item seen per repository and drops
/// later ones. Stays inside the pipeline; the raw `fragments` carry
/// unsanitized addresses and must never be serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub repo_name: String,
    pub file_path: String,
    pub file_url: String,
    pub description: Option<String>,
    pub stars: u64,
    /// Raw matched text fragments, as returned by the search service.
    pub fragments: Vec<String>,
}

/// Repository metadata as it appears in a report. Built from a [`SearchHit`]
/// with the raw fragments dropped, so only sanitized snippet text can reach
/// a report consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoRecord {
    pub repo_name: String,
    pub file_path: String,
    pub file_url: String,
    pub description: Option<String>,
    pub stars: u64,
}

impl From<SearchHit> for RepoRecord {
    fn from(hit: SearchHit) -> Self {
        Self {
            repo_name: hit.repo_name,
            file_path: hit.file_path,
            file_url: hit.file_url,
            description: hit.description,
            stars: hit.stars,
        }
    }
}

/// A compressed snippet with its selection score and the normalized key used
/// for exact-duplicate detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSnippet {
    pub text: String,
    pub score: f64,
    pub key: String,
}

/// The boundary handed to downstream collaborators: bounded, sanitized
/// snippets plus the ranked repositories they came from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvidenceReport {
    pub address: String,
    pub snippets: Vec<String>,
    pub repos: Vec<RepoRecord>,
}

impl EvidenceReport {
    #[must_use]
    pub fn repo_paths(&self) -> Vec<&str> {
        self.repos.iter().map(|hit| hit.repo_name.as_str()).collect()
    }
}
