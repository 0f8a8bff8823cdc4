//! Paginated code-search fetching against the GitHub search API.
//!
//! The fetcher owns two distinct recovery policies: a rate-limit signal
//! (HTTP 403 with zero remaining quota) waits and re-issues the *same*
//! request with unbounded patience, while any other transient failure is
//! retried with bounded exponential backoff. Exhausted retries degrade to
//! whatever has been accumulated so far; nothing here fails the batch.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GithubConfig;
use crate::error::{Result, ScoutError};
use crate::models::SearchHit;

/// Extra wait on top of the server-reported quota reset.
const RATE_LIMIT_BUFFER_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: String,
    pub per_page: u32,
    pub page: u32,
}

#[derive(Debug, Clone)]
pub enum PageResponse {
    Ok(Value),
    RateLimited { retry_after: Duration },
    Failed { status: Option<u16>, message: String },
}

/// Seam between the fetch state machine and the wire, so recovery behavior
/// can be driven by a scripted transport in tests.
pub trait SearchTransport {
    fn fetch_page(&mut self, request: &PageRequest) -> PageResponse;
    fn wait(&mut self, delay: Duration);
}

pub struct HttpSearchTransport {
    http: Client,
    base_url: String,
    rate_limit_fallback: Duration,
}

impl std::fmt::Debug for HttpSearchTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSearchTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpSearchTransport {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3.text-match+json"),
        );
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|e| ScoutError::Validation(format!("invalid GITHUB_TOKEN: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .user_agent("hexscout")
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limit_fallback: Duration::from_secs(config.rate_limit_fallback_secs),
        })
    }
}

impl SearchTransport for HttpSearchTransport {
    fn fetch_page(&mut self, request: &PageRequest) -> PageResponse {
        let url = format!("{}/search/code", self.base_url);
        let sent = self
            .http
            .get(url)
            .query(&[
                ("q", request.query.clone()),
                ("per_page", request.per_page.to_string()),
                ("page", request.page.to_string()),
            ])
            .send();

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                return PageResponse::Failed {
                    status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status.as_u16() == 403 && quota_exhausted(response.headers()) {
            return PageResponse::RateLimited {
                retry_after: reset_delay(response.headers(), self.rate_limit_fallback),
            };
        }
        if !status.is_success() {
            return PageResponse::Failed {
                status: Some(status.as_u16()),
                message: format!("search request failed with status {status}"),
            };
        }

        match response.json::<Value>() {
            Ok(body) => PageResponse::Ok(body),
            Err(e) => PageResponse::Failed {
                status: None,
                message: format!("invalid search response body: {e}"),
            },
        }
    }

    fn wait(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

fn quota_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .is_some_and(|remaining| remaining == 0)
}

/// Delay until the server-reported quota reset, plus a small buffer.
fn reset_delay(headers: &HeaderMap, fallback: Duration) -> Duration {
    let reset_epoch = headers
        .get("x-ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let Some(reset_epoch) = reset_epoch else {
        return fallback;
    };

    let now_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    Duration::from_secs(reset_epoch.saturating_sub(now_epoch).max(1) + RATE_LIMIT_BUFFER_SECS)
}

pub struct CodeSearchFetcher<T> {
    transport: T,
    config: GithubConfig,
}

impl<T: SearchTransport> CodeSearchFetcher<T> {
    pub fn new(transport: T, config: GithubConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Collect hits for `query` across all available pages, best-effort.
    ///
    /// Repository identity is unique in the result: the first fragment-
    /// bearing item per repository wins, later items for the same repository
    /// are dropped. A short page means the service has no further pages.
    /// `total_count` is deliberately not used to force deeper pagination, so
    /// very popular queries undercount; that mirrors the upstream cap.
    pub fn search(&mut self, query: &str) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = Vec::new();
        let mut seen_repos: HashSet<String> = HashSet::new();
        let mut page = 1u32;

        loop {
            let request = PageRequest {
                query: query.to_string(),
                per_page: self.config.per_page,
                page,
            };
            let Some(body) = self.fetch_with_recovery(&request) else {
                break;
            };

            let parsed = parse_search_page(&body, &self.config.excluded_repos);
            debug!(
                page,
                items = parsed.item_count,
                repos = parsed.hits.len(),
                "fetched search page"
            );
            for hit in parsed.hits {
                if seen_repos.insert(hit.repo_name.clone()) {
                    hits.push(hit);
                }
            }

            // An empty page is terminal no matter what per_page says.
            if parsed.item_count == 0 || parsed.item_count < self.config.per_page as usize {
                break;
            }
            page += 1;
        }

        hits
    }

    /// Issue one page request, absorbing rate limits (wait, retry the same
    /// request, forever) and transient failures (bounded backoff). `None`
    /// means retries were exhausted.
    fn fetch_with_recovery(&mut self, request: &PageRequest) -> Option<Value> {
        let mut attempt = 0u32;
        loop {
            match self.transport.fetch_page(request) {
                PageResponse::Ok(body) => return Some(body),
                PageResponse::RateLimited { retry_after } => {
                    warn!(
                        page = request.page,
                        wait_secs = retry_after.as_secs(),
                        "search rate limit exhausted, waiting"
                    );
                    self.transport.wait(retry_after);
                }
                PageResponse::Failed { status, message } => {
                    attempt += 1;
                    if attempt >= self.config.max_attempts {
                        warn!(
                            page = request.page,
                            attempts = attempt,
                            status,
                            "search request failed, keeping partial results: {message}"
                        );
                        return None;
                    }
                    let delay = Duration::from_millis(
                        self.config.backoff_base_ms.saturating_mul(1u64 << attempt.min(16)),
                    );
                    debug!(
                        page = request.page,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient search failure, backing off: {message}"
                    );
                    self.transport.wait(delay);
                }
            }
        }
    }
}

pub(crate) struct ParsedPage {
    pub(crate) hits: Vec<SearchHit>,
    /// Raw item count before exclusion, used to decide whether to advance.
    pub(crate) item_count: usize,
}

/// Extract repository hits from one search page. A malformed body parses as
/// an empty page rather than an error.
pub(crate) fn parse_search_page(body: &Value, excluded_repos: &[String]) -> ParsedPage {
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        return ParsedPage {
            hits: Vec::new(),
            item_count: 0,
        };
    };

    let mut hits = Vec::new();
    for item in items {
        let repo = item.get("repository");
        let Some(repo_name) = repo
            .and_then(|r| r.get("full_name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        if is_excluded_repo(repo_name, excluded_repos) {
            continue;
        }

        let fragments = item
            .get("text_matches")
            .and_then(Value::as_array)
            .map(|matches| {
                matches
                    .iter()
                    .filter_map(|m| m.get("fragment").and_then(Value::as_str))
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        hits.push(SearchHit {
            repo_name: repo_name.to_string(),
            file_path: item
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            file_url: item
                .get("html_url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: repo
                .and_then(|r| r.get("description"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
            stars: repo
                .and_then(|r| r.get("stargazers_count"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
            fragments,
        });
    }

    ParsedPage {
        hits,
        item_count: items.len(),
    }
}

/// Denylist match: entries ending in `/` match as owner prefixes, anything
/// else matches the full name exactly.
pub(crate) fn is_excluded_repo(repo_name: &str, excluded_repos: &[String]) -> bool {
    excluded_repos.iter().any(|entry| {
        if entry.ends_with('/') {
            repo_name.starts_with(entry.as_str())
        } else {
            repo_name == entry
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;

    struct ScriptedTransport {
        responses: VecDeque<PageResponse>,
        requests: Vec<PageRequest>,
        waits: Vec<Duration>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<PageResponse>) -> Self {
            Self {
                responses: responses.into(),
                requests: Vec::new(),
                waits: Vec::new(),
            }
        }
    }

    impl SearchTransport for ScriptedTransport {
        fn fetch_page(&mut self, request: &PageRequest) -> PageResponse {
            self.requests.push(request.clone());
            self.responses.pop_front().unwrap_or(PageResponse::Failed {
                status: None,
                message: "script exhausted".to_string(),
            })
        }

        fn wait(&mut self, delay: Duration) {
            self.waits.push(delay);
        }
    }

    fn config(per_page: u32) -> GithubConfig {
        GithubConfig {
            per_page,
            backoff_base_ms: 10,
            ..GithubConfig::default()
        }
    }

    fn item(repo_name: &str, fragment: &str) -> Value {
        json!({
            "path": "contracts/Token.sol",
            "html_url": format!("https://github.com/{repo_name}/blob/main/contracts/Token.sol"),
            "repository": {
                "full_name": repo_name,
                "description": "token contracts",
                "stargazers_count": 12,
            },
            "text_matches": [{"fragment": fragment}],
        })
    }

    fn page(items: Vec<Value>) -> PageResponse {
        PageResponse::Ok(json!({"total_count": items.len(), "items": items}))
    }

    #[test]
    fn rate_limit_retries_the_identical_request_after_waiting() {
        let transport = ScriptedTransport::new(vec![
            PageResponse::RateLimited {
                retry_after: Duration::from_secs(7),
            },
            page(vec![item("octocat/demo", "let x = target;")]),
        ]);
        let mut fetcher = CodeSearchFetcher::new(transport, config(10));

        let hits = fetcher.search("0xabc");
        assert_eq!(hits.len(), 1);

        let requests = &fetcher.transport.requests;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
        assert_eq!(fetcher.transport.waits, vec![Duration::from_secs(7)]);
    }

    #[test]
    fn duplicate_repository_across_pages_yields_one_hit() {
        let transport = ScriptedTransport::new(vec![
            page(vec![
                item("octocat/demo", "first fragment"),
                item("other/repo", "other fragment"),
            ]),
            page(vec![item("octocat/demo", "second fragment")]),
        ]);
        let mut fetcher = CodeSearchFetcher::new(transport, config(2));

        let hits = fetcher.search("0xabc");
        assert_eq!(hits.len(), 2);
        let demo = hits.iter().find(|h| h.repo_name == "octocat/demo").unwrap();
        assert_eq!(demo.fragments, vec!["first fragment".to_string()]);
    }

    #[test]
    fn short_page_stops_pagination() {
        let transport = ScriptedTransport::new(vec![page(vec![item("octocat/demo", "frag")])]);
        let mut fetcher = CodeSearchFetcher::new(transport, config(10));

        let hits = fetcher.search("0xabc");
        assert_eq!(hits.len(), 1);
        assert_eq!(fetcher.transport.requests.len(), 1);
    }

    #[test]
    fn empty_page_stops_pagination_even_when_per_page_is_zero() {
        let transport = ScriptedTransport::new(vec![page(vec![])]);
        let mut fetcher = CodeSearchFetcher::new(transport, config(0));

        let hits = fetcher.search("0xabc");
        assert!(hits.is_empty());
        assert_eq!(fetcher.transport.requests.len(), 1);
    }

    #[test]
    fn transient_failures_back_off_then_keep_partial_results() {
        let failed = || PageResponse::Failed {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        let transport = ScriptedTransport::new(vec![
            page(vec![
                item("octocat/demo", "frag a"),
                item("other/repo", "frag b"),
            ]),
            failed(),
            failed(),
            failed(),
        ]);
        let mut fetcher = CodeSearchFetcher::new(transport, config(2));

        let hits = fetcher.search("0xabc");
        // Page two never succeeded; page one's hits survive.
        assert_eq!(hits.len(), 2);
        // Two backoff waits before giving up on the third attempt, doubling.
        assert_eq!(
            fetcher.transport.waits,
            vec![Duration::from_millis(20), Duration::from_millis(40)]
        );
    }

    #[test]
    fn malformed_body_counts_as_an_empty_page() {
        let transport =
            ScriptedTransport::new(vec![PageResponse::Ok(json!({"unexpected": true}))]);
        let mut fetcher = CodeSearchFetcher::new(transport, config(10));
        assert!(fetcher.search("0xabc").is_empty());
    }

    #[test]
    fn parse_search_page_extracts_hit_fields() {
        let body = json!({
            "total_count": 1,
            "items": [item("octocat/demo", "mapping(address => uint256) balances;")],
        });
        let parsed = parse_search_page(&body, &[]);
        assert_eq!(parsed.item_count, 1);
        assert_eq!(parsed.hits.len(), 1);
        let hit = &parsed.hits[0];
        assert_eq!(hit.repo_name, "octocat/demo");
        assert_eq!(hit.file_path, "contracts/Token.sol");
        assert_eq!(hit.description.as_deref(), Some("token contracts"));
        assert_eq!(hit.stars, 12);
        assert_eq!(
            hit.fragments,
            vec!["mapping(address => uint256) balances;".to_string()]
        );
    }

    #[test]
    fn parse_search_page_skips_items_without_repository_identity() {
        let body = json!({
            "items": [
                {"path": "a.sol", "repository": {}},
                item("octocat/demo", "frag"),
            ],
        });
        let parsed = parse_search_page(&body, &[]);
        assert_eq!(parsed.item_count, 2);
        assert_eq!(parsed.hits.len(), 1);
    }

    #[test]
    fn excluded_repositories_never_enter_the_accumulator() {
        let excluded = vec!["tangtj/".to_string(), "octocat/demo".to_string()];
        let body = json!({
            "items": [
                item("octocat/demo", "frag"),
                item("tangtj/bsc-contract-database", "frag"),
                item("kept/repo", "frag"),
            ],
        });
        let parsed = parse_search_page(&body, &excluded);
        assert_eq!(parsed.hits.len(), 1);
        assert_eq!(parsed.hits[0].repo_name, "kept/repo");
    }

    #[test]
    fn exclusion_distinguishes_owner_prefix_from_exact_match() {
        let excluded = vec!["tangtj/".to_string(), "octocat/demo".to_string()];
        assert!(is_excluded_repo("tangtj/anything", &excluded));
        assert!(is_excluded_repo("octocat/demo", &excluded));
        assert!(!is_excluded_repo("octocat/demo-fork", &excluded));
    }

    #[test]
    fn reset_delay_falls_back_when_header_is_missing() {
        let headers = HeaderMap::new();
        assert_eq!(
            reset_delay(&headers, Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn quota_exhausted_requires_zero_remaining() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("3"));
        assert!(!quota_exhausted(&headers));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        assert!(quota_exhausted(&headers));
    }
}
