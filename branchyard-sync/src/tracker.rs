//! Blocking HTTP clients for the issue tracker and the deployed-hash page.
//!
//! Both are traits so reports can be produced without the network in tests.
//! Failures are [`FetchError`]s; callers degrade instead of aborting.

use std::collections::HashMap;
use std::time::Duration;

use branchyard_core::config::TrackerConfig;
use branchyard_core::IssueDetails;

use crate::error::FetchError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("branchyard/", env!("CARGO_PKG_VERSION"));

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}

// ---------------------------------------------------------------------------
// Issue tracker
// ---------------------------------------------------------------------------

pub trait IssueTracker {
    fn issue(&self, id: u64) -> Result<IssueDetails, FetchError>;
}

/// `GET <api_url><id>` with the `X-TrackerToken` header.
pub struct HttpTracker {
    agent: ureq::Agent,
    api_url: String,
    token: String,
}

impl HttpTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            agent: agent(),
            api_url: config.api_url.clone(),
            token: config.token.clone(),
        }
    }
}

impl IssueTracker for HttpTracker {
    fn issue(&self, id: u64) -> Result<IssueDetails, FetchError> {
        let url = format!("{}{id}", self.api_url);
        tracing::debug!("GET {url}");
        let resp = self
            .agent
            .get(&url)
            .set("X-TrackerToken", &self.token)
            .call()
            .map_err(|e| FetchError::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;
        resp.into_json::<IssueDetails>().map_err(|e| FetchError::Body {
            url,
            message: e.to_string(),
        })
    }
}

/// Per-run memo of tracker answers, failures included, so each issue id is
/// requested at most once.
pub struct TrackerCache<'a> {
    tracker: &'a dyn IssueTracker,
    seen: HashMap<u64, Option<IssueDetails>>,
}

impl<'a> TrackerCache<'a> {
    pub fn new(tracker: &'a dyn IssueTracker) -> Self {
        Self {
            tracker,
            seen: HashMap::new(),
        }
    }

    pub fn lookup(&mut self, id: u64) -> Option<IssueDetails> {
        let tracker = self.tracker;
        self.seen
            .entry(id)
            .or_insert_with(|| match tracker.issue(id) {
                Ok(details) => Some(details),
                Err(err) => {
                    tracing::warn!("issue #{id} not enriched: {err}");
                    None
                }
            })
            .clone()
    }

    pub fn status(&mut self, id: u64) -> Option<String> {
        self.lookup(id)
            .map(|d| d.status())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Deployed hash
// ---------------------------------------------------------------------------

pub trait DeployedHashSource {
    /// Hash of the currently deployed commit, trimmed and non-empty.
    fn deployed_hash(&self) -> Result<String, FetchError>;
}

/// Plain-text hash served at a fixed URL.
pub struct HttpDeployedHash {
    agent: ureq::Agent,
    url: String,
}

impl HttpDeployedHash {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            url: url.into(),
        }
    }
}

impl DeployedHashSource for HttpDeployedHash {
    fn deployed_hash(&self) -> Result<String, FetchError> {
        tracing::debug!("GET {}", self.url);
        let body = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| FetchError::Http {
                url: self.url.clone(),
                message: e.to_string(),
            })?
            .into_string()
            .map_err(|e| FetchError::Body {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        non_empty_hash(&body).ok_or_else(|| FetchError::Empty {
            url: self.url.clone(),
        })
    }
}

pub(crate) fn non_empty_hash(body: &str) -> Option<String> {
    let hash = body.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}
