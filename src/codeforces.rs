//! Codeforces problem metadata lookup.
//!
//! A problem link of the form `.../problemset/problem/<contest>/<index>` is
//! resolved against the public problemset listing. The listing is fetched at
//! most once per client.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use codetrack_core::ProblemMetadata;

pub const PROBLEMSET_URL: &str = "https://codeforces.com/api/problemset.problems";

/// Rating stored for problems the API lists without one.
pub const UNRATED: &str = "Unrated";

const LINK_MARKER: &str = "problemset/problem/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRef {
    pub contest: u32,
    pub index: String,
}

/// Contest id and problem index from a problemset link. `None` for anything
/// else, including contest-scoped links.
pub fn parse_problem_link(link: &str) -> Option<ProblemRef> {
    let start = link.find(LINK_MARKER)? + LINK_MARKER.len();
    let (contest, rest) = link[start..].split_once('/')?;
    if contest.is_empty() || !contest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if index.is_empty() {
        return None;
    }
    Some(ProblemRef {
        contest: contest.parse().ok()?,
        index,
    })
}

/// Metadata source for imported problems.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// `Ok(None)` when the problem is not listed.
    async fn fetch(&self, problem: &ProblemRef) -> Result<Option<ProblemMetadata>>;
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Option<ProblemsetResult>,
}

#[derive(Debug, Deserialize)]
struct ProblemsetResult {
    problems: Vec<ApiProblem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProblem {
    #[serde(default)]
    contest_id: Option<u32>,
    index: String,
    name: String,
    #[serde(default)]
    rating: Option<u32>,
    #[serde(default)]
    tags: Vec<String>,
}

impl ApiProblem {
    fn matches(&self, problem: &ProblemRef) -> bool {
        self.contest_id == Some(problem.contest) && self.index == problem.index
    }

    fn metadata(&self) -> ProblemMetadata {
        ProblemMetadata {
            title: Some(self.name.clone()),
            rating: Some(self.rating.map_or_else(|| UNRATED.to_string(), |r| r.to_string())),
            tags: self.tags.clone(),
        }
    }
}

fn problems_from_body(body: &str) -> Result<Vec<ApiProblem>> {
    let envelope: ApiEnvelope = serde_json::from_str(body).context("malformed problemset response")?;
    if envelope.status != "OK" {
        bail!(
            "problemset request rejected: {}",
            envelope.comment.as_deref().unwrap_or(&envelope.status)
        );
    }
    envelope
        .result
        .map(|r| r.problems)
        .context("problemset response has no result")
}

/// Fetcher backed by `reqwest` against the Codeforces API.
pub struct CodeforcesClient {
    client: reqwest::Client,
    url: String,
    problems: OnceCell<Vec<ApiProblem>>,
}

impl CodeforcesClient {
    pub fn new() -> Self {
        Self::with_url(PROBLEMSET_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(concat!("codetrack/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            url: url.into(),
            problems: OnceCell::new(),
        }
    }

    async fn problemset(&self) -> Result<&[ApiProblem]> {
        let problems = self
            .problems
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(&self.url)
                    .send()
                    .await
                    .with_context(|| format!("request to {} failed", self.url))?;
                let body = response.text().await.context("failed to read problemset body")?;
                let problems = problems_from_body(&body)?;
                debug!(count = problems.len(), "problemset loaded");
                Ok::<_, anyhow::Error>(problems)
            })
            .await?;
        Ok(problems)
    }
}

impl Default for CodeforcesClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for CodeforcesClient {
    async fn fetch(&self, problem: &ProblemRef) -> Result<Option<ProblemMetadata>> {
        let problems = self.problemset().await?;
        Ok(problems.iter().find(|p| p.matches(problem)).map(ApiProblem::metadata))
    }
}

/// Canned fetcher for tests. Unknown problems are unlisted; a contest in
/// `failing` returns an error.
#[cfg(test)]
#[derive(Default)]
pub struct MockFetcher {
    listed: Vec<(ProblemRef, ProblemMetadata)>,
    failing: Vec<u32>,
    calls: parking_lot::Mutex<Vec<ProblemRef>>,
}

#[cfg(test)]
impl MockFetcher {
    pub fn with(mut self, contest: u32, index: &str, metadata: ProblemMetadata) -> Self {
        self.listed.push((
            ProblemRef {
                contest,
                index: index.into(),
            },
            metadata,
        ));
        self
    }

    pub fn failing(mut self, contest: u32) -> Self {
        self.failing.push(contest);
        self
    }

    pub fn calls(&self) -> Vec<ProblemRef> {
        self.calls.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl MetadataFetcher for MockFetcher {
    async fn fetch(&self, problem: &ProblemRef) -> Result<Option<ProblemMetadata>> {
        self.calls.lock().push(problem.clone());
        if self.failing.contains(&problem.contest) {
            bail!("connection reset");
        }
        Ok(self
            .listed
            .iter()
            .find(|(r, _)| r == problem)
            .map(|(_, m)| m.clone()))
    }
}
