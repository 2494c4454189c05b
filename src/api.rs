//! Remote collaborator abstraction
//!
//! The collector only talks to GitHub through [`GitHubApi`], so the audit logic
//! can run against the real REST API ([`GitHubClient`](crate::GitHubClient)) or
//! an in-memory fake in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;

/// Snapshot of one repository as returned by the organization listing
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSnapshot {
    /// Repository name (e.g., "greprepos")
    pub name: String,

    #[serde(default)]
    pub archived: bool,

    #[serde(default)]
    pub private: bool,

    #[serde(default)]
    pub fork: bool,

    pub created_at: DateTime<Utc>,

    /// Null for repositories that never received a push
    pub pushed_at: Option<DateTime<Utc>>,

    pub default_branch: String,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub forks_count: u64,

    /// Includes open pull requests, as reported by GitHub
    #[serde(default)]
    pub open_issues_count: u64,
}

/// Every repository of an organization together with the total the listing reported
#[derive(Debug, Clone, Default)]
pub struct RepoListing {
    pub total_count: usize,
    pub repositories: Vec<RepoSnapshot>,
}

/// Head of a branch
#[derive(Debug, Clone)]
pub struct BranchHead {
    pub name: String,
    pub last_commit_at: Option<DateTime<Utc>>,
}

/// Result of looking up a path inside a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    File(String),
    Directory,
}

/// An open pull request
#[derive(Debug, Clone)]
pub struct PullRequestSummary {
    pub title: String,
    pub author: String,
}

/// Core API quota
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Operations the audit needs from GitHub
///
/// Lookups whose absence is expected return `Ok(None)` instead of
/// [`ApiError::NotFound`]; errors are reserved for real failures and for
/// [`ApiError::RateLimited`], which the rate-limit guard acts on.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// List all repositories of an organization, following pagination
    async fn list_org_repositories(&self, org: &str) -> Result<RepoListing, ApiError>;

    /// Look up a single repository
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Option<RepoSnapshot>, ApiError>;

    /// Head of a branch, or `None` when the branch does not exist (empty repository)
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Option<BranchHead>, ApiError>;

    /// Names of all branches
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError>;

    /// Number of commits reachable from `branch`
    async fn count_commits(&self, owner: &str, repo: &str, branch: &str) -> Result<u64, ApiError>;

    /// Contents of `path`, or `None` when it does not exist
    async fn get_contents(&self, owner: &str, repo: &str, path: &str) -> Result<Option<FileContent>, ApiError>;

    /// Whether GitHub detected a license file
    async fn has_license(&self, owner: &str, repo: &str) -> Result<bool, ApiError>;

    /// Team names with access, or `None` when the team list is not visible
    async fn list_teams(&self, owner: &str, repo: &str) -> Result<Option<Vec<String>>, ApiError>;

    /// All open pull requests
    async fn list_open_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullRequestSummary>, ApiError>;

    /// Current core quota
    async fn rate_limit(&self) -> Result<RateLimit, ApiError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
