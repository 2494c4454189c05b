/// Common test utilities and helpers for greprepos tests
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use greprepos::api::{
    BranchHead, FileContent, GitHubApi, PullRequestSummary, RateLimit, RepoListing, RepoSnapshot,
};
use greprepos::ApiError;

pub const ORG: &str = "acme";
pub const DEFAULT_CONTRIBUTING: &str = "# Contributing\n\nOpen an issue before sending a PR.\n";

/// Repository fixture for the in-memory GitHub
#[derive(Debug, Clone)]
pub struct MockRepository {
    pub snapshot: RepoSnapshot,
    pub branches: Vec<String>,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub commits: u64,
    pub files: HashMap<String, FileContent>,
    pub has_license: bool,
    pub teams: Option<Vec<String>>,
    pub pulls: Vec<PullRequestSummary>,
}

impl MockRepository {
    pub fn new(name: &str) -> Self {
        Self {
            snapshot: RepoSnapshot {
                name: name.to_string(),
                archived: false,
                private: false,
                fork: false,
                created_at: timestamp("2020-01-01T00:00:00Z"),
                pushed_at: Some(timestamp("2024-03-01T12:00:00Z")),
                default_branch: "main".to_string(),
                topics: Vec::new(),
                forks_count: 0,
                open_issues_count: 0,
            },
            branches: vec!["main".to_string()],
            last_commit_at: Some(timestamp("2024-03-01T11:59:00Z")),
            commits: 10,
            files: HashMap::new(),
            has_license: false,
            teams: Some(Vec::new()),
            pulls: Vec::new(),
        }
    }

    pub fn archived(mut self) -> Self {
        self.snapshot.archived = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.snapshot.private = true;
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files
            .insert(path.to_string(), FileContent::File(content.to_string()));
        self
    }

    pub fn with_directory(mut self, path: &str) -> Self {
        self.files.insert(path.to_string(), FileContent::Directory);
        self
    }

    /// Branch list; the default branch becomes the first entry
    pub fn with_branches(mut self, branches: &[&str]) -> Self {
        self.branches = branches.iter().map(|b| b.to_string()).collect();
        if let Some(first) = branches.first() {
            self.snapshot.default_branch = first.to_string();
        }
        self
    }

    /// No branches at all, like a freshly created repository
    pub fn empty(mut self) -> Self {
        self.branches.clear();
        self.commits = 0;
        self.last_commit_at = None;
        self.snapshot.pushed_at = None;
        self
    }

    pub fn with_license(mut self) -> Self {
        self.has_license = true;
        self
    }

    pub fn with_teams(mut self, teams: &[&str]) -> Self {
        self.teams = Some(teams.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_hidden_teams(mut self) -> Self {
        self.teams = None;
        self
    }

    pub fn with_topics(mut self, topics: &[&str]) -> Self {
        self.snapshot.topics = topics.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_pull(mut self, title: &str, author: &str) -> Self {
        self.pulls.push(PullRequestSummary {
            title: title.to_string(),
            author: author.to_string(),
        });
        self
    }

    pub fn with_counts(mut self, commits: u64, forks: u64, open_issues: u64) -> Self {
        self.commits = commits;
        self.snapshot.forks_count = forks;
        self.snapshot.open_issues_count = open_issues;
        self
    }
}

/// In-memory organization implementing [`GitHubApi`]
pub struct MockGitHub {
    listed: Vec<MockRepository>,
    unlisted: Vec<MockRepository>,
    total_count: Option<usize>,
    rate_limited_branch_calls: AtomicUsize,
    reset_in: Duration,
    pub branch_calls: AtomicUsize,
    pub rate_limit_calls: AtomicUsize,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self {
            listed: Vec::new(),
            unlisted: Vec::new(),
            total_count: None,
            rate_limited_branch_calls: AtomicUsize::new(0),
            reset_in: Duration::seconds(30),
            branch_calls: AtomicUsize::new(0),
            rate_limit_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_repo(mut self, repo: MockRepository) -> Self {
        self.listed.push(repo);
        self
    }

    /// Defaults repository reachable by name but absent from the listing
    pub fn with_defaults_repo(mut self, repo: MockRepository) -> Self {
        self.unlisted.push(repo);
        self
    }

    /// Report a total that disagrees with the repositories actually listed
    pub fn with_total_count(mut self, total: usize) -> Self {
        self.total_count = Some(total);
        self
    }

    /// Fail the next `calls` default-branch lookups with a rate-limit error
    pub fn rate_limited_for(self, calls: usize) -> Self {
        self.rate_limited_branch_calls.store(calls, Ordering::SeqCst);
        self
    }

    pub fn with_reset_in(mut self, reset_in: Duration) -> Self {
        self.reset_in = reset_in;
        self
    }

    fn repo(&self, owner: &str, repo: &str) -> Result<&MockRepository, ApiError> {
        if owner != ORG {
            return Err(ApiError::NotFound(format!("organization {}", owner)));
        }
        self.listed
            .iter()
            .chain(self.unlisted.iter())
            .find(|r| r.snapshot.name == repo)
            .ok_or_else(|| ApiError::NotFound(format!("{}/{}", owner, repo)))
    }
}

impl Default for MockGitHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitHubApi for MockGitHub {
    async fn list_org_repositories(&self, org: &str) -> Result<RepoListing, ApiError> {
        if org != ORG {
            return Err(ApiError::NotFound(format!("organization {}", org)));
        }
        Ok(RepoListing {
            total_count: self.total_count.unwrap_or(self.listed.len()),
            repositories: self.listed.iter().map(|r| r.snapshot.clone()).collect(),
        })
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Option<RepoSnapshot>, ApiError> {
        match self.repo(owner, repo) {
            Ok(r) => Ok(Some(r.snapshot.clone())),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Option<BranchHead>, ApiError> {
        self.branch_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.rate_limited_branch_calls.load(Ordering::SeqCst);
        if pending > 0 {
            self.rate_limited_branch_calls.store(pending - 1, Ordering::SeqCst);
            return Err(ApiError::RateLimited("API rate limit exceeded".to_string()));
        }

        let r = self.repo(owner, repo)?;
        Ok(r.branches.iter().any(|b| b == branch).then(|| BranchHead {
            name: branch.to_string(),
            last_commit_at: r.last_commit_at,
        }))
    }

    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError> {
        Ok(self.repo(owner, repo)?.branches.clone())
    }

    async fn count_commits(&self, owner: &str, repo: &str, _branch: &str) -> Result<u64, ApiError> {
        Ok(self.repo(owner, repo)?.commits)
    }

    async fn get_contents(&self, owner: &str, repo: &str, path: &str) -> Result<Option<FileContent>, ApiError> {
        Ok(self.repo(owner, repo)?.files.get(path).cloned())
    }

    async fn has_license(&self, owner: &str, repo: &str) -> Result<bool, ApiError> {
        Ok(self.repo(owner, repo)?.has_license)
    }

    async fn list_teams(&self, owner: &str, repo: &str) -> Result<Option<Vec<String>>, ApiError> {
        Ok(self.repo(owner, repo)?.teams.clone())
    }

    async fn list_open_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullRequestSummary>, ApiError> {
        Ok(self.repo(owner, repo)?.pulls.clone())
    }

    async fn rate_limit(&self) -> Result<RateLimit, ApiError> {
        self.rate_limit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RateLimit {
            remaining: 0,
            reset_at: Utc::now() + self.reset_in,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

