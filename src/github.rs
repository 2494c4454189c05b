use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::{Octocrab, Page};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{
    BranchHead, FileContent, GitHubApi, PullRequestSummary, RateLimit, RepoListing, RepoSnapshot,
};
use crate::config::Config;
use crate::error::ApiError;

/// Page size used for every listing endpoint
const PER_PAGE: usize = 100;

/// GitHub client wrapper speaking the REST API through octocrab
pub struct GitHubClient {
    client: Octocrab,
}

/// Items of a paginated listing plus the total GitHub reported for it
struct Paged<T> {
    items: Vec<T>,
    total_count: usize,
}

#[derive(Debug, Deserialize)]
struct BranchName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BranchDetail {
    name: String,
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Option<CommitSignature>,
}

#[derive(Debug, Deserialize)]
struct CommitSignature {
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Team {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    title: String,
    user: Option<PullRequestUser>,
}

#[derive(Debug, Deserialize)]
struct PullRequestUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: CoreRate,
}

#[derive(Debug, Deserialize)]
struct CoreRate {
    remaining: u64,
    reset: i64,
}

impl GitHubClient {
    /// Create a new GitHub client authenticated with a personal access token
    pub fn new(token: String, config: &Config) -> Result<Self> {
        let timeout = Some(config.request_timeout());

        let client = Octocrab::builder()
            .set_connect_timeout(timeout)
            .set_read_timeout(timeout)
            .personal_token(token)
            .base_uri(config.github.api_url.as_str())
            .with_context(|| format!("Invalid GitHub API URL: {}", config.github.api_url))?
            .build()
            .context("Failed to create GitHub client")?;

        info!("Using GitHub API at {}", config.github.api_url);

        Ok(Self::with_client(client))
    }

    /// Wrap an existing octocrab instance
    pub fn with_client(client: Octocrab) -> Self {
        Self { client }
    }

    /// Fetch every page of a listing endpoint.
    ///
    /// The total is derived from the page count GitHub advertises on the first
    /// page and the length of the final page, so it can disagree with the
    /// number of items collected if the listing changes mid-walk.
    async fn get_all_pages<T>(&self, route: &str, query: &[(&str, &str)]) -> Result<Paged<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page = 1usize;
        let mut reported_pages = None;

        loop {
            let mut params: Vec<(&str, String)> =
                query.iter().map(|(key, value)| (*key, value.to_string())).collect();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            let response: Page<T> = self.client.get(route, Some(&params)).await?;
            let pages = response.number_of_pages().map(|n| n as usize).unwrap_or(page);
            let reported = *reported_pages.get_or_insert(pages);
            let page_len = response.items.len();
            items.extend(response.items);

            if page_len == 0 || page >= pages {
                let total_count = if page_len == 0 && page == 1 {
                    0
                } else {
                    reported.saturating_sub(1) * PER_PAGE + page_len
                };
                debug!("{}: {} page(s), {} item(s)", route, page, items.len());
                return Ok(Paged { items, total_count });
            }
            page += 1;
        }
    }

    async fn get_one<T>(&self, route: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        Ok(self.client.get(route, None::<&()>).await?)
    }
}

/// Turn a 404 into `None`
fn found<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Decide whether a contents response for `path` is a file or a directory.
///
/// A directory comes back as a listing of its entries, all below `path`. Any
/// other single object is treated as a file: symlinks resolved to their target
/// carry the target's path, and submodules or unresolved symlinks carry no
/// content at all.
fn content_kind(path: &str, items: &[octocrab::models::repos::Content]) -> FileContent {
    let prefix = format!("{}/", path.trim_matches('/'));
    let is_listing = items
        .iter()
        .all(|item| item.path.trim_start_matches('/').starts_with(&prefix));

    match items {
        [item] if !is_listing => FileContent::File(item.decoded_content().unwrap_or_default()),
        _ => FileContent::Directory,
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_org_repositories(&self, org: &str) -> Result<RepoListing, ApiError> {
        debug!("Fetching repositories for organization: {}", org);

        let paged: Paged<RepoSnapshot> = self
            .get_all_pages(&format!("/orgs/{}/repos", org), &[("type", "all")])
            .await?;

        info!(
            "Found {} repositories for organization: {}",
            paged.items.len(),
            org
        );

        Ok(RepoListing {
            total_count: paged.total_count,
            repositories: paged.items,
        })
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Option<RepoSnapshot>, ApiError> {
        found(self.get_one(&format!("/repos/{}/{}", owner, repo)).await)
    }

    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Option<BranchHead>, ApiError> {
        let detail: Option<BranchDetail> =
            found(self.get_one(&format!("/repos/{}/{}/branches/{}", owner, repo, branch)).await)?;

        Ok(detail.map(|detail| BranchHead {
            name: detail.name,
            last_commit_at: detail.commit.commit.committer.and_then(|c| c.date),
        }))
    }

    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError> {
        let paged: Paged<BranchName> = self
            .get_all_pages(&format!("/repos/{}/{}/branches", owner, repo), &[])
            .await?;

        Ok(paged.items.into_iter().map(|b| b.name).collect())
    }

    async fn count_commits(&self, owner: &str, repo: &str, branch: &str) -> Result<u64, ApiError> {
        // One commit per page makes the advertised page count the commit count
        let params = [("sha", branch), ("per_page", "1")];
        let page: Page<serde_json::Value> = self
            .client
            .get(format!("/repos/{}/{}/commits", owner, repo), Some(&params))
            .await?;

        Ok(page
            .number_of_pages()
            .map(u64::from)
            .unwrap_or(page.items.len() as u64))
    }

    async fn get_contents(&self, owner: &str, repo: &str, path: &str) -> Result<Option<FileContent>, ApiError> {
        let result = self
            .client
            .repos(owner, repo)
            .get_content()
            .path(path)
            .send()
            .await
            .map_err(ApiError::from);

        let Some(contents) = found(result)? else {
            return Ok(None);
        };

        Ok(Some(content_kind(path, &contents.items)))
    }

    async fn has_license(&self, owner: &str, repo: &str) -> Result<bool, ApiError> {
        let license: Option<serde_json::Value> =
            found(self.get_one(&format!("/repos/{}/{}/license", owner, repo)).await)?;
        Ok(license.is_some())
    }

    async fn list_teams(&self, owner: &str, repo: &str) -> Result<Option<Vec<String>>, ApiError> {
        let paged = found(
            self.get_all_pages::<Team>(&format!("/repos/{}/{}/teams", owner, repo), &[])
                .await,
        )?;

        Ok(paged.map(|paged| paged.items.into_iter().map(|t| t.name).collect()))
    }

    async fn list_open_pulls(&self, owner: &str, repo: &str) -> Result<Vec<PullRequestSummary>, ApiError> {
        let paged: Paged<PullRequest> = self
            .get_all_pages(&format!("/repos/{}/{}/pulls", owner, repo), &[("state", "open")])
            .await?;

        Ok(paged
            .items
            .into_iter()
            .map(|pull| PullRequestSummary {
                title: pull.title,
                author: pull.user.map(|u| u.login).unwrap_or_default(),
            })
            .collect())
    }

    async fn rate_limit(&self) -> Result<RateLimit, ApiError> {
        let response: RateLimitResponse = self.get_one("/rate_limit").await?;
        let core = response.resources.core;

        let reset_at = DateTime::from_timestamp(core.reset, 0)
            .ok_or_else(|| ApiError::GitHub(format!("Invalid rate limit reset time: {}", core.reset)))?;

        Ok(RateLimit {
            remaining: core.remaining,
            reset_at,
        })
    }

    fn provider_name(&self) -> &'static str {
        "GitHub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_maps_not_found_to_none() {
        assert_eq!(found::<u8>(Ok(3)).unwrap(), Some(3));
        assert_eq!(found::<u8>(Err(ApiError::NotFound("gone".to_string()))).unwrap(), None);
        assert!(found::<u8>(Err(ApiError::RateLimited("quota".to_string()))).is_err());
    }

    fn content(path: &str, kind: &str, encoded: Option<&str>) -> octocrab::models::repos::Content {
        let url = format!("https://api.github.com/repos/acme/widgets/contents/{}", path);
        serde_json::from_value(serde_json::json!({
            "name": path.rsplit('/').next().unwrap(),
            "path": path,
            "sha": "3d21ec53a331a6f037a91c368710b99387d012c1",
            "size": 14,
            "url": url,
            "html_url": null,
            "git_url": null,
            "download_url": null,
            "type": kind,
            "encoding": encoded.map(|_| "base64"),
            "content": encoded,
            "_links": { "self": url, "git": null, "html": null }
        }))
        .unwrap()
    }

    #[test]
    fn test_content_kind_file() {
        let items = [content("CONTRIBUTING.md", "file", Some("aGVsbG8K"))];
        assert_eq!(content_kind("CONTRIBUTING.md", &items), FileContent::File("hello\n".to_string()));
    }

    #[test]
    fn test_content_kind_resolved_symlink_is_a_file() {
        let items = [content("docs/CONTRIBUTING.md", "file", Some("aGVsbG8K"))];
        assert_eq!(content_kind("CONTRIBUTING.md", &items), FileContent::File("hello\n".to_string()));
    }

    #[test]
    fn test_content_kind_symlink_and_submodule_are_files() {
        let items = [content(".travis.yml", "symlink", None)];
        assert_eq!(content_kind(".travis.yml", &items), FileContent::File(String::new()));

        let items = [content("CODE_OF_CONDUCT.md", "submodule", None)];
        assert_eq!(content_kind("CODE_OF_CONDUCT.md", &items), FileContent::File(String::new()));
    }

    #[test]
    fn test_content_kind_directory_listing() {
        let items = [
            content("CONTRIBUTING.md/README.md", "file", None),
            content("CONTRIBUTING.md/images", "dir", None),
        ];
        assert_eq!(content_kind("CONTRIBUTING.md", &items), FileContent::Directory);

        // A directory holding a single entry still lists it below the path
        let items = [content("CONTRIBUTING.md/README.md", "file", None)];
        assert_eq!(content_kind("CONTRIBUTING.md", &items), FileContent::Directory);

        assert_eq!(content_kind("CONTRIBUTING.md", &[]), FileContent::Directory);
    }

    #[test]
    fn test_branch_detail_deserialize() {
        let json = r#"{
            "name": "main",
            "commit": {
                "sha": "abc123",
                "commit": {
                    "committer": { "name": "Dev", "date": "2024-05-06T07:08:09Z" }
                }
            },
            "protected": true
        }"#;

        let detail: BranchDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.name, "main");
        let date = detail.commit.commit.committer.and_then(|c| c.date).unwrap();
        assert_eq!(date.to_rfc3339(), "2024-05-06T07:08:09+00:00");
    }

    #[test]
    fn test_pull_request_deserialize_without_user() {
        let json = r#"[
            { "title": "Configure Renovate", "user": { "login": "renovate[bot]" } },
            { "title": "Ghost PR", "user": null }
        ]"#;

        let pulls: Vec<PullRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(pulls[0].user.as_ref().unwrap().login, "renovate[bot]");
        assert!(pulls[1].user.is_none());
    }

    #[test]
    fn test_rate_limit_response_deserialize() {
        let json = r#"{
            "resources": {
                "core": { "limit": 5000, "used": 5000, "remaining": 0, "reset": 1700000000 },
                "search": { "limit": 30, "used": 0, "remaining": 30, "reset": 1700000000 }
            },
            "rate": { "limit": 5000, "used": 5000, "remaining": 0, "reset": 1700000000 }
        }"#;

        let response: RateLimitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.resources.core.remaining, 0);
        assert_eq!(response.resources.core.reset, 1_700_000_000);
    }
}
