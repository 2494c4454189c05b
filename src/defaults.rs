//! Organization default files
//!
//! GitHub serves files from an organization's `.github` repository as defaults
//! for every repository that lacks its own copy. These are the baseline the
//! relationship classifier compares against.

use tracing::debug;

use crate::api::{FileContent, GitHubApi};
use crate::error::{AuditError, Result};

/// Read a file from a repository.
///
/// Returns `None` when the path does not exist, and fails when it is a
/// directory: callers only ever ask for paths that must be files.
pub async fn read_file(api: &dyn GitHubApi, owner: &str, repo: &str, path: &str) -> Result<Option<String>> {
    match api.get_contents(owner, repo, path).await? {
        Some(FileContent::File(content)) => Ok(Some(content)),
        Some(FileContent::Directory) => Err(AuditError::NotAFile {
            repo: format!("{}/{}", owner, repo),
            path: path.to_string(),
        }),
        None => Ok(None),
    }
}

/// Fetch `filename` from the organization's defaults repository.
///
/// `None` means there is no default: either the defaults repository or the
/// file in it does not exist. An empty file is `Some("")`.
pub async fn resolve_default_file(
    api: &dyn GitHubApi,
    org: &str,
    defaults_repo: &str,
    filename: &str,
) -> Result<Option<String>> {
    if api.get_repository(org, defaults_repo).await?.is_none() {
        debug!("{} has no {} repository", org, defaults_repo);
        return Ok(None);
    }

    let content = read_file(api, org, defaults_repo, filename).await?;
    if content.is_none() {
        debug!("{}/{} has no {}", org, defaults_repo, filename);
    }
    Ok(content)
}

/// Default files the audit compares repositories against
#[derive(Debug, Clone, Default)]
pub struct OrgDefaults {
    pub contributing: Option<String>,
    pub code_of_conduct: Option<String>,
}

impl OrgDefaults {
    pub async fn resolve(
        api: &dyn GitHubApi,
        org: &str,
        defaults_repo: &str,
        contributing_file: &str,
        code_of_conduct_file: &str,
    ) -> Result<Self> {
        Ok(Self {
            contributing: resolve_default_file(api, org, defaults_repo, contributing_file).await?,
            code_of_conduct: resolve_default_file(api, org, defaults_repo, code_of_conduct_file).await?,
        })
    }
}
