//! Error types shared by the collector, the guard and the reporter.

use thiserror::Error;

/// Failures reported by a [`GitHubApi`](crate::api::GitHubApi) implementation
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service refused the request because the quota is exhausted
    #[error("GitHub API rate limit exceeded: {0}")]
    RateLimited(String),

    /// The requested resource does not exist (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other failure talking to GitHub
    #[error("GitHub API request failed: {0}")]
    GitHub(String),
}

impl From<octocrab::Error> for ApiError {
    fn from(error: octocrab::Error) -> Self {
        match &error {
            octocrab::Error::GitHub { source, .. } => {
                let status = source.status_code.as_u16();
                let message = source.message.clone();

                if status == 429 || (status == 403 && message.to_lowercase().contains("rate limit")) {
                    ApiError::RateLimited(message)
                } else if status == 404 {
                    ApiError::NotFound(message)
                } else {
                    ApiError::GitHub(format!("{} ({})", message, status))
                }
            }
            _ => ApiError::GitHub(error.to_string()),
        }
    }
}

/// Fatal conditions that abort an audit run
#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A path expected to be a file is a directory in the repository
    #[error("{path} in {repo} does not seem to be a file. Is it a directory?")]
    NotAFile { repo: String, path: String },

    /// Rows written plus archived repositories disagree with the listing total
    #[error("Got {seen} repos but expected {expected} in {org}.")]
    CountMismatch {
        org: String,
        seen: usize,
        expected: usize,
    },

    /// A report row does not carry exactly the declared columns
    #[error("You found a bug! Data for {repo} does not have expected keys. This was the diff: {diff:?}")]
    HeaderMismatch { repo: String, diff: Vec<String> },
}

pub type Result<T, E = AuditError> = std::result::Result<T, E>;
