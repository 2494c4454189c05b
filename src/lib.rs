//! greprepos - GitHub organization repository audit
//!
//! Walks every repository of a GitHub organization and writes one CSV row per
//! repository describing its governance state: branch naming, license,
//! CONTRIBUTING and CODE_OF_CONDUCT alignment with the organization defaults,
//! open issues and pull requests, Travis CI usage and private-repository
//! justification.
//!
//! ## Modules
//!
//! - [`api`]: the operations the audit needs from GitHub
//! - [`github`]: octocrab-backed implementation of [`api::GitHubApi`]
//! - [`collector`]: builds the report rows
//! - [`rate_limit`]: wait-and-retry-once rate-limit handling
//! - [`relationship`]: compares repository files with organization defaults
//! - [`report`]: row model and CSV output
//! - [`config`]: configuration management and parsing

pub mod api;
pub mod collector;
pub mod config;
pub mod defaults;
pub mod error;
pub mod github;
pub mod rate_limit;
pub mod relationship;
pub mod report;

pub use api::GitHubApi;
pub use collector::{AuditSettings, AuditSummary, Collector};
pub use config::Config;
pub use error::{ApiError, AuditError};
pub use github::GitHubClient;
pub use rate_limit::RateLimitGuard;
pub use relationship::RelationshipToOrgDefault;
pub use report::{ReportRow, HEADERS};
