//! Collector - gathers one report row per repository of an organization
//!
//! Repositories are processed one at a time in listing order. Each
//! repository's fetch runs under the [`RateLimitGuard`], so hitting the quota
//! costs a wait and a single retry of that repository rather than the run.

use std::time::Duration;
use tracing::info;

use crate::api::{GitHubApi, PullRequestSummary, RepoSnapshot};
use crate::config::Config;
use crate::defaults::{read_file, OrgDefaults};
use crate::error::{AuditError, Result};
use crate::rate_limit::RateLimitGuard;
use crate::relationship::{classify, DefaultsLocation};
use crate::report::{self, ReportRow};

/// What to audit and how
#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub org: String,
    pub base_url: String,
    pub defaults_repo: String,
    pub contributing_file: String,
    pub code_of_conduct_file: String,
    pub why_private_file: String,
    pub travis_config_file: String,
    pub renovate_user: String,
    pub bot_user: Option<String>,
    pub rate_limit_margin: Duration,
}

impl AuditSettings {
    pub fn from_config(org: impl Into<String>, config: &Config) -> Self {
        Self {
            org: org.into(),
            base_url: config.github.base_url.clone(),
            defaults_repo: config.audit.defaults_repo.clone(),
            contributing_file: config.audit.contributing_file.clone(),
            code_of_conduct_file: config.audit.code_of_conduct_file.clone(),
            why_private_file: config.audit.why_private_file.clone(),
            travis_config_file: config.audit.travis_config_file.clone(),
            renovate_user: config.audit.renovate_user.clone(),
            bot_user: config.audit.bot_user.clone(),
            rate_limit_margin: config.rate_limit_margin(),
        }
    }

    fn defaults_location(&self) -> DefaultsLocation {
        DefaultsLocation::new(&self.base_url, &self.org, &self.defaults_repo)
    }
}

/// Rows produced by a run, with the counts used for the consistency check
#[derive(Debug, Clone, Default)]
pub struct AuditSummary {
    pub rows: Vec<ReportRow>,
    pub archived: usize,
    pub total_repositories: usize,
}

/// Pull-request flags of a repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullRequestFlags {
    pub configure_renovate: bool,
    pub from_bot: bool,
}

/// Look for the Renovate onboarding PR and for PRs opened by `bot_user`.
///
/// Stops as soon as nothing left to scan could change the result.
pub fn scan_pull_requests(
    pulls: &[PullRequestSummary],
    renovate_title: &str,
    renovate_user: &str,
    bot_user: Option<&str>,
) -> PullRequestFlags {
    let mut flags = PullRequestFlags::default();

    for pull in pulls {
        if pull.title == renovate_title && pull.author == renovate_user {
            flags.configure_renovate = true;
        }
        if bot_user == Some(pull.author.as_str()) {
            flags.from_bot = true;
        }
        if flags.configure_renovate && (flags.from_bot || bot_user.is_none()) {
            break;
        }
    }

    flags
}

/// Walks an organization and builds the report rows
pub struct Collector<'a> {
    api: &'a dyn GitHubApi,
    settings: AuditSettings,
    guard: RateLimitGuard,
}

impl<'a> Collector<'a> {
    pub fn new(api: &'a dyn GitHubApi, settings: AuditSettings) -> Self {
        let guard = RateLimitGuard::new(settings.rate_limit_margin);
        Self {
            api,
            settings,
            guard,
        }
    }

    /// Audit every non-archived repository of the organization.
    ///
    /// Fails if the rows written plus the archived repositories skipped do not
    /// add up to the total the listing reported.
    pub async fn collect(&self) -> Result<AuditSummary> {
        let org = self.settings.org.as_str();
        info!(
            "Auditing organization {} via {}",
            org,
            self.api.provider_name()
        );

        let defaults = self
            .guard
            .run(self.api, || {
                OrgDefaults::resolve(
                    self.api,
                    org,
                    &self.settings.defaults_repo,
                    &self.settings.contributing_file,
                    &self.settings.code_of_conduct_file,
                )
            })
            .await?;

        let listing = self
            .guard
            .run(self.api, || self.api.list_org_repositories(org))
            .await?;
        let total = listing.total_count;

        let mut summary = AuditSummary {
            total_repositories: total,
            ..AuditSummary::default()
        };

        for (index, repo) in listing.repositories.iter().enumerate() {
            if repo.archived {
                info!("{} is archived. Skipping.", repo.name);
                summary.archived += 1;
                continue;
            }

            info!("Looking at {}, repo {} of {}.", repo.name, index + 1, total);
            let row = self
                .guard
                .run(self.api, || self.repo_row(repo, &defaults))
                .await?;
            summary.rows.push(row);
        }

        let seen = summary.archived + summary.rows.len();
        info!(
            "Summary: {} archived | {} to write into CSV file | {} total repos in {}.",
            summary.archived,
            summary.rows.len(),
            total,
            org
        );

        if seen != total {
            return Err(AuditError::CountMismatch {
                org: org.to_string(),
                seen,
                expected: total,
            });
        }

        Ok(summary)
    }

    /// Build the report row for one repository
    pub async fn repo_row(&self, repo: &RepoSnapshot, defaults: &OrgDefaults) -> Result<ReportRow> {
        let api = self.api;
        let settings = &self.settings;
        let org = settings.org.as_str();
        let name = repo.name.as_str();

        let mut row = ReportRow::new();
        row.set(report::NAME, name);
        row.set(report::IS_ARCHIVED, repo.archived);
        row.set(report::IS_PRIVATE, repo.private);
        row.set(report::IS_FORK, repo.fork);
        row.set(report::CREATED_AT, repo.created_at);
        row.set(report::PUSHED_AT, repo.pushed_at);
        row.set(report::DEFAULT_BRANCH, repo.default_branch.as_str());

        // An empty repository has no default branch yet
        match api.get_branch(org, name, &repo.default_branch).await? {
            Some(head) => {
                let commits = api.count_commits(org, name, &head.name).await?;
                row.set(report::COMMITS_ON_DEFAULT_BRANCH, commits);
                row.set(report::LAST_COMMIT_TO_DEFAULT_BRANCH, head.last_commit_at);
            }
            None => {
                info!("{} has no {} branch", name, repo.default_branch);
                row.set(report::COMMITS_ON_DEFAULT_BRANCH, 0u64);
                row.set(report::LAST_COMMIT_TO_DEFAULT_BRANCH, report::Value::Empty);
            }
        }

        let branches = api.list_branches(org, name).await?;
        let has_master = branches.iter().any(|b| b == "master");
        let has_main = branches.iter().any(|b| b == "main");
        row.set(report::MASTER_BUT_NO_MAIN, has_master && !has_main);

        row.set(report::HAS_LICENSE, api.has_license(org, name).await?);

        let location = settings.defaults_location();
        let contributing = read_file(api, org, name, &settings.contributing_file).await?;
        row.set(
            report::CONTRIBUTING_RELATIONSHIP,
            classify(
                defaults.contributing.as_deref(),
                contributing.as_deref(),
                &location,
                &settings.contributing_file,
            ),
        );
        let code_of_conduct = read_file(api, org, name, &settings.code_of_conduct_file).await?;
        row.set(
            report::COC_RELATIONSHIP,
            classify(
                defaults.code_of_conduct.as_deref(),
                code_of_conduct.as_deref(),
                &location,
                &settings.code_of_conduct_file,
            ),
        );

        let missing_why_private = repo.private
            && read_file(api, org, name, &settings.why_private_file)
                .await?
                .is_none();
        row.set(report::MISSING_WHY_PRIVATE, missing_why_private);

        let uses_travis = read_file(api, org, name, &settings.travis_config_file)
            .await?
            .is_some();
        row.set(report::USES_TRAVIS, uses_travis);

        row.set(report::TOPICS, repo.topics.join(", "));
        let teams = api.list_teams(org, name).await?.unwrap_or_default();
        row.set(report::TEAMS, teams.join(", "));
        row.set(report::FORKS_COUNT, repo.forks_count);
        row.set(report::OPEN_ISSUES, repo.open_issues_count);

        let pulls = api.list_open_pulls(org, name).await?;
        row.set(report::OPEN_PRS, pulls.len() as u64);
        let flags = scan_pull_requests(
            &pulls,
            report::RENOVATE_PR_TITLE,
            &settings.renovate_user,
            settings.bot_user.as_deref(),
        );
        row.set(report::RENOVATE_PR, flags.configure_renovate);
        row.set(report::BOT_PR, flags.from_bot);

        Ok(row)
    }
}
