//! How a repository file relates to the organization default of the same name
//!
//! An organization keeps canonical copies of files such as `CONTRIBUTING.md` in
//! its defaults repository. Every other repository is expected to either carry
//! an identical copy or link to the canonical one.

use std::fmt;

/// Relationship between a repository file and the organization default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipToOrgDefault {
    /// Repository file contains a link to the organization default
    LinksTo,
    /// Repository file is identical to the organization default
    Matches,
    /// Repository has no such file
    Missing,
    /// Organization has no default for this file
    NoDefault,
    /// Both files exist and are unrelated
    Unrelated,
}

impl RelationshipToOrgDefault {
    /// Label written to the report
    pub fn label(self) -> &'static str {
        match self {
            RelationshipToOrgDefault::LinksTo => "links to",
            RelationshipToOrgDefault::Matches => "matches",
            RelationshipToOrgDefault::Missing => "missing",
            RelationshipToOrgDefault::NoDefault => "no organisation default",
            RelationshipToOrgDefault::Unrelated => "unrelated",
        }
    }
}

impl fmt::Display for RelationshipToOrgDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where an organization's default files live on the web
#[derive(Debug, Clone)]
pub struct DefaultsLocation {
    pub base_url: String,
    pub org: String,
    pub repo: String,
}

impl DefaultsLocation {
    pub fn new(base_url: impl Into<String>, org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            org: org.into(),
            repo: repo.into(),
        }
    }

    /// Browser URL of `filename` on the defaults repository's `main` branch
    pub fn file_url(&self, filename: &str) -> String {
        [
            self.base_url.trim_end_matches('/'),
            &self.org,
            &self.repo,
            "blob",
            "main",
            filename,
        ]
        .join("/")
    }
}

/// Classify a repository's copy of `filename` against the organization default.
///
/// The link test is plain substring containment of [`DefaultsLocation::file_url`],
/// so any mention of the URL counts, whether or not it is a markdown link.
pub fn classify(
    default: Option<&str>,
    repo_file: Option<&str>,
    location: &DefaultsLocation,
    filename: &str,
) -> RelationshipToOrgDefault {
    let Some(default) = default else {
        return RelationshipToOrgDefault::NoDefault;
    };
    let Some(repo_file) = repo_file else {
        return RelationshipToOrgDefault::Missing;
    };

    if default == repo_file {
        RelationshipToOrgDefault::Matches
    } else if repo_file.contains(&location.file_url(filename)) {
        RelationshipToOrgDefault::LinksTo
    } else {
        RelationshipToOrgDefault::Unrelated
    }
}
