//! Report rows and CSV output
//!
//! Every audited repository becomes one [`ReportRow`]. The column set and its
//! order are fixed by [`HEADERS`]; rows are checked against it before anything
//! is written, so a collector that forgets or invents a column aborts the run
//! instead of producing a misaligned file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::error::AuditError;
use crate::relationship::RelationshipToOrgDefault;

/// Format used for every timestamp column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const NAME: &str = "name";
pub const IS_ARCHIVED: &str = "is archived";
pub const IS_PRIVATE: &str = "is private";
pub const IS_FORK: &str = "is fork";
pub const CREATED_AT: &str = "created at";
pub const PUSHED_AT: &str = "pushed at";
pub const DEFAULT_BRANCH: &str = "default branch";
pub const COMMITS_ON_DEFAULT_BRANCH: &str = "commits on default branch";
pub const LAST_COMMIT_TO_DEFAULT_BRANCH: &str = "last commit to default branch";
pub const OPEN_ISSUES: &str = "open issues";
pub const OPEN_PRS: &str = "open prs";
pub const MASTER_BUT_NO_MAIN: &str = "has master branch but no main";
pub const HAS_LICENSE: &str = "has license file";
pub const CONTRIBUTING_RELATIONSHIP: &str = "contributing relates to org default";
pub const COC_RELATIONSHIP: &str = "coc relates to org default";
pub const MISSING_WHY_PRIVATE: &str = "missing why private";
macro_rules! renovate_pr_title {
    () => {
        "Configure Renovate"
    };
}

/// Title of the onboarding PR Renovate opens; also names its column
pub const RENOVATE_PR_TITLE: &str = renovate_pr_title!();
pub const RENOVATE_PR: &str = concat!("has unmerged ", renovate_pr_title!(), " PR");
pub const BOT_PR: &str = "has unmerged PR(s) from org bot";
pub const USES_TRAVIS: &str = "uses Travis CI";
pub const FORKS_COUNT: &str = "forks count";
pub const TEAMS: &str = "teams";
pub const TOPICS: &str = "topics";

/// Report columns, in output order
pub const HEADERS: [&str; 22] = [
    NAME,
    IS_ARCHIVED,
    IS_PRIVATE,
    IS_FORK,
    CREATED_AT,
    PUSHED_AT,
    DEFAULT_BRANCH,
    COMMITS_ON_DEFAULT_BRANCH,
    LAST_COMMIT_TO_DEFAULT_BRANCH,
    OPEN_ISSUES,
    OPEN_PRS,
    MASTER_BUT_NO_MAIN,
    HAS_LICENSE,
    CONTRIBUTING_RELATIONSHIP,
    COC_RELATIONSHIP,
    MISSING_WHY_PRIVATE,
    RENOVATE_PR,
    BOT_PR,
    USES_TRAVIS,
    FORKS_COUNT,
    TEAMS,
    TOPICS,
];

/// A single report cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(u64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Relationship(RelationshipToOrgDefault),
    Empty,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            Value::Relationship(r) => f.write_str(r.label()),
            Value::Empty => Ok(()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Int(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<RelationshipToOrgDefault> for Value {
    fn from(value: RelationshipToOrgDefault) -> Self {
        Value::Relationship(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Empty)
    }
}

/// Column values gathered for one repository
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    cells: BTreeMap<String, Value>,
}

impl ReportRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.cells.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    /// Repository name, used in diagnostics
    pub fn name(&self) -> String {
        self.get(NAME).map(ToString::to_string).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Columns present in the row but not declared, or declared but absent, sorted
    pub fn header_diff(&self, headers: &[&str]) -> Vec<String> {
        let expected: BTreeSet<&str> = headers.iter().copied().collect();
        let actual: BTreeSet<&str> = self.columns().collect();

        expected
            .symmetric_difference(&actual)
            .map(|column| column.to_string())
            .collect()
    }

    /// Cells rendered in `headers` order
    fn record(&self, headers: &[&str]) -> Vec<String> {
        headers
            .iter()
            .map(|column| self.get(column).map(ToString::to_string).unwrap_or_default())
            .collect()
    }
}

/// Check that every row carries exactly the declared columns
pub fn verify_headers(rows: &[ReportRow], headers: &[&str]) -> Result<(), AuditError> {
    debug!("Expected headers: {:?}", headers);

    for row in rows {
        let diff = row.header_diff(headers);
        if !diff.is_empty() {
            debug!("Got headers: {:?}", row.columns().collect::<Vec<_>>());
            return Err(AuditError::HeaderMismatch {
                repo: row.name(),
                diff,
            });
        }
    }

    Ok(())
}

/// Write the header row and then one record per row
pub fn write_rows<W: io::Write>(rows: &[ReportRow], headers: &[&str], writer: W) -> Result<()> {
    verify_headers(rows, headers)?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(headers)
        .context("Failed to write CSV header")?;

    for row in rows {
        csv_writer
            .write_record(row.record(headers))
            .with_context(|| format!("Failed to write CSV row for {}", row.name()))?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write the report to `path`, replacing any existing file
pub fn write_csv_file(rows: &[ReportRow], path: &Path) -> Result<()> {
    verify_headers(rows, &HEADERS)?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    write_rows(rows, &HEADERS, file)?;

    info!("CSV data written to {}.", path.display());
    Ok(())
}
