// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! App listing validation.
//!
//! Validation compares what the Makefile declares against itself, and
//! against what actually sits in the repository. Every check runs over the
//! whole listing in one pass. All findings are collected into a [`Report`]
//! instead of stopping at the first problem, so the operator gets the full
//! remediation list in one go.
//!
//! # See Also
//!
//! - [`category`]
//! - [`submodule`]

pub mod category;
pub mod submodule;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

/// Kind of problem a finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Problem {
    /// App listed in more than one category.
    DuplicateCategory,

    /// App listed more than once in one category.
    DuplicateEntry,

    /// Special app without hand-written build rule.
    MissingRule,

    /// Hand-written build rule for app that pattern rules already build.
    RuleConflict,

    /// Hand-written build rule for app outside the special category.
    UncategorizedRule,

    /// Categorized app without directory.
    MissingDirectory,

    /// Categorized app directory that is not a registered submodule.
    NotSubmodule,

    /// Registered submodule without category.
    UncategorizedSubmodule,

    /// Declared category disagrees with files of app.
    CategoryMismatch,

    /// Package manifest of app cannot be read.
    UnreadablePackage,
}

impl Problem {
    /// Remediation heading of problem group.
    pub fn remedy(self) -> &'static str {
        match self {
            Self::DuplicateCategory => "keep each app in exactly one category",
            Self::DuplicateEntry => "remove repeated entries from category",
            Self::MissingRule => "add a build_<app>_app rule for special apps",
            Self::RuleConflict => "drop the hand-written rule, or move app to special",
            Self::UncategorizedRule => "list app under special, or allow-list the rule",
            Self::MissingDirectory => "add the app directory, or drop it from its category",
            Self::NotSubmodule => "register the app directory as git submodule",
            Self::UncategorizedSubmodule => "list submodule in one category",
            Self::CategoryMismatch => "review the category of app",
            Self::UnreadablePackage => "fix package.json of app",
        }
    }
}

/// Single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub problem: Problem,
    pub app: String,
    pub message: String,
}

impl Finding {
    pub fn error(problem: Problem, app: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            problem,
            app: app.into(),
            message: message.into(),
        }
    }

    pub fn warning(problem: Problem, app: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            problem,
            app: app.into(),
            message: message.into(),
        }
    }
}

/// Collected findings of a validation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    findings: Vec<Finding>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Merge findings of another report.
    pub fn extend(&mut self, other: Report) {
        self.findings.extend(other.findings);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Warning)
    }

    /// Check if validation passed, warnings do not count.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }
}

impl Display for Report {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut groups: BTreeMap<(Severity, Problem), Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            groups
                .entry((finding.severity, finding.problem))
                .or_default()
                .push(finding);
        }

        for ((severity, problem), findings) in groups {
            let label = match severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            writeln!(fmt, "{label}: {}", problem.remedy())?;
            for finding in findings {
                writeln!(fmt, "  - {}: {}", finding.app, finding.message)?;
            }
        }

        Ok(())
    }
}

/// Validation error types.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Apps directory cannot be turned into a search pattern.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Apps directory cannot be listed.
    #[error("failed to list apps directory {:?}", apps_dir.display())]
    ListAppsDir {
        #[source]
        source: glob::GlobError,
        apps_dir: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ValidateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_groups_by_problem() {
        let mut report = Report::new();
        report.push(Finding::warning(Problem::CategoryMismatch, "mail", "looks like full-build"));
        report.push(Finding::error(Problem::MissingRule, "notify_push", "no build_notify_push_app rule"));
        report.push(Finding::error(Problem::DuplicateCategory, "spreed", "listed in full-build, special"));
        report.push(Finding::error(Problem::MissingRule, "richdocumentscode", "no build_richdocumentscode_app rule"));

        let expect = indoc! {"
            error: keep each app in exactly one category
              - spreed: listed in full-build, special
            error: add a build_<app>_app rule for special apps
              - notify_push: no build_notify_push_app rule
              - richdocumentscode: no build_richdocumentscode_app rule
            warning: review the category of app
              - mail: looks like full-build
        "};
        assert_eq!(report.to_string(), expect);
        assert!(!report.is_ok());
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn warnings_alone_pass() {
        let mut report = Report::new();
        report.push(Finding::warning(Problem::CategoryMismatch, "mail", "looks like full-build"));
        assert!(report.is_ok());
    }
}
