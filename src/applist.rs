// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! App identifiers and app list files.
//!
//! An __app identifier__ is the name of an app folder inside the host
//! application, e.g., "notify_push" or "files_antivirus". Every list that
//! drives app-state changes is built out of these identifiers.
//!
//! # App List Files
//!
//! App list files are plain text. Each line is trimmed before being
//! interpreted. Blank lines and lines starting with '#' are ignored. Every
//! other line holds exactly one app identifier. Three lists exist, each with
//! its own effect:
//!
//! - __disabled-apps__: apps that administrators may disable, so they are
//!   removed from the default and always enabled sets of the manifest.
//! - __always-enabled-apps__: apps that get force enabled on every start.
//! - __removed-apps__: apps that never make it into the distribution.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Name of an app folder in the host application.
///
/// # Invariant
///
/// - Never empty.
/// - Only contains lowercase ASCII letters, ASCII digits, and underscores.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    /// Construct new app identifier.
    ///
    /// # Errors
    ///
    /// - Return [`AppListError::InvalidAppId`] if identifier is empty or
    ///   contains characters outside of `[a-z0-9_]`.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if !valid {
            return Err(AppListError::InvalidAppId { id });
        }

        Ok(Self(id))
    }

    /// Treat app identifier as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for AppId {
    type Err = AppListError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Self::new(id)
    }
}

impl TryFrom<String> for AppId {
    type Error = AppListError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for AppId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Ordered listing of app identifiers read from an app list file.
///
/// Keeps identifiers in file order. Duplicate lines are kept as is, because
/// every consumer of an app list is idempotent per identifier.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AppList {
    apps: Vec<AppId>,
}

impl AppList {
    /// Construct new app list from identifiers.
    pub fn new(apps: impl IntoIterator<Item = AppId>) -> Self {
        Self {
            apps: apps.into_iter().collect(),
        }
    }

    /// Parse app list from file content.
    ///
    /// # Errors
    ///
    /// - Return [`AppListError::InvalidLine`] if a non-comment line does not
    ///   hold a valid app identifier.
    pub fn parse(content: &str) -> Result<Self> {
        let mut apps = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let app = AppId::new(line).map_err(|_| AppListError::InvalidLine {
                line: index + 1,
                content: line.to_string(),
            })?;
            apps.push(app);
        }

        Ok(Self { apps })
    }

    /// Read and parse app list file.
    ///
    /// # Errors
    ///
    /// - Return [`AppListError::ReadListFile`] if file cannot be read.
    /// - Return [`AppListError::ParseListFile`] if file content is invalid.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|err| AppListError::ReadListFile {
            source: err,
            list_path: path.to_path_buf(),
        })?;

        Self::parse(&content).map_err(|err| AppListError::ParseListFile {
            source: Box::new(err),
            list_path: path.to_path_buf(),
        })
    }

    /// Iterate through app identifiers in file order.
    pub fn iter(&self) -> impl Iterator<Item = &AppId> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn contains(&self, app: &AppId) -> bool {
        self.apps.contains(app)
    }
}

impl<'a> IntoIterator for &'a AppList {
    type Item = &'a AppId;
    type IntoIter = std::slice::Iter<'a, AppId>;

    fn into_iter(self) -> Self::IntoIter {
        self.apps.iter()
    }
}

/// App list error types.
#[derive(Debug, thiserror::Error)]
pub enum AppListError {
    /// App identifier breaks naming rules.
    #[error("invalid app identifier {id:?}")]
    InvalidAppId { id: String },

    /// Line of app list does not hold a valid app identifier.
    #[error("line {line}: invalid app identifier {content:?}")]
    InvalidLine { line: usize, content: String },

    /// App list file cannot be read from.
    #[error("failed to read app list at {:?}", list_path.display())]
    ReadListFile {
        #[source]
        source: std::io::Error,
        list_path: PathBuf,
    },

    /// App list file holds invalid content.
    #[error("failed to parse app list at {:?}", list_path.display())]
    ParseListFile {
        #[source]
        source: Box<AppListError>,
        list_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = AppListError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    fn names(list: &AppList) -> Vec<&str> {
        list.iter().map(AppId::as_str).collect()
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() -> anyhow::Result<()> {
        let list = AppList::parse("# comment\n\napp1\n  \napp2\n")?;
        assert_eq!(names(&list), vec!["app1", "app2"]);
        Ok(())
    }

    #[test]
    fn parse_trims_whitespace_and_keeps_order() -> anyhow::Result<()> {
        let content = indoc! {r#"
            # Apps forced on at every start.
              notify_push
            files_antivirus
                # indented comment
            circles
        "#};
        let list = AppList::parse(content)?;
        assert_eq!(names(&list), vec!["notify_push", "files_antivirus", "circles"]);
        Ok(())
    }

    #[test]
    fn parse_reports_offending_line() {
        let result = AppList::parse("good_app\n\nBad-App\n");
        assert!(matches!(
            result,
            Err(AppListError::InvalidLine { line: 3, ref content }) if content == "Bad-App"
        ));
    }

    #[test_case("notify_push"; "underscore")]
    #[test_case("app2"; "digits")]
    #[test_case("spreed"; "plain")]
    #[test]
    fn app_id_accepts(id: &str) {
        assert!(AppId::new(id).is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case("Files"; "uppercase")]
    #[test_case("files-pdf"; "hyphen")]
    #[test_case("files pdf"; "space")]
    #[test]
    fn app_id_rejects(id: &str) {
        assert!(AppId::new(id).is_err());
    }

    #[sealed_test]
    fn read_list_file_from_disk() -> anyhow::Result<()> {
        std::fs::write("always-enabled-apps.list", "# forced\nnotify_push\n")?;
        let list = AppList::read("always-enabled-apps.list")?;
        assert_eq!(names(&list), vec!["notify_push"]);
        Ok(())
    }

    #[sealed_test]
    fn read_missing_list_file_fails() {
        let result = AppList::read("missing.list");
        assert!(matches!(result, Err(AppListError::ReadListFile { .. })));
    }
}
