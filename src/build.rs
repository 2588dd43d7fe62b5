// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! App build categories.
//!
//! Every external app is built by exactly one strategy. The Makefile lists
//! the apps of each strategy in its own variable, and its pattern rules pick
//! the strategy based on which variable an app is listed in:
//!
//! - __full-build__: composer install, then npm install and build.
//! - __composer-only__: composer install with scripts.
//! - __composer-no-scripts__: composer install without scripts.
//! - __composer-no-scripts-with-npm__: composer install without scripts,
//!   then npm install and build.
//! - __nothing-to-build__: app ships ready to use.
//! - __special__: app has its own hand-written build rule.
//!
//! # See Also
//!
//! - [`makefile`]

pub mod makefile;

use crate::{build::makefile::Makefile, config::CategoryVariables};

use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Build strategy of an external app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    FullBuild,
    ComposerOnly,
    ComposerNoScripts,
    ComposerNoScriptsWithNpm,
    NothingToBuild,
    Special,
}

impl Category {
    /// All categories in Makefile order.
    pub const ALL: [Category; 6] = [
        Category::FullBuild,
        Category::ComposerOnly,
        Category::ComposerNoScripts,
        Category::ComposerNoScriptsWithNpm,
        Category::NothingToBuild,
        Category::Special,
    ];

    /// Check if the Makefile builds apps of this category through pattern
    /// rules.
    pub fn is_dynamic(self) -> bool {
        self != Category::Special
    }
}

impl Display for Category {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::FullBuild => fmt.write_str("full-build"),
            Self::ComposerOnly => fmt.write_str("composer-only"),
            Self::ComposerNoScripts => fmt.write_str("composer-no-scripts"),
            Self::ComposerNoScriptsWithNpm => fmt.write_str("composer-no-scripts-with-npm"),
            Self::NothingToBuild => fmt.write_str("nothing-to-build"),
            Self::Special => fmt.write_str("special"),
        }
    }
}

/// App listing of every build category.
///
/// Entries are kept exactly as written, duplicates included, so validation
/// can report them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategoryLists {
    lists: BTreeMap<Category, Vec<String>>,
}

impl CategoryLists {
    /// Construct category lists from explicit listings.
    pub fn new(lists: impl IntoIterator<Item = (Category, Vec<String>)>) -> Self {
        Self {
            lists: lists.into_iter().collect(),
        }
    }

    /// Extract category lists from Makefile variables.
    ///
    /// Missing variables count as empty categories.
    pub fn from_makefile(makefile: &Makefile, variables: &CategoryVariables) -> Self {
        Self::new(Category::ALL.into_iter().map(|category| {
            let apps = makefile
                .variable(variables.variable(category))
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            (category, apps)
        }))
    }

    /// Apps listed in category.
    pub fn apps(&self, category: Category) -> &[String] {
        self.lists.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate through every listing in category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        Category::ALL.into_iter().flat_map(move |category| {
            self.apps(category)
                .iter()
                .map(move |app| (category, app.as_str()))
        })
    }

    /// Categories that list app.
    pub fn categories_of(&self, app: &str) -> Vec<Category> {
        let mut categories = self
            .iter()
            .filter(|(_, entry)| *entry == app)
            .map(|(category, _)| category)
            .collect::<Vec<_>>();
        categories.dedup();
        categories
    }

    /// Check if app is listed in any dynamic category.
    pub fn is_dynamic(&self, app: &str) -> bool {
        self.categories_of(app)
            .into_iter()
            .any(Category::is_dynamic)
    }
}

/// Single entry of the external apps build matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixEntry {
    pub app: String,
    pub category: Category,
    pub path: PathBuf,
}

impl Display for MatrixEntry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}\t{}\t{}", self.app, self.category, self.path.display())
    }
}

/// Build matrix of every categorized external app.
///
/// Lists each app once, under the first category it appears in.
pub fn build_matrix(lists: &CategoryLists, apps_dir: impl AsRef<Path>) -> Vec<MatrixEntry> {
    let mut seen = std::collections::BTreeSet::new();
    lists
        .iter()
        .filter(|(_, app)| seen.insert(app.to_string()))
        .map(|(category, app)| MatrixEntry {
            app: app.to_string(),
            category,
            path: apps_dir.as_ref().join(app),
        })
        .collect()
}
