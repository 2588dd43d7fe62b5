// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Submodule and filesystem consistency.
//!
//! External apps are git submodules inside the apps directory. Each one must
//! be categorized, and each categorized app must be an actual submodule. The
//! category of a present submodule can also be guessed from its files:
//!
//! | composer.json | npm build script | inferred category |
//! |---------------|------------------|-------------------|
//! | yes           | yes              | full-build        |
//! | yes           | no               | composer-only     |
//! | no            | yes              | full-build        |
//! | no            | no               | nothing-to-build  |
//!
//! A guess that disagrees with the declared category is only a warning,
//! because the Makefile may know better, e.g., composer scripts that must not
//! run.

use crate::{
    build::{Category, CategoryLists},
    validate::{Finding, Problem, Report, Result, ValidateError},
};

use git2::Repository;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::read_to_string,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Layer of indirection for submodule registration lookup.
pub trait SubmoduleRegistry {
    /// Paths of registered submodules relative to repository root.
    fn submodule_paths(&self) -> Result<BTreeSet<PathBuf>>;
}

/// Submodule registration read through libgit2.
pub struct Git2Registry {
    repository: Repository,
}

impl Git2Registry {
    /// Open repository at path.
    ///
    /// # Errors
    ///
    /// - Return [`ValidateError::Git2`] if repository cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            repository: Repository::open(path.as_ref())?,
        })
    }
}

impl SubmoduleRegistry for Git2Registry {
    fn submodule_paths(&self) -> Result<BTreeSet<PathBuf>> {
        Ok(self
            .repository
            .submodules()?
            .iter()
            .map(|submodule| submodule.path().to_path_buf())
            .collect())
    }
}

impl SubmoduleRegistry for BTreeSet<PathBuf> {
    fn submodule_paths(&self) -> Result<BTreeSet<PathBuf>> {
        Ok(self.clone())
    }
}

/// Validate categorized apps against submodules in the apps directory.
///
/// `apps_dir` is relative to `repo_root`. A leading "./" is ignored, and an
/// absolute `apps_dir` below `repo_root` is made relative to it. Registered
/// submodules are checked even when their directory is not checked out.
///
/// # Errors
///
/// - Return [`ValidateError`] if submodules or the apps directory cannot be
///   listed.
#[instrument(skip(lists, registry), level = "debug")]
pub fn validate_submodules(
    lists: &CategoryLists,
    repo_root: &Path,
    apps_dir: &Path,
    registry: &impl SubmoduleRegistry,
) -> Result<Report> {
    let mut report = Report::new();
    let apps_dir = normalize_apps_dir(repo_root, apps_dir);
    let registered = registry
        .submodule_paths()?
        .iter()
        .map(|path| strip_cur_dir(path))
        .collect::<BTreeSet<_>>();

    let mut declared: BTreeMap<&str, Category> = BTreeMap::new();
    for (category, app) in lists.iter() {
        declared.entry(app).or_insert(category);
    }

    for app in declared.keys() {
        let relative = apps_dir.join(app);
        if !repo_root.join(&relative).is_dir() {
            report.push(Finding::error(
                Problem::MissingDirectory,
                *app,
                format!("{} does not exist", relative.display()),
            ));
        }

        if !registered.contains(&relative) {
            report.push(Finding::error(
                Problem::NotSubmodule,
                *app,
                format!("{} is not a registered submodule", relative.display()),
            ));
        }
    }

    // INVARIANT: Check registered submodules and present directories alike.
    let mut candidates = registered
        .iter()
        .filter(|path| path.parent() == Some(apps_dir.as_path()))
        .cloned()
        .collect::<BTreeSet<_>>();
    for path in present_dirs(repo_root, &apps_dir)? {
        candidates.insert(apps_dir.join(path.file_name().unwrap_or_default()));
    }

    for relative in candidates {
        if !registered.contains(&relative) {
            debug!("skip unregistered directory {}", relative.display());
            continue;
        }

        let app = relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(category) = declared.get(app.as_str()).copied() else {
            report.push(Finding::error(
                Problem::UncategorizedSubmodule,
                app.as_str(),
                format!("{} is missing from every category", relative.display()),
            ));
            continue;
        };

        let path = repo_root.join(&relative);
        if !path.is_dir() {
            debug!("{} not checked out, skip category check", relative.display());
            continue;
        }

        match infer_category(&path) {
            Ok(inferred) if !compatible(category, inferred) => {
                report.push(Finding::warning(
                    Problem::CategoryMismatch,
                    app.as_str(),
                    format!("declared {category}, files suggest {inferred}"),
                ));
            }
            Ok(_) => {}
            Err(message) => {
                warn!("cannot infer category of {app}: {message}");
                report.push(Finding::warning(Problem::UnreadablePackage, app.as_str(), message));
            }
        }
    }

    Ok(report)
}

fn normalize_apps_dir(repo_root: &Path, apps_dir: &Path) -> PathBuf {
    let apps_dir = if apps_dir.is_absolute() {
        apps_dir
            .strip_prefix(strip_cur_dir(repo_root))
            .unwrap_or(apps_dir)
    } else {
        apps_dir
    };

    strip_cur_dir(apps_dir)
}

fn strip_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

fn present_dirs(repo_root: &Path, apps_dir: &Path) -> Result<Vec<PathBuf>> {
    let root = repo_root.join(apps_dir);
    let pattern = format!("{}/*", glob::Pattern::escape(&root.to_string_lossy()));

    let mut dirs = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|err| ValidateError::ListAppsDir {
            source: err,
            apps_dir: root.clone(),
        })?;
        if path.is_dir() {
            dirs.push(path);
        }
    }

    Ok(dirs)
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    scripts: BTreeMap<String, serde_json::Value>,
}

/// Guess build category from the files of an app.
///
/// Returns a message describing the problem if package.json exists but
/// cannot be read.
pub fn infer_category(app_dir: &Path) -> std::result::Result<Category, String> {
    let composer = app_dir.join("composer.json").is_file();

    let package_path = app_dir.join("package.json");
    let npm_build = if package_path.is_file() {
        let content = read_to_string(&package_path)
            .map_err(|err| format!("cannot read {}: {err}", package_path.display()))?;
        let package: PackageJson = serde_json::from_str(&content)
            .map_err(|err| format!("cannot parse {}: {err}", package_path.display()))?;
        package.scripts.contains_key("build")
    } else {
        false
    };

    Ok(match (composer, npm_build) {
        (true, true) | (false, true) => Category::FullBuild,
        (true, false) => Category::ComposerOnly,
        (false, false) => Category::NothingToBuild,
    })
}

fn compatible(declared: Category, inferred: Category) -> bool {
    match (declared, inferred) {
        (Category::Special, _) => true,
        (Category::ComposerNoScripts, Category::ComposerOnly) => true,
        (Category::ComposerNoScriptsWithNpm, Category::FullBuild) => true,
        (declared, inferred) => declared == inferred,
    }
}
