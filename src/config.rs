// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that appship uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use crate::{applist::AppId, build::Category, host::ConfigType};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Appship configuration layout.
///
/// # General Layout
///
/// The configuration is split into the file paths appship works on, the
/// host administration command to use, the Makefile variables that hold the
/// app categories, validation settings, and a listing of configuration
/// blocks that wire environment variables into the host application.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct AppshipConfig {
    /// File paths to operate on.
    #[serde(default)]
    pub paths: PathSettings,

    /// Host administration command.
    #[serde(default)]
    pub occ: OccSettings,

    /// Makefile variables holding each app category.
    #[serde(default)]
    pub categories: CategoryVariables,

    /// Validation settings.
    #[serde(default)]
    pub validate: ValidateSettings,

    /// Configuration blocks applied through the host application.
    #[serde(default, rename = "setting", skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<SettingBlock>,
}

impl AppshipConfig {
    /// Resolve path relative to server root.
    ///
    /// Absolute paths are returned as is.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.paths.server_root.join(path)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.paths.manifest)
    }

    pub fn makefile_path(&self) -> PathBuf {
        self.resolve(&self.paths.makefile)
    }

    pub fn repo_root(&self) -> PathBuf {
        self.resolve(&self.paths.repo_root)
    }

    pub fn disabled_apps_path(&self) -> PathBuf {
        self.resolve(&self.paths.disabled_apps)
    }

    pub fn always_enabled_apps_path(&self) -> PathBuf {
        self.resolve(&self.paths.always_enabled_apps)
    }

    pub fn removed_apps_path(&self) -> PathBuf {
        self.resolve(&self.paths.removed_apps)
    }
}

impl FromStr for AppshipConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: AppshipConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        let paths = &mut config.paths;
        for path in [
            &mut paths.server_root,
            &mut paths.manifest,
            &mut paths.makefile,
            &mut paths.repo_root,
            &mut paths.apps_dir,
            &mut paths.disabled_apps,
            &mut paths.always_enabled_apps,
            &mut paths.removed_apps,
        ] {
            *path = expand_path(path.as_path())?;
        }

        Ok(config)
    }
}

impl Display for AppshipConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// File paths appship operates on.
///
/// Relative paths are resolved against the server root.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathSettings {
    /// Root directory of the host application installation.
    pub server_root: PathBuf,

    /// Shipped apps manifest.
    pub manifest: PathBuf,

    /// Makefile holding app categories and hand-written build rules.
    pub makefile: PathBuf,

    /// Git repository that registers external apps as submodules.
    pub repo_root: PathBuf,

    /// Directory holding external apps, relative to repository root.
    pub apps_dir: PathBuf,

    /// List of apps administrators may disable.
    pub disabled_apps: PathBuf,

    /// List of apps to force enable.
    pub always_enabled_apps: PathBuf,

    /// List of apps removed from the distribution.
    pub removed_apps: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            server_root: PathBuf::from("/var/www/html"),
            manifest: PathBuf::from("core/shipped.json"),
            makefile: PathBuf::from("IONOS/Makefile"),
            repo_root: PathBuf::from("."),
            apps_dir: PathBuf::from("apps-external"),
            disabled_apps: PathBuf::from("IONOS/disabled-apps.list"),
            always_enabled_apps: PathBuf::from("IONOS/always-enabled-apps.list"),
            removed_apps: PathBuf::from("IONOS/removed-apps.list"),
        }
    }
}

/// Host administration command.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OccSettings {
    /// Program and leading arguments, run inside the server root.
    pub command: Vec<String>,
}

impl Default for OccSettings {
    fn default() -> Self {
        Self {
            command: vec!["php".into(), "occ".into()],
        }
    }
}

/// Makefile variables holding each app category.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryVariables {
    pub full_build: String,
    pub composer_only: String,
    pub composer_no_scripts: String,
    pub composer_no_scripts_with_npm: String,
    pub nothing_to_build: String,
    pub special: String,
}

impl CategoryVariables {
    /// Makefile variable of category.
    pub fn variable(&self, category: Category) -> &str {
        match category {
            Category::FullBuild => &self.full_build,
            Category::ComposerOnly => &self.composer_only,
            Category::ComposerNoScripts => &self.composer_no_scripts,
            Category::ComposerNoScriptsWithNpm => &self.composer_no_scripts_with_npm,
            Category::NothingToBuild => &self.nothing_to_build,
            Category::Special => &self.special,
        }
    }
}

impl Default for CategoryVariables {
    fn default() -> Self {
        Self {
            full_build: "FULL_BUILD_APPS".into(),
            composer_only: "COMPOSER_ONLY_APPS".into(),
            composer_no_scripts: "COMPOSER_NO_SCRIPTS_APPS".into(),
            composer_no_scripts_with_npm: "COMPOSER_NO_SCRIPTS_WITH_NPM_APPS".into(),
            nothing_to_build: "NOTHING_TO_BUILD_APPS".into(),
            special: "SPECIAL_BUILD_APPS".into(),
        }
    }
}

/// Validation settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidateSettings {
    /// Hand-written build rules that need no category, e.g.,
    /// "build_notify_push_binary_app".
    pub allowed_rules: Vec<String>,
}

/// Configuration block applied through the host application.
///
/// A block is skipped as a whole when one of its environment variables is
/// missing and the block is optional. Missing variables of a mandatory block
/// abort the run before anything is applied.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SettingBlock {
    /// Name of the block for logging.
    pub name: String,

    /// Environment variables the block needs.
    #[serde(default)]
    pub env: Vec<String>,

    /// Skip block instead of failing when variables are missing.
    #[serde(default)]
    pub optional: bool,

    /// App configuration values to set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_config: Vec<AppConfigEntry>,

    /// Raw administration subcommands to run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<CommandEntry>,
}

/// App configuration value to set.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct AppConfigEntry {
    pub app: AppId,
    pub key: String,

    /// Value, may reference environment variables as `${NAME}`.
    pub value: String,

    #[serde(default, rename = "type")]
    pub kind: ConfigType,

    #[serde(default)]
    pub sensitive: bool,
}

/// Raw administration subcommand.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct CommandEntry {
    /// Arguments, each may reference environment variables as `${NAME}`.
    pub args: Vec<String>,

    /// Keep arguments and output out of logs and errors.
    #[serde(default)]
    pub sensitive: bool,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
