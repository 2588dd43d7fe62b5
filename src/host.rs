// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Host application administration.
//!
//! All app-state and configuration changes go through the host
//! application's own administration CLI ("occ"). This module models that CLI
//! as the [`HostCli`] trait, so reconciliation logic never needs to know
//! whether it talks to a real installation or to an in-memory stand-in.
//!
//! # See Also
//!
//! - [`occ`]
//! - [`fake`]

pub mod fake;
pub mod occ;

use crate::applist::AppId;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Layer of indirection for host application administration.
pub trait HostCli {
    /// List installed apps split by enabled state.
    fn list_apps(&self) -> Result<AppListing>;

    /// Enable installed app.
    fn enable_app(&self, app: &AppId) -> Result<()>;

    /// Disable enabled app.
    fn disable_app(&self, app: &AppId) -> Result<()>;

    /// Read app configuration value, if set.
    fn get_app_config(&self, app: &AppId, key: &str) -> Result<Option<String>>;

    /// Write app configuration value.
    fn set_app_config(&self, app: &AppId, key: &str, value: &ConfigValue) -> Result<()>;

    /// Delete app configuration value.
    fn delete_app_config(&self, app: &AppId, key: &str) -> Result<()>;

    /// Run app specific administration subcommand.
    ///
    /// Returns combined output of the subcommand.
    fn run(&self, args: &[String]) -> Result<String>;
}

impl<T> HostCli for &T
where
    T: HostCli + ?Sized,
{
    fn list_apps(&self) -> Result<AppListing> {
        (**self).list_apps()
    }

    fn enable_app(&self, app: &AppId) -> Result<()> {
        (**self).enable_app(app)
    }

    fn disable_app(&self, app: &AppId) -> Result<()> {
        (**self).disable_app(app)
    }

    fn get_app_config(&self, app: &AppId, key: &str) -> Result<Option<String>> {
        (**self).get_app_config(app, key)
    }

    fn set_app_config(&self, app: &AppId, key: &str, value: &ConfigValue) -> Result<()> {
        (**self).set_app_config(app, key, value)
    }

    fn delete_app_config(&self, app: &AppId, key: &str) -> Result<()> {
        (**self).delete_app_config(app, key)
    }

    fn run(&self, args: &[String]) -> Result<String> {
        (**self).run(args)
    }
}

/// State of an app inside the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Enabled,
    Disabled,
    NotInstalled,
}

/// Installed apps of host application.
///
/// Mirrors the JSON output of `app:list`. The host encodes an empty
/// listing as `[]` instead of `{}`, so both are accepted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct AppListing {
    #[serde(default, deserialize_with = "app_names")]
    pub enabled: BTreeSet<String>,

    #[serde(default, deserialize_with = "app_names")]
    pub disabled: BTreeSet<String>,
}

impl AppListing {
    /// Determine state of app.
    pub fn state(&self, app: &AppId) -> AppState {
        if self.enabled.contains(app.as_str()) {
            AppState::Enabled
        } else if self.disabled.contains(app.as_str()) {
            AppState::Disabled
        } else {
            AppState::NotInstalled
        }
    }
}

fn app_names<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Listing {
        Versions(BTreeMap<String, Value>),
        Empty(Vec<Value>),
    }

    match Listing::deserialize(deserializer)? {
        Listing::Versions(map) => Ok(map.into_keys().collect()),
        Listing::Empty(list) if list.is_empty() => Ok(BTreeSet::new()),
        Listing::Empty(_) => Err(serde::de::Error::custom(
            "expected app version map or empty list",
        )),
    }
}

/// Value type understood by the host configuration store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Array,
}

impl Display for ConfigType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::String => fmt.write_str("string"),
            Self::Integer => fmt.write_str("integer"),
            Self::Float => fmt.write_str("float"),
            Self::Boolean => fmt.write_str("boolean"),
            Self::Array => fmt.write_str("array"),
        }
    }
}

/// Typed app configuration value.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigValue {
    pub value: String,
    pub kind: ConfigType,
    pub sensitive: bool,
}

impl ConfigValue {
    pub fn new(value: impl Into<String>, kind: ConfigType, sensitive: bool) -> Self {
        Self {
            value: value.into(),
            kind,
            sensitive,
        }
    }

    /// Value safe to show in logs.
    pub fn redacted(&self) -> &str {
        if self.sensitive {
            "***"
        } else {
            self.value.as_str()
        }
    }
}

impl std::fmt::Debug for ConfigValue {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("ConfigValue")
            .field("value", &self.redacted())
            .field("kind", &self.kind)
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

/// Host administration error types.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Required binary cannot be found.
    #[error("required binary {binary:?} not found in PATH")]
    MissingDependency {
        #[source]
        source: which::Error,
        binary: String,
    },

    /// Administration command is empty.
    #[error("administration command cannot be empty")]
    EmptyCommand,

    /// Administration command cannot be spawned.
    #[error("failed to spawn {command}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Administration command exited with failure.
    #[error("command {command} failed:\n{message}")]
    Syscall { command: String, message: String },

    /// Administration command printed unexpected output.
    #[error("cannot parse output of {command}")]
    ParseOutput {
        #[source]
        source: serde_json::Error,
        command: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = HostError> = std::result::Result<T, E>;
