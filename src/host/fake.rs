// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! In-memory host application.
//!
//! Keeps installed apps and app configuration in memory, and records every
//! state changing call. Used to rehearse reconciliation without touching a
//! real installation.

use crate::{
    applist::AppId,
    host::{AppListing, ConfigValue, HostCli, HostError, Result},
};

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

/// State changing call received by [`FakeHostCli`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    EnableApp(String),
    DisableApp(String),
    SetAppConfig { app: String, key: String, value: String },
    DeleteAppConfig { app: String, key: String },
    Run(Vec<String>),
}

/// Host application kept in memory.
#[derive(Debug, Default)]
pub struct FakeHostCli {
    apps: RefCell<BTreeMap<String, bool>>,
    config: RefCell<BTreeMap<(String, String), String>>,
    failing: BTreeSet<String>,
    failing_commands: BTreeSet<String>,
    calls: RefCell<Vec<HostCall>>,
}

impl FakeHostCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install app in given enabled state.
    pub fn with_app(self, app: impl Into<String>, enabled: bool) -> Self {
        self.apps.borrow_mut().insert(app.into(), enabled);
        self
    }

    /// Make enabling or disabling app fail.
    pub fn with_failing_app(mut self, app: impl Into<String>) -> Self {
        self.failing.insert(app.into());
        self
    }

    /// Make subcommand fail.
    pub fn with_failing_command(mut self, subcommand: impl Into<String>) -> Self {
        self.failing_commands.insert(subcommand.into());
        self
    }

    /// All state changing calls in order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    /// Number of enable calls for app.
    pub fn enable_calls(&self, app: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, HostCall::EnableApp(id) if id == app))
            .count()
    }

    pub fn is_enabled(&self, app: &str) -> bool {
        self.apps.borrow().get(app).copied().unwrap_or(false)
    }

    pub fn app_config(&self, app: &str, key: &str) -> Option<String> {
        self.config
            .borrow()
            .get(&(app.to_string(), key.to_string()))
            .cloned()
    }

    fn toggle(&self, app: &AppId, enabled: bool) -> Result<()> {
        let verb = if enabled { "app:enable" } else { "app:disable" };
        let call = if enabled {
            HostCall::EnableApp(app.to_string())
        } else {
            HostCall::DisableApp(app.to_string())
        };
        self.calls.borrow_mut().push(call);

        if self.failing.contains(app.as_str()) {
            return Err(HostError::Syscall {
                command: format!("{verb} {app}"),
                message: format!("stderr: {app} refused to change state"),
            });
        }

        let mut apps = self.apps.borrow_mut();
        match apps.get_mut(app.as_str()) {
            Some(state) => {
                *state = enabled;
                Ok(())
            }
            None => Err(HostError::Syscall {
                command: format!("{verb} {app}"),
                message: format!("stderr: {app} not installed"),
            }),
        }
    }
}

impl HostCli for FakeHostCli {
    fn list_apps(&self) -> Result<AppListing> {
        let mut listing = AppListing::default();
        for (app, enabled) in self.apps.borrow().iter() {
            if *enabled {
                listing.enabled.insert(app.clone());
            } else {
                listing.disabled.insert(app.clone());
            }
        }

        Ok(listing)
    }

    fn enable_app(&self, app: &AppId) -> Result<()> {
        self.toggle(app, true)
    }

    fn disable_app(&self, app: &AppId) -> Result<()> {
        self.toggle(app, false)
    }

    fn get_app_config(&self, app: &AppId, key: &str) -> Result<Option<String>> {
        Ok(self.app_config(app.as_str(), key))
    }

    fn set_app_config(&self, app: &AppId, key: &str, value: &ConfigValue) -> Result<()> {
        self.calls.borrow_mut().push(HostCall::SetAppConfig {
            app: app.to_string(),
            key: key.to_string(),
            value: value.redacted().to_string(),
        });
        self.config
            .borrow_mut()
            .insert((app.to_string(), key.to_string()), value.value.clone());

        Ok(())
    }

    fn delete_app_config(&self, app: &AppId, key: &str) -> Result<()> {
        self.calls.borrow_mut().push(HostCall::DeleteAppConfig {
            app: app.to_string(),
            key: key.to_string(),
        });
        self.config
            .borrow_mut()
            .remove(&(app.to_string(), key.to_string()));

        Ok(())
    }

    fn run(&self, args: &[String]) -> Result<String> {
        self.calls.borrow_mut().push(HostCall::Run(args.to_vec()));
        match args.first() {
            Some(subcommand) if self.failing_commands.contains(subcommand) => {
                Err(HostError::Syscall {
                    command: args.join(" "),
                    message: format!("stderr: {subcommand} failed"),
                })
            }
            _ => Ok(String::new()),
        }
    }
}
