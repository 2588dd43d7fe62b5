// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Always enabled app enforcement.
//!
//! Runs on every container start and after every upgrade. Each app of the
//! always-enabled list gets enabled if it is installed, and is then pinned
//! into the `alwaysEnabled` listing of the shipped apps manifest. Enabling
//! happens first, because the host application refuses to pin apps that are
//! not there yet.
//!
//! Enforcement is idempotent. A second run over the same list finds every
//! app already enabled and already pinned, so it neither calls the host
//! application nor writes the manifest.
//!
//! # Administrator Overrides
//!
//! Apps that an administrator disabled on purpose get enabled again. Each one
//! is logged as a warning before it is touched. Use a dry run to see what
//! would change first.

use crate::{
    applist::{AppId, AppList},
    host::{AppState, HostCli, HostError},
    manifest::{store::ManifestStore, ManifestDrafter, ManifestError, ManifestList},
};

use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Outcome of an enforcement run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnforcementReport {
    /// Apps enabled by this run.
    pub enabled: Vec<AppId>,

    /// Apps that were enabled already.
    pub already_enabled: Vec<AppId>,

    /// Apps skipped because they are not installed.
    pub skipped: Vec<AppId>,

    /// Apps the host application failed to enable.
    pub failed: Vec<AppId>,

    /// Apps newly added to the `alwaysEnabled` listing.
    pub pinned: Vec<AppId>,
}

impl EnforcementReport {
    /// Check if every installed app ended up enabled.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Enforce always enabled apps through host application and manifest.
#[derive(Debug)]
pub struct AppStateEnforcer<H, S>
where
    H: HostCli,
    S: ManifestStore,
{
    host: H,
    drafter: ManifestDrafter<S>,
    dry_run: bool,
}

impl<H, S> AppStateEnforcer<H, S>
where
    H: HostCli,
    S: ManifestStore,
{
    /// Construct new enforcer.
    pub fn new(host: H, drafter: ManifestDrafter<S>) -> Self {
        Self {
            host,
            drafter,
            dry_run: false,
        }
    }

    /// Only report what would change.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable every installed app of list, and pin it in the manifest.
    ///
    /// Apps that are not installed are skipped. Apps that fail to enable are
    /// counted as failed, but do not stop the run.
    ///
    /// # Errors
    ///
    /// - Return [`EnforceError::Host`] if installed apps cannot be listed.
    /// - Return [`EnforceError::Manifest`] if manifest cannot be updated.
    #[instrument(skip(self, apps), level = "debug")]
    pub fn enforce(&self, apps: &AppList) -> Result<EnforcementReport> {
        // INVARIANT: Broken manifest aborts before the host is touched.
        let manifest = self.drafter.current()?;
        let listing = self.host.list_apps()?;
        let mut report = EnforcementReport::default();
        let mut seen = BTreeSet::new();

        for app in apps.iter().filter(|app| seen.insert(*app)) {
            match listing.state(app) {
                AppState::Enabled => {
                    debug!("{app} already enabled");
                    report.already_enabled.push(app.clone());
                }
                AppState::NotInstalled => {
                    warn!("{app} is not installed, skip");
                    report.skipped.push(app.clone());
                }
                AppState::Disabled if self.dry_run => {
                    info!("would enable {app}");
                    report.enabled.push(app.clone());
                }
                AppState::Disabled => {
                    warn!("{app} is disabled, enable it again");
                    match self.host.enable_app(app) {
                        Ok(()) => {
                            info!("enabled {app}");
                            report.enabled.push(app.clone());
                        }
                        Err(err) => {
                            warn!("failed to enable {app}: {err}");
                            report.failed.push(app.clone());
                        }
                    }
                }
            }
        }

        // INVARIANT: Pin in list order, and only apps that are enabled now.
        let active = report
            .already_enabled
            .iter()
            .chain(report.enabled.iter())
            .collect::<BTreeSet<_>>();
        let pinned = apps
            .iter()
            .filter(|app| active.contains(app))
            .filter(|app| !manifest.contains(ManifestList::AlwaysEnabled, app))
            .fold(Vec::<AppId>::new(), |mut pinned, app| {
                if !pinned.contains(app) {
                    pinned.push(app.clone());
                }
                pinned
            });

        if self.dry_run {
            for app in &pinned {
                info!("would add {app} to {}", ManifestList::AlwaysEnabled);
            }
        } else if !pinned.is_empty() {
            self.drafter.edit(|edit| {
                for app in &pinned {
                    edit.add_to_always_enabled(app);
                }
            })?;
        }
        report.pinned = pinned;

        info!(
            "enabled {}, already enabled {}, skipped {}, failed {}, pinned {}",
            report.enabled.len(),
            report.already_enabled.len(),
            report.skipped.len(),
            report.failed.len(),
            report.pinned.len(),
        );

        Ok(report)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn drafter(&self) -> &ManifestDrafter<S> {
        &self.drafter
    }
}

/// Enforcement error types.
#[derive(Debug, thiserror::Error)]
pub enum EnforceError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Friendly result alias :3
pub type Result<T, E = EnforceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::fake::{FakeHostCli, HostCall},
        manifest::{store::MemoryManifestStore, ShippedManifest},
    };
    use pretty_assertions::assert_eq;

    fn app(id: &str) -> AppId {
        AppId::new(id).unwrap()
    }

    fn list(apps: &[&str]) -> AppList {
        AppList::new(apps.iter().map(|id| app(id)))
    }

    #[test]
    fn enforce_twice_is_idempotent() -> anyhow::Result<()> {
        let host = FakeHostCli::new().with_app("notify_push", false);
        let store = MemoryManifestStore::new(ShippedManifest::default());
        let enforcer = AppStateEnforcer::new(&host, ManifestDrafter::new(&store));
        let apps = list(&["notify_push"]);

        let first = enforcer.enforce(&apps)?;
        assert_eq!(first.enabled, vec![app("notify_push")]);
        assert_eq!(first.pinned, vec![app("notify_push")]);
        assert_eq!(host.enable_calls("notify_push"), 1);
        let after_first = store.document();

        let second = enforcer.enforce(&apps)?;
        assert_eq!(second.already_enabled, vec![app("notify_push")]);
        assert!(second.enabled.is_empty());
        assert!(second.pinned.is_empty());
        assert_eq!(host.enable_calls("notify_push"), 1);
        assert_eq!(store.document(), after_first);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.load()?.always_enabled, vec!["notify_push"]);

        Ok(())
    }

    #[test]
    fn missing_and_failing_apps_are_not_pinned() -> anyhow::Result<()> {
        let host = FakeHostCli::new()
            .with_app("files", true)
            .with_app("circles", false)
            .with_app("richdocuments", false)
            .with_failing_app("richdocuments");
        let store = MemoryManifestStore::new(ShippedManifest::default());
        let enforcer = AppStateEnforcer::new(&host, ManifestDrafter::new(&store));

        let report = enforcer.enforce(&list(&["circles", "spreed", "richdocuments", "files"]))?;

        assert_eq!(report.enabled, vec![app("circles")]);
        assert_eq!(report.already_enabled, vec![app("files")]);
        assert_eq!(report.skipped, vec![app("spreed")]);
        assert_eq!(report.failed, vec![app("richdocuments")]);
        assert!(!report.is_clean());
        assert_eq!(store.load()?.always_enabled, vec!["circles", "files"]);

        Ok(())
    }

    #[test]
    fn duplicate_list_entries_enable_once() -> anyhow::Result<()> {
        let host = FakeHostCli::new().with_app("circles", false);
        let store = MemoryManifestStore::new(ShippedManifest::default());
        let enforcer = AppStateEnforcer::new(&host, ManifestDrafter::new(&store));

        enforcer.enforce(&list(&["circles", "circles"]))?;

        assert_eq!(host.calls(), vec![HostCall::EnableApp("circles".into())]);
        assert_eq!(store.load()?.always_enabled, vec!["circles"]);

        Ok(())
    }

    #[test]
    fn invalid_manifest_aborts_before_host_calls() {
        let host = FakeHostCli::new().with_app("notify_push", false);
        let document = match serde_json::json!({"shippedApps": "broken"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let store = MemoryManifestStore::from_document(document);
        let enforcer = AppStateEnforcer::new(&host, ManifestDrafter::new(&store));

        let result = enforcer.enforce(&list(&["notify_push"]));

        assert!(matches!(result, Err(EnforceError::Manifest(_))));
        assert!(host.calls().is_empty());
        assert!(!host.is_enabled("notify_push"));
    }

    #[test]
    fn dry_run_changes_nothing() -> anyhow::Result<()> {
        let host = FakeHostCli::new().with_app("notify_push", false);
        let store = MemoryManifestStore::new(ShippedManifest::default());
        let enforcer = AppStateEnforcer::new(&host, ManifestDrafter::new(&store)).dry_run(true);

        let report = enforcer.enforce(&list(&["notify_push"]))?;

        assert_eq!(report.enabled, vec![app("notify_push")]);
        assert_eq!(report.pinned, vec![app("notify_push")]);
        assert!(host.calls().is_empty());
        assert_eq!(store.writes(), 0);

        Ok(())
    }
}
