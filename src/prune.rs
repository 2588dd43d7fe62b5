// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Disabled and removed app processing.
//!
//! Two lists shrink what the distribution forces on its users:
//!
//! - Apps of the __disabled-apps__ list stay shipped, but lose their place in
//!   `defaultEnabled` and `alwaysEnabled`. Administrators can then disable
//!   them without the host application turning them back on.
//! - Apps of the __removed-apps__ list never make it into the distribution.
//!   The packaging step excludes their directories from the archive. At
//!   runtime, any removed app that is still enabled gets unshipped from the
//!   manifest and then disabled.

use crate::{
    applist::{AppId, AppList},
    host::{AppState, HostCli, HostError},
    manifest::{store::ManifestStore, ManifestDrafter, ManifestError},
};

use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Let administrators disable every app of list.
///
/// Returns true if the manifest changed.
///
/// # Errors
///
/// - Return [`PruneError::Manifest`] if manifest cannot be updated.
#[instrument(skip_all, level = "debug")]
pub fn permit_disable_apps<S>(drafter: &ManifestDrafter<S>, apps: &AppList) -> Result<bool>
where
    S: ManifestStore,
{
    let changed = drafter.edit(|edit| {
        for app in apps {
            if edit.permit_disable(app) {
                info!("{app} may now be disabled");
            } else {
                debug!("{app} already optional");
            }
        }
    })?;

    Ok(changed)
}

/// Archive exclusion patterns for every app of list.
///
/// Each pattern matches everything below the app directory, e.g.,
/// "apps-external/survey_client/*", ready to be handed to the archiver.
pub fn removed_app_exclusions(apps_dir: impl AsRef<Path>, apps: &AppList) -> Vec<String> {
    apps.iter()
        .map(|app| format!("{}/*", apps_dir.as_ref().join(app.as_str()).display()))
        .collect()
}

/// Unship and disable every removed app that is still enabled.
///
/// Apps are unshipped first, because the host application refuses to disable
/// apps pinned as always enabled. Returns the apps that were disabled.
///
/// # Errors
///
/// - Return [`PruneError::Host`] if apps cannot be listed or disabled.
/// - Return [`PruneError::Manifest`] if manifest cannot be updated.
#[instrument(skip_all, level = "debug")]
pub fn disable_removed_apps<H, S>(
    host: &H,
    drafter: &ManifestDrafter<S>,
    apps: &AppList,
) -> Result<Vec<AppId>>
where
    H: HostCli,
    S: ManifestStore,
{
    let listing = host.list_apps()?;
    let mut enabled = Vec::new();
    for app in apps {
        match listing.state(app) {
            AppState::Enabled if !enabled.contains(app) => enabled.push(app.clone()),
            AppState::Enabled => {}
            AppState::Disabled => debug!("{app} already disabled"),
            AppState::NotInstalled => debug!("{app} not installed"),
        }
    }

    if enabled.is_empty() {
        info!("no removed app is enabled");
        return Ok(enabled);
    }

    drafter.edit(|edit| {
        for app in &enabled {
            edit.unship_app(app);
        }
    })?;

    for app in &enabled {
        warn!("{app} is removed from the distribution but still enabled, disable it");
        host.disable_app(app)?;
    }

    Ok(enabled)
}

/// Pruning error types.
#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Friendly result alias :3
pub type Result<T, E = PruneError> = std::result::Result<T, E>;
