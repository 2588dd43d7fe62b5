// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shipped apps manifest reconciliation.
//!
//! The host application ships a JSON manifest named "shipped.json" that
//! decides how it treats the apps that come with the distribution. The
//! manifest holds three app listings:
//!
//! - `shippedApps`: apps that are part of the base distribution, and hidden
//!   from the app store view.
//! - `defaultEnabled`: apps that get enabled on fresh installs only.
//! - `alwaysEnabled`: apps that cannot be disabled at all. The host checks
//!   this listing on every app operation.
//!
//! # Reconciliation
//!
//! Membership is the only thing that matters in each listing. Thus, every
//! mutation is either an idempotent set union, or an idempotent set
//! difference keyed by app identifier. New entries are always appended at
//! the end of a listing to keep diffs against the vendor manifest small.
//! Every other field of the manifest is carried along untouched.
//!
//! The manifest is parsed before each batch of mutations, and the written
//! result is parsed again before it replaces the original. A manifest that
//! fails to parse at either point aborts the current run, because shipping
//! a corrupted manifest breaks the host application.
//!
//! # See Also
//!
//! - [`store`]

pub mod store;

use crate::{applist::AppId, manifest::store::ManifestStore};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};
use tracing::{debug, instrument};

/// Layout of the shipped apps manifest.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippedManifest {
    /// Apps that are part of the base distribution.
    pub shipped_apps: Vec<String>,

    /// Apps enabled on fresh installs.
    pub default_enabled: Vec<String>,

    /// Apps that cannot be disabled.
    pub always_enabled: Vec<String>,

    /// Vendor fields that are preserved as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShippedManifest {
    /// Borrow target app listing.
    pub fn list(&self, list: ManifestList) -> &[String] {
        match list {
            ManifestList::ShippedApps => &self.shipped_apps,
            ManifestList::DefaultEnabled => &self.default_enabled,
            ManifestList::AlwaysEnabled => &self.always_enabled,
        }
    }

    fn list_mut(&mut self, list: ManifestList) -> &mut Vec<String> {
        match list {
            ManifestList::ShippedApps => &mut self.shipped_apps,
            ManifestList::DefaultEnabled => &mut self.default_enabled,
            ManifestList::AlwaysEnabled => &mut self.always_enabled,
        }
    }

    /// Check if app is a member of target listing.
    pub fn contains(&self, list: ManifestList, app: &AppId) -> bool {
        self.list(list).iter().any(|entry| entry == app.as_str())
    }
}

impl FromStr for ShippedManifest {
    type Err = serde_json::Error;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(data)
    }
}

impl Display for ShippedManifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut out = serde_json::to_string_pretty(self).map_err(|_| FmtError)?;
        out.push('\n');
        fmt.write_str(out.as_str())
    }
}

/// App listings of the shipped apps manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestList {
    ShippedApps,
    DefaultEnabled,
    AlwaysEnabled,
}

impl ManifestList {
    /// All listings in manifest order.
    pub const ALL: [ManifestList; 3] = [
        ManifestList::ShippedApps,
        ManifestList::DefaultEnabled,
        ManifestList::AlwaysEnabled,
    ];
}

impl Display for ManifestList {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ShippedApps => fmt.write_str("shippedApps"),
            Self::DefaultEnabled => fmt.write_str("defaultEnabled"),
            Self::AlwaysEnabled => fmt.write_str("alwaysEnabled"),
        }
    }
}

/// Shipped apps manifest editor.
///
/// # Invariant
///
/// - Insertion never creates duplicate entries.
/// - Insertion appends to the end of a listing.
/// - Removal drops every occurrence of an app.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ManifestEdit {
    manifest: ShippedManifest,
    changed: bool,
}

impl ManifestEdit {
    /// Construct new manifest editor.
    pub fn new(manifest: ShippedManifest) -> Self {
        Self {
            manifest,
            changed: false,
        }
    }

    /// Insert app into target listing if absent.
    ///
    /// Returns true if the listing changed.
    pub fn insert(&mut self, list: ManifestList, app: &AppId) -> bool {
        if self.manifest.contains(list, app) {
            return false;
        }

        debug!("insert {app} into {list}");
        self.manifest.list_mut(list).push(app.to_string());
        self.changed = true;
        true
    }

    /// Remove all occurrences of app from target listing.
    ///
    /// Returns true if the listing changed.
    pub fn remove(&mut self, list: ManifestList, app: &AppId) -> bool {
        let entries = self.manifest.list_mut(list);
        let before = entries.len();
        entries.retain(|entry| entry != app.as_str());
        if entries.len() == before {
            return false;
        }

        debug!("remove {app} from {list}");
        self.changed = true;
        true
    }

    /// Mark app as part of the base distribution.
    pub fn ship_app(&mut self, app: &AppId) -> bool {
        self.insert(ManifestList::ShippedApps, app)
    }

    /// Drop app from every listing of the manifest.
    pub fn unship_app(&mut self, app: &AppId) -> bool {
        ManifestList::ALL
            .into_iter()
            .fold(false, |changed, list| self.remove(list, app) || changed)
    }

    /// Mark app as impossible to disable.
    pub fn add_to_always_enabled(&mut self, app: &AppId) -> bool {
        self.insert(ManifestList::AlwaysEnabled, app)
    }

    /// Let administrators disable app.
    ///
    /// App stays shipped, but is neither enabled by default nor forced on.
    pub fn permit_disable(&mut self, app: &AppId) -> bool {
        let default = self.remove(ManifestList::DefaultEnabled, app);
        let always = self.remove(ManifestList::AlwaysEnabled, app);
        default || always
    }

    /// Check if any edit changed the manifest.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Borrow manifest being edited.
    pub fn manifest(&self) -> &ShippedManifest {
        &self.manifest
    }

    /// Consume editor for its manifest.
    pub fn into_manifest(self) -> ShippedManifest {
        self.manifest
    }
}

/// Manage shipped apps manifest through a [`ManifestStore`].
#[derive(Debug)]
pub struct ManifestDrafter<S>
where
    S: ManifestStore,
{
    store: S,
}

impl<S> ManifestDrafter<S>
where
    S: ManifestStore,
{
    /// Construct new manifest drafter.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Edit shipped apps manifest.
    ///
    /// Loads current manifest into [`ManifestEdit`] instance, and applies
    /// given edits before saving the results back. Nothing gets saved if
    /// the edits left the manifest unchanged.
    ///
    /// Returns true if the manifest was saved.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError`] if manifest cannot be loaded or saved.
    #[instrument(skip(self, editor), level = "debug")]
    pub fn edit<E>(&self, editor: E) -> Result<bool>
    where
        E: FnOnce(&mut ManifestEdit),
    {
        let mut edit = ManifestEdit::new(self.store.load()?);
        editor(&mut edit);

        if !edit.is_changed() {
            debug!("manifest unchanged, skip write");
            return Ok(false);
        }

        self.store.save(edit.manifest())?;

        Ok(true)
    }

    /// Load current manifest.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError`] if manifest cannot be loaded.
    pub fn current(&self) -> Result<ShippedManifest> {
        self.store.load()
    }

    /// Borrow underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Shipped apps manifest error types.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file cannot be read from.
    #[error("failed to read manifest at {:?}", manifest_path.display())]
    ReadManifest {
        #[source]
        source: std::io::Error,
        manifest_path: PathBuf,
    },

    /// Manifest is not well-formed.
    #[error("manifest at {:?} is not a valid shipped apps manifest", manifest_path.display())]
    Invalid {
        #[source]
        source: serde_json::Error,
        manifest_path: PathBuf,
    },

    /// Manifest cannot be serialized.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// Temporary manifest file cannot be written to.
    #[error("failed to write temporary manifest at {:?}", temp_path.display())]
    WriteTemp {
        #[source]
        source: std::io::Error,
        temp_path: PathBuf,
    },

    /// Written manifest failed validation, original left in place.
    #[error("written manifest at {:?} is corrupt, original left untouched", temp_path.display())]
    CorruptWrite {
        #[source]
        source: serde_json::Error,
        temp_path: PathBuf,
    },

    /// Temporary manifest file cannot replace original.
    #[error("failed to move {:?} over {:?}", temp_path.display(), manifest_path.display())]
    Promote {
        #[source]
        source: std::io::Error,
        temp_path: PathBuf,
        manifest_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ManifestError> = std::result::Result<T, E>;
