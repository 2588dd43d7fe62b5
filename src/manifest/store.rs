// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shipped apps manifest storage.
//!
//! Provides the file backed store used in production, and an in-memory store
//! that holds the manifest as a plain JSON object.

use crate::manifest::{ManifestError, Result, ShippedManifest};

use serde_json::{Map, Value};
use std::{
    cell::{Cell, RefCell},
    fs::{read_to_string, remove_file, rename, write},
    path::{Path, PathBuf},
    process,
};
use tracing::{debug, info, instrument};

/// Layer of indirection for manifest persistence.
pub trait ManifestStore {
    /// Load and validate manifest.
    fn load(&self) -> Result<ShippedManifest>;

    /// Validate and persist manifest.
    fn save(&self, manifest: &ShippedManifest) -> Result<()>;
}

impl<T> ManifestStore for &T
where
    T: ManifestStore + ?Sized,
{
    fn load(&self) -> Result<ShippedManifest> {
        (**self).load()
    }

    fn save(&self, manifest: &ShippedManifest) -> Result<()> {
        (**self).save(manifest)
    }
}

/// Manifest stored as JSON file on disk.
///
/// Saving goes through a temporary file next to the manifest. The temporary
/// file is parsed again, and only then renamed over the manifest. Readers
/// either see the old manifest, or the new one, never a partial write.
#[derive(Debug, Clone)]
pub struct FileManifestStore {
    manifest_path: PathBuf,
}

impl FileManifestStore {
    /// Construct new file backed manifest store.
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        self.manifest_path.as_path()
    }

    fn temp_path(&self) -> PathBuf {
        self.manifest_path
            .with_extension(format!("json.tmp-{}", process::id()))
    }

    /// Atomically replace manifest with payload.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::WriteTemp`] if temporary file cannot be
    ///   written.
    /// - Return [`ManifestError::CorruptWrite`] if temporary file does not
    ///   hold a valid manifest. The temporary file is removed.
    /// - Return [`ManifestError::Promote`] if temporary file cannot be
    ///   renamed over the manifest.
    pub(crate) fn write_atomic(&self, payload: &[u8]) -> Result<()> {
        let temp_path = self.temp_path();
        write(&temp_path, payload).map_err(|err| ManifestError::WriteTemp {
            source: err,
            temp_path: temp_path.clone(),
        })?;

        // INVARIANT: Never promote a manifest that fails to parse.
        let written = read_to_string(&temp_path).map_err(|err| {
            let _ = remove_file(&temp_path);
            ManifestError::WriteTemp {
                source: err,
                temp_path: temp_path.clone(),
            }
        })?;
        if let Err(err) = written.parse::<ShippedManifest>() {
            let _ = remove_file(&temp_path);
            return Err(ManifestError::CorruptWrite {
                source: err,
                temp_path,
            });
        }

        rename(&temp_path, &self.manifest_path).map_err(|err| {
            let _ = remove_file(&temp_path);
            ManifestError::Promote {
                source: err,
                temp_path: temp_path.clone(),
                manifest_path: self.manifest_path.clone(),
            }
        })?;

        Ok(())
    }
}

impl ManifestStore for FileManifestStore {
    #[instrument(skip(self), level = "debug")]
    fn load(&self) -> Result<ShippedManifest> {
        debug!("load manifest {:?}", self.manifest_path.display());
        let content =
            read_to_string(&self.manifest_path).map_err(|err| ManifestError::ReadManifest {
                source: err,
                manifest_path: self.manifest_path.clone(),
            })?;

        content.parse().map_err(|err| ManifestError::Invalid {
            source: err,
            manifest_path: self.manifest_path.clone(),
        })
    }

    #[instrument(skip(self, manifest), level = "debug")]
    fn save(&self, manifest: &ShippedManifest) -> Result<()> {
        let mut payload = serde_json::to_string_pretty(manifest)?;
        payload.push('\n');
        self.write_atomic(payload.as_bytes())?;
        info!("updated manifest {:?}", self.manifest_path.display());

        Ok(())
    }
}

/// Manifest held in memory as a JSON object.
///
/// Goes through the same serialization boundary as the file store, so a
/// document that does not match the manifest layout fails to load.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    document: RefCell<Map<String, Value>>,
    writes: Cell<usize>,
}

impl MemoryManifestStore {
    /// Construct new in-memory store holding manifest.
    pub fn new(manifest: ShippedManifest) -> Self {
        let document = match serde_json::to_value(manifest) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Self::from_document(document)
    }

    /// Construct new in-memory store from raw JSON object.
    pub fn from_document(document: Map<String, Value>) -> Self {
        Self {
            document: RefCell::new(document),
            writes: Cell::new(0),
        }
    }

    /// Snapshot of current document.
    pub fn document(&self) -> Value {
        Value::Object(self.document.borrow().clone())
    }

    /// Number of saves performed.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl ManifestStore for MemoryManifestStore {
    fn load(&self) -> Result<ShippedManifest> {
        serde_json::from_value(self.document()).map_err(|err| ManifestError::Invalid {
            source: err,
            manifest_path: PathBuf::from("<memory>"),
        })
    }

    fn save(&self, manifest: &ShippedManifest) -> Result<()> {
        let document = match serde_json::to_value(manifest)? {
            Value::Object(map) => map,
            other => {
                return Err(ManifestError::CorruptWrite {
                    source: serde::de::Error::custom(format!("expected object, got {other}")),
                    temp_path: PathBuf::from("<memory>"),
                })
            }
        };

        *self.document.borrow_mut() = document;
        self.writes.set(self.writes.get() + 1);

        Ok(())
    }
}
