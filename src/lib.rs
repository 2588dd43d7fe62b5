// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shipped apps reconciliation for Nextcloud distribution builds.
//!
//! A distribution of the host application decides which apps it ships, which
//! ones are enabled by default, and which ones users can never turn off. All
//! three facts live in the __shipped apps manifest__ (`core/shipped.json`).
//! Plain text app lists in the distribution repository drive changes to that
//! manifest, and drive the host application itself through its
//! administration CLI.
//!
//! At build time, the app lists of the Makefile are validated against each
//! other and against the git submodules that hold the external apps.
//!
//! # See Also
//!
//! - [`manifest`]
//! - [`enforce`]
//! - [`prune`]
//! - [`validate`]

pub mod applist;
pub mod build;
pub mod config;
pub mod enforce;
pub mod host;
pub mod manifest;
pub mod path;
pub mod prune;
pub mod settings;
pub mod validate;

pub use applist::{AppId, AppList};
pub use config::AppshipConfig;
pub use manifest::{ManifestDrafter, ShippedManifest};
