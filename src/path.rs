// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the appship configuration file lives when the caller did
//! not name one explicitly.

use std::path::{Path, PathBuf};

/// File name of the appship configuration file.
pub const CONFIG_FILE_NAME: &str = "appship.toml";

/// Determine default absolute path to user configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/appship/appship.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoConfigDir`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn user_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("appship").join(CONFIG_FILE_NAME))
        .ok_or(NoConfigDir)
}

/// Locate configuration file.
///
/// Prefers `explicit` when given. Otherwise, picks `appship.toml` in
/// `working_dir` if it exists, falling back to [`user_config_path`]. Returns
/// `None` if no candidate exists, so the caller can use defaults.
///
/// # Errors
///
/// - Return [`NoConfigDir`] if nothing was found locally and the
///   configuration directory cannot be determined.
pub fn locate_config(explicit: Option<&Path>, working_dir: &Path) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(Some(path.to_path_buf()));
    }

    let local = working_dir.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Ok(Some(local));
    }

    let user = user_config_path()?;
    Ok(user.is_file().then_some(user))
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoConfigDir;

/// Friendly result alias :3
pub type Result<T, E = NoConfigDir> = std::result::Result<T, E>;
