// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Host administration through the "occ" command.
//!
//! Every call spawns the configured command in the server root, waits for
//! it, and treats a non-zero exit as failure. Output of failed calls is
//! attached to the error, so the original message of the host application
//! reaches the operator.

use crate::{
    applist::AppId,
    host::{AppListing, ConfigValue, HostCli, HostError, Result},
};

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Command, Output},
};
use tracing::{debug, info, instrument};

/// Host administration via spawned "occ" process.
#[derive(Debug, Clone)]
pub struct OccCli {
    program: String,
    prefix: Vec<String>,
    working_dir: PathBuf,
}

impl OccCli {
    /// Construct new occ caller.
    ///
    /// The first element of `command` is the program to spawn, the rest are
    /// arguments placed in front of every call, e.g., `["php", "occ"]`.
    ///
    /// # Errors
    ///
    /// - Return [`HostError::EmptyCommand`] if `command` is empty.
    /// - Return [`HostError::MissingDependency`] if program is not in PATH.
    pub fn new(command: &[String], working_dir: impl Into<PathBuf>) -> Result<Self> {
        let (program, prefix) = command.split_first().ok_or(HostError::EmptyCommand)?;

        // INVARIANT: Missing binaries abort before any call is made.
        which::which(program).map_err(|err| HostError::MissingDependency {
            source: err,
            binary: program.clone(),
        })?;

        Ok(Self {
            program: program.clone(),
            prefix: prefix.to_vec(),
            working_dir: working_dir.into(),
        })
    }

    pub fn working_dir(&self) -> &Path {
        self.working_dir.as_path()
    }

    fn expand_bin_args(&self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .current_dir(&self.working_dir)
            .args(&self.prefix)
            .arg("--no-interaction")
            .args(args);
        command
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.prefix.iter().map(String::as_str));
        parts.extend(args);
        format!("{:?}", parts.join(" "))
    }

    fn call(&self, args: &[&str]) -> Result<String> {
        self.call_described(args, self.describe(args))
    }

    fn call_described(&self, args: &[&str], description: String) -> Result<String> {
        debug!("run {}", args.first().copied().unwrap_or_default());
        let output = self.spawn(args, &description)?;
        let message = combined_output(&output);

        if !output.status.success() {
            return Err(HostError::Syscall {
                command: description,
                message,
            });
        }

        Ok(message)
    }

    fn spawn(&self, args: &[&str], description: &str) -> Result<Output> {
        self.expand_bin_args(args)
            .output()
            .map_err(|err| HostError::Spawn {
                source: err,
                command: description.to_string(),
            })
    }
}

impl HostCli for OccCli {
    #[instrument(skip(self), level = "debug")]
    fn list_apps(&self) -> Result<AppListing> {
        let args = ["app:list", "--output=json"];
        let description = self.describe(&args);
        let output = self.spawn(&args, &description)?;
        if !output.status.success() {
            return Err(HostError::Syscall {
                command: description,
                message: combined_output(&output),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|err| HostError::ParseOutput {
            source: err,
            command: description,
        })
    }

    #[instrument(skip(self), level = "debug")]
    fn enable_app(&self, app: &AppId) -> Result<()> {
        let output = self.call(&["app:enable", app.as_str()])?;
        info!("{output}");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn disable_app(&self, app: &AppId) -> Result<()> {
        let output = self.call(&["app:disable", app.as_str()])?;
        info!("{output}");
        Ok(())
    }

    fn get_app_config(&self, app: &AppId, key: &str) -> Result<Option<String>> {
        let args = ["config:app:get", app.as_str(), key];
        let description = self.describe(&args);
        let output = self.spawn(&args, &description)?;

        // INVARIANT: Exit code 1 without output means the key is not set.
        if output.status.code() == Some(1) && output.stdout.is_empty() {
            return Ok(None);
        }

        if !output.status.success() {
            return Err(HostError::Syscall {
                command: description,
                message: combined_output(&output),
            });
        }

        Ok(Some(chomp(String::from_utf8_lossy(&output.stdout).into_owned())))
    }

    #[instrument(skip(self, value), fields(value = value.redacted()), level = "debug")]
    fn set_app_config(&self, app: &AppId, key: &str, value: &ConfigValue) -> Result<()> {
        let value_arg = format!("--value={}", value.value);
        let type_arg = format!("--type={}", value.kind);
        let mut args = vec!["config:app:set", app.as_str(), key, value_arg.as_str(), type_arg.as_str()];
        if value.sensitive {
            args.push("--sensitive");
        }

        // INVARIANT: Sensitive values never show up in logs or errors.
        let redacted_arg = format!("--value={}", value.redacted());
        let shown = args
            .iter()
            .map(|arg| if *arg == value_arg { redacted_arg.as_str() } else { *arg })
            .collect::<Vec<_>>();
        let description = self.describe(&shown);

        self.call_described(&args, description)?;
        Ok(())
    }

    fn delete_app_config(&self, app: &AppId, key: &str) -> Result<()> {
        self.call(&["config:app:delete", app.as_str(), key])?;
        Ok(())
    }

    fn run(&self, args: &[String]) -> Result<String> {
        let args = args.iter().map(String::as_str).collect::<Vec<_>>();
        self.call(&args)
    }
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    chomp(message)
}

// INVARIANT: Chomp trailing newlines.
fn chomp(message: String) -> String {
    message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message)
}
