// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration applier.
//!
//! Wires environment variables of the container into the host application.
//! Each [`SettingBlock`] names the variables it needs, the app configuration
//! values to write, and any app specific administration commands to run.
//!
//! # Preflight
//!
//! Every block is checked for its variables before anything is applied. A
//! mandatory block with missing variables aborts the whole run without a
//! single call to the host application. An optional block with missing
//! variables is skipped with a warning. Variables that are set but empty
//! count as missing.

use crate::{
    applist::AppId,
    config::SettingBlock,
    host::{ConfigValue, HostCli, HostError},
};

use std::env::VarError;
use tracing::{debug, info, instrument, warn};

/// Outcome of applying configuration blocks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Blocks fully applied.
    pub applied: Vec<String>,

    /// Optional blocks skipped for missing variables.
    pub skipped: Vec<String>,
}

/// Apply configuration blocks through host application.
#[derive(Debug)]
pub struct ConfigApplier<H, F>
where
    H: HostCli,
    F: Fn(&str) -> Option<String>,
{
    host: H,
    lookup: F,
}

impl<H> ConfigApplier<H, fn(&str) -> Option<String>>
where
    H: HostCli,
{
    /// Construct new applier that reads the process environment.
    pub fn from_env(host: H) -> Self {
        Self::new(host, process_env)
    }
}

impl<H, F> ConfigApplier<H, F>
where
    H: HostCli,
    F: Fn(&str) -> Option<String>,
{
    /// Construct new applier with custom variable lookup.
    pub fn new(host: H, lookup: F) -> Self {
        Self { host, lookup }
    }

    /// Apply every block in order.
    ///
    /// # Errors
    ///
    /// - Return [`SettingsError::MissingEnv`] if a mandatory block lacks
    ///   variables. Nothing is applied in that case.
    /// - Return [`SettingsError::Expand`] if a value references an unset
    ///   variable.
    /// - Return [`SettingsError::SetConfig`] or [`SettingsError::Command`] if
    ///   the host application rejects a call.
    /// - Return [`SettingsError::SensitiveCommand`] if a sensitive command
    ///   fails. Its output is withheld.
    #[instrument(skip_all, level = "debug")]
    pub fn apply(&self, blocks: &[SettingBlock]) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        let mut ready = Vec::new();

        // INVARIANT: All blocks pass preflight before the first host call.
        for block in blocks {
            let missing = self.missing_env(block);
            if missing.is_empty() {
                ready.push(block);
            } else if block.optional {
                warn!("skip {}: missing {}", block.name, missing.join(", "));
                report.skipped.push(block.name.clone());
            } else {
                return Err(SettingsError::MissingEnv {
                    block: block.name.clone(),
                    missing,
                });
            }
        }

        for block in ready {
            self.apply_block(block)?;
            report.applied.push(block.name.clone());
        }

        info!(
            "applied {} setting blocks, skipped {}",
            report.applied.len(),
            report.skipped.len()
        );

        Ok(report)
    }

    fn missing_env(&self, block: &SettingBlock) -> Vec<String> {
        block
            .env
            .iter()
            .filter(|name| (self.lookup)(name.as_str()).is_none_or(|value| value.is_empty()))
            .cloned()
            .collect()
    }

    fn apply_block(&self, block: &SettingBlock) -> Result<()> {
        debug!("apply {}", block.name);
        for entry in &block.app_config {
            let value = ConfigValue::new(
                self.expand(&block.name, &entry.value)?,
                entry.kind,
                entry.sensitive,
            );
            self.host
                .set_app_config(&entry.app, &entry.key, &value)
                .map_err(|err| SettingsError::SetConfig {
                    source: err,
                    app: entry.app.clone(),
                    key: entry.key.clone(),
                })?;
            info!("set {} {} = {}", entry.app, entry.key, value.redacted());
        }

        for entry in &block.command {
            let args = entry
                .args
                .iter()
                .map(|arg| self.expand(&block.name, arg))
                .collect::<Result<Vec<_>>>()?;
            let subcommand = args.first().cloned().unwrap_or_default();

            match self.host.run(&args) {
                Ok(_) if entry.sensitive => debug!("ran {subcommand}"),
                Ok(output) => info!("ran {subcommand}: {output}"),
                Err(_) if entry.sensitive => {
                    return Err(SettingsError::SensitiveCommand {
                        block: block.name.clone(),
                        subcommand,
                    })
                }
                Err(err) => {
                    return Err(SettingsError::Command {
                        source: err,
                        block: block.name.clone(),
                    })
                }
            }
        }

        Ok(())
    }

    fn expand(&self, block: &str, input: &str) -> Result<String> {
        shellexpand::env_with_context(input, |name| {
            (self.lookup)(name)
                .map(Some)
                .ok_or(VarError::NotPresent)
        })
        .map(|value| value.into_owned())
        .map_err(|err| SettingsError::Expand {
            source: err,
            block: block.to_string(),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Configuration applier error types.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Mandatory block lacks environment variables.
    #[error("setting block {block:?} requires unset variables: {}", .missing.join(", "))]
    MissingEnv { block: String, missing: Vec<String> },

    /// Value references unset variable.
    #[error("failed to expand value of setting block {block:?}")]
    Expand {
        #[source]
        source: shellexpand::LookupError<VarError>,
        block: String,
    },

    /// Host application rejected configuration value.
    #[error("failed to set {app} {key}")]
    SetConfig {
        #[source]
        source: HostError,
        app: AppId,
        key: String,
    },

    /// Host application rejected command.
    #[error("command of setting block {block:?} failed")]
    Command {
        #[source]
        source: HostError,
        block: String,
    },

    /// Host application rejected sensitive command.
    #[error("sensitive command {subcommand:?} of setting block {block:?} failed")]
    SensitiveCommand { block: String, subcommand: String },
}

/// Friendly result alias :3
pub type Result<T, E = SettingsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppConfigEntry, CommandEntry},
        host::{
            fake::{FakeHostCli, HostCall},
            ConfigType,
        },
    };
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::collections::BTreeMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    fn office_block() -> SettingBlock {
        SettingBlock {
            name: "collabora".into(),
            env: vec!["COLLABORA_HOST".into(), "COLLABORA_SECRET".into()],
            optional: true,
            app_config: vec![
                AppConfigEntry {
                    app: AppId::new("richdocuments").unwrap(),
                    key: "wopi_url".into(),
                    value: "https://${COLLABORA_HOST}".into(),
                    kind: ConfigType::String,
                    sensitive: false,
                },
                AppConfigEntry {
                    app: AppId::new("richdocuments").unwrap(),
                    key: "wopi_secret".into(),
                    value: "${COLLABORA_SECRET}".into(),
                    kind: ConfigType::String,
                    sensitive: true,
                },
            ],
            command: vec![CommandEntry {
                args: vec!["richdocuments:activate-config".into()],
                sensitive: false,
            }],
        }
    }

    fn push_block() -> SettingBlock {
        SettingBlock {
            name: "notify_push".into(),
            env: vec!["PUSH_URL".into()],
            optional: false,
            app_config: vec![AppConfigEntry {
                app: AppId::new("notify_push").unwrap(),
                key: "base_endpoint".into(),
                value: "${PUSH_URL}".into(),
                kind: ConfigType::String,
                sensitive: false,
            }],
            command: Vec::new(),
        }
    }

    #[test]
    fn apply_expands_variables() -> anyhow::Result<()> {
        let host = FakeHostCli::new();
        let applier = ConfigApplier::new(
            &host,
            env(&[
                ("COLLABORA_HOST", "office.example.com"),
                ("COLLABORA_SECRET", "hunter2"),
            ]),
        );

        let report = applier.apply(&[office_block()])?;

        assert_eq!(report.applied, vec!["collabora"]);
        assert_eq!(
            host.app_config("richdocuments", "wopi_url"),
            Some("https://office.example.com".into())
        );
        assert_eq!(
            host.app_config("richdocuments", "wopi_secret"),
            Some("hunter2".into())
        );
        assert_eq!(
            host.calls().last(),
            Some(&HostCall::Run(vec!["richdocuments:activate-config".into()]))
        );

        Ok(())
    }

    #[test]
    fn sensitive_values_are_recorded_redacted() -> anyhow::Result<()> {
        let host = FakeHostCli::new();
        let applier = ConfigApplier::new(
            &host,
            env(&[
                ("COLLABORA_HOST", "office.example.com"),
                ("COLLABORA_SECRET", "hunter2"),
            ]),
        );

        applier.apply(&[office_block()])?;

        assert!(!format!("{:?}", host.calls()).contains("hunter2"));
        Ok(())
    }

    #[test]
    fn optional_block_with_missing_env_is_skipped() -> anyhow::Result<()> {
        let host = FakeHostCli::new();
        let applier = ConfigApplier::new(
            &host,
            env(&[("COLLABORA_HOST", ""), ("PUSH_URL", "https://push.example.com")]),
        );

        let report = applier.apply(&[office_block(), push_block()])?;

        assert_eq!(report.skipped, vec!["collabora"]);
        assert_eq!(report.applied, vec!["notify_push"]);
        assert_eq!(host.app_config("richdocuments", "wopi_url"), None);

        Ok(())
    }

    #[test]
    fn mandatory_block_with_missing_env_aborts_before_any_call() {
        let host = FakeHostCli::new();
        let applier = ConfigApplier::new(
            &host,
            env(&[
                ("COLLABORA_HOST", "office.example.com"),
                ("COLLABORA_SECRET", "hunter2"),
            ]),
        );

        let result = applier.apply(&[office_block(), push_block()]);

        match result {
            Err(SettingsError::MissingEnv { block, missing }) => {
                assert_eq!(block, "notify_push");
                assert_eq!(missing, vec!["PUSH_URL"]);
            }
            other => panic!("expected missing env, got {other:?}"),
        }
        assert!(host.calls().is_empty());
    }

    #[test]
    fn failing_sensitive_command_withholds_output() {
        let host = FakeHostCli::new();
        let block = SettingBlock {
            name: "signaling".into(),
            env: vec!["SIGNALING_SECRET".into()],
            optional: false,
            app_config: Vec::new(),
            command: vec![CommandEntry {
                args: vec!["talk:signaling:add".into(), "${SIGNALING_SECRET}".into()],
                sensitive: true,
            }],
        };
        let host = host.with_failing_command("talk:signaling:add");
        let applier = ConfigApplier::new(&host, env(&[("SIGNALING_SECRET", "hunter2")]));

        let result = applier.apply(&[block]);

        match result {
            Err(err @ SettingsError::SensitiveCommand { .. }) => {
                assert!(!format!("{err:?}").contains("hunter2"));
            }
            other => panic!("expected sensitive command failure, got {other:?}"),
        }
    }

    #[sealed_test(env = [("PUSH_URL", "https://push.example.com")])]
    fn from_env_reads_process_environment() -> anyhow::Result<()> {
        let host = FakeHostCli::new();
        let applier = ConfigApplier::from_env(&host);

        applier.apply(&[push_block()])?;

        assert_eq!(
            host.app_config("notify_push", "base_endpoint"),
            Some("https://push.example.com".into())
        );
        Ok(())
    }
}
