// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Makefile inspection.
//!
//! Only the two things appship cares about are extracted from a Makefile:
//! variable assignments, and the targets of hand-written app build rules.
//! Anything else, e.g., recipes, conditionals, includes, is skipped.

use std::{
    collections::{BTreeMap, BTreeSet},
    str::FromStr,
};

/// Variables and app build rules of a Makefile.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Makefile {
    variables: BTreeMap<String, Vec<String>>,
    rules: BTreeSet<String>,
}

impl Makefile {
    /// Words assigned to variable.
    pub fn variable(&self, name: &str) -> Option<&[String]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    /// Hand-written app build rules as pairs of target and app name.
    ///
    /// A hand-written app build rule is any explicit target named
    /// `build_<app>_app`. Pattern rules never count.
    pub fn app_rules(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules
            .iter()
            .filter_map(|target| rule_app(target).map(|app| (target.as_str(), app)))
    }

    /// Check if explicit target exists.
    pub fn has_rule(&self, target: &str) -> bool {
        self.rules.contains(target)
    }
}

impl FromStr for Makefile {
    type Err = std::convert::Infallible;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut makefile = Makefile::default();

        for line in logical_lines(data) {
            // Recipe lines.
            if line.starts_with('\t') {
                continue;
            }

            let line = strip_comment(&line);
            if line.trim().is_empty() {
                continue;
            }

            if let Some((name, op, value)) = split_assignment(line) {
                let words = value.split_whitespace().map(str::to_owned);
                let entry = makefile.variables.entry(name.to_string()).or_default();
                if op != "+=" {
                    entry.clear();
                }
                entry.extend(words);
                continue;
            }

            if let Some((targets, _)) = line.split_once(':') {
                for target in targets.split_whitespace() {
                    if !target.contains(['%', '$']) {
                        makefile.rules.insert(target.to_string());
                    }
                }
            }
        }

        Ok(makefile)
    }
}

fn rule_app(target: &str) -> Option<&str> {
    target
        .strip_prefix("build_")
        .and_then(|rest| rest.strip_suffix("_app"))
        .filter(|app| !app.is_empty())
}

// INVARIANT: Backslash continued lines become one logical line.
fn logical_lines(data: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continued = false;

    for raw in data.lines() {
        let (body, continues) = match raw.strip_suffix('\\') {
            Some(body) => (body, true),
            None => (raw, false),
        };

        if continued {
            current.push(' ');
            current.push_str(body.trim_start());
        } else {
            current = body.to_string();
        }

        continued = continues;
        if !continued {
            lines.push(std::mem::take(&mut current));
        }
    }

    if continued {
        lines.push(current);
    }

    lines
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(index) => &line[..index],
        None => line,
    }
}

fn split_assignment(line: &str) -> Option<(&str, &str, &str)> {
    let line = line.trim_start();
    let line = line.strip_prefix("override ").unwrap_or(line);
    let line = line.strip_prefix("export ").unwrap_or(line);

    let name_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'))
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() {
        return None;
    }

    let rest = line[name_end..].trim_start();
    for op in ["::=", ":=", "+=", "?=", "="] {
        if let Some(value) = rest.strip_prefix(op) {
            return Some((name, op, value.trim()));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const MAKEFILE: &str = indoc! {"
        # Apps that need composer and npm.
        FULL_BUILD_APPS = \\
        \tactivity \\
        \tspreed # video calls

        COMPOSER_ONLY_APPS := files_antivirus
        COMPOSER_ONLY_APPS += user_oidc
        EMPTY_APPS =

        .PHONY: build_notify_push_app

        build_%_app:
        \tcd apps-external/$* && make

        build_notify_push_app: build_dep_rust
        \tcd apps-external/notify_push && cargo build --release

        build_richdocumentscode_app build_viewer_app:
        \techo done
    "};

    #[test]
    fn parse_variables_with_continuations() -> anyhow::Result<()> {
        let makefile: Makefile = MAKEFILE.parse()?;

        assert_eq!(
            makefile.variable("FULL_BUILD_APPS"),
            Some(["activity".to_string(), "spreed".to_string()].as_slice())
        );
        assert_eq!(
            makefile.variable("COMPOSER_ONLY_APPS"),
            Some(["files_antivirus".to_string(), "user_oidc".to_string()].as_slice())
        );
        assert_eq!(makefile.variable("EMPTY_APPS"), Some([].as_slice()));
        assert_eq!(makefile.variable("MISSING"), None);

        Ok(())
    }

    #[test]
    fn parse_explicit_app_rules_only() -> anyhow::Result<()> {
        let makefile: Makefile = MAKEFILE.parse()?;

        let rules = makefile.app_rules().collect::<Vec<_>>();
        assert_eq!(
            rules,
            vec![
                ("build_notify_push_app", "notify_push"),
                ("build_richdocumentscode_app", "richdocumentscode"),
                ("build_viewer_app", "viewer"),
            ]
        );
        assert!(makefile.has_rule(".PHONY"));
        assert!(!makefile.has_rule("build_%_app"));

        Ok(())
    }

    #[test]
    fn plain_assignment_replaces_earlier_value() -> anyhow::Result<()> {
        let makefile: Makefile = "APPS = a b\nAPPS = c\n".parse()?;
        assert_eq!(makefile.variable("APPS"), Some(["c".to_string()].as_slice()));
        Ok(())
    }
}
