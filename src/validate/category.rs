// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Category uniqueness and build rule consistency.

use crate::{
    build::{makefile::Makefile, Category, CategoryLists},
    validate::{Finding, Problem, Report},
};

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Validate category lists against each other and the Makefile.
///
/// Checks that:
///
/// 1. Every app is listed in at most one category. Each offending app gets
///    one finding naming all of its categories.
/// 2. No app is listed twice in the same category.
/// 3. Every special app has a hand-written build rule.
/// 4. Every hand-written build rule outside `allowed_rules` belongs to a
///    special app, and never to an app of a dynamic category.
#[instrument(skip_all, level = "debug")]
pub fn validate_categories(
    lists: &CategoryLists,
    makefile: &Makefile,
    allowed_rules: &[String],
) -> Report {
    let mut report = Report::new();
    check_uniqueness(lists, &mut report);
    check_rules(lists, makefile, allowed_rules, &mut report);
    debug!("category validation found {} problems", report.findings().len());
    report
}

fn check_uniqueness(lists: &CategoryLists, report: &mut Report) {
    let mut seen = BTreeSet::new();
    for (_, app) in lists.iter() {
        if !seen.insert(app) {
            continue;
        }

        let categories = lists.categories_of(app);
        if categories.len() > 1 {
            let names = categories
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            report.push(Finding::error(
                Problem::DuplicateCategory,
                app,
                format!("listed in {names}"),
            ));
        }
    }

    for category in Category::ALL {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for app in lists.apps(category) {
            *counts.entry(app.as_str()).or_default() += 1;
        }

        for (app, count) in counts.into_iter().filter(|(_, count)| *count > 1) {
            report.push(Finding::error(
                Problem::DuplicateEntry,
                app,
                format!("listed {count} times in {category}"),
            ));
        }
    }
}

fn check_rules(
    lists: &CategoryLists,
    makefile: &Makefile,
    allowed_rules: &[String],
    report: &mut Report,
) {
    let mut special = BTreeSet::new();
    for app in lists.apps(Category::Special) {
        if !special.insert(app.as_str()) {
            continue;
        }

        let target = format!("build_{app}_app");
        if !makefile.has_rule(&target) {
            report.push(Finding::error(
                Problem::MissingRule,
                app.as_str(),
                format!("no {target} rule"),
            ));
        }
    }

    for (target, app) in makefile.app_rules() {
        if allowed_rules.iter().any(|allowed| allowed == target) {
            continue;
        }

        if lists.is_dynamic(app) {
            let categories = lists
                .categories_of(app)
                .into_iter()
                .filter(|category| category.is_dynamic())
                .map(|category| category.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            report.push(Finding::error(
                Problem::RuleConflict,
                app,
                format!("{target} collides with pattern rule of {categories}"),
            ));
        } else if !special.contains(app) {
            report.push(Finding::error(
                Problem::UncategorizedRule,
                app,
                format!("{target} builds an app outside the special category"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryVariables;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn validate(makefile: &str, allowed: &[&str]) -> anyhow::Result<Report> {
        let makefile: Makefile = makefile.parse()?;
        let lists = CategoryLists::from_makefile(&makefile, &CategoryVariables::default());
        let allowed = allowed.iter().map(ToString::to_string).collect::<Vec<_>>();
        Ok(validate_categories(&lists, &makefile, &allowed))
    }

    #[test]
    fn consistent_makefile_passes() -> anyhow::Result<()> {
        let report = validate(
            indoc! {"
                FULL_BUILD_APPS = activity spreed
                COMPOSER_ONLY_APPS = user_oidc
                SPECIAL_BUILD_APPS = notify_push

                build_notify_push_app:
                \tcargo build --release
            "},
            &[],
        )?;

        assert!(report.findings().is_empty());
        Ok(())
    }

    #[test]
    fn app_in_two_categories_is_one_error() -> anyhow::Result<()> {
        let report = validate(
            indoc! {"
                FULL_BUILD_APPS = activity spreed
                COMPOSER_ONLY_APPS = spreed
            "},
            &[],
        )?;

        assert_eq!(
            report.findings(),
            &[Finding::error(
                Problem::DuplicateCategory,
                "spreed",
                "listed in full-build, composer-only"
            )]
        );
        Ok(())
    }

    #[test]
    fn repeated_entry_in_one_category() -> anyhow::Result<()> {
        let report = validate("NOTHING_TO_BUILD_APPS = theming_customcss theming_customcss\n", &[])?;

        assert_eq!(
            report.findings(),
            &[Finding::error(
                Problem::DuplicateEntry,
                "theming_customcss",
                "listed 2 times in nothing-to-build"
            )]
        );
        Ok(())
    }

    #[test]
    fn rule_problems_are_reported() -> anyhow::Result<()> {
        let report = validate(
            indoc! {"
                FULL_BUILD_APPS = mail
                SPECIAL_BUILD_APPS = notify_push richdocumentscode

                build_richdocumentscode_app:
                \t./fetch.sh
                build_mail_app:
                \tmake -C apps-external/mail
                build_viewer_app:
                \tnpm ci
                build_notify_push_binary_app:
                \tcurl -O notify_push
            "},
            &["build_notify_push_binary_app"],
        )?;

        let expect = vec![
            Finding::error(Problem::MissingRule, "notify_push", "no build_notify_push_app rule"),
            Finding::error(
                Problem::RuleConflict,
                "mail",
                "build_mail_app collides with pattern rule of full-build",
            ),
            Finding::error(
                Problem::UncategorizedRule,
                "viewer",
                "build_viewer_app builds an app outside the special category",
            ),
        ];
        assert_eq!(report.findings(), expect.as_slice());
        assert!(!report.is_ok());
        Ok(())
    }
}
