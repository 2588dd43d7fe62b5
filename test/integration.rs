// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::RepoFixture;

use appship::{
    applist::AppList,
    build::{build_matrix, makefile::Makefile, Category, CategoryLists},
    config::{AppshipConfig, CategoryVariables},
    enforce::AppStateEnforcer,
    host::fake::{FakeHostCli, HostCall},
    manifest::{store::FileManifestStore, ManifestDrafter, ShippedManifest},
    prune::{disable_removed_apps, permit_disable_apps},
    validate::{
        category::validate_categories,
        submodule::{validate_submodules, Git2Registry},
        Problem, Severity,
    },
};

use anyhow::Result;
use indoc::{formatdoc, indoc};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    env::current_dir,
    fs::{read_to_string, write},
    path::Path,
};

const MAKEFILE: &str = indoc! {"
    FULL_BUILD_APPS = \\
        notify_push

    COMPOSER_ONLY_APPS = circles
    NOTHING_TO_BUILD_APPS = ghost
    SPECIAL_BUILD_APPS = richdocuments

    build_richdocuments_app:
    \tcd apps-external/richdocuments && make appstore
"};

const SHIPPED: &str = indoc! {r#"
    {
      "shippedApps": ["files", "circles", "survey_client"],
      "defaultEnabled": ["circles", "survey_client"],
      "alwaysEnabled": ["files"],
      "alwaysEnabledListVersion": 2
    }
"#};

fn test_config(server_root: &Path) -> Result<AppshipConfig> {
    let config = formatdoc! {r#"
        [paths]
        server_root = "{}"
        manifest = "core/shipped.json"
    "#, server_root.display()};

    Ok(config.parse::<AppshipConfig>()?)
}

#[sealed_test]
fn submodules_match_categories() -> Result<()> {
    let fixture = RepoFixture::new(current_dir()?)?;
    fixture.stage_and_commit("IONOS/Makefile", MAKEFILE)?;

    let notify_push = fixture.add_submodule("apps-external/notify_push")?;
    write(notify_push.join("composer.json"), "{}")?;
    write(
        notify_push.join("package.json"),
        r#"{"scripts": {"build": "vite build"}}"#,
    )?;
    let circles = fixture.add_submodule("apps-external/circles")?;
    write(circles.join("package.json"), r#"{"scripts": {"build": "webpack"}}"#)?;
    fixture.add_submodule("apps-external/richdocuments")?;
    fixture.add_submodule("apps-external/orphan")?;

    let config = test_config(&fixture.root())?;
    let makefile: Makefile = read_to_string(config.makefile_path())?.parse()?;
    let lists = CategoryLists::from_makefile(&makefile, &config.categories);
    let registry = Git2Registry::open(config.repo_root())?;

    let report = validate_submodules(&lists, &config.repo_root(), &config.paths.apps_dir, &registry)?;

    let mut result = report
        .findings()
        .iter()
        .map(|finding| (finding.severity, finding.problem, finding.app.clone()))
        .collect::<Vec<_>>();
    result.sort();
    assert_eq!(
        result,
        vec![
            (Severity::Error, Problem::MissingDirectory, "ghost".to_string()),
            (Severity::Error, Problem::NotSubmodule, "ghost".to_string()),
            (Severity::Error, Problem::UncategorizedSubmodule, "orphan".to_string()),
            (Severity::Warning, Problem::CategoryMismatch, "circles".to_string()),
        ]
    );
    assert!(!report.is_ok());

    Ok(())
}

#[test]
fn makefile_categories_validate_and_build_matrix() -> Result<()> {
    let makefile: Makefile = MAKEFILE.parse()?;
    let lists = CategoryLists::from_makefile(&makefile, &CategoryVariables::default());

    let report = validate_categories(&lists, &makefile, &[]);
    assert!(report.is_ok(), "{report}");

    let matrix = build_matrix(&lists, "apps-external")
        .into_iter()
        .map(|entry| (entry.app, entry.category))
        .collect::<Vec<_>>();
    assert_eq!(
        matrix,
        vec![
            ("notify_push".to_string(), Category::FullBuild),
            ("circles".to_string(), Category::ComposerOnly),
            ("ghost".to_string(), Category::NothingToBuild),
            ("richdocuments".to_string(), Category::Special),
        ]
    );

    Ok(())
}

#[sealed_test]
fn enforcement_run_twice_on_disk() -> Result<()> {
    let config = test_config(&current_dir()?)?;
    std::fs::create_dir_all("core")?;
    std::fs::create_dir_all("IONOS")?;
    write(config.manifest_path(), SHIPPED)?;
    write(
        config.always_enabled_apps_path(),
        "# pinned apps\nnotify_push\n\nfiles\n  \nspreed\n",
    )?;

    let host = FakeHostCli::new()
        .with_app("files", true)
        .with_app("notify_push", false);
    let apps = AppList::read(config.always_enabled_apps_path())?;
    let enforcer = AppStateEnforcer::new(
        &host,
        ManifestDrafter::new(FileManifestStore::new(config.manifest_path())),
    );

    enforcer.enforce(&apps)?;
    let after_first = read_to_string(config.manifest_path())?;
    let report = enforcer.enforce(&apps)?;

    assert_eq!(read_to_string(config.manifest_path())?, after_first);
    assert_eq!(host.enable_calls("notify_push"), 1);
    assert!(report.enabled.is_empty());
    assert_eq!(report.skipped.len(), 1);

    let manifest: ShippedManifest = after_first.parse()?;
    assert_eq!(manifest.always_enabled, vec!["files", "notify_push"]);
    assert_eq!(
        manifest.extra.get("alwaysEnabledListVersion"),
        Some(&serde_json::json!(2))
    );

    Ok(())
}

#[sealed_test]
fn disabled_and_removed_lists_on_disk() -> Result<()> {
    let config = test_config(&current_dir()?)?;
    std::fs::create_dir_all("core")?;
    std::fs::create_dir_all("IONOS")?;
    write(config.manifest_path(), SHIPPED)?;
    write(config.disabled_apps_path(), "circles\n")?;
    write(config.removed_apps_path(), "# gone\nsurvey_client\n")?;

    let host = FakeHostCli::new().with_app("survey_client", true);
    let drafter = ManifestDrafter::new(FileManifestStore::new(config.manifest_path()));

    permit_disable_apps(&drafter, &AppList::read(config.disabled_apps_path())?)?;
    disable_removed_apps(&host, &drafter, &AppList::read(config.removed_apps_path())?)?;

    let manifest: ShippedManifest = read_to_string(config.manifest_path())?.parse()?;
    assert_eq!(manifest.shipped_apps, vec!["files", "circles"]);
    assert!(manifest.default_enabled.is_empty());
    assert_eq!(manifest.always_enabled, vec!["files"]);
    assert_eq!(host.calls(), vec![HostCall::DisableApp("survey_client".into())]);

    Ok(())
}
