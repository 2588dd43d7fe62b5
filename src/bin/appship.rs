// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use appship::{
    applist::{AppId, AppList},
    build::{build_matrix, makefile::Makefile, CategoryLists},
    config::AppshipConfig,
    enforce::AppStateEnforcer,
    host::occ::OccCli,
    manifest::{store::FileManifestStore, ManifestDrafter},
    path::locate_config,
    prune::{disable_removed_apps, permit_disable_apps, removed_app_exclusions},
    settings::ConfigApplier,
    validate::{
        category::validate_categories,
        submodule::{validate_submodules, Git2Registry},
        Report,
    },
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "appship [options] <appship-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, env = "APPSHIP_CONFIG", value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        if let Command::InitConfig = self.command {
            print!("{}", AppshipConfig::default());
            return Ok(());
        }

        let config = load_config(self.config.as_deref())?;
        match self.command {
            Command::Ship(opts) => run_ship(&config, opts),
            Command::Unship(opts) => run_unship(&config, opts),
            Command::PermitDisable(opts) => run_permit_disable(&config, opts),
            Command::Enforce(opts) => run_enforce(&config, opts),
            Command::DisableRemoved(opts) => run_disable_removed(&config, opts),
            Command::RemovedPaths(opts) => run_removed_paths(&config, opts),
            Command::Configure => run_configure(&config),
            Command::ValidateCategories(opts) => run_validate_categories(&config, opts),
            Command::ValidateSubmodules(opts) => run_validate_submodules(&config, opts),
            Command::Matrix(opts) => run_matrix(&config, opts),
            Command::InitConfig => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Add apps to the shipped apps listing of the manifest.
    #[command(override_usage = "appship ship [options] <app>...")]
    Ship(AppsOptions),

    /// Remove apps from every listing of the manifest.
    #[command(override_usage = "appship unship [options] <app>...")]
    Unship(AppsOptions),

    /// Let administrators disable apps of the disabled apps list.
    #[command(override_usage = "appship permit-disable [options]")]
    PermitDisable(ListOptions),

    /// Enable apps of the always enabled list, and pin them in the manifest.
    #[command(override_usage = "appship enforce [options]")]
    Enforce(EnforceOptions),

    /// Unship and disable apps of the removed apps list that are enabled.
    #[command(override_usage = "appship disable-removed [options]")]
    DisableRemoved(ListOptions),

    /// Print archive exclusion patterns for apps of the removed apps list.
    #[command(override_usage = "appship removed-paths [options]")]
    RemovedPaths(ListOptions),

    /// Apply configuration blocks through the host application.
    #[command(override_usage = "appship configure [options]")]
    Configure,

    /// Validate app categories of the Makefile.
    #[command(override_usage = "appship validate-categories [options]")]
    ValidateCategories(MakefileOptions),

    /// Validate app categories against submodules of the apps directory.
    #[command(override_usage = "appship validate-submodules [options]")]
    ValidateSubmodules(MakefileOptions),

    /// Print build matrix of external apps.
    #[command(override_usage = "appship matrix [options]")]
    Matrix(MatrixOptions),

    /// Print default configuration file.
    #[command(override_usage = "appship init-config")]
    InitConfig,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AppsOptions {
    /// Apps to operate on.
    #[arg(required = true, value_name = "app")]
    pub apps: Vec<AppId>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// App list file to use instead of the configured one.
    #[arg(short, long, value_name = "path")]
    pub list: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EnforceOptions {
    /// App list file to use instead of the configured one.
    #[arg(short, long, value_name = "path")]
    pub list: Option<PathBuf>,

    /// Only report what would change.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MakefileOptions {
    /// Makefile to use instead of the configured one.
    #[arg(short, long, value_name = "path")]
    pub makefile: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MatrixOptions {
    /// Makefile to use instead of the configured one.
    #[arg(short, long, value_name = "path")]
    pub makefile: Option<PathBuf>,

    /// Print matrix as JSON.
    #[arg(short, long)]
    pub json: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(explicit: Option<&Path>) -> Result<AppshipConfig> {
    let working_dir = std::env::current_dir().context("cannot determine working directory")?;
    match locate_config(explicit, &working_dir)? {
        Some(path) => {
            info!("use configuration {:?}", path.display());
            let content = read_to_string(&path)
                .with_context(|| format!("failed to read configuration {:?}", path.display()))?;
            Ok(content.parse::<AppshipConfig>()?)
        }
        None => {
            info!("no configuration file found, use defaults");
            Ok(AppshipConfig::default())
        }
    }
}

fn drafter(config: &AppshipConfig) -> ManifestDrafter<FileManifestStore> {
    ManifestDrafter::new(FileManifestStore::new(config.manifest_path()))
}

fn occ(config: &AppshipConfig) -> Result<OccCli> {
    Ok(OccCli::new(&config.occ.command, &config.paths.server_root)?)
}

fn read_list(explicit: Option<PathBuf>, configured: PathBuf) -> Result<AppList> {
    Ok(AppList::read(explicit.unwrap_or(configured))?)
}

fn read_categories(
    config: &AppshipConfig,
    explicit: Option<PathBuf>,
) -> Result<(Makefile, CategoryLists)> {
    let path = explicit.unwrap_or_else(|| config.makefile_path());
    let makefile = read_to_string(&path)
        .with_context(|| format!("failed to read Makefile {:?}", path.display()))?
        .parse::<Makefile>()?;
    let lists = CategoryLists::from_makefile(&makefile, &config.categories);

    Ok((makefile, lists))
}

fn run_ship(config: &AppshipConfig, opts: AppsOptions) -> Result<()> {
    let saved = drafter(config).edit(|edit| {
        for app in &opts.apps {
            edit.ship_app(app);
        }
    })?;

    if !saved {
        info!("all apps already shipped");
    }

    Ok(())
}

fn run_unship(config: &AppshipConfig, opts: AppsOptions) -> Result<()> {
    let saved = drafter(config).edit(|edit| {
        for app in &opts.apps {
            edit.unship_app(app);
        }
    })?;

    if !saved {
        info!("no app was shipped");
    }

    Ok(())
}

fn run_permit_disable(config: &AppshipConfig, opts: ListOptions) -> Result<()> {
    let apps = read_list(opts.list, config.disabled_apps_path())?;
    permit_disable_apps(&drafter(config), &apps)?;

    Ok(())
}

fn run_enforce(config: &AppshipConfig, opts: EnforceOptions) -> Result<()> {
    let apps = read_list(opts.list, config.always_enabled_apps_path())?;
    let enforcer = AppStateEnforcer::new(occ(config)?, drafter(config)).dry_run(opts.dry_run);
    let report = enforcer.enforce(&apps)?;

    if !report.is_clean() {
        let failed = report
            .failed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        warn!("failed to enable {}", failed.join(", "));
    }

    Ok(())
}

fn run_disable_removed(config: &AppshipConfig, opts: ListOptions) -> Result<()> {
    let apps = read_list(opts.list, config.removed_apps_path())?;
    let disabled = disable_removed_apps(&occ(config)?, &drafter(config), &apps)?;
    info!("disabled {} removed apps", disabled.len());

    Ok(())
}

fn run_removed_paths(config: &AppshipConfig, opts: ListOptions) -> Result<()> {
    let apps = read_list(opts.list, config.removed_apps_path())?;
    for pattern in removed_app_exclusions(&config.paths.apps_dir, &apps) {
        println!("{pattern}");
    }

    Ok(())
}

fn run_configure(config: &AppshipConfig) -> Result<()> {
    if config.settings.is_empty() {
        info!("no setting blocks configured");
        return Ok(());
    }

    ConfigApplier::from_env(occ(config)?).apply(&config.settings)?;

    Ok(())
}

fn run_validate_categories(config: &AppshipConfig, opts: MakefileOptions) -> Result<()> {
    let (makefile, lists) = read_categories(config, opts.makefile)?;
    let report = validate_categories(&lists, &makefile, &config.validate.allowed_rules);
    finish_validation("category", report)
}

fn run_validate_submodules(config: &AppshipConfig, opts: MakefileOptions) -> Result<()> {
    let (_, lists) = read_categories(config, opts.makefile)?;
    let repo_root = config.repo_root();
    let registry = Git2Registry::open(&repo_root)?;
    let report = validate_submodules(&lists, &repo_root, &config.paths.apps_dir, &registry)?;
    finish_validation("submodule", report)
}

fn finish_validation(kind: &str, report: Report) -> Result<()> {
    print!("{report}");
    let errors = report.errors().count();
    let warnings = report.warnings().count();

    if !report.is_ok() {
        bail!("{kind} validation failed with {errors} errors and {warnings} warnings");
    }

    info!("{kind} validation passed with {warnings} warnings");
    Ok(())
}

fn run_matrix(config: &AppshipConfig, opts: MatrixOptions) -> Result<()> {
    let (_, lists) = read_categories(config, opts.makefile)?;
    let matrix = build_matrix(&lists, &config.paths.apps_dir);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&matrix)?);
    } else {
        for entry in &matrix {
            println!("{entry}");
        }
    }

    Ok(())
}
