//! devstack launcher CLI.
//!
//! Thin command surface over `devstack-core` and `devstack-upgrade`. Logs go
//! to stderr; reports and plans go to stdout.

mod commands;
mod launcher;
mod render;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "devstack", version)]
#[command(about = "Scaffold, run and upgrade devstack projects")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Cache directory (defaults to the per-user cache)
    #[arg(long, global = true, env = "DEVSTACK_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upgrade a project to a newer (or older) release
    Upgrade {
        /// Target version (defaults to the latest release)
        #[arg(long = "version")]
        target: Option<String>,

        /// Print the plan without changing anything or calling docker
        #[arg(long)]
        dry_run: bool,

        /// Proceed through breaking changes without asking
        #[arg(long)]
        force: bool,

        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Report breaking changes between two versions
    Check {
        from: String,
        to: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the deployment mode
    Mode {
        #[command(subcommand)]
        action: ModeAction,
    },

    /// List or download project templates
    Templates {
        #[command(subcommand)]
        action: TemplatesAction,
    },

    /// Inspect or clear the download cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum ModeAction {
    /// Print the detected mode and what decided it
    Show {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Persist a mode marker (`default` or `app-dev`)
    Set {
        mode: String,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum TemplatesAction {
    /// List the templates published with a release
    List {
        #[arg(long, default_value = "latest")]
        version: String,
    },
    /// Download, verify and extract a template
    Download {
        name: String,
        #[arg(long, default_value = "latest")]
        version: String,
        /// Directory to extract into (defaults to ./<name>)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show cached entries per namespace
    List,
    /// Print the total cache size
    Size,
    /// Remove every cached manifest and archive
    Clear,
    /// Remove cached archives of one template
    Evict {
        template: String,
        #[arg(long)]
        version: Option<String>,
    },
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let launcher = launcher::Launcher::new(cli.cache_dir)?;

    match cli.command {
        Command::Upgrade {
            target,
            dry_run,
            force,
            dir,
        } => {
            let options = devstack_upgrade::UpgradeOptions {
                target,
                dry_run,
                force,
            };
            commands::upgrade(&launcher, &dir, options).await
        }
        Command::Check { from, to, json } => commands::check(&launcher, &from, &to, json).await,
        Command::Mode { action } => match action {
            ModeAction::Show { dir } => commands::mode_show(&dir).await,
            ModeAction::Set { mode, dir } => commands::mode_set(&dir, &mode),
        },
        Command::Templates { action } => match action {
            TemplatesAction::List { version } => commands::templates_list(&launcher, &version).await,
            TemplatesAction::Download { name, version, dir } => {
                let dir = dir.unwrap_or_else(|| PathBuf::from(&name));
                commands::templates_download(&launcher, &name, &version, &dir).await
            }
        },
        Command::Cache { action } => match action {
            CacheAction::List => commands::cache_list(&launcher),
            CacheAction::Size => commands::cache_size(&launcher),
            CacheAction::Clear => commands::cache_clear(&launcher),
            CacheAction::Evict { template, version } => {
                commands::cache_evict(&launcher, &template, version.as_deref())
            }
        },
    }
}
