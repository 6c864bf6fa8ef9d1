use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use git_semver::cli::{run, Command, Outcome};
use git_semver::config::{self, Config};
use git_semver::domain::Axis;
use git_semver::git::PushOutcome;
use git_semver::ui;

#[derive(clap::Parser)]
#[command(
    name = "git-semver",
    about = "Per-branch semantic versions recorded in an orphaned `semver` branch"
)]
struct Args {
    #[arg(short = 'C', global = true, help = "Run as if started in <path>")]
    dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, help = "Print version information")]
    version: bool,

    #[command(subcommand)]
    command: Option<Sub>,
}

#[derive(Subcommand)]
enum Sub {
    /// Create the ledger (cloning it from the remote if it exists there) and record the initial version
    Init {
        #[arg(long, help = "Initial version (default from config, 0.0.0)")]
        version: Option<String>,

        #[arg(short, long, help = "Overwrite an existing version for this branch")]
        force: bool,
    },
    /// Advance the version along one axis: major, minor, patch, pre or final
    Bump {
        axis: String,

        #[arg(long, help = "Pre-release identifier for the `pre` axis")]
        pre: Option<String>,

        #[arg(long, help = "Build metadata to attach to the new version")]
        build: Option<String>,
    },
    /// Tag HEAD with v<version>
    Tag,
    /// Push the ledger, then the current branch and its v* tags
    Push,
}

fn main() {
    let args = Args::parse();

    if args.version {
        println!("git-semver {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let workdir = match working_dir(args.dir.clone()) {
        Ok(dir) => dir,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    let config = match config::load_config(args.config.as_deref(), &workdir) {
        Ok(cfg) => cfg.with_process_env(),
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = try_main(args, &workdir, &config) {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Tracing is opt-in: `RUST_LOG` when set and valid, else debug output for this
/// crate when the configuration asks for it.
fn init_tracing(config: &Config) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| {
            EnvFilter::new(if config.debug {
                "git_semver=debug"
            } else {
                "off"
            })
        });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn try_main(args: Args, workdir: &Path, config: &Config) -> Result<()> {
    let command = match args.command {
        None => Command::Show,
        Some(Sub::Init { version, force }) => Command::Init { version, force },
        Some(Sub::Bump { axis, pre, build }) => Command::Bump {
            axis: axis.parse::<Axis>()?,
            pre,
            build,
        },
        Some(Sub::Tag) => Command::Tag,
        Some(Sub::Push) => Command::Push,
    };

    tracing::debug!(workdir = %workdir.display(), remote = %config.remote_name, "starting");
    let outcome = run(&command, config, workdir)?;

    match outcome {
        Outcome::Version(version) if command == Command::Show => ui::display_version(&version),
        Outcome::Version(version) => ui::display_status(&format!("semver: {}", version)),
        Outcome::Tagged(tag) => ui::display_status(&format!("Created tag {}", tag.name)),
        Outcome::Published(report) => {
            let everything_current = report.ledger == PushOutcome::AlreadyUpToDate
                && report.source == PushOutcome::AlreadyUpToDate;
            if everything_current {
                ui::display_status("Everything up-to-date");
            } else {
                ui::display_status(&format!("Pushed to {}", config.remote_name));
            }
        }
    }
    Ok(())
}

/// `-C` if given, else `$GIT_DIR`, else the current directory
fn working_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(git_dir) = std::env::var_os("GIT_DIR").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(git_dir));
    }
    std::env::current_dir().context("Cannot determine the current directory")
}
