//! Command orchestration
//!
//! Wires configuration, the source repository and the ledger together for each
//! subcommand. Kept apart from argument parsing so commands can be driven
//! programmatically (and from tests) without clap.

use std::path::Path;

use crate::config::Config;
use crate::domain::prerelease::validate_identifier;
use crate::domain::{bump, Axis, Tag, Version};
use crate::error::Result;
use crate::extent::Extent;
use crate::git::{Backend, Git2Backend, Git2Repository, Repository};
use crate::ledger::{read_version, write_version};
use crate::provision::{InitRequest, Provisioner};
use crate::publish::{publish, PublishReport};
use crate::tagger::tag;

/// A subcommand, decoupled from the CLI parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the current version (no subcommand)
    Show,
    /// Create the ledger if needed and record the initial version
    Init {
        version: Option<String>,
        force: bool,
    },
    Bump {
        axis: Axis,
        /// Pre-release identifier; only consulted by the `pre` axis
        pre: Option<String>,
        build: Option<String>,
    },
    Tag,
    Push,
}

/// Result of a successful command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Version now on record for the branch
    Version(Version),
    Tagged(Tag),
    Published(PublishReport),
}

/// Run `command` against the repository containing `workdir`
pub fn run(command: &Command, config: &Config, workdir: &Path) -> Result<Outcome> {
    let source = Git2Repository::discover(workdir)?;
    execute(&Git2Backend, source, command, config)
}

/// Run `command` with an explicit backend and an already opened source repository
pub fn execute<B, S>(backend: &B, source: S, command: &Command, config: &Config) -> Result<Outcome>
where
    B: Backend,
    S: Repository,
{
    validate(command)?;

    let my = Extent::open(source, config.branch.as_deref())?;
    let provisioner = Provisioner::new(backend, &config.remote_name, &config.user);

    match command {
        Command::Show => {
            let sv = provisioner.open(&my)?;
            Ok(Outcome::Version(read_version(&my, &sv)?))
        }
        Command::Init { version, force } => {
            let version = match version {
                Some(text) => Version::parse(text)?,
                None => config.init_version()?,
            };
            let request = InitRequest {
                version,
                force: *force,
            };
            let sv = provisioner.init(&my, &request)?;
            Ok(Outcome::Version(read_version(&my, &sv)?))
        }
        Command::Bump { axis, pre, build } => {
            let sv = provisioner.open(&my)?;
            let current = read_version(&my, &sv)?;

            let mut next = bump(&current, *axis, &config.bump_options(pre.as_deref()))?;
            if let Some(build) = build {
                next = next.with_build(build)?;
            }

            tracing::debug!(from = %current, to = %next, %axis, "bumping");
            write_version(&my, &sv, &next, &config.user)?;
            Ok(Outcome::Version(next))
        }
        Command::Tag => {
            let sv = provisioner.open(&my)?;
            Ok(Outcome::Tagged(tag(&my, &sv, &config.user)?))
        }
        Command::Push => {
            let sv = provisioner.open(&my)?;
            Ok(Outcome::Published(publish(&my, &sv, &config.remote_name)?))
        }
    }
}

/// Reject malformed command-line input before touching any repository
fn validate(command: &Command) -> Result<()> {
    match command {
        Command::Init {
            version: Some(text),
            ..
        } => {
            Version::parse(text)?;
        }
        Command::Bump { pre, build, .. } => {
            if let Some(identifier) = pre.as_deref().filter(|p| !p.is_empty()) {
                validate_identifier(identifier)?;
            }
            if let Some(build) = build {
                Version::new(0, 0, 0).with_build(build)?;
            }
        }
        _ => {}
    }
    Ok(())
}
