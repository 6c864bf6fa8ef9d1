use crate::domain::bump::{BumpOptions, DEFAULT_PRE_PREFIX};
use crate::domain::Version;
use crate::error::{GitSemverError, Result};
use crate::git::Identity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Represents the complete configuration for git-semver.
///
/// Built once at startup (file, then environment) and passed by reference to every
/// operation; nothing below `main` reads the environment.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Remote used for cloning the ledger and for publishing
    #[serde(default = "default_remote_name")]
    pub remote_name: String,

    /// Identity recorded on ledger commits and version tags
    #[serde(default)]
    pub user: Identity,

    /// Pre-release identifier used when none is given or inherited
    #[serde(default = "default_pre_prefix")]
    pub pre_prefix: String,

    /// Branch name to use instead of resolving it from HEAD
    #[serde(default)]
    pub branch: Option<String>,

    /// Version written by `init` when no other is given
    #[serde(default = "default_init_version")]
    pub init_version: String,

    #[serde(default)]
    pub debug: bool,
}

fn default_remote_name() -> String {
    "origin".to_string()
}

fn default_pre_prefix() -> String {
    DEFAULT_PRE_PREFIX.to_string()
}

fn default_init_version() -> String {
    "0.0.0".to_string()
}

impl Default for Identity {
    fn default() -> Self {
        Identity::new("semver", "semver@semver.org")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote_name: default_remote_name(),
            user: Identity::default(),
            pre_prefix: default_pre_prefix(),
            branch: None,
            init_version: default_init_version(),
            debug: false,
        }
    }
}

/// Per-repository configuration file name
pub const CONFIG_FILE: &str = "gitsemver.toml";

/// Environment variables consulted for the branch override, in priority order
pub const BRANCH_VARIABLES: [&str; 3] = ["SEMVER_BRANCH", "GIT_BRANCH", "BRANCH_NAME"];

impl Config {
    /// Overlay `SEMVER_*` (and CI branch) variables read through `lookup`.
    ///
    /// Empty values are ignored, so an exported-but-empty variable never clears a
    /// setting from the config file.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(remote) = get("SEMVER_REMOTE_NAME") {
            self.remote_name = remote;
        }
        if let Some(prefix) = get("SEMVER_PRE_PREFIX") {
            self.pre_prefix = prefix;
        }
        if let Some(name) = get("SEMVER_USER_NAME") {
            self.user.name = name;
        }
        if let Some(email) = get("SEMVER_USER_EMAIL") {
            self.user.email = email;
        }
        if let Some(branch) = BRANCH_VARIABLES.iter().find_map(|key| get(key)) {
            self.branch = Some(branch);
        }
        if let Some(debug) = get("SEMVER_DEBUG") {
            self.debug = is_truthy(&debug);
        }
        self
    }

    /// Overlay the process environment
    pub fn with_process_env(self) -> Self {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Options for the `pre` bump axis, with an optional explicit identifier
    pub fn bump_options(&self, identifier: Option<&str>) -> BumpOptions {
        let options = BumpOptions::new(self.pre_prefix.as_str());
        match identifier {
            Some(identifier) => options.with_identifier(identifier),
            None => options,
        }
    }

    /// The configured initial version, parsed
    pub fn init_version(&self) -> Result<Version> {
        Version::parse(&self.init_version)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitsemver.toml` in the working directory
/// 3. `.gitsemver.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>, workdir: &Path) -> Result<Config> {
    let local = workdir.join(CONFIG_FILE);
    let path = if let Some(path) = config_path {
        Path::new(path).to_path_buf()
    } else if local.exists() {
        local
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".gitsemver.toml");
        if config_path.exists() {
            config_path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| {
        GitSemverError::config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&config_str).map_err(|e| {
        GitSemverError::config(format!("Cannot parse {}: {}", path.display(), e))
    })?;
    Ok(config)
}
