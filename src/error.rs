use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for git-semver operations
#[derive(Error, Debug)]
pub enum GitSemverError {
    #[error("Invalid version '{text}': {reason}")]
    Parse { text: String, reason: String },

    #[error("Cannot bump {axis}: counter is at its maximum value")]
    BumpOverflow { axis: &'static str },

    #[error("Bump axis not supported: {0} (expected major|minor|patch|pre|final)")]
    InvalidAxis(String),

    #[error("Invalid pre-release identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Semver ledger not found at {0} (run `git-semver init`)")]
    LedgerNotFound(PathBuf),

    #[error("No version recorded for branch '{branch}'")]
    VersionNotFound { branch: String },

    #[error("Unable to determine branch for HEAD (set SEMVER_BRANCH)")]
    BranchUndeterminable,

    #[error("{commit} is already tagged: {tag}")]
    AlreadyTagged { commit: String, tag: String },

    #[error("Not a git repository: {0}")]
    NotARepo(PathBuf),

    #[error("Repository is bare: {0}")]
    BareRepository(PathBuf),

    #[error("Git {operation} failed: {source}")]
    Backend {
        operation: String,
        #[source]
        source: git2::Error,
    },

    #[error("Push to '{remote}' rejected: {reason}")]
    PushRejected { remote: String, reason: String },

    #[error("Unable to provision ledger: {}", .attempts.join("; "))]
    ProvisionFailed { attempts: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-semver
pub type Result<T> = std::result::Result<T, GitSemverError>;

impl GitSemverError {
    /// Create a parse error for the given input text
    pub fn parse(text: impl Into<String>, reason: impl Into<String>) -> Self {
        GitSemverError::Parse {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a backend failure with the name of the operation that produced it
    pub fn backend(operation: impl Into<String>, source: git2::Error) -> Self {
        GitSemverError::Backend {
            operation: operation.into(),
            source,
        }
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GitSemverError::Config(msg.into())
    }
}

/// Attach an operation name to raw `git2` results.
pub(crate) trait BackendContext<T> {
    fn during(self, operation: impl Into<String>) -> Result<T>;
}

impl<T> BackendContext<T> for std::result::Result<T, git2::Error> {
    fn during(self, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| GitSemverError::backend(operation, e))
    }
}
