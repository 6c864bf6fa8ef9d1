//! Version control backend abstraction layer
//!
//! The rest of the crate talks to repositories only through the [Repository] and
//! [Backend] traits defined here. Two implementations exist:
//!
//! - [repository::Git2Repository] / [repository::Git2Backend]: real repositories via `git2`
//! - [mock::MockRepository]: an in-memory double for unit tests
//!
//! # Usage
//!
//! ```rust
//! # use git_semver::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> git_semver::Result<()> {
//! let head = repo.head_commit()?;
//! let tags = repo.tag_objects()?;
//! # let _ = (head, tags);
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::{Git2Backend, Git2Repository};

pub use crate::domain::{HeadState, RefEntry};

use crate::error::Result;
use git2::Oid;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Author/committer/tagger identity used for ledger commits and tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Identity {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// An annotated tag object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagObject {
    /// Object id of the tag itself
    pub id: Oid,
    /// Object the tag points at (normally a commit)
    pub target: Oid,
    /// Tag name stored in the tag object
    pub name: String,
}

/// Result of staging and committing a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(Oid),
    /// Content matched the tip commit; no commit was created
    Unchanged,
}

/// Result of a push that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Refs that were updated on the remote
    Pushed(Vec<String>),
    AlreadyUpToDate,
}

/// Operations on one opened, non-bare working tree
///
/// Methods take `&self`; implementations own whatever interior state they need.
/// Failures from the underlying store are reported as
/// [crate::error::GitSemverError::Backend] with the operation name attached.
pub trait Repository {
    /// Root of the working tree
    fn workdir(&self) -> Result<PathBuf>;

    /// Location of the repository's storage (the `.git` directory)
    fn storage_dir(&self) -> PathBuf;

    /// Current state of HEAD, used to resolve the branch name
    fn head(&self) -> Result<HeadState>;

    /// Commit HEAD currently points at
    fn head_commit(&self) -> Result<Oid>;

    /// Local branches (`refs/heads/*`)
    fn branches(&self) -> Result<Vec<RefEntry>>;

    /// Tag references (`refs/tags/*`), lightweight and annotated
    fn tag_refs(&self) -> Result<Vec<RefEntry>>;

    /// All annotated tag objects reachable from tag references
    fn tag_objects(&self) -> Result<Vec<TagObject>>;

    /// Read a file from the working tree; `Ok(None)` if it does not exist
    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Write a file (creating parent directories), stage it and commit on HEAD
    fn write_file_and_commit(
        &self,
        path: &str,
        contents: &[u8],
        author: &Identity,
        message: &str,
    ) -> Result<CommitOutcome>;

    /// Create an annotated tag `name` on `target`
    fn create_annotated_tag(
        &self,
        name: &str,
        target: Oid,
        message: &str,
        tagger: &Identity,
    ) -> Result<Oid>;

    /// URLs configured for a remote, or `None` if there is no such remote
    fn remote_urls(&self, name: &str) -> Result<Option<Vec<String>>>;

    /// Create (or replace) a remote with the given URL and fetch refspec
    fn set_remote(&self, name: &str, url: &str, fetch_refspec: &str) -> Result<()>;

    /// Remove a remote if it exists
    fn remove_remote(&self, name: &str) -> Result<()>;

    /// Push refspecs (globs allowed on the source side) to a remote
    fn push(&self, remote: &str, refspecs: &[String]) -> Result<PushOutcome>;
}

/// Opens and creates repositories
pub trait Backend {
    type Repo: Repository;

    /// Open the working tree rooted exactly at `path`
    ///
    /// Fails with `NotARepo` if there is no repository there and `BareRepository`
    /// if the repository has no working tree.
    fn open(&self, path: &Path) -> Result<Self::Repo>;

    /// Clone only `branch` from `url` into `into`, naming the remote `remote_name`
    fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        remote_name: &str,
        into: &Path,
    ) -> Result<Self::Repo>;

    /// Initialize a repository at `path` whose HEAD points at unborn `branch`
    fn init_orphan(&self, path: &Path, branch: &str) -> Result<Self::Repo>;
}
