//! An opened working tree together with the branch it is on

use crate::domain::resolve_branch;
use crate::error::{GitSemverError, Result};
use crate::git::Repository;

/// Handle to one working tree and its current branch.
///
/// The branch name is resolved once when the extent is opened and never changes
/// afterwards, even if HEAD moves.
pub struct Extent<R: Repository> {
    repo: R,
    branch: String,
}

impl<R: Repository> Extent<R> {
    /// Wrap `repo`, resolving its branch from HEAD unless `branch_override` is non-empty
    pub fn open(repo: R, branch_override: Option<&str>) -> Result<Self> {
        let branch = match branch_override.filter(|b| !b.is_empty()) {
            Some(branch) => branch.to_string(),
            None => {
                let head = repo.head()?;
                let branches = repo.branches()?;
                resolve_branch(&head, &branches).ok_or(GitSemverError::BranchUndeterminable)?
            }
        };

        tracing::debug!(branch = %branch, "opened extent");
        Ok(Extent { repo, branch })
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}
