//! Pushing the ledger and the source branch to the remote

use crate::domain::tag::TAG_REFSPEC;
use crate::error::Result;
use crate::extent::Extent;
use crate::git::{PushOutcome, Repository};
use crate::provision::LEDGER_BRANCH;

/// What each step of a publish did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub ledger: PushOutcome,
    pub source: PushOutcome,
}

/// Push the ledger's `semver` branch, then the source branch and its `v*` tags.
///
/// "Already up to date" is success on both steps. The source push is not attempted
/// when the ledger push fails. The branch is only pushed when it exists locally; the
/// tags always are.
pub fn publish<S, L>(my: &Extent<S>, sv: &Extent<L>, remote: &str) -> Result<PublishReport>
where
    S: Repository,
    L: Repository,
{
    let ledger_refspec = format!("refs/heads/{0}:refs/heads/{0}", LEDGER_BRANCH);
    let ledger = sv.repo().push(remote, &[ledger_refspec])?;
    log_outcome("ledger", &ledger);

    // an overridden branch name may have no local ref (detached CI checkouts)
    let branch_ref = format!("refs/heads/{}", my.branch());
    let mut source_refspecs = Vec::new();
    if my.repo().branches()?.iter().any(|b| b.name == branch_ref) {
        source_refspecs.push(format!("{0}:{0}", branch_ref));
    } else {
        tracing::debug!(branch = my.branch(), "no local branch ref, pushing tags only");
    }
    source_refspecs.push(TAG_REFSPEC.to_string());
    let source = my.repo().push(remote, &source_refspecs)?;
    log_outcome(my.branch(), &source);

    Ok(PublishReport { ledger, source })
}

fn log_outcome(what: &str, outcome: &PushOutcome) {
    match outcome {
        PushOutcome::Pushed(refs) => tracing::info!(what, refs = ?refs, "pushed"),
        PushOutcome::AlreadyUpToDate => tracing::debug!(what, "already up to date"),
    }
}
