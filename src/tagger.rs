//! Version tags on the source repository

use crate::domain::{RefEntry, Tag};
use crate::error::{GitSemverError, Result};
use crate::extent::Extent;
use crate::git::{Identity, Repository};
use crate::ledger::read_version;
use git2::Oid;

const SHORT_HASH_LEN: usize = 7;

/// Tag the source extent's HEAD with `v<version>` from the ledger.
///
/// A commit carries at most one version tag: if HEAD is already tagged with a name
/// that parses as a version, this fails with `AlreadyTagged` without reading the
/// ledger.
pub fn tag<S, L>(my: &Extent<S>, sv: &Extent<L>, tagger: &Identity) -> Result<Tag>
where
    S: Repository,
    L: Repository,
{
    let head = my.repo().head_commit()?;
    tracing::debug!(%head, branch = my.branch(), "tagging");

    if let Some(existing) = find_version_tag(my.repo(), head)? {
        return Err(GitSemverError::AlreadyTagged {
            commit: short_hash(head),
            tag: existing,
        });
    }

    let version = read_version(my, sv)?;
    let tag = Tag::for_version(&version);
    let id = my
        .repo()
        .create_annotated_tag(&tag.name, head, &Tag::message(&version), tagger)?;

    tracing::info!(tag = %tag.name, object = %id, "created tag");
    Ok(tag)
}

/// Name of an existing version tag on `head`, if any.
///
/// Tag objects are visited by tag name, references by full name with tag refs ahead
/// of branches. The first hit wins. Lightweight tags on `head` count too.
pub fn find_version_tag<R: Repository>(repo: &R, head: Oid) -> Result<Option<String>> {
    let mut refs: Vec<RefEntry> = repo.tag_refs()?;
    refs.extend(repo.branches()?);

    for object in repo.tag_objects()? {
        if object.id != head && object.target != head {
            continue;
        }
        tracing::debug!(id = %object.id, target = %object.target, name = %object.name, "tag object on HEAD");

        for entry in &refs {
            // a ref on the commit itself must carry a version name of its own
            let hit = if entry.target == object.id {
                Tag::new(object.name.as_str()).is_version_tag()
            } else {
                entry.target == head && Tag::new(entry.short_name()).is_version_tag()
            };
            if hit {
                return Ok(Some(entry.short_name().to_string()));
            }
        }
    }

    let lightweight = refs
        .iter()
        .filter(|entry| !entry.is_branch() && entry.target == head)
        .find(|entry| Tag::new(entry.short_name()).is_version_tag());
    Ok(lightweight.map(|entry| entry.short_name().to_string()))
}

fn short_hash(oid: Oid) -> String {
    oid.to_string().chars().take(SHORT_HASH_LEN).collect()
}
