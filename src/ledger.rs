//! Per-branch version records stored in the ledger tree

use crate::domain::tag::ledger_message;
use crate::domain::Version;
use crate::error::{GitSemverError, Result};
use crate::extent::Extent;
use crate::git::{CommitOutcome, Identity, Repository};

/// Read the version recorded for the source extent's branch
pub fn read_version<S, L>(my: &Extent<S>, sv: &Extent<L>) -> Result<Version>
where
    S: Repository,
    L: Repository,
{
    let contents = sv
        .repo()
        .read_file(my.branch())?
        .ok_or_else(|| GitSemverError::VersionNotFound {
            branch: my.branch().to_string(),
        })?;

    let text = String::from_utf8_lossy(&contents);
    let version = Version::parse(text.trim())?;
    tracing::debug!(branch = my.branch(), %version, "read version");
    Ok(version)
}

/// Record `version` for the source extent's branch and commit it to the ledger.
///
/// Rewriting the value already on record creates no commit and returns
/// [CommitOutcome::Unchanged].
pub fn write_version<S, L>(
    my: &Extent<S>,
    sv: &Extent<L>,
    version: &Version,
    author: &Identity,
) -> Result<CommitOutcome>
where
    S: Repository,
    L: Repository,
{
    let contents = format!("{}\n", version);
    let message = ledger_message(my.branch(), version);

    let outcome = sv
        .repo()
        .write_file_and_commit(my.branch(), contents.as_bytes(), author, &message)?;

    match outcome {
        CommitOutcome::Committed(oid) => {
            tracing::info!(branch = my.branch(), %version, commit = %oid, "recorded version")
        }
        CommitOutcome::Unchanged => {
            tracing::debug!(branch = my.branch(), %version, "version already recorded")
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    fn extents(branch: &str) -> (Extent<MockRepository>, Extent<MockRepository>) {
        let mut source = MockRepository::new();
        source.checkout_branch(branch);
        let ledger = MockRepository::new();
        (
            Extent::open(source, None).unwrap(),
            Extent::open(ledger, Some("semver")).unwrap(),
        )
    }

    fn identity() -> Identity {
        Identity::new("semver", "semver@semver.org")
    }

    #[test]
    fn test_read_missing_record() {
        let (my, sv) = extents("main");
        assert!(matches!(
            read_version(&my, &sv),
            Err(GitSemverError::VersionNotFound { branch }) if branch == "main"
        ));
    }

    #[test]
    fn test_read_trims_trailing_newline() {
        let (my, _) = extents("main");
        let mut ledger = MockRepository::new();
        ledger.set_file("main", "1.2.3-dev.4\r\n");
        let sv = Extent::open(ledger, Some("semver")).unwrap();

        assert_eq!(read_version(&my, &sv).unwrap().to_string(), "1.2.3-dev.4");
    }

    #[test]
    fn test_read_invalid_record() {
        let (my, _) = extents("main");
        let mut ledger = MockRepository::new();
        ledger.set_file("main", "not a version");
        let sv = Extent::open(ledger, Some("semver")).unwrap();

        assert!(matches!(
            read_version(&my, &sv),
            Err(GitSemverError::Parse { .. })
        ));
    }

    #[test]
    fn test_write_then_read() {
        let (my, sv) = extents("feature/login");
        let version = Version::parse("0.3.1-pre.2").unwrap();

        let outcome = write_version(&my, &sv, &version, &identity()).unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(_)));
        assert_eq!(sv.repo().file("feature/login").as_deref(), Some("0.3.1-pre.2\n"));
        assert_eq!(
            sv.repo().commit_messages(),
            vec!["semver(feature/login): 0.3.1-pre.2"]
        );
        assert_eq!(read_version(&my, &sv).unwrap(), version);
    }

    #[test]
    fn test_records_are_per_branch() {
        let (main, sv) = extents("main");
        let mut other = MockRepository::new();
        other.checkout_branch("develop");
        let develop = Extent::open(other, None).unwrap();

        write_version(&main, &sv, &Version::new(1, 0, 0), &identity()).unwrap();
        write_version(&develop, &sv, &Version::new(0, 5, 0), &identity()).unwrap();

        assert_eq!(read_version(&main, &sv).unwrap(), Version::new(1, 0, 0));
        assert_eq!(read_version(&develop, &sv).unwrap(), Version::new(0, 5, 0));
    }

    #[test]
    fn test_identical_write_creates_no_commit() {
        let (my, sv) = extents("main");
        let version = Version::new(2, 0, 0);

        write_version(&my, &sv, &version, &identity()).unwrap();
        let again = write_version(&my, &sv, &version, &identity()).unwrap();

        assert_eq!(again, CommitOutcome::Unchanged);
        assert_eq!(sv.repo().commit_messages().len(), 1);
    }
}
