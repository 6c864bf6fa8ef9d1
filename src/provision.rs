//! Ledger provisioning
//!
//! The ledger is a second repository checked out at `<worktree>/.semver` whose HEAD is
//! the orphan branch `semver`. It is opened if present; `init` creates it by cloning the
//! remote's `semver` branch, or by initializing an empty repository when the remote has
//! none. Creation strategies and placement methods are each tried in order, and every
//! failure is kept for the final error.

use crate::domain::Version;
use crate::error::{GitSemverError, Result};
use crate::extent::Extent;
use crate::git::{Backend, Identity, Repository};
use crate::ledger::{read_version, write_version};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory (relative to the source working tree) holding the ledger
pub const LEDGER_DIR: &str = ".semver";

/// Orphan branch holding the version records
pub const LEDGER_BRANCH: &str = "semver";

/// Ways of creating a ledger repository in scratch space, in the order tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    CloneRemote,
    InitOrphan,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::CloneRemote => f.write_str("clone"),
            Strategy::InitOrphan => f.write_str("init"),
        }
    }
}

/// Ways of moving the scratch repository into place, in the order tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Rename,
    RecursiveCopy,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Rename => f.write_str("rename"),
            Placement::RecursiveCopy => f.write_str("copy"),
        }
    }
}

/// Initial record requested by `init`
#[derive(Debug, Clone)]
pub struct InitRequest {
    pub version: Version,
    /// Overwrite an existing readable record
    pub force: bool,
}

/// Opens or creates the ledger for a source extent
pub struct Provisioner<'a, B: Backend> {
    backend: &'a B,
    remote_name: &'a str,
    author: &'a Identity,
}

impl<'a, B: Backend> Provisioner<'a, B> {
    pub fn new(backend: &'a B, remote_name: &'a str, author: &'a Identity) -> Self {
        Provisioner {
            backend,
            remote_name,
            author,
        }
    }

    /// Open the existing ledger; fails with `LedgerNotFound` if there is none
    pub fn open<S: Repository>(&self, my: &Extent<S>) -> Result<Extent<B::Repo>> {
        let path = ledger_path(my)?;
        let repo = match self.backend.open(&path) {
            Ok(repo) => repo,
            Err(GitSemverError::NotARepo(_)) => return Err(GitSemverError::LedgerNotFound(path)),
            Err(e) => return Err(e),
        };

        let sv = Extent::open(repo, None)?;
        self.track_remote(my, &sv)?;
        Ok(sv)
    }

    /// Open the ledger, creating it if missing, and write the initial record.
    ///
    /// The record is written when the source branch has no readable version yet, or
    /// always when `request.force` is set. The ledger directory is added to the source
    /// repository's exclude list on every call.
    pub fn init<S: Repository>(
        &self,
        my: &Extent<S>,
        request: &InitRequest,
    ) -> Result<Extent<B::Repo>> {
        let path = ledger_path(my)?;
        let repo = match self.backend.open(&path) {
            Ok(repo) => repo,
            Err(GitSemverError::NotARepo(_)) => {
                self.create(my, &path)?;
                self.backend.open(&path)?
            }
            Err(e) => return Err(e),
        };
        let sv = Extent::open(repo, None)?;
        exclude_ledger(&my.repo().storage_dir())?;

        tracing::debug!(force = request.force, "checking initial version");
        if request.force || read_version(my, &sv).is_err() {
            write_version(my, &sv, &request.version, self.author)?;
        }

        self.track_remote(my, &sv)?;
        tracing::debug!(ledger = %path.display(), "ledger ready");
        Ok(sv)
    }

    fn create<S: Repository>(&self, my: &Extent<S>, target: &Path) -> Result<()> {
        let scratch = tempfile::Builder::new().prefix("semver-").tempdir()?;
        let url = source_url(my, self.remote_name)?;
        tracing::debug!(scratch = %scratch.path().display(), url = %url, "creating ledger");

        let mut failures = Vec::new();
        let mut built = None;
        for strategy in [Strategy::CloneRemote, Strategy::InitOrphan] {
            let dir = scratch.path().join(strategy.to_string());
            match self.build(strategy, &url, &dir) {
                Ok(()) => {
                    tracing::info!(%strategy, "ledger repository created");
                    built = Some(dir);
                    break;
                }
                Err(e) => {
                    tracing::debug!(%strategy, error = %e, "ledger strategy failed");
                    failures.push(format!("{}: {}", strategy, e));
                }
            }
        }
        let built = built.ok_or_else(|| GitSemverError::ProvisionFailed {
            attempts: failures.clone(),
        })?;

        place(&built, target, &mut failures)?;
        Ok(())
    }

    /// Run one strategy; the repository handle is closed before returning
    fn build(&self, strategy: Strategy, url: &str, dir: &Path) -> Result<()> {
        match strategy {
            Strategy::CloneRemote => {
                self.backend
                    .clone_branch(url, LEDGER_BRANCH, self.remote_name, dir)?;
            }
            Strategy::InitOrphan => {
                let repo = self.backend.init_orphan(dir, LEDGER_BRANCH)?;
                repo.remove_remote(self.remote_name)?;
            }
        }
        Ok(())
    }

    /// Mirror the source repository's remote on the ledger, tracking only `semver`
    fn track_remote<S, L>(&self, my: &Extent<S>, sv: &Extent<L>) -> Result<()>
    where
        S: Repository,
        L: Repository,
    {
        let Some(url) = my
            .repo()
            .remote_urls(self.remote_name)?
            .and_then(|urls| urls.into_iter().next())
        else {
            return Ok(());
        };

        let current = sv.repo().remote_urls(self.remote_name)?;
        if current.as_deref() == Some(std::slice::from_ref(&url)) {
            return Ok(());
        }

        let fetch = format!(
            "+refs/heads/{}:refs/remotes/{}/{}",
            LEDGER_BRANCH, self.remote_name, LEDGER_BRANCH
        );
        tracing::debug!(remote = self.remote_name, url = %url, "tracking remote on ledger");
        sv.repo().set_remote(self.remote_name, &url, &fetch)
    }
}

/// Location of the ledger working tree for a source extent
pub fn ledger_path<S: Repository>(my: &Extent<S>) -> Result<PathBuf> {
    Ok(my.repo().workdir()?.join(LEDGER_DIR))
}

/// URL the ledger is cloned from: the remote's first URL, else the source repository itself
fn source_url<S: Repository>(my: &Extent<S>, remote_name: &str) -> Result<String> {
    let url = my
        .repo()
        .remote_urls(remote_name)?
        .and_then(|urls| urls.into_iter().next())
        .unwrap_or_else(|| my.repo().storage_dir().to_string_lossy().into_owned());
    Ok(url)
}

fn place(from: &Path, to: &Path, failures: &mut Vec<String>) -> Result<()> {
    for placement in [Placement::Rename, Placement::RecursiveCopy] {
        let result = match placement {
            Placement::Rename => fs::rename(from, to),
            Placement::RecursiveCopy => copy_directory_contents(from, to).map(|_| ()),
        };
        match result {
            Ok(()) => {
                tracing::debug!(%placement, to = %to.display(), "ledger moved into place");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%placement, error = %e, "ledger placement failed");
                failures.push(format!("{}: {}", placement, e));
            }
        }
    }
    Err(GitSemverError::ProvisionFailed {
        attempts: failures.clone(),
    })
}

/// Copy contents of a directory to another directory.
fn copy_directory_contents(src: &Path, dst: &Path) -> io::Result<usize> {
    fs::create_dir_all(dst)?;

    let mut count = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            count += copy_directory_contents(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path)?;
            count += 1;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            {
                let target = fs::read_link(&src_path)?;
                let _ = fs::remove_file(&dst_path);
                std::os::unix::fs::symlink(&target, &dst_path)?;
                count += 1;
            }
        }
    }

    Ok(count)
}

/// Append `.semver` to the repository's local exclude list unless already listed
fn exclude_ledger(storage_dir: &Path) -> Result<()> {
    let info = storage_dir.join("info");
    fs::create_dir_all(&info)?;
    let exclude = info.join("exclude");

    let existing = match fs::read_to_string(&exclude) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let listed = existing
        .lines()
        .map(str::trim)
        .any(|line| line == LEDGER_DIR || line == "/.semver" || line == ".semver/");
    if listed {
        return Ok(());
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(LEDGER_DIR);
    updated.push('\n');
    fs::write(&exclude, updated)?;

    tracing::debug!(path = %exclude.display(), "excluded ledger directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exclude_creates_file() {
        let dir = TempDir::new().unwrap();
        exclude_ledger(dir.path()).unwrap();

        let contents = fs::read_to_string(dir.path().join("info/exclude")).unwrap();
        assert_eq!(contents, ".semver\n");
    }

    #[test]
    fn test_exclude_keeps_existing_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("info")).unwrap();
        fs::write(dir.path().join("info/exclude"), "# comment\n*.log").unwrap();

        exclude_ledger(dir.path()).unwrap();
        exclude_ledger(dir.path()).unwrap();

        let contents = fs::read_to_string(dir.path().join("info/exclude")).unwrap();
        assert_eq!(contents, "# comment\n*.log\n.semver\n");
    }

    #[test]
    fn test_copy_directory_contents() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("top"), "1").unwrap();
        fs::write(src.path().join("a/b/nested"), "2").unwrap();

        let target = dst.path().join("copy");
        let count = copy_directory_contents(src.path(), &target).unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(target.join("top")).unwrap(), "1");
        assert_eq!(fs::read_to_string(target.join("a/b/nested")).unwrap(), "2");
    }

    #[test]
    fn test_place_prefers_rename() {
        let root = TempDir::new().unwrap();
        let from = root.path().join("scratch");
        let to = root.path().join("ledger");
        fs::create_dir_all(&from).unwrap();
        fs::write(from.join("main"), "0.0.0\n").unwrap();

        let mut failures = Vec::new();
        place(&from, &to, &mut failures).unwrap();

        assert!(failures.is_empty());
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(to.join("main")).unwrap(), "0.0.0\n");
    }

    #[test]
    fn test_place_reports_every_failure() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("missing");
        let to = root.path().join("ledger");

        let mut failures = vec!["clone: no such branch".to_string()];
        let err = place(&missing, &to, &mut failures).unwrap_err();

        match err {
            GitSemverError::ProvisionFailed { attempts } => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts[1].starts_with("rename: "));
                assert!(attempts[2].starts_with("copy: "));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_track_remote_mirrors_source_url() {
        use crate::git::{Git2Backend, MockRepository};

        let mut source = MockRepository::new();
        source.checkout_branch("main");
        source.add_remote("origin", "git@example.com:team/app.git");
        let my = Extent::open(source, None).unwrap();
        let sv = Extent::open(MockRepository::new(), Some(LEDGER_BRANCH)).unwrap();

        let author = Identity::new("semver", "semver@semver.org");
        let provisioner = Provisioner::new(&Git2Backend, "origin", &author);
        provisioner.track_remote(&my, &sv).unwrap();

        assert_eq!(
            sv.repo().remote("origin"),
            Some((
                "git@example.com:team/app.git".to_string(),
                "+refs/heads/semver:refs/remotes/origin/semver".to_string()
            ))
        );
    }

    #[test]
    fn test_track_remote_without_source_remote() {
        use crate::git::{Git2Backend, MockRepository};

        let mut source = MockRepository::new();
        source.checkout_branch("main");
        let my = Extent::open(source, None).unwrap();
        let sv = Extent::open(MockRepository::new(), Some(LEDGER_BRANCH)).unwrap();

        let author = Identity::new("semver", "semver@semver.org");
        let provisioner = Provisioner::new(&Git2Backend, "origin", &author);
        provisioner.track_remote(&my, &sv).unwrap();

        assert_eq!(sv.repo().remote("origin"), None);
    }

    #[test]
    fn test_open_without_ledger() {
        use crate::git::{Git2Backend, MockRepository};

        let dir = TempDir::new().unwrap();
        let mut source = MockRepository::with_workdir(dir.path());
        source.checkout_branch("main");
        let my = Extent::open(source, None).unwrap();

        let author = Identity::new("semver", "semver@semver.org");
        let provisioner = Provisioner::new(&Git2Backend, "origin", &author);

        assert!(matches!(
            provisioner.open(&my),
            Err(GitSemverError::LedgerNotFound(path)) if path == dir.path().join(".semver")
        ));
    }
}
