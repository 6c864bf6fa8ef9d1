#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// A non-bare repository on branch `main` with one commit
pub struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    pub fn init() -> Result<Self, git2::Error> {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts)?;
        let test_repo = Self { dir, repo };
        test_repo
            .commit_file("README.md", "hello\n", "initial commit")
            .expect("initial commit");
        Ok(test_repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn commit_file(
        &self,
        rel_path: &str,
        contents: &str,
        message: &str,
    ) -> Result<Oid, Box<dyn std::error::Error>> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;

        let mut index = self.repo.index()?;
        index.add_path(Path::new(rel_path))?;
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let sig = Signature::now("semver-test", "semver-test@example.com")?;

        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .and_then(|oid| self.repo.find_commit(oid).ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        Ok(self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?)
    }

    pub fn head(&self) -> Oid {
        self.repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map(|commit| commit.id())
            .expect("HEAD commit")
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), git2::Error> {
        self.repo.remote(name, url)?;
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join(".semver")
    }

    pub fn ledger(&self) -> Repository {
        Repository::open(self.ledger_path()).expect("ledger repository")
    }

    /// Messages of the ledger's commits, newest first
    pub fn ledger_history(&self) -> Vec<String> {
        let ledger = self.ledger();
        let mut walk = ledger.revwalk().expect("revwalk");
        walk.push_head().expect("push HEAD");
        walk.map(|oid| {
            let commit = ledger.find_commit(oid.expect("oid")).expect("commit");
            commit.message().unwrap_or_default().to_string()
        })
        .collect()
    }

    pub fn ledger_record(&self, branch: &str) -> Option<String> {
        fs::read_to_string(self.ledger_path().join(branch)).ok()
    }
}

/// An empty bare repository standing in for the shared remote
pub struct BareRemote {
    dir: TempDir,
    repo: Repository,
}

impl BareRemote {
    pub fn init() -> Result<Self, git2::Error> {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let repo = Repository::init_bare(dir.path())?;
        Ok(Self { dir, repo })
    }

    pub fn url(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    pub fn target(&self, reference: &str) -> Option<Oid> {
        self.repo
            .find_reference(reference)
            .ok()
            .and_then(|r| r.target())
    }
}
