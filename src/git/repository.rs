use crate::domain::{HeadState, RefEntry, RefPattern};
use crate::error::{BackendContext, GitSemverError, Result};
use crate::git::{Backend, CommitOutcome, Identity, PushOutcome, Repository, TagObject};
use git2::build::RepoBuilder;
use git2::{
    CredentialType, Cred, ErrorCode, FetchOptions, Oid, PushOptions, RemoteCallbacks,
    Repository as Git2Repo, Signature,
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Discover the repository containing `path` (walking up parent directories)
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repo::discover(path).map_err(|e| not_a_repo(path, e))?;
        Self::non_bare(repo, path)
    }

    /// Open the repository rooted exactly at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repo::open(path).map_err(|e| not_a_repo(path, e))?;
        Self::non_bare(repo, path)
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn non_bare(repo: Git2Repo, path: &Path) -> Result<Self> {
        if repo.is_bare() {
            return Err(GitSemverError::BareRepository(path.to_path_buf()));
        }
        Ok(Git2Repository { repo })
    }

    fn refs_matching(&self, glob: &str) -> Result<Vec<RefEntry>> {
        let operation = format!("list {}", glob);
        let mut entries = Vec::new();
        for reference in self.repo.references_glob(glob).during(&operation)? {
            let reference = reference.during(&operation)?;
            if let (Some(name), Some(target)) = (reference.name(), reference.target()) {
                entries.push(RefEntry::new(name, target));
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Tip of HEAD, or `None` on an unborn branch
    fn head_tip(&self) -> Result<Option<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit().during("resolve HEAD commit")?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(GitSemverError::backend("resolve HEAD", e)),
        }
    }

    /// Expand source-side globs against local references.
    ///
    /// libgit2 only pushes concrete refspecs, so `refs/tags/v*:refs/tags/v*`
    /// becomes one refspec per matching local tag.
    fn expand_refspecs(&self, refspecs: &[String]) -> Result<Vec<String>> {
        let mut expanded = Vec::new();
        for spec in refspecs {
            let (force, body) = match spec.strip_prefix('+') {
                Some(body) => ("+", body),
                None => ("", spec.as_str()),
            };
            let (src, dst) = body.split_once(':').unwrap_or((body, body));

            let pattern = RefPattern::new(src)?;
            if !pattern.is_glob() {
                expanded.push(spec.clone());
                continue;
            }

            for reference in self.repo.references().during("list references")? {
                let reference = reference.during("list references")?;
                let Some(name) = reference.name() else {
                    continue;
                };
                if let Some(destination) = pattern.expand(dst, name) {
                    expanded.push(format!("{}{}:{}", force, name, destination));
                }
            }
        }
        Ok(expanded)
    }
}

fn not_a_repo(path: &Path, e: git2::Error) -> GitSemverError {
    if e.code() == ErrorCode::NotFound {
        GitSemverError::NotARepo(path.to_path_buf())
    } else {
        GitSemverError::backend(format!("open {}", path.display()), e)
    }
}

fn signature(identity: &Identity) -> Result<Signature<'static>> {
    Signature::now(&identity.name, &identity.email).during("build signature")
}

/// SSH key files tried after the agent, in order of preference
fn ssh_key_paths() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    ["id_ed25519", "id_rsa", "id_ecdsa"]
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .filter(|path| path.exists())
        .collect()
}

/// Credential callbacks shared by clone and push.
///
/// libgit2 calls back again after a rejected credential, so each call moves on
/// to the next source and gives up once they are exhausted.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0usize;
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts += 1;
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if attempts == 1 {
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
            }
            let keys = ssh_key_paths();
            let index = attempts.saturating_sub(2);
            if let Some(key) = keys.get(index) {
                return Cred::ssh_key(username, None, key, None);
            }
        } else if attempts == 1 && allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username_from_url);
        } else if attempts == 1 && allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        Err(git2::Error::from_str(&format!(
            "no usable credentials for {}",
            url
        )))
    });
    callbacks
}

impl Repository for Git2Repository {
    fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitSemverError::BareRepository(self.repo.path().to_path_buf()))
    }

    fn storage_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    fn head(&self) -> Result<HeadState> {
        let head = self.repo.find_reference("HEAD").during("read HEAD")?;
        let oid = head.resolve().ok().and_then(|resolved| resolved.target());

        Ok(HeadState {
            name: head.name().unwrap_or("HEAD").to_string(),
            symbolic_target: head.symbolic_target().map(str::to_string),
            oid,
        })
    }

    fn head_commit(&self) -> Result<Oid> {
        let head = self.repo.head().during("resolve HEAD")?;
        let commit = head.peel_to_commit().during("resolve HEAD commit")?;
        Ok(commit.id())
    }

    fn branches(&self) -> Result<Vec<RefEntry>> {
        self.refs_matching("refs/heads/*")
    }

    fn tag_refs(&self) -> Result<Vec<RefEntry>> {
        self.refs_matching("refs/tags/*")
    }

    fn tag_objects(&self) -> Result<Vec<TagObject>> {
        let mut objects: Vec<TagObject> = Vec::new();
        for entry in self.tag_refs()? {
            // lightweight tags point straight at a commit
            let Ok(tag) = self.repo.find_tag(entry.target) else {
                continue;
            };
            if objects.iter().any(|o| o.id == tag.id()) {
                continue;
            }
            objects.push(TagObject {
                id: tag.id(),
                target: tag.target_id(),
                name: tag.name().unwrap_or_default().to_string(),
            });
        }
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.workdir()?.join(path);
        if !full.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read(full)?))
    }

    fn write_file_and_commit(
        &self,
        path: &str,
        contents: &[u8],
        author: &Identity,
        message: &str,
    ) -> Result<CommitOutcome> {
        let full = self.workdir()?.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, contents)?;

        let mut index = self.repo.index().during("open index")?;
        index
            .add_path(Path::new(path))
            .during(format!("stage {}", path))?;
        index.write().during("write index")?;
        let tree_id = index.write_tree().during("write tree")?;

        let parent = self.head_tip()?;
        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                tracing::debug!(path, "content unchanged, skipping commit");
                return Ok(CommitOutcome::Unchanged);
            }
        }

        let tree = self.repo.find_tree(tree_id).during("find tree")?;
        let sig = signature(author)?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .during("commit")?;

        tracing::debug!(%oid, "created commit: {}", message);
        Ok(CommitOutcome::Committed(oid))
    }

    fn create_annotated_tag(
        &self,
        name: &str,
        target: Oid,
        message: &str,
        tagger: &Identity,
    ) -> Result<Oid> {
        let object = self
            .repo
            .find_object(target, None)
            .during(format!("find object {}", target))?;
        let sig = signature(tagger)?;

        self.repo
            .tag(name, &object, &sig, message, false)
            .during(format!("create tag {}", name))
    }

    fn remote_urls(&self, name: &str) -> Result<Option<Vec<String>>> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(Some(remote.url().map(str::to_string).into_iter().collect())),
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => Ok(None),
            Err(e) => Err(GitSemverError::backend(format!("find remote {}", name), e)),
        }
    }

    fn set_remote(&self, name: &str, url: &str, fetch_refspec: &str) -> Result<()> {
        self.remove_remote(name)?;
        self.repo
            .remote_with_fetch(name, url, fetch_refspec)
            .during(format!("create remote {}", name))?;
        Ok(())
    }

    fn remove_remote(&self, name: &str) -> Result<()> {
        if self.repo.find_remote(name).is_ok() {
            self.repo
                .remote_delete(name)
                .during(format!("delete remote {}", name))?;
        }
        Ok(())
    }

    fn push(&self, remote_name: &str, refspecs: &[String]) -> Result<PushOutcome> {
        let expanded = self.expand_refspecs(refspecs)?;
        if expanded.is_empty() {
            return Ok(PushOutcome::AlreadyUpToDate);
        }

        let mut remote = self
            .repo
            .find_remote(remote_name)
            .during(format!("find remote {}", remote_name))?;

        let updated = RefCell::new(Vec::new());
        let rejected = RefCell::new(Vec::new());

        let mut callbacks = remote_callbacks();
        callbacks.push_negotiation(|updates| {
            for update in updates {
                if update.src() != update.dst() {
                    let name = update.dst_refname().unwrap_or_default().to_string();
                    updated.borrow_mut().push(name);
                }
            }
            Ok(())
        });
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejected
                    .borrow_mut()
                    .push(format!("{}: {}", refname, status));
            }
            Ok(())
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let specs: Vec<&str> = expanded.iter().map(String::as_str).collect();
        tracing::debug!(remote = remote_name, refspecs = ?specs, "pushing");

        match remote.push(&specs, Some(&mut push_options)) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::NotFastForward => {
                return Err(GitSemverError::PushRejected {
                    remote: remote_name.to_string(),
                    reason: e.message().to_string(),
                });
            }
            Err(e) => return Err(GitSemverError::backend(format!("push to {}", remote_name), e)),
        }
        drop(push_options);

        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(GitSemverError::PushRejected {
                remote: remote_name.to_string(),
                reason: rejected.join(", "),
            });
        }

        let updated = updated.into_inner();
        if updated.is_empty() {
            Ok(PushOutcome::AlreadyUpToDate)
        } else {
            Ok(PushOutcome::Pushed(updated))
        }
    }
}

/// Opens and creates repositories on disk through libgit2
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Backend;

impl Backend for Git2Backend {
    type Repo = Git2Repository;

    fn open(&self, path: &Path) -> Result<Git2Repository> {
        Git2Repository::open(path)
    }

    fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        remote_name: &str,
        into: &Path,
    ) -> Result<Git2Repository> {
        let name = remote_name.to_string();
        let fetch = format!("+refs/heads/{}:refs/remotes/{}/{}", branch, remote_name, branch);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());

        let mut builder = RepoBuilder::new();
        builder.branch(branch);
        builder.fetch_options(fetch_options);
        builder.remote_create(move |repo, _name, url| repo.remote_with_fetch(&name, url, &fetch));

        let repo = builder
            .clone(url, into)
            .during(format!("clone {} from {}", branch, url))?;
        Ok(Git2Repository::from_git2(repo))
    }

    fn init_orphan(&self, path: &Path, branch: &str) -> Result<Git2Repository> {
        let repo = Git2Repo::init(path).during(format!("init {}", path.display()))?;
        repo.set_head(&format!("refs/heads/{}", branch))
            .during(format!("point HEAD at {}", branch))?;
        Ok(Git2Repository::from_git2(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity() -> Identity {
        Identity::new("Test", "test@example.com")
    }

    #[test]
    fn test_open_missing_repository() {
        let dir = TempDir::new().unwrap();
        let result = Git2Repository::open(dir.path());
        assert!(matches!(result, Err(GitSemverError::NotARepo(_))));
    }

    #[test]
    fn test_open_bare_repository() {
        let dir = TempDir::new().unwrap();
        Git2Repo::init_bare(dir.path()).unwrap();
        let result = Git2Repository::open(dir.path());
        assert!(matches!(result, Err(GitSemverError::BareRepository(_))));
    }

    #[test]
    fn test_init_orphan_head_is_unborn_branch() {
        let dir = TempDir::new().unwrap();
        let repo = Git2Backend.init_orphan(dir.path(), "semver").unwrap();

        let head = repo.head().unwrap();
        assert_eq!(head.symbolic_target.as_deref(), Some("refs/heads/semver"));
        assert_eq!(head.oid, None);
        assert!(repo.head_commit().is_err());
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = TempDir::new().unwrap();
        let repo = Git2Backend.init_orphan(dir.path(), "semver").unwrap();

        assert_eq!(repo.read_file("feature/x").unwrap(), None);

        let outcome = repo
            .write_file_and_commit("feature/x", b"1.0.0", &identity(), "semver(feature/x): 1.0.0")
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(_)));
        assert_eq!(repo.read_file("feature/x").unwrap(), Some(b"1.0.0".to_vec()));

        let branches = repo.branches().unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "refs/heads/semver");
    }

    #[test]
    fn test_identical_write_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let repo = Git2Backend.init_orphan(dir.path(), "semver").unwrap();

        let first = repo
            .write_file_and_commit("main", b"0.1.0", &identity(), "semver(main): 0.1.0")
            .unwrap();
        let second = repo
            .write_file_and_commit("main", b"0.1.0", &identity(), "semver(main): 0.1.0")
            .unwrap();

        assert!(matches!(first, CommitOutcome::Committed(_)));
        assert_eq!(second, CommitOutcome::Unchanged);
    }

    #[test]
    fn test_annotated_tag_listing() {
        let dir = TempDir::new().unwrap();
        let repo = Git2Backend.init_orphan(dir.path(), "main").unwrap();
        repo.write_file_and_commit("README", b"hi", &identity(), "init")
            .unwrap();
        let head = repo.head_commit().unwrap();

        let tag_id = repo
            .create_annotated_tag("v1.0.0", head, "semver(tag): 1.0.0", &identity())
            .unwrap();

        let objects = repo.tag_objects().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, tag_id);
        assert_eq!(objects[0].target, head);
        assert_eq!(objects[0].name, "v1.0.0");

        let refs = repo.tag_refs().unwrap();
        assert_eq!(refs[0].name, "refs/tags/v1.0.0");
        assert_eq!(refs[0].target, tag_id);
    }

    #[test]
    fn test_remote_management() {
        let dir = TempDir::new().unwrap();
        let repo = Git2Backend.init_orphan(dir.path(), "semver").unwrap();

        assert_eq!(repo.remote_urls("origin").unwrap(), None);
        repo.set_remote(
            "origin",
            "https://example.com/a.git",
            "+refs/heads/semver:refs/remotes/origin/semver",
        )
        .unwrap();
        assert_eq!(
            repo.remote_urls("origin").unwrap(),
            Some(vec!["https://example.com/a.git".to_string()])
        );

        repo.remove_remote("origin").unwrap();
        assert_eq!(repo.remote_urls("origin").unwrap(), None);
        repo.remove_remote("origin").unwrap();
    }

    #[test]
    fn test_expand_tag_glob() {
        let dir = TempDir::new().unwrap();
        let repo = Git2Backend.init_orphan(dir.path(), "main").unwrap();
        repo.write_file_and_commit("README", b"hi", &identity(), "init")
            .unwrap();
        let head = repo.head_commit().unwrap();
        repo.create_annotated_tag("v1.0.0", head, "m", &identity())
            .unwrap();
        repo.create_annotated_tag("release", head, "m", &identity())
            .unwrap();

        let expanded = repo
            .expand_refspecs(&[
                "refs/heads/main:refs/heads/main".to_string(),
                "refs/tags/v*:refs/tags/v*".to_string(),
            ])
            .unwrap();
        assert_eq!(
            expanded,
            vec![
                "refs/heads/main:refs/heads/main".to_string(),
                "refs/tags/v1.0.0:refs/tags/v1.0.0".to_string(),
            ]
        );
    }
}
