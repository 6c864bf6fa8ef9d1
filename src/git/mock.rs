use crate::domain::{HeadState, RefEntry};
use crate::error::{GitSemverError, Result};
use crate::git::{CommitOutcome, Identity, PushOutcome, Repository, TagObject};
use git2::Oid;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

/// Mock repository for testing without actual git operations
///
/// Setup methods take `&mut self`; trait methods mutate through interior cells so
/// the mock can stand in wherever a [Repository] is borrowed.
pub struct MockRepository {
    workdir: PathBuf,
    head: RefCell<HeadState>,
    files: RefCell<HashMap<String, Vec<u8>>>,
    commits: RefCell<Vec<String>>,
    branches: RefCell<Vec<RefEntry>>,
    tag_refs: RefCell<Vec<RefEntry>>,
    tag_objects: RefCell<Vec<TagObject>>,
    remotes: RefCell<HashMap<String, (String, String)>>,
    pushes: RefCell<Vec<(String, Vec<String>)>>,
    push_outcomes: RefCell<VecDeque<std::result::Result<PushOutcome, String>>>,
    next_oid: Cell<u32>,
}

/// Deterministic fake object id
pub fn fake_oid(n: u32) -> Oid {
    let mut bytes = [0u8; 20];
    bytes[16..].copy_from_slice(&n.to_be_bytes());
    Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
}

impl MockRepository {
    /// Create a new mock whose HEAD is the unborn branch `main`
    pub fn new() -> Self {
        MockRepository {
            workdir: PathBuf::from("/mock/work"),
            head: RefCell::new(HeadState {
                name: "HEAD".to_string(),
                symbolic_target: Some("refs/heads/main".to_string()),
                oid: None,
            }),
            files: RefCell::new(HashMap::new()),
            commits: RefCell::new(Vec::new()),
            branches: RefCell::new(Vec::new()),
            tag_refs: RefCell::new(Vec::new()),
            tag_objects: RefCell::new(Vec::new()),
            remotes: RefCell::new(HashMap::new()),
            pushes: RefCell::new(Vec::new()),
            push_outcomes: RefCell::new(VecDeque::new()),
            next_oid: Cell::new(1),
        }
    }

    /// Create a mock rooted at a real directory (paths derived from it are usable)
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        MockRepository {
            workdir: workdir.into(),
            ..Self::new()
        }
    }

    fn allocate_oid(&self) -> Oid {
        let n = self.next_oid.get();
        self.next_oid.set(n + 1);
        fake_oid(n)
    }

    /// Point HEAD symbolically at `branch`, creating the branch at a fresh commit
    pub fn checkout_branch(&mut self, branch: &str) -> Oid {
        let oid = self.allocate_oid();
        self.set_branch_head(branch, oid);
        *self.head.get_mut() = HeadState {
            name: "HEAD".to_string(),
            symbolic_target: Some(format!("refs/heads/{}", branch)),
            oid: Some(oid),
        };
        oid
    }

    /// Detach HEAD at `oid`
    pub fn detach_head(&mut self, oid: Oid) {
        *self.head.get_mut() = HeadState {
            name: "HEAD".to_string(),
            symbolic_target: None,
            oid: Some(oid),
        };
    }

    /// Set a branch head
    pub fn set_branch_head(&mut self, branch: &str, oid: Oid) {
        let name = format!("refs/heads/{}", branch);
        upsert(self.branches.get_mut(), RefEntry::new(name, oid));
    }

    /// Add a lightweight tag pointing to an OID
    pub fn add_tag(&mut self, name: &str, oid: Oid) {
        upsert(
            self.tag_refs.get_mut(),
            RefEntry::new(format!("refs/tags/{}", name), oid),
        );
    }

    /// Add an annotated tag on `target`, returning the tag object id
    pub fn add_annotated_tag(&mut self, name: &str, target: Oid) -> Oid {
        let id = self.allocate_oid();
        self.tag_objects.get_mut().push(TagObject {
            id,
            target,
            name: name.to_string(),
        });
        self.add_tag(name, id);
        id
    }

    pub fn add_remote(&mut self, name: &str, url: &str) {
        self.remotes
            .get_mut()
            .insert(name.to_string(), (url.to_string(), String::new()));
    }

    /// Place a file in the working tree without committing it
    pub fn set_file(&mut self, path: &str, contents: &str) {
        self.files
            .get_mut()
            .insert(path.to_string(), contents.as_bytes().to_vec());
    }

    /// Script the result of the next push; `Err(reason)` becomes a rejection
    pub fn queue_push_outcome(&mut self, outcome: std::result::Result<PushOutcome, String>) {
        self.push_outcomes.get_mut().push_back(outcome);
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files
            .borrow()
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Messages of commits created through the trait, oldest first
    pub fn commit_messages(&self) -> Vec<String> {
        self.commits.borrow().clone()
    }

    /// Remote name and refspecs of every push, in order
    pub fn pushes(&self) -> Vec<(String, Vec<String>)> {
        self.pushes.borrow().clone()
    }

    /// URL and fetch refspec of a remote
    pub fn remote(&self, name: &str) -> Option<(String, String)> {
        self.remotes.borrow().get(name).cloned()
    }
}

fn upsert(entries: &mut Vec<RefEntry>, entry: RefEntry) {
    match entries.iter_mut().find(|e| e.name == entry.name) {
        Some(existing) => existing.target = entry.target,
        None => entries.push(entry),
    }
}

fn mock_failure(operation: &str, message: &str) -> GitSemverError {
    GitSemverError::backend(operation, git2::Error::from_str(message))
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn workdir(&self) -> Result<PathBuf> {
        Ok(self.workdir.clone())
    }

    fn storage_dir(&self) -> PathBuf {
        self.workdir.join(".git")
    }

    fn head(&self) -> Result<HeadState> {
        Ok(self.head.borrow().clone())
    }

    fn head_commit(&self) -> Result<Oid> {
        self.head
            .borrow()
            .oid
            .ok_or_else(|| mock_failure("resolve HEAD", "reference 'HEAD' is unborn"))
    }

    fn branches(&self) -> Result<Vec<RefEntry>> {
        let mut branches = self.branches.borrow().clone();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    fn tag_refs(&self) -> Result<Vec<RefEntry>> {
        let mut refs = self.tag_refs.borrow().clone();
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    fn tag_objects(&self) -> Result<Vec<TagObject>> {
        let mut objects = self.tag_objects.borrow().clone();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.borrow().get(path).cloned())
    }

    fn write_file_and_commit(
        &self,
        path: &str,
        contents: &[u8],
        _author: &Identity,
        message: &str,
    ) -> Result<CommitOutcome> {
        let unchanged = self.head.borrow().oid.is_some()
            && self.files.borrow().get(path).map(Vec::as_slice) == Some(contents);
        if unchanged {
            return Ok(CommitOutcome::Unchanged);
        }

        self.files
            .borrow_mut()
            .insert(path.to_string(), contents.to_vec());
        self.commits.borrow_mut().push(message.to_string());

        let oid = self.allocate_oid();
        let mut head = self.head.borrow_mut();
        head.oid = Some(oid);
        if let Some(target) = head.symbolic_target.clone() {
            upsert(&mut self.branches.borrow_mut(), RefEntry::new(target, oid));
        }
        Ok(CommitOutcome::Committed(oid))
    }

    fn create_annotated_tag(
        &self,
        name: &str,
        target: Oid,
        _message: &str,
        _tagger: &Identity,
    ) -> Result<Oid> {
        let ref_name = format!("refs/tags/{}", name);
        if self.tag_refs.borrow().iter().any(|r| r.name == ref_name) {
            return Err(mock_failure(
                &format!("create tag {}", name),
                "tag already exists",
            ));
        }

        let id = self.allocate_oid();
        self.tag_objects.borrow_mut().push(TagObject {
            id,
            target,
            name: name.to_string(),
        });
        self.tag_refs.borrow_mut().push(RefEntry::new(ref_name, id));
        Ok(id)
    }

    fn remote_urls(&self, name: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .remotes
            .borrow()
            .get(name)
            .map(|(url, _)| vec![url.clone()]))
    }

    fn set_remote(&self, name: &str, url: &str, fetch_refspec: &str) -> Result<()> {
        self.remotes.borrow_mut().insert(
            name.to_string(),
            (url.to_string(), fetch_refspec.to_string()),
        );
        Ok(())
    }

    fn remove_remote(&self, name: &str) -> Result<()> {
        self.remotes.borrow_mut().remove(name);
        Ok(())
    }

    fn push(&self, remote: &str, refspecs: &[String]) -> Result<PushOutcome> {
        if !self.remotes.borrow().contains_key(remote) {
            return Err(mock_failure(
                &format!("find remote {}", remote),
                "remote does not exist",
            ));
        }

        self.pushes
            .borrow_mut()
            .push((remote.to_string(), refspecs.to_vec()));

        match self.push_outcomes.borrow_mut().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(reason)) => Err(GitSemverError::PushRejected {
                remote: remote.to_string(),
                reason,
            }),
            None => Ok(PushOutcome::Pushed(refspecs.to_vec())),
        }
    }
}
