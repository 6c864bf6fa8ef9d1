use git2::Oid;

const BRANCH_PREFIX: &str = "refs/heads/";

/// A named reference (branch or tag) and the object it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// Full reference name, e.g. "refs/heads/main"
    pub name: String,
    pub target: Oid,
}

impl RefEntry {
    pub fn new(name: impl Into<String>, target: Oid) -> Self {
        RefEntry {
            name: name.into(),
            target,
        }
    }

    /// Name without the `refs/heads/`, `refs/tags/` or `refs/remotes/` prefix
    pub fn short_name(&self) -> &str {
        ["refs/heads/", "refs/tags/", "refs/remotes/"]
            .iter()
            .find_map(|prefix| self.name.strip_prefix(prefix))
            .unwrap_or(self.name.as_str())
    }

    pub fn is_branch(&self) -> bool {
        self.name.starts_with(BRANCH_PREFIX)
    }
}

/// What HEAD looks like when an extent is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadState {
    /// Name of the HEAD reference itself (normally "HEAD")
    pub name: String,
    /// Target of HEAD when it is symbolic, e.g. "refs/heads/main"
    pub symbolic_target: Option<String>,
    /// Commit HEAD resolves to, if any (unborn branches have none)
    pub oid: Option<Oid>,
}

/// Resolve the current branch name from HEAD.
///
/// Order: HEAD itself is a branch ref; HEAD symbolically targets a branch ref;
/// otherwise the first branch (by name) whose tip is HEAD's commit.
pub fn resolve_branch(head: &HeadState, branches: &[RefEntry]) -> Option<String> {
    if let Some(short) = head.name.strip_prefix(BRANCH_PREFIX) {
        return Some(short.to_string());
    }

    if let Some(short) = head
        .symbolic_target
        .as_deref()
        .and_then(|target| target.strip_prefix(BRANCH_PREFIX))
    {
        return Some(short.to_string());
    }

    let oid = head.oid?;
    let mut candidates: Vec<&RefEntry> = branches
        .iter()
        .filter(|b| b.is_branch() && b.target == oid)
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    candidates.first().map(|b| b.short_name().to_string())
}
