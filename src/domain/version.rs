use crate::domain::prerelease::PreRelease;
use crate::error::{GitSemverError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Semantic version: `MAJOR.MINOR.PATCH[-IDENT.SEQ][+BUILD.…]`
///
/// Values are never mutated in place by this crate; every bump builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<PreRelease>,
    pub build: Vec<String>,
}

impl Version {
    /// Create a release version with no pre-release or build metadata
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre: None,
            build: Vec::new(),
        }
    }

    /// Parse version text, accepting one leading `v` when it is followed by a digit.
    ///
    /// The numeric grammar is delegated to the `semver` crate; on top of it the
    /// pre-release must be a single `<identifier>.<integer>` pair.
    pub fn parse(text: &str) -> Result<Self> {
        let stripped = strip_v_prefix(text);
        let parsed =
            semver::Version::parse(stripped).map_err(|e| GitSemverError::parse(text, e.to_string()))?;

        let pre = if parsed.pre.is_empty() {
            None
        } else {
            Some(PreRelease::parse(parsed.pre.as_str()).map_err(|_| {
                GitSemverError::parse(
                    text,
                    format!(
                        "pre-release '{}' must be <identifier>.<integer>",
                        parsed.pre
                    ),
                )
            })?)
        };

        Ok(Version {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre,
            build: split_build(parsed.build.as_str()),
        })
    }

    /// Copy of this version with `pre` replacing the pre-release component
    pub fn with_pre(&self, pre: Option<PreRelease>) -> Self {
        Version {
            pre,
            ..self.clone()
        }
    }

    /// Copy of this version with build metadata replaced by `build` split on `.`
    ///
    /// An empty string clears the build metadata. Precedence is unaffected.
    pub fn with_build(&self, build: &str) -> Result<Self> {
        if !build.is_empty() {
            semver::BuildMetadata::new(build).map_err(|e| {
                GitSemverError::parse(format!("{}+{}", self.core(), build), e.to_string())
            })?;
        }
        Ok(Version {
            build: split_build(build),
            ..self.clone()
        })
    }

    /// Compare by semver precedence, ignoring build metadata
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }

    fn core(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn strip_v_prefix(text: &str) -> &str {
    match text.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => text,
    }
}

fn split_build(build: &str) -> Vec<String> {
    if build.is_empty() {
        Vec::new()
    } else {
        build.split('.').map(str::to_string).collect()
    }
}

// Build metadata only breaks ties so that `Ord` agrees with `Eq`.
impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_precedence(other)
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = GitSemverError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build.join("."))?;
        }
        Ok(())
    }
}
