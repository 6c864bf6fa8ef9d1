use crate::domain::version::Version;
use crate::error::{GitSemverError, Result};

/// Prefix applied to every version tag name
pub const TAG_PREFIX: &str = "v";

/// Ref glob matching every version tag, used when publishing
pub const TAG_REFSPEC: &str = "refs/tags/v*:refs/tags/v*";

/// Represents a version tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    /// Create a new tag from a string
    pub fn new(name: impl Into<String>) -> Self {
        Tag { name: name.into() }
    }

    /// Tag name for a version, e.g. 1.2.3 -> "v1.2.3"
    pub fn for_version(version: &Version) -> Self {
        Tag::new(format!("{}{}", TAG_PREFIX, version))
    }

    /// Annotation message recorded on the tag object
    pub fn message(version: &Version) -> String {
        format!("semver(tag): {}", version)
    }

    /// Version named by this tag, if the name parses as one
    pub fn version(&self) -> Result<Version> {
        Version::parse(&self.name)
    }

    /// Whether the tag name is a valid version (with or without `v`)
    pub fn is_version_tag(&self) -> bool {
        self.version().is_ok()
    }
}

/// Ledger commit message for a recorded version
pub fn ledger_message(branch: &str, version: &Version) -> String {
    format!("semver({}): {}", branch, version)
}

/// Ref glob (e.g. "refs/tags/v*") to be expanded against local references
///
/// At most one `*` is meaningful; it matches any run of characters.
#[derive(Debug, Clone)]
pub struct RefPattern {
    pub pattern: String,
    regex: regex::Regex,
}

impl RefPattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let escaped = regex::escape(&pattern);
        let regex_pattern = escaped.replacen(r"\*", "(.*)", 1);

        let regex = regex::Regex::new(&format!("^{}$", regex_pattern)).map_err(|e| {
            GitSemverError::config(format!("Invalid ref pattern '{}': {}", pattern, e))
        })?;
        Ok(RefPattern { pattern, regex })
    }

    pub fn is_glob(&self) -> bool {
        self.pattern.contains('*')
    }

    /// Check whether a full ref name matches this pattern
    /// Example: pattern="refs/tags/v*" matches "refs/tags/v1.2.3"
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Map a matching ref name onto `destination`, substituting its `*`
    ///
    /// Example: "refs/tags/v*" with destination "refs/tags/v*" maps
    /// "refs/tags/v1.0.0" to "refs/tags/v1.0.0".
    pub fn expand(&self, destination: &str, name: &str) -> Option<String> {
        let captures = self.regex.captures(name)?;
        match captures.get(1) {
            Some(wildcard) => Some(destination.replacen('*', wildcard.as_str(), 1)),
            None => Some(destination.to_string()),
        }
    }
}
