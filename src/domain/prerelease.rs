//! Pre-release epoch handling for semantic versioning
//!
//! A pre-release is always a single `<identifier>.<sequence>` pair, e.g. `dev.4`.
//! According to semver.org: https://semver.org/#spec-item-9

use crate::error::{GitSemverError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Pre-release epoch: an identifier plus a numeric sequence
///
/// # Examples
/// - "dev.4" -> PreRelease { identifier: "dev", sequence: 4 }
/// - "rc.1" -> PreRelease { identifier: "rc", sequence: 1 }
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreRelease {
    /// The pre-release identifier (e.g. "pre", "dev", "rc")
    pub identifier: String,
    /// Sequence number within the identifier's epoch
    pub sequence: u64,
}

impl PreRelease {
    /// Create a new pre-release epoch after validating the identifier
    pub fn new(identifier: impl Into<String>, sequence: u64) -> Result<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(PreRelease {
            identifier,
            sequence,
        })
    }

    /// Start a fresh epoch at sequence 1
    pub fn first(identifier: impl Into<String>) -> Result<Self> {
        PreRelease::new(identifier, 1)
    }

    /// Parse a pre-release from a string of the form `<identifier>.<integer>`
    ///
    /// # Examples
    /// ```ignore
    /// let pr = PreRelease::parse("beta.1")?;
    /// assert_eq!(pr.identifier, "beta");
    /// assert_eq!(pr.sequence, 1);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(GitSemverError::parse(s, "empty pre-release"));
        }

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 2 {
            return Err(GitSemverError::parse(
                s,
                "pre-release must be <identifier>.<integer>",
            ));
        }

        let sequence = parts[1].parse::<u64>().map_err(|_| {
            GitSemverError::parse(s, format!("invalid pre-release sequence '{}'", parts[1]))
        })?;

        PreRelease::new(parts[0], sequence)
            .map_err(|_| GitSemverError::parse(s, format!("invalid identifier '{}'", parts[0])))
    }

    /// Next sequence in the same epoch, or `None` if the counter would wrap
    pub fn next(&self) -> Option<Self> {
        Some(PreRelease {
            identifier: self.identifier.clone(),
            sequence: self.sequence.checked_add(1)?,
        })
    }

    fn numeric_identifier(&self) -> Option<u64> {
        if self.identifier.bytes().all(|b| b.is_ascii_digit()) {
            self.identifier.parse().ok()
        } else {
            None
        }
    }
}

/// Check that `identifier` is a single non-empty semver identifier (`[0-9A-Za-z-]+`).
///
/// Numeric identifiers may not carry leading zeros (semver.org item 9).
pub fn validate_identifier(identifier: &str) -> Result<()> {
    let numeric = identifier.bytes().all(|b| b.is_ascii_digit());
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !(numeric && identifier.len() > 1 && identifier.starts_with('0'));
    if valid {
        Ok(())
    } else {
        Err(GitSemverError::InvalidIdentifier(identifier.to_string()))
    }
}

impl FromStr for PreRelease {
    type Err = GitSemverError;

    fn from_str(s: &str) -> Result<Self> {
        PreRelease::parse(s)
    }
}

// Numeric identifiers sort below alphanumeric ones (semver.org item 11).
impl Ord for PreRelease {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_identifier = match (self.numeric_identifier(), other.numeric_identifier()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.identifier.cmp(&other.identifier),
        };
        by_identifier.then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for PreRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.identifier, self.sequence)
    }
}
