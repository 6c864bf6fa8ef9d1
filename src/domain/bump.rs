//! Version bump state machine
//!
//! Pure transforms from one [`Version`] to the next along a single [`Axis`].
//! Nothing here touches the repository; given the starting text, the axis and the
//! identifier, the result is fully determined.

use crate::domain::prerelease::PreRelease;
use crate::domain::version::Version;
use crate::error::{GitSemverError, Result};
use std::fmt;
use std::str::FromStr;

/// Default identifier for pre-release bumps when none is configured
pub const DEFAULT_PRE_PREFIX: &str = "pre";

/// Component of a version targeted by a bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Major,
    Minor,
    Patch,
    Pre,
    Final,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::Major => "major",
            Axis::Minor => "minor",
            Axis::Patch => "patch",
            Axis::Pre => "pre",
            Axis::Final => "final",
        }
    }
}

impl FromStr for Axis {
    type Err = GitSemverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "major" => Ok(Axis::Major),
            "minor" => Ok(Axis::Minor),
            "patch" => Ok(Axis::Patch),
            "pre" => Ok(Axis::Pre),
            "final" => Ok(Axis::Final),
            other => Err(GitSemverError::InvalidAxis(other.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs for the `pre` axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOptions {
    /// Explicit pre-release identifier; `None` or `""` means "not given"
    pub identifier: Option<String>,
    /// Identifier used when nothing explicit or existing is available
    pub default_prefix: String,
}

impl BumpOptions {
    pub fn new(default_prefix: impl Into<String>) -> Self {
        BumpOptions {
            identifier: None,
            default_prefix: default_prefix.into(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    fn requested_identifier(&self) -> Option<&str> {
        self.identifier.as_deref().filter(|s| !s.is_empty())
    }
}

impl Default for BumpOptions {
    fn default() -> Self {
        BumpOptions::new(DEFAULT_PRE_PREFIX)
    }
}

/// Compute the next version along `axis`.
///
/// Numeric axes and `final` always produce a release (pre-release cleared).
/// Build metadata is never carried over. Overflow of any counter is an error and
/// yields no value.
///
/// # Example
/// ```ignore
/// let v = Version::parse("1.2.3-dev.4")?;
/// assert_eq!(bump(&v, Axis::Minor, &BumpOptions::default())?.to_string(), "1.3.0");
/// ```
pub fn bump(version: &Version, axis: Axis, options: &BumpOptions) -> Result<Version> {
    match axis {
        Axis::Major => {
            let major = increment(version.major, Axis::Major)?;
            Ok(Version::new(major, 0, 0))
        }
        Axis::Minor => {
            let minor = increment(version.minor, Axis::Minor)?;
            Ok(Version::new(version.major, minor, 0))
        }
        Axis::Patch => bump_patch(version),
        Axis::Final => Ok(Version::new(version.major, version.minor, version.patch)),
        Axis::Pre => bump_pre(version, options),
    }
}

fn bump_patch(version: &Version) -> Result<Version> {
    let patch = increment(version.patch, Axis::Patch)?;
    Ok(Version::new(version.major, version.minor, patch))
}

fn bump_pre(version: &Version, options: &BumpOptions) -> Result<Version> {
    let requested = options.requested_identifier();

    let (base, pre) = match &version.pre {
        None => {
            let base = bump_patch(version)?;
            let identifier = requested.unwrap_or(options.default_prefix.as_str());
            (base, PreRelease::first(identifier)?)
        }
        Some(current) => {
            let identifier = requested.unwrap_or(current.identifier.as_str());
            let pre = if identifier == current.identifier {
                current.next().ok_or(GitSemverError::BumpOverflow {
                    axis: "pre-release sequence",
                })?
            } else {
                PreRelease::first(identifier)?
            };
            let base = Version::new(version.major, version.minor, version.patch);
            (base, pre)
        }
    };

    Ok(base.with_pre(Some(pre)))
}

fn increment(value: u64, axis: Axis) -> Result<u64> {
    value
        .checked_add(1)
        .ok_or(GitSemverError::BumpOverflow { axis: axis.name() })
}
