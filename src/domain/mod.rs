//! Domain logic - pure version rules independent of git operations

pub mod branch;
pub mod bump;
pub mod prerelease;
pub mod tag;
pub mod version;

pub use branch::{resolve_branch, HeadState, RefEntry};
pub use bump::{bump, Axis, BumpOptions};
pub use prerelease::PreRelease;
pub use tag::{RefPattern, Tag};
pub use version::Version;
