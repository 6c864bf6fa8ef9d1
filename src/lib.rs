pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod extent;
pub mod git;
pub mod ledger;
pub mod provision;
pub mod publish;
pub mod tagger;
pub mod ui;

pub use error::{GitSemverError, Result};
