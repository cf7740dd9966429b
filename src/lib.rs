//! submodule-sync: keep a GitLab submodule pointer in sync with an external branch
//!
//! The sync path rewrites a deterministic sync branch to carry exactly one
//! pointer-update commit and upserts its merge request. The merge path
//! validates that merge request and merges it.

pub mod config;
pub mod error;
pub mod merge;
pub mod platform;
pub mod progress;
pub mod repo;
pub mod sync;
pub mod types;

pub use error::{Error, Result};
