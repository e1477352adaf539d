//! esolang-archive core library.
//!
//! This crate archives the successful submissions of a contest into a git
//! repository: configuration, the read-only datastore snapshot, submitter
//! identity resolution, language extension lookup, archive planning and the
//! commit sequence.

pub mod archive;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod git;
pub mod identity;
pub mod language;
pub mod models;

// Re-exports for convenience.
pub use config::ArchiveConfig;
pub use db::Database;
pub use engine::{ArchiveEngine, ArchivePlan};
pub use errors::CoreError;
pub use identity::{EventFeed, ResolvedIdentities};
pub use language::ExtensionResolver;
