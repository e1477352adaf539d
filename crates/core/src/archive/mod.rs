//! Submission archival: planning, file writes and the commit sequence.
//!
//! Archival runs in two phases. [`ArchivePlanner`] turns a contest snapshot
//! into an ordered list of [`ArchiveEntry`] values without touching the
//! disk, so a missing language, user or identity aborts the run before any
//! write. [`CommitSequencer`] then writes each entry into the archive work
//! tree and commits it on top of HEAD, strictly in submission order.

pub mod commit_format;
pub mod planner;
pub mod sequencer;
pub mod writer;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AuthorIdentity;

pub use commit_format::CommitFormatter;
pub use planner::ArchivePlanner;
pub use sequencer::CommitSequencer;
pub use writer::ArchiveWriter;

/// One planned archive commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub submission_id: String,
    /// Language slug as registered with the contest.
    pub language: String,
    /// `<slug><extension>`.
    pub filename: String,
    /// `<round>/<filename>`, relative to the archive root.
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub author: AuthorIdentity,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// Result of one created commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedEntry {
    pub submission_id: String,
    pub path: PathBuf,
    pub sha: String,
}

/// Summary of an archive run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub round: String,
    pub commits: Vec<CommittedEntry>,
}
