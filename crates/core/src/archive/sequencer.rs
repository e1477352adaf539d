//! Applies a planned archive run: one file write and one commit per entry.

use tracing::{info, instrument, warn};

use super::writer::ArchiveWriter;
use super::{ArchiveEntry, ArchiveReport, CommittedEntry};
use crate::errors::ArchiveError;
use crate::git::ArchiveRepo;

/// Writes and commits entries strictly in order. Each commit's parent is
/// the commit created for the previous entry.
pub struct CommitSequencer<'a> {
    repo: &'a ArchiveRepo,
    writer: ArchiveWriter,
    offset_minutes: i32,
}

impl<'a> CommitSequencer<'a> {
    pub fn new(repo: &'a ArchiveRepo, offset_minutes: i32) -> Self {
        Self {
            writer: ArchiveWriter::new(repo.workdir()),
            repo,
            offset_minutes,
        }
    }

    /// Apply `entries` for `round`.
    ///
    /// The round directory is created up front, even for an empty run. On
    /// error, commits already created stay in place and the run stops.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub fn apply(&self, round: &str, entries: &[ArchiveEntry]) -> Result<ArchiveReport, ArchiveError> {
        self.writer.ensure_round_dir(round)?;

        let mut report = ArchiveReport {
            round: round.to_string(),
            commits: Vec::with_capacity(entries.len()),
        };

        for (i, entry) in entries.iter().enumerate() {
            let path = self
                .writer
                .write(round, &entry.filename, &entry.content)?;
            let oid = self
                .repo
                .commit_file(
                    &path,
                    &entry.author,
                    entry.created_at,
                    self.offset_minutes,
                    &entry.message,
                )
                .map_err(|e| {
                    warn!(
                        submission = %entry.submission_id,
                        committed = i,
                        error = %e,
                        "archive run stopped"
                    );
                    e
                })?;
            report.commits.push(CommittedEntry {
                submission_id: entry.submission_id.clone(),
                path,
                sha: oid.to_string(),
            });
        }

        info!(round, commits = report.commits.len(), "archive run complete");
        Ok(report)
    }
}
