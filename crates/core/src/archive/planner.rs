//! Turns a contest snapshot into the ordered list of archive commits.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use super::commit_format::CommitFormatter;
use super::writer::{validate_filename, validate_round};
use super::ArchiveEntry;
use crate::errors::ArchiveError;
use crate::identity::ResolvedIdentities;
use crate::language::ExtensionResolver;
use crate::models::{ContestSnapshot, Language, User};

/// Pure planning step: no file is written and no commit is made here, so
/// every lookup failure surfaces before the archive is touched.
pub struct ArchivePlanner<'a> {
    extensions: &'a ExtensionResolver,
    identities: &'a ResolvedIdentities,
    formatter: CommitFormatter,
    round: String,
}

impl<'a> ArchivePlanner<'a> {
    pub fn new(
        extensions: &'a ExtensionResolver,
        identities: &'a ResolvedIdentities,
        formatter: CommitFormatter,
        round: impl Into<String>,
    ) -> Self {
        Self {
            extensions,
            identities,
            formatter,
            round: round.into(),
        }
    }

    /// One entry per submission, in snapshot order.
    #[instrument(skip(self, snapshot), fields(contest = %snapshot.contest.name, round = %self.round))]
    pub fn plan(&self, snapshot: &ContestSnapshot) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        validate_round(&self.round)?;

        let languages: HashMap<&str, &Language> = snapshot
            .languages
            .iter()
            .map(|language| (language.id.as_str(), language))
            .collect();
        let users: HashMap<&str, &User> = snapshot
            .users
            .iter()
            .map(|user| (user.id.as_str(), user))
            .collect();

        let mut extension_cache: HashMap<&str, String> = HashMap::new();
        let mut entries = Vec::with_capacity(snapshot.submissions.len());

        for submission in &snapshot.submissions {
            let language = languages
                .get(submission.language_id.as_str())
                .ok_or_else(|| ArchiveError::UnknownLanguage {
                    submission: submission.id.clone(),
                    language: submission.language_id.clone(),
                })?;
            let extension = extension_cache
                .entry(language.slug.as_str())
                .or_insert_with(|| self.extensions.resolve(&language.slug));
            let filename = format!("{}{}", language.slug, extension);
            validate_filename(&filename)?;

            let user = users.get(submission.user_id.as_str()).ok_or_else(|| {
                ArchiveError::UnknownUser {
                    submission: submission.id.clone(),
                    user: submission.user_id.clone(),
                }
            })?;
            let handle = user
                .email_local_part()
                .ok_or_else(|| ArchiveError::MalformedEmail {
                    user: user.id.clone(),
                    email: user.email.clone(),
                })?;
            let author = self
                .identities
                .get(handle)
                .ok_or_else(|| ArchiveError::UnmappedHandle {
                    submission: submission.id.clone(),
                    handle: handle.to_string(),
                })?;

            let message = self.formatter.format(
                &filename,
                submission.display_size(),
                &self.round,
                &language.slug,
            );
            debug!(submission = %submission.id, %filename, author = %author, "planned commit");

            entries.push(ArchiveEntry {
                submission_id: submission.id.clone(),
                language: language.slug.clone(),
                path: std::path::Path::new(&self.round).join(&filename),
                filename,
                content: submission.code.clone(),
                author: author.clone(),
                created_at: submission.created_at,
                message,
            });
        }

        info!(entries = entries.len(), "archive plan ready");
        Ok(entries)
    }
}
