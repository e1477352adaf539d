//! Archive engine: drives one archive run from configuration.
//!
//! A run goes through fixed phases:
//! `ResolvingIdentities -> LoadingLanguages -> LoadingSubmissions -> Planning -> Committing`.
//! Identity resolution finishes before any submission is read, and planning
//! finishes before the first file is written.

use tracing::{info, instrument};

use crate::archive::{ArchiveEntry, ArchivePlanner, ArchiveReport, CommitFormatter, CommitSequencer};
use crate::config::ArchiveConfig;
use crate::db::Database;
use crate::errors::CoreError;
use crate::git::{ArchiveRepo, GitHubClient};
use crate::identity::{EventFeed, IdentityRegistry, IdentityResolver, ResolvedIdentities};
use crate::language::{ExtensionResolver, LanguageRegistry, OverrideTable};
use crate::models::ContestSnapshot;

/// Phase of an archive run, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivePhase {
    ResolvingIdentities,
    LoadingLanguages,
    LoadingSubmissions,
    Planning,
    Committing,
}

impl std::fmt::Display for ArchivePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResolvingIdentities => write!(f, "resolving_identities"),
            Self::LoadingLanguages => write!(f, "loading_languages"),
            Self::LoadingSubmissions => write!(f, "loading_submissions"),
            Self::Planning => write!(f, "planning"),
            Self::Committing => write!(f, "committing"),
        }
    }
}

/// A fully planned run, ready to be committed or printed.
#[derive(Debug, Clone)]
pub struct ArchivePlan {
    pub contest: String,
    pub round: String,
    pub entries: Vec<ArchiveEntry>,
}

/// Orchestrates identity resolution, language lookup, planning and commits.
pub struct ArchiveEngine {
    config: ArchiveConfig,
}

impl ArchiveEngine {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// GitHub client built from the `[github]` section.
    pub fn github_client(&self) -> Result<GitHubClient, CoreError> {
        Ok(GitHubClient::new(
            &self.config.github.api_url,
            self.config.github.token.clone(),
        )?)
    }

    /// Load the users file and resolve every handle.
    pub async fn resolve_identities<F: EventFeed>(
        &self,
        feed: &F,
    ) -> Result<ResolvedIdentities, CoreError> {
        info!(phase = %ArchivePhase::ResolvingIdentities, "archive phase");
        let registry = IdentityRegistry::load(&self.config.identity.users_file)?;
        let resolver = IdentityResolver::new(&self.config.identity);
        Ok(resolver.resolve(&registry, feed).await?)
    }

    /// Load the override table and the canonical registry. A configured
    /// `registry_file` takes precedence over `registry_url`.
    pub async fn load_extensions(&self) -> Result<ExtensionResolver, CoreError> {
        info!(phase = %ArchivePhase::LoadingLanguages, "archive phase");
        let languages = &self.config.languages;
        let overrides = OverrideTable::load(&languages.overrides_file)?;
        let registry = match &languages.registry_file {
            Some(path) => LanguageRegistry::load(path)?,
            None => LanguageRegistry::fetch(&languages.registry_url).await?,
        };
        Ok(ExtensionResolver::new(overrides, registry))
    }

    /// Read the contest's successful submissions from the datastore.
    pub fn load_snapshot(&self, contest: &str) -> Result<ContestSnapshot, CoreError> {
        info!(phase = %ArchivePhase::LoadingSubmissions, "archive phase");
        let db = Database::open_read_only(&self.config.datastore.path)?;
        Ok(db.load_snapshot(contest)?)
    }

    /// Everything up to, but not including, the first file write.
    #[instrument(skip(self, feed))]
    pub async fn plan<F: EventFeed>(
        &self,
        contest: &str,
        round: &str,
        feed: &F,
    ) -> Result<ArchivePlan, CoreError> {
        let identities = self.resolve_identities(feed).await?;
        let extensions = self.load_extensions().await?;
        let snapshot = self.load_snapshot(contest)?;

        info!(phase = %ArchivePhase::Planning, "archive phase");
        let planner = ArchivePlanner::new(
            &extensions,
            &identities,
            CommitFormatter::new(&self.config.archive),
            round,
        );
        let entries = planner.plan(&snapshot)?;
        Ok(ArchivePlan {
            contest: contest.to_string(),
            round: round.to_string(),
            entries,
        })
    }

    /// Write and commit a plan into the archive repository.
    #[instrument(skip(self, plan), fields(contest = %plan.contest, round = %plan.round))]
    pub fn execute(&self, plan: &ArchivePlan) -> Result<ArchiveReport, CoreError> {
        info!(phase = %ArchivePhase::Committing, entries = plan.entries.len(), "archive phase");
        let repo = ArchiveRepo::open(&self.config.archive.root)?;
        let sequencer = CommitSequencer::new(&repo, self.config.archive.timezone_offset_minutes);
        Ok(sequencer.apply(&plan.round, &plan.entries)?)
    }

    /// Plan and commit in one go.
    pub async fn run<F: EventFeed>(
        &self,
        contest: &str,
        round: &str,
        feed: &F,
    ) -> Result<ArchiveReport, CoreError> {
        let plan = self.plan(contest, round, feed).await?;
        self.execute(&plan)
    }
}
