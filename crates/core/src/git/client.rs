//! Archive repository operations via `git2`.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{Oid, Repository, Signature, Sort, Time};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::GitError;
use crate::models::AuthorIdentity;

/// Handle on the archive repository's work tree and HEAD.
pub struct ArchiveRepo {
    repo: Repository,
    workdir: PathBuf,
}

/// Information about a single archive commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveCommit {
    pub sha: String,
    pub parent_shas: Vec<String>,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_time: i64,
    pub author_offset_minutes: i32,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_time: i64,
}

impl ArchiveRepo {
    /// Open an existing, non-bare repository at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening archive repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Self::from_repository(repo, path)
    }

    /// Initialize a new repository at `path`.
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        info!(path = %path.display(), "initializing archive repository");
        let repo = Repository::init(path)?;
        Self::from_repository(repo, path)
    }

    fn from_repository(repo: Repository, path: &Path) -> Result<Self, GitError> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepository(path.display().to_string()))?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Stage exactly `rel_path` (relative to the work tree) and commit it
    /// on top of HEAD. Author and committer are the same signature.
    ///
    /// An unborn HEAD yields a root commit. The commit is created even if
    /// the staged content is unchanged.
    #[instrument(skip(self, author, message), fields(path = %rel_path.display()))]
    pub fn commit_file(
        &self,
        rel_path: &Path,
        author: &AuthorIdentity,
        when: DateTime<Utc>,
        offset_minutes: i32,
        message: &str,
    ) -> Result<Oid, GitError> {
        if rel_path.is_absolute()
            || rel_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(GitError::OutsideWorkTree(rel_path.display().to_string()));
        }

        let mut index = self.repo.index()?;
        index.add_path(rel_path)?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let time = Time::new(when.timestamp(), offset_minutes);
        let signature = Signature::new(&author.name, &author.email, &time)?;

        let parent_commit = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        info!(sha = %oid, author = %author, "created commit");
        Ok(oid)
    }

    /// SHA of HEAD, or `None` while the branch is unborn.
    pub fn head_sha(&self) -> Result<Option<String>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id().to_string())),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// First-parent history of HEAD, oldest first.
    pub fn history(&self) -> Result<Vec<ArchiveCommit>, GitError> {
        if self.head_sha()?.is_none() {
            return Ok(Vec::new());
        }
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.simplify_first_parent()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;
            let author = commit.author();
            let committer = commit.committer();
            commits.push(ArchiveCommit {
                sha: oid.to_string(),
                parent_shas: commit.parent_ids().map(|p| p.to_string()).collect(),
                message: commit.message().unwrap_or("").to_string(),
                author_name: author.name().unwrap_or("").to_string(),
                author_email: author.email().unwrap_or("").to_string(),
                author_time: author.when().seconds(),
                author_offset_minutes: author.when().offset_minutes(),
                committer_name: committer.name().unwrap_or("").to_string(),
                committer_email: committer.email().unwrap_or("").to_string(),
                committer_time: committer.when().seconds(),
            });
        }
        debug!(count = commits.len(), "collected archive history");
        Ok(commits)
    }

    /// Is `ancestor` reachable from `descendant`?
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        let ancestor = Oid::from_str(ancestor)?;
        let descendant = Oid::from_str(descendant)?;
        Ok(self.repo.graph_descendant_of(descendant, ancestor)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn author() -> AuthorIdentity {
        AuthorIdentity::new("alice", "alice@twitter.com")
    }

    #[test]
    fn test_root_commit_on_unborn_head() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArchiveRepo::init(dir.path()).unwrap();
        assert_eq!(repo.head_sha().unwrap(), None);

        std::fs::create_dir(dir.path().join("01")).unwrap();
        std::fs::write(dir.path().join("01/brainfuck.bf"), "+[.]").unwrap();
        let when = Utc.timestamp_opt(1_512_086_400, 0).unwrap();
        let oid = repo
            .commit_file(Path::new("01/brainfuck.bf"), &author(), when, 540, "Update brainfuck.bf (4 bytes)")
            .unwrap();

        assert_eq!(repo.head_sha().unwrap(), Some(oid.to_string()));
        let history = repo.history().unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].parent_shas.is_empty());
        assert_eq!(history[0].author_time, 1_512_086_400);
        assert_eq!(history[0].author_offset_minutes, 540);
        assert_eq!(history[0].committer_email, "alice@twitter.com");
    }

    #[test]
    fn test_commits_chain_on_head() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArchiveRepo::init(dir.path()).unwrap();
        let when = Utc.timestamp_opt(1_512_086_400, 0).unwrap();

        std::fs::write(dir.path().join("a.txt"), "1").unwrap();
        let first = repo
            .commit_file(Path::new("a.txt"), &author(), when, 540, "first")
            .unwrap();
        std::fs::write(dir.path().join("a.txt"), "2").unwrap();
        let second = repo
            .commit_file(Path::new("a.txt"), &author(), when, 540, "second")
            .unwrap();

        assert!(repo
            .is_ancestor(&first.to_string(), &second.to_string())
            .unwrap());
        let history = repo.history().unwrap();
        assert_eq!(history[1].parent_shas, vec![first.to_string()]);
    }

    #[test]
    fn test_commit_stages_only_the_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArchiveRepo::init(dir.path()).unwrap();
        let when = Utc.timestamp_opt(1_512_086_400, 0).unwrap();

        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("stray.txt"), "stray").unwrap();
        let oid = repo
            .commit_file(Path::new("a.txt"), &author(), when, 540, "a")
            .unwrap();

        let tree = repo.repo().find_commit(oid).unwrap().tree().unwrap();
        assert!(tree.get_name("a.txt").is_some());
        assert!(tree.get_name("stray.txt").is_none());
    }

    #[test]
    fn test_rejects_paths_outside_work_tree() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArchiveRepo::init(dir.path()).unwrap();
        let when = Utc.timestamp_opt(0, 0).unwrap();
        let result = repo.commit_file(Path::new("../escape.txt"), &author(), when, 540, "x");
        assert!(matches!(result, Err(GitError::OutsideWorkTree(_))));
    }

    #[test]
    fn test_repo_not_found() {
        assert!(matches!(
            ArchiveRepo::open("/nonexistent"),
            Err(GitError::RepositoryNotFound(_))
        ));
    }
}
