//! End-to-end tests for archiving a contest round.
//!
//! These tests exercise the real `ArchiveEngine` with:
//! - A real SQLite snapshot built through `Database`
//! - A real git repository created with `git2`
//! - YAML users, override and registry files on disk
//!
//! No network I/O: the registry is read from a local file and the event
//! feed is a fake.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use esolang_archive_core::config::{ArchiveConfig, IdentityStrategy};
use esolang_archive_core::db::Database;
use esolang_archive_core::engine::ArchiveEngine;
use esolang_archive_core::errors::{ArchiveError, CoreError, GitHubError, IdentityError};
use esolang_archive_core::git::ArchiveRepo;
use esolang_archive_core::identity::EventFeed;
use esolang_archive_core::models::{
    AuthorIdentity, Contest, Language, Submission, SubmissionStatus, User,
};

// ===========================================================================
// Helpers
// ===========================================================================

const USERS_YML: &str = "\
hakatashi: hakatashi
alice: ~
";

const LANGUAGES_YML: &str = "\
brainfuck: .bf
c-gcc: c
";

const REGISTRY_YML: &str = r#"
C:
  type: programming
  extensions:
  - ".c"
  - ".h"
Brainfuck:
  extensions:
  - ".b"
  - ".bf"
Python:
  aliases:
  - python3
  extensions:
  - ".py"
"#;

/// Feed that must never be consulted.
struct NoFeed;

impl EventFeed for NoFeed {
    async fn latest_push_author(
        &self,
        login: &str,
    ) -> Result<Option<AuthorIdentity>, GitHubError> {
        panic!("unexpected event feed lookup for {login}")
    }
}

/// Feed answering from a fixed table, counting lookups per login.
struct FakeFeed {
    authors: HashMap<String, AuthorIdentity>,
    calls: Mutex<Vec<String>>,
}

impl EventFeed for FakeFeed {
    async fn latest_push_author(
        &self,
        login: &str,
    ) -> Result<Option<AuthorIdentity>, GitHubError> {
        self.calls.lock().unwrap().push(login.to_string());
        Ok(self.authors.get(login).cloned())
    }
}

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    config_path: PathBuf,
    db_path: PathBuf,
}

fn submission(
    id: &str,
    user: &str,
    language: &str,
    code: &[u8],
    size: Option<i64>,
    status: SubmissionStatus,
    secs: i64,
) -> Submission {
    Submission {
        id: id.into(),
        user_id: user.into(),
        language_id: language.into(),
        code: code.to_vec(),
        size,
        status,
        created_at: Utc.timestamp_opt(secs, 0).unwrap(),
    }
}

fn write_config(dir: &Path, db_path: &Path, root: &Path, strategy: &str) -> PathBuf {
    let config_path = dir.join("esolang-archive.toml");
    let toml = format!(
        r#"
[archive]
root = {root:?}
timezone_offset_minutes = 540

[identity]
users_file = {users:?}
strategy = "{strategy}"

[languages]
overrides_file = {overrides:?}
registry_file = {registry:?}

[datastore]
path = {db:?}

[github]
token_env = "ESOLANG_ARCHIVE_E2E_UNSET_TOKEN"
"#,
        root = root.display().to_string(),
        users = dir.join("users.yml").display().to_string(),
        overrides = dir.join("languages.yml").display().to_string(),
        registry = dir.join("linguist.yml").display().to_string(),
        db = db_path.display().to_string(),
    );
    std::fs::write(&config_path, toml).unwrap();
    config_path
}

/// Snapshot with two contests, mixed statuses, an out-of-order insert and
/// a `created_at` tie.
fn setup(strategy: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("users.yml"), USERS_YML).unwrap();
    std::fs::write(dir.path().join("languages.yml"), LANGUAGES_YML).unwrap();
    std::fs::write(dir.path().join("linguist.yml"), REGISTRY_YML).unwrap();

    let db_path = dir.path().join("esolang-battle.db");
    {
        let db = Database::new(&db_path).unwrap();
        db.initialize().unwrap();
        for (id, name) in [("c1", "esolang"), ("c2", "mayfes2018")] {
            db.insert_contest(&Contest {
                id: id.into(),
                name: name.into(),
            })
            .unwrap();
        }
        for (id, email) in [("u1", "hakatashi@example.com"), ("u2", "alice@example.org")] {
            db.insert_user(&User {
                id: id.into(),
                email: email.into(),
            })
            .unwrap();
        }
        for (id, slug) in [
            ("l1", "brainfuck"),
            ("l2", "c-gcc"),
            ("l3", "python3"),
            ("l4", "starry"),
        ] {
            db.insert_language(&Language {
                id: id.into(),
                slug: slug.into(),
            })
            .unwrap();
        }

        use SubmissionStatus::*;
        let esolang = [
            submission("s1", "u1", "l1", b"+[.]", Some(4), Success, 1_000),
            submission("s2", "u2", "l2", b"main(){}", None, Success, 3_000),
            submission("s3", "u1", "l2", b"broken", None, Failed, 2_000),
            submission("s4", "u2", "l1", b"+.", None, Success, 2_000),
            submission("s5", "u1", "l3", b"print(1)", Some(0), Success, 4_000),
            submission("s6", "u2", "l4", b"\x00\xff raw", Some(99), Success, 4_000),
            submission("s7", "u2", "l4", b"pending", None, Pending, 5_000),
        ];
        for s in &esolang {
            db.insert_submission("c1", s).unwrap();
        }
        db.insert_submission(
            "c2",
            &submission("s8", "u1", "l1", b"other", None, Success, 500),
        )
        .unwrap();
    }

    let root = dir.path().join("esolang-battle-archive");
    ArchiveRepo::init(&root).unwrap();
    let config_path = write_config(dir.path(), &db_path, &root, strategy);

    Fixture {
        _dir: dir,
        root,
        config_path,
        db_path,
    }
}

fn engine(fixture: &Fixture) -> ArchiveEngine {
    ArchiveEngine::new(ArchiveConfig::load_and_resolve(&fixture.config_path).unwrap())
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_archive_round_commits_in_submission_order() {
    let fixture = setup("noreply");
    let report = engine(&fixture).run("esolang", "01", &NoFeed).await.unwrap();

    let ids: Vec<_> = report
        .commits
        .iter()
        .map(|c| c.submission_id.as_str())
        .collect();
    assert_eq!(ids, vec!["s1", "s4", "s2", "s5", "s6"]);

    let repo = ArchiveRepo::open(&fixture.root).unwrap();
    let history = repo.history().unwrap();
    assert_eq!(history.len(), 5);

    let messages: Vec<_> = history.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Update brainfuck.bf (4 bytes)",
            "Update brainfuck.bf (2 bytes)",
            "Update c-gcc.c (8 bytes)",
            "Update python3.py (8 bytes)",
            "Update starry.starry (99 bytes)",
        ]
    );

    // Linear chain rooted at the first commit.
    assert!(history[0].parent_shas.is_empty());
    for pair in history.windows(2) {
        assert_eq!(pair[1].parent_shas, vec![pair[0].sha.clone()]);
    }
    assert_eq!(
        repo.head_sha().unwrap().as_deref(),
        Some(report.commits[4].sha.as_str())
    );
}

#[tokio::test]
async fn test_archive_round_authors_and_dates() {
    let fixture = setup("noreply");
    engine(&fixture).run("esolang", "01", &NoFeed).await.unwrap();

    let history = ArchiveRepo::open(&fixture.root).unwrap().history().unwrap();

    assert_eq!(history[0].author_name, "hakatashi");
    assert_eq!(
        history[0].author_email,
        "hakatashi@users.noreply.github.com"
    );
    assert_eq!(history[1].author_name, "alice");
    assert_eq!(history[1].author_email, "alice@twitter.com");

    for commit in &history {
        assert_eq!(commit.author_name, commit.committer_name);
        assert_eq!(commit.author_email, commit.committer_email);
        assert_eq!(commit.author_time, commit.committer_time);
        assert_eq!(commit.author_offset_minutes, 540);
    }
    let times: Vec<_> = history.iter().map(|c| c.author_time).collect();
    assert_eq!(times, vec![1_000, 2_000, 3_000, 4_000, 4_000]);
}

#[tokio::test]
async fn test_archive_round_work_tree_holds_latest_code() {
    let fixture = setup("noreply");
    engine(&fixture).run("esolang", "01", &NoFeed).await.unwrap();

    let round = fixture.root.join("01");
    assert_eq!(std::fs::read(round.join("brainfuck.bf")).unwrap(), b"+.");
    assert_eq!(std::fs::read(round.join("c-gcc.c")).unwrap(), b"main(){}");
    assert_eq!(std::fs::read(round.join("python3.py")).unwrap(), b"print(1)");
    assert_eq!(
        std::fs::read(round.join("starry.starry")).unwrap(),
        b"\x00\xff raw"
    );

    let mut names: Vec<_> = std::fs::read_dir(&round)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["brainfuck.bf", "c-gcc.c", "python3.py", "starry.starry"]
    );
}

#[tokio::test]
async fn test_rerun_is_content_idempotent() {
    let fixture = setup("noreply");
    let engine = engine(&fixture);
    let first = engine.run("esolang", "01", &NoFeed).await.unwrap();
    let tree_before = {
        let repo = ArchiveRepo::open(&fixture.root).unwrap();
        let head = repo.repo().head().unwrap().peel_to_tree().unwrap();
        head.id()
    };

    let second = engine.run("esolang", "01", &NoFeed).await.unwrap();
    let repo = ArchiveRepo::open(&fixture.root).unwrap();
    let tree_after = repo.repo().head().unwrap().peel_to_tree().unwrap().id();

    assert_eq!(tree_before, tree_after);
    assert_eq!(repo.history().unwrap().len(), 10);
    assert!(repo
        .is_ancestor(&first.commits[4].sha, &second.commits[0].sha)
        .unwrap());
}

#[tokio::test]
async fn test_dry_run_plan_leaves_archive_untouched() {
    let fixture = setup("noreply");
    let plan = engine(&fixture)
        .plan("esolang", "02", &NoFeed)
        .await
        .unwrap();

    assert_eq!(plan.entries.len(), 5);
    assert_eq!(plan.entries[0].path, Path::new("02/brainfuck.bf"));
    assert!(!fixture.root.join("02").exists());
    assert_eq!(
        ArchiveRepo::open(&fixture.root).unwrap().head_sha().unwrap(),
        None
    );
}

#[tokio::test]
async fn test_contest_without_submissions_creates_empty_round() {
    let fixture = setup("noreply");
    {
        let db = Database::new(&fixture.db_path).unwrap();
        db.insert_contest(&Contest {
            id: "c3".into(),
            name: "empty".into(),
        })
        .unwrap();
    }

    let report = engine(&fixture).run("empty", "03", &NoFeed).await.unwrap();
    assert!(report.commits.is_empty());
    assert!(fixture.root.join("03").is_dir());
    assert_eq!(
        ArchiveRepo::open(&fixture.root).unwrap().head_sha().unwrap(),
        None
    );
}

#[tokio::test]
async fn test_unmapped_handle_aborts_before_any_commit() {
    let fixture = setup("noreply");
    std::fs::write(fixture.config_path.with_file_name("users.yml"), "hakatashi: hakatashi\n")
        .unwrap();

    let result = engine(&fixture).run("esolang", "01", &NoFeed).await;
    assert!(matches!(
        result,
        Err(CoreError::Archive(ArchiveError::UnmappedHandle { .. }))
    ));
    assert!(!fixture.root.join("01").exists());
    assert_eq!(
        ArchiveRepo::open(&fixture.root).unwrap().head_sha().unwrap(),
        None
    );
}

#[tokio::test]
async fn test_unknown_contest_is_an_error() {
    let fixture = setup("noreply");
    let result = engine(&fixture).run("nope", "01", &NoFeed).await;
    assert!(matches!(result, Err(CoreError::Database(_))));
}

#[tokio::test]
async fn test_github_events_strategy_uses_push_authors() {
    let fixture = setup("github_events");
    let feed = FakeFeed {
        authors: HashMap::from([(
            "hakatashi".to_string(),
            AuthorIdentity::new("Koki Takahashi", "hakatasiloving@gmail.com"),
        )]),
        calls: Mutex::new(Vec::new()),
    };

    engine(&fixture).run("esolang", "01", &feed).await.unwrap();

    assert_eq!(*feed.calls.lock().unwrap(), vec!["hakatashi".to_string()]);
    let history = ArchiveRepo::open(&fixture.root).unwrap().history().unwrap();
    assert_eq!(history[0].author_name, "Koki Takahashi");
    assert_eq!(history[0].committer_email, "hakatasiloving@gmail.com");
    assert_eq!(history[1].author_email, "alice@twitter.com");
}

#[tokio::test]
async fn test_github_events_without_push_fails_resolution() {
    let fixture = setup("github_events");
    let feed = FakeFeed {
        authors: HashMap::new(),
        calls: Mutex::new(Vec::new()),
    };

    let result = engine(&fixture).run("esolang", "01", &feed).await;
    assert!(matches!(
        result,
        Err(CoreError::Identity(IdentityError::NoPushEvent(_)))
    ));
    assert!(!fixture.root.join("01").exists());
}

#[test]
fn test_config_strategy_is_parsed() {
    let fixture = setup("github_events");
    let config = ArchiveConfig::load_and_resolve(&fixture.config_path).unwrap();
    assert_eq!(config.identity.strategy, IdentityStrategy::GithubEvents);
    assert_eq!(config.github.token, None);
}
