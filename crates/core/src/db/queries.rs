//! Typed query helpers for the datastore snapshot.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::Database;
use crate::errors::DatabaseError;
use crate::models::{Contest, ContestSnapshot, Language, Submission, SubmissionStatus, User};

impl Database {
    // -- contests -----------------------------------------------------------

    /// Look up a contest by its name (e.g. `esolang`).
    pub fn find_contest(&self, name: &str) -> Result<Contest, DatabaseError> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM contests WHERE name = ?1",
            params![name],
            |row| {
                Ok(Contest {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "contest".into(),
            id: name.to_string(),
        })
    }

    pub fn insert_contest(&self, contest: &Contest) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO contests (id, name) VALUES (?1, ?2)",
            params![contest.id, contest.name],
        )?;
        Ok(())
    }

    // -- users --------------------------------------------------------------

    pub fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, email FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = users.len(), "listed users");
        Ok(users)
    }

    pub fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO users (id, email) VALUES (?1, ?2)",
            params![user.id, user.email],
        )?;
        Ok(())
    }

    // -- languages ----------------------------------------------------------

    pub fn list_languages(&self) -> Result<Vec<Language>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, slug FROM languages ORDER BY id")?;
        let languages = stmt
            .query_map([], |row| {
                Ok(Language {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = languages.len(), "listed languages");
        Ok(languages)
    }

    pub fn insert_language(&self, language: &Language) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO languages (id, slug) VALUES (?1, ?2)",
            params![language.id, language.slug],
        )?;
        Ok(())
    }

    // -- submissions --------------------------------------------------------

    /// Successful submissions of a contest, oldest first. Submissions with
    /// equal `created_at` keep their insertion order.
    pub fn list_successful_submissions(
        &self,
        contest_id: &str,
    ) -> Result<Vec<Submission>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, language_id, code, size, status, created_at
             FROM submissions
             WHERE contest_id = ?1 AND status = 'success'
             ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![contest_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Value>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Value>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut submissions = rows
            .into_iter()
            .map(|(id, user_id, language_id, code, size, status, created_at)| {
                let code = code_bytes(&id, code)?;
                let created_at = parse_timestamp(&id, created_at)?;
                Ok(Submission {
                    id,
                    user_id,
                    language_id,
                    code,
                    size,
                    status: SubmissionStatus::from_str_val(&status),
                    created_at,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        // Stable: ties stay in insertion order.
        submissions.sort_by_key(|s| s.created_at);
        debug!(contest_id, count = submissions.len(), "listed successful submissions");
        Ok(submissions)
    }

    pub fn insert_submission(
        &self,
        contest_id: &str,
        submission: &Submission,
    ) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO submissions
                (id, user_id, language_id, contest_id, code, size, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                submission.id,
                submission.user_id,
                submission.language_id,
                contest_id,
                submission.code,
                submission.size,
                submission.status.to_string(),
                submission
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ],
        )?;
        Ok(())
    }

    // -- snapshot -----------------------------------------------------------

    /// Everything the archive planner needs for one contest.
    pub fn load_snapshot(&self, contest_name: &str) -> Result<ContestSnapshot, DatabaseError> {
        let contest = self.find_contest(contest_name)?;
        let users = self.list_users()?;
        let languages = self.list_languages()?;
        let submissions = self.list_successful_submissions(&contest.id)?;
        info!(
            contest = %contest.name,
            users = users.len(),
            languages = languages.len(),
            submissions = submissions.len(),
            "loaded contest snapshot"
        );
        Ok(ContestSnapshot {
            contest,
            users,
            languages,
            submissions,
        })
    }
}

/// Source code is normally a BLOB; snapshots exported as text are accepted.
fn code_bytes(id: &str, value: Value) -> Result<Vec<u8>, DatabaseError> {
    match value {
        Value::Blob(bytes) => Ok(bytes),
        Value::Text(text) => Ok(text.into_bytes()),
        other => Err(DatabaseError::InvalidColumn {
            id: id.to_string(),
            column: "code".into(),
            detail: format!("{:?}", other),
        }),
    }
}

/// Interpret a stored `created_at`: integer epoch milliseconds, or text
/// holding either RFC 3339 or epoch milliseconds.
fn parse_timestamp(id: &str, value: Value) -> Result<DateTime<Utc>, DatabaseError> {
    let invalid = |value: String| DatabaseError::InvalidTimestamp {
        id: id.to_string(),
        value,
    };
    match value {
        Value::Integer(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| invalid(ms.to_string())),
        Value::Text(text) => {
            if let Ok(ms) = text.trim().parse::<i64>() {
                return Utc
                    .timestamp_millis_opt(ms)
                    .single()
                    .ok_or_else(|| invalid(text));
            }
            DateTime::parse_from_rfc3339(text.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| invalid(text))
        }
        other => Err(invalid(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db.insert_contest(&Contest {
            id: "c1".into(),
            name: "esolang".into(),
        })
        .unwrap();
        db.insert_contest(&Contest {
            id: "c2".into(),
            name: "mayfes".into(),
        })
        .unwrap();
        db
    }

    fn submission(id: &str, status: SubmissionStatus, ms: i64) -> Submission {
        Submission {
            id: id.into(),
            user_id: "u1".into(),
            language_id: "l1".into(),
            code: format!("code of {id}").into_bytes(),
            size: None,
            status,
            created_at: Utc.timestamp_millis_opt(ms).unwrap(),
        }
    }

    #[test]
    fn test_find_contest() {
        let db = setup();
        assert_eq!(db.find_contest("esolang").unwrap().id, "c1");
        assert!(matches!(
            db.find_contest("missing"),
            Err(DatabaseError::NotFound { ref entity, .. }) if entity == "contest"
        ));
    }

    #[test]
    fn test_successful_submissions_are_filtered_and_ordered() {
        let db = setup();
        db.insert_submission("c1", &submission("late", SubmissionStatus::Success, 3_000))
            .unwrap();
        db.insert_submission("c1", &submission("failed", SubmissionStatus::Failed, 1_000))
            .unwrap();
        db.insert_submission("c1", &submission("early", SubmissionStatus::Success, 2_000))
            .unwrap();
        db.insert_submission("c2", &submission("other", SubmissionStatus::Success, 500))
            .unwrap();

        let ids: Vec<_> = db
            .list_successful_submissions("c1")
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let db = setup();
        for id in ["first", "second", "third"] {
            db.insert_submission("c1", &submission(id, SubmissionStatus::Success, 1_000))
                .unwrap();
        }
        let ids: Vec<_> = db
            .list_successful_submissions("c1")
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let db = setup();
        let mut original = submission("s1", SubmissionStatus::Success, 1_512_345_678_901);
        original.code = vec![0x2b, 0x00, 0xff];
        original.size = Some(3);
        db.insert_submission("c1", &original).unwrap();

        let loaded = db.list_successful_submissions("c1").unwrap();
        assert_eq!(loaded, vec![original]);
    }

    #[test]
    fn test_integer_millisecond_timestamps() {
        let db = setup();
        db.conn()
            .execute(
                "INSERT INTO submissions
                    (id, user_id, language_id, contest_id, code, size, status, created_at)
                 VALUES ('s1', 'u1', 'l1', 'c1', x'00', NULL, 'success', 1512345678000)",
                [],
            )
            .unwrap();

        let loaded = db.list_successful_submissions("c1").unwrap();
        assert_eq!(loaded[0].created_at.timestamp(), 1_512_345_678);
    }

    #[test]
    fn test_text_code_is_accepted() {
        let db = setup();
        db.conn()
            .execute(
                "INSERT INTO submissions
                    (id, user_id, language_id, contest_id, code, size, status, created_at)
                 VALUES ('s1', 'u1', 'l1', 'c1', '+[]', NULL, 'success', '2017-12-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let loaded = db.list_successful_submissions("c1").unwrap();
        assert_eq!(loaded[0].code, b"+[]".to_vec());
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        let db = setup();
        db.conn()
            .execute(
                "INSERT INTO submissions
                    (id, user_id, language_id, contest_id, code, size, status, created_at)
                 VALUES ('bad', 'u1', 'l1', 'c1', x'00', NULL, 'success', 'yesterday')",
                [],
            )
            .unwrap();

        assert!(matches!(
            db.list_successful_submissions("c1"),
            Err(DatabaseError::InvalidTimestamp { ref id, .. }) if id == "bad"
        ));
    }

    #[test]
    fn test_load_snapshot() {
        let db = setup();
        db.insert_user(&User {
            id: "u1".into(),
            email: "alice@twitter.com".into(),
        })
        .unwrap();
        db.insert_language(&Language {
            id: "l1".into(),
            slug: "brainfuck".into(),
        })
        .unwrap();
        db.insert_submission("c1", &submission("s1", SubmissionStatus::Success, 1_000))
            .unwrap();

        let snapshot = db.load_snapshot("esolang").unwrap();
        assert_eq!(snapshot.contest.name, "esolang");
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.languages[0].slug, "brainfuck");
        assert_eq!(snapshot.submissions.len(), 1);
    }
}
