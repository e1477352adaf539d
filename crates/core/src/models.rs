//! Domain model types used throughout the archiver.
//!
//! Records mirror the contest datastore; they are read once and never
//! mutated by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Author identity
// ---------------------------------------------------------------------------

/// A Git author/committer identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AuthorIdentity {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl AuthorIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl std::fmt::Display for AuthorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

// ---------------------------------------------------------------------------
// Datastore records
// ---------------------------------------------------------------------------

/// A contest, e.g. `esolang` or `mayfes2018`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contest {
    pub id: String,
    pub name: String,
}

/// A registered user. Only the email is used: its local part is the key
/// into the identity registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
}

impl User {
    /// The part of the email before the first `@`, or `None` if the email
    /// has no `@` or nothing precedes it.
    pub fn email_local_part(&self) -> Option<&str> {
        match self.email.split_once('@') {
            Some((local, _)) if !local.is_empty() => Some(local),
            _ => None,
        }
    }
}

/// A programming language registered with the contest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
    pub id: String,
    pub slug: String,
}

/// Judge status of a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Success,
    Failed,
    Error,
    Invalid,
}

impl SubmissionStatus {
    /// Parse a status string as stored in the datastore.
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "error" => Self::Error,
            "invalid" => Self::Invalid,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Error => write!(f, "error"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// A judged submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub language_id: String,
    pub code: Vec<u8>,
    /// Byte size recorded by the judge, when available.
    pub size: Option<i64>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// Size shown in the commit message: the recorded size, else the raw
    /// code length. A recorded size of zero counts as absent.
    pub fn display_size(&self) -> u64 {
        match self.size {
            Some(size) if size > 0 => size as u64,
            _ => self.code.len() as u64,
        }
    }
}

/// Everything the planner needs from the datastore for one contest.
///
/// `submissions` holds only successful submissions, ordered by
/// `created_at` ascending.
#[derive(Debug, Clone)]
pub struct ContestSnapshot {
    pub contest: Contest,
    pub users: Vec<User>,
    pub languages: Vec<Language>,
    pub submissions: Vec<Submission>,
}
