//! Error types for the esolang-archive core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Language(#[from] LanguageError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors from loading and resolving submitter identities.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The users file could not be read or parsed.
    #[error("identity registry error at '{path}': {detail}")]
    RegistryFile { path: String, detail: String },

    /// The event feed for a handle contained no push event to take an
    /// author from.
    #[error("no push event with a commit author found for '{0}'")]
    NoPushEvent(String),

    /// The event feed lookup itself failed.
    #[error("event feed lookup for '{handle}' failed: {source}")]
    Feed {
        handle: String,
        #[source]
        source: GitHubError,
    },
}

// ---------------------------------------------------------------------------
// Language errors
// ---------------------------------------------------------------------------

/// Errors from the extension override table and the language registry.
#[derive(Debug, Error)]
pub enum LanguageError {
    /// The override table could not be read or parsed.
    #[error("language override file error at '{path}': {detail}")]
    OverrideFile { path: String, detail: String },

    /// The registry document could not be parsed.
    #[error("language registry parse error: {0}")]
    RegistryParse(String),

    /// Fetching the registry over HTTP failed.
    #[error("language registry fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The registry endpoint returned a non-success status.
    #[error("language registry returned HTTP {status} for {url}")]
    FetchStatus { status: u16, url: String },

    /// Generic I/O error.
    #[error("language registry I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite datastore snapshot.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A stored column holds a value of the wrong kind.
    #[error("invalid {column} on submission {id}: {detail}")]
    InvalidColumn {
        id: String,
        column: String,
        detail: String,
    },

    /// A stored timestamp could not be interpreted.
    #[error("invalid timestamp '{value}' on submission {id}")]
    InvalidTimestamp { id: String, value: String },
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// The path to commit lies outside the repository work tree.
    #[error("path '{0}' is not inside the repository work tree")]
    OutsideWorkTree(String),

    /// The repository is bare and has no work tree to commit from.
    #[error("git repository at '{0}' has no work tree")]
    BareRepository(String),
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },
}

// ---------------------------------------------------------------------------
// Archive errors
// ---------------------------------------------------------------------------

/// Errors from planning and applying an archive run.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A submission references a language missing from the datastore.
    #[error("submission {submission} references unknown language {language}")]
    UnknownLanguage { submission: String, language: String },

    /// A submission references a user missing from the datastore.
    #[error("submission {submission} references unknown user {user}")]
    UnknownUser { submission: String, user: String },

    /// A user's email has no local part usable as a registry key.
    #[error("user {user} has malformed email '{email}'")]
    MalformedEmail { user: String, email: String },

    /// The user's handle has no entry in the identity registry.
    #[error("handle '{handle}' (submission {submission}) is not in the identity registry")]
    UnmappedHandle { submission: String, handle: String },

    /// The round identifier would escape the archive root.
    #[error("invalid round identifier '{0}'")]
    InvalidRound(String),

    /// A language slug would produce a file name outside the round directory.
    #[error("language slug '{0}' is not a usable file name")]
    InvalidFilename(String),

    /// Writing an archive file failed.
    #[error("archive write failed at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Creating a commit failed.
    #[error(transparent)]
    Git(#[from] GitError),
}
