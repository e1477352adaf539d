//! TOML-based configuration for the archiver.
//!
//! Secrets are never stored in the file: the GitHub token is referenced by
//! the name of an environment variable (`token_env`) and resolved at runtime
//! via [`ArchiveConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

/// Raw linguist registry, the canonical language name -> extensions source.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/github/linguist/master/lib/linguist/languages.yml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveConfig {
    /// Archive repository and commit settings.
    #[serde(default)]
    pub archive: ArchiveSection,

    /// Submitter identity settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Extension override table and language registry settings.
    #[serde(default)]
    pub languages: LanguagesConfig,

    /// Datastore snapshot settings.
    #[serde(default)]
    pub datastore: DatastoreConfig,

    /// GitHub API settings (used by the `github_events` identity strategy).
    #[serde(default)]
    pub github: GitHubConfig,
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// Archive repository and commit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSection {
    /// Path to the archive git repository (must already be initialized).
    #[serde(default = "default_archive_root")]
    pub root: PathBuf,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Commit message template.
    /// Placeholders: `{filename}`, `{bytes}`, `{round}`, `{language}`
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Timezone offset applied to every commit signature, in minutes east
    /// of UTC. The contest runs on JST.
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset_minutes: i32,
}

fn default_archive_root() -> PathBuf {
    PathBuf::from("esolang-battle-archive")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_commit_message() -> String {
    "Update {filename} ({bytes} bytes)".into()
}
fn default_timezone_offset() -> i32 {
    540
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            root: default_archive_root(),
            log_level: default_log_level(),
            commit_message: default_commit_message(),
            timezone_offset_minutes: default_timezone_offset(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// How a submitter's known GitHub handle becomes a commit identity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// `{handle, handle@users.noreply.<host>}` with no network access.
    #[default]
    Noreply,
    /// Adopt the author of the handle's most recent public push event.
    GithubEvents,
}

/// Submitter identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// YAML document mapping contest handle -> GitHub handle or null.
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,

    /// Strategy for handles with a known GitHub account.
    #[serde(default)]
    pub strategy: IdentityStrategy,

    /// Host used for synthetic noreply addresses.
    #[serde(default = "default_noreply_host")]
    pub noreply_host: String,

    /// Email domain for handles with no GitHub account.
    #[serde(default = "default_fallback_domain")]
    pub fallback_domain: String,
}

fn default_users_file() -> PathBuf {
    PathBuf::from("users.yml")
}
fn default_noreply_host() -> String {
    "github.com".into()
}
fn default_fallback_domain() -> String {
    "twitter.com".into()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
            strategy: IdentityStrategy::default(),
            noreply_host: default_noreply_host(),
            fallback_domain: default_fallback_domain(),
        }
    }
}

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

/// Extension override table and canonical registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesConfig {
    /// YAML document mapping language slug -> `.ext` or alternate slug.
    #[serde(default = "default_overrides_file")]
    pub overrides_file: PathBuf,

    /// URL of the canonical language registry.
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Local copy of the registry. When set, no HTTP fetch is made.
    #[serde(default)]
    pub registry_file: Option<PathBuf>,
}

fn default_overrides_file() -> PathBuf {
    PathBuf::from("languages.yml")
}
fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.into()
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            overrides_file: default_overrides_file(),
            registry_url: default_registry_url(),
            registry_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Datastore
// ---------------------------------------------------------------------------

/// Datastore snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Path to the SQLite snapshot of the contest datastore.
    #[serde(default = "default_datastore_path")]
    pub path: PathBuf,
}

fn default_datastore_path() -> PathBuf {
    PathBuf::from("esolang-battle.db")
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            path: default_datastore_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API base URL (default `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Environment variable holding an optional access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token_env: default_token_env(),
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl ArchiveConfig {
    /// Load an [`ArchiveConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ArchiveConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the token environment variable. A missing token is not an
    /// error: unauthenticated lookups are allowed, just rate limited.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");
        self.github.token = resolve_optional_env(&self.github.token_env, "github.token_env");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "archive.root".into(),
                detail: "archive root must not be empty".into(),
            });
        }
        if !self.archive.commit_message.contains("{filename}") {
            return Err(ConfigError::InvalidValue {
                field: "archive.commit_message".into(),
                detail: "template must contain the {filename} placeholder".into(),
            });
        }
        if self.archive.timezone_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue {
                field: "archive.timezone_offset_minutes".into(),
                detail: "offset must be within +/- 24 hours".into(),
            });
        }
        if self.identity.users_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "identity.users_file".into(),
                detail: "users file must not be empty".into(),
            });
        }
        if self.identity.noreply_host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "identity.noreply_host".into(),
                detail: "noreply host must not be empty".into(),
            });
        }
        if self.identity.fallback_domain.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "identity.fallback_domain".into(),
                detail: "fallback domain must not be empty".into(),
            });
        }
        if self.languages.overrides_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "languages.overrides_file".into(),
                detail: "overrides file must not be empty".into(),
            });
        }
        if self.languages.registry_file.is_none() && self.languages.registry_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "languages.registry_url".into(),
                detail: "either registry_url or registry_file is required".into(),
            });
        }
        if self.datastore.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "datastore.path".into(),
                detail: "datastore path must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# esolang-archive configuration

[archive]
root = "esolang-battle-archive"
log_level = "info"
commit_message = "Update {filename} ({bytes} bytes)"
timezone_offset_minutes = 540

[identity]
users_file = "users.yml"
# "noreply" or "github_events"
strategy = "noreply"
noreply_host = "github.com"
fallback_domain = "twitter.com"

[languages]
overrides_file = "languages.yml"
registry_url = "https://raw.githubusercontent.com/github/linguist/master/lib/linguist/languages.yml"
# registry_file = "linguist-languages.yml"

[datastore]
path = "esolang-battle.db"

[github]
api_url = "https://api.github.com"
token_env = "GITHUB_TOKEN"
"#
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
