//! Submitter identity resolution.
//!
//! Resolution is two-phase: the raw registry (`users.yml`) is loaded, every
//! entry is resolved to an [`AuthorIdentity`](crate::models::AuthorIdentity),
//! and the result is frozen into an immutable [`ResolvedIdentities`] lookup.
//!
//! Per entry:
//! 1. No GitHub handle: `{handle, handle@<fallback_domain>}`
//! 2. GitHub handle, `noreply` strategy: `{login, login@users.noreply.<host>}`
//! 3. GitHub handle, `github_events` strategy: author of the latest push event

pub mod registry;
pub mod resolver;

pub use registry::IdentityRegistry;
pub use resolver::{EventFeed, IdentityResolver, ResolvedIdentities};
