//! Git operations: the archive repository and the GitHub events API.

pub mod client;
pub mod github;

pub use client::{ArchiveCommit, ArchiveRepo};
pub use github::GitHubClient;
