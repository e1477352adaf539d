//! Identity resolution: raw registry in, frozen handle -> identity map out.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use tracing::{debug, info};

use super::registry::IdentityRegistry;
use crate::config::{IdentityConfig, IdentityStrategy};
use crate::errors::{GitHubError, IdentityError};
use crate::models::AuthorIdentity;

/// Source of "who pushed last" for a GitHub login.
///
/// Implemented by [`GitHubClient`](crate::git::GitHubClient) against the
/// public events API.
pub trait EventFeed {
    /// Author of the first commit of the most recent push event, or `None`
    /// if the feed holds no push event.
    fn latest_push_author(
        &self,
        login: &str,
    ) -> impl Future<Output = Result<Option<AuthorIdentity>, GitHubError>> + Send;
}

/// Fully resolved handle -> identity lookup. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentities {
    identities: BTreeMap<String, AuthorIdentity>,
}

impl ResolvedIdentities {
    pub fn get(&self, handle: &str) -> Option<&AuthorIdentity> {
        self.identities.get(handle)
    }

    /// Iterate `(handle, identity)` pairs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AuthorIdentity)> {
        self.identities.iter().map(|(h, i)| (h.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl FromIterator<(String, AuthorIdentity)> for ResolvedIdentities {
    fn from_iter<T: IntoIterator<Item = (String, AuthorIdentity)>>(iter: T) -> Self {
        Self {
            identities: iter.into_iter().collect(),
        }
    }
}

/// Resolves every registry entry according to the configured strategy.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    strategy: IdentityStrategy,
    noreply_host: String,
    fallback_domain: String,
}

impl IdentityResolver {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            strategy: config.strategy,
            noreply_host: config.noreply_host.clone(),
            fallback_domain: config.fallback_domain.clone(),
        }
    }

    /// Resolve the whole registry.
    ///
    /// The feed is only consulted under [`IdentityStrategy::GithubEvents`],
    /// once per distinct login, sequentially. The first failed lookup aborts
    /// resolution.
    pub async fn resolve<F: EventFeed>(
        &self,
        registry: &IdentityRegistry,
        feed: &F,
    ) -> Result<ResolvedIdentities, IdentityError> {
        info!(
            entries = registry.len(),
            strategy = ?self.strategy,
            "resolving submitter identities"
        );

        let mut looked_up: HashMap<String, AuthorIdentity> = HashMap::new();
        let mut resolved = BTreeMap::new();

        for (handle, login) in registry.iter() {
            let identity = match (login, self.strategy) {
                (None, _) => self.fallback_identity(handle),
                (Some(login), IdentityStrategy::Noreply) => self.noreply_identity(login),
                (Some(login), IdentityStrategy::GithubEvents) => {
                    if let Some(identity) = looked_up.get(login) {
                        identity.clone()
                    } else {
                        let identity = feed
                            .latest_push_author(login)
                            .await
                            .map_err(|source| IdentityError::Feed {
                                handle: login.to_string(),
                                source,
                            })?
                            .ok_or_else(|| IdentityError::NoPushEvent(login.to_string()))?;
                        info!(handle, login, author = %identity, "resolved identity from push events");
                        looked_up.insert(login.to_string(), identity.clone());
                        identity
                    }
                }
            };
            debug!(handle, author = %identity, "resolved identity");
            resolved.insert(handle.to_string(), identity);
        }

        Ok(ResolvedIdentities {
            identities: resolved,
        })
    }

    fn fallback_identity(&self, handle: &str) -> AuthorIdentity {
        AuthorIdentity::new(handle, format!("{}@{}", handle, self.fallback_domain))
    }

    fn noreply_identity(&self, login: &str) -> AuthorIdentity {
        AuthorIdentity::new(
            login,
            format!("{}@users.noreply.{}", login, self.noreply_host),
        )
    }
}
