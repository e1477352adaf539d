//! Canonical language registry (github/linguist `languages.yml`).
//!
//! Only `extensions` and `aliases` are read from each entry; everything
//! else in the document is ignored. Entries keep document order, which is
//! the tie-break order for matching.

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, instrument};

use crate::errors::LanguageError;

/// One canonical language.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LanguageEntry {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone)]
struct RegistryRecord {
    name: String,
    /// Lowercased name and aliases, for case-insensitive comparison.
    keys: Vec<String>,
    entry: LanguageEntry,
}

/// Top-level mapping read in document order, keys kept as written.
struct DocumentOrder(Vec<(String, LanguageEntry)>);

impl<'de> Deserialize<'de> for DocumentOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderVisitor;

        impl<'de> Visitor<'de> for OrderVisitor {
            type Value = DocumentOrder;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of language name to language entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, LanguageEntry>()? {
                    entries.push(entry);
                }
                Ok(DocumentOrder(entries))
            }
        }

        deserializer.deserialize_map(OrderVisitor)
    }
}

/// Read-only canonical name -> entry mapping.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    records: Vec<RegistryRecord>,
}

impl LanguageRegistry {
    /// Fetch and parse the registry from `url`.
    #[instrument]
    pub async fn fetch(url: &str) -> Result<Self, LanguageError> {
        info!("fetching language registry");
        let resp = reqwest::get(url).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LanguageError::FetchStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        Self::from_yaml_str(&body)
    }

    /// Load the registry from a local YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LanguageError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading language registry");
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a registry document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, LanguageError> {
        let raw: DocumentOrder = serde_yaml::from_str(contents)
            .map_err(|e| LanguageError::RegistryParse(e.to_string()))?;

        let mut registry = Self::default();
        for (name, entry) in raw.0 {
            registry.push(name, entry);
        }

        debug!(count = registry.len(), "parsed language registry");
        Ok(registry)
    }

    /// Append an entry. Later entries lose ties to earlier ones.
    pub fn push(&mut self, name: impl Into<String>, entry: LanguageEntry) {
        let name = name.into();
        let keys = std::iter::once(&name)
            .chain(entry.aliases.iter())
            .map(|key| key.to_lowercase())
            .collect();
        self.records.push(RegistryRecord { name, keys, entry });
    }

    /// First entry, in document order, whose name or one of whose aliases
    /// equals `slug` ignoring case, and that lists at least one extension.
    ///
    /// The comparison is literal: no character of `slug` is special.
    pub fn find(&self, slug: &str) -> Option<(&str, &LanguageEntry)> {
        let needle = slug.to_lowercase();
        self.records
            .iter()
            .filter(|record| !record.entry.extensions.is_empty())
            .find(|record| record.keys.iter().any(|key| *key == needle))
            .map(|record| (record.name.as_str(), &record.entry))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
