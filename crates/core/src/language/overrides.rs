//! Extension override table.
//!
//! ```yaml
//! brainfuck: .bf
//! c-gcc: c
//! ```
//!
//! A value starting with `.` is a literal extension; anything else names
//! another slug to look up in the canonical registry instead.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::LanguageError;

/// One entry of the override table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionOverride {
    /// Use this extension verbatim (includes the leading dot).
    DirectExtension(String),
    /// Resolve this slug against the registry in place of the original.
    AliasRedirect(String),
}

impl ExtensionOverride {
    /// Classify a raw override value. A blank value is no override.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else if value.starts_with('.') {
            Some(Self::DirectExtension(value.to_string()))
        } else {
            Some(Self::AliasRedirect(value.to_string()))
        }
    }
}

/// Slug -> override lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: HashMap<String, ExtensionOverride>,
}

impl OverrideTable {
    /// Load the override table from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LanguageError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading language override table");

        if !path.exists() {
            return Err(LanguageError::OverrideFile {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| LanguageError::OverrideFile {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        Self::from_yaml_str(&contents).map_err(|detail| LanguageError::OverrideFile {
            path: path.display().to_string(),
            detail,
        })
    }

    /// Parse an override document. An empty document is an empty table.
    ///
    /// Keys and values are read as the text written in the document, so
    /// `.1` stays `.1` and `2048` stays `2048`. Null or blank values are
    /// skipped.
    pub fn from_yaml_str(contents: &str) -> Result<Self, String> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: HashMap<String, Option<String>> =
            serde_yaml::from_str(contents).map_err(|e| e.to_string())?;

        let entries: HashMap<_, _> = raw
            .into_iter()
            .filter_map(|(slug, value)| {
                let entry = ExtensionOverride::parse(value.as_deref()?)?;
                Some((slug, entry))
            })
            .collect();

        debug!(count = entries.len(), "parsed language overrides");
        Ok(Self { entries })
    }

    pub fn get(&self, slug: &str) -> Option<&ExtensionOverride> {
        self.entries.get(slug)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
