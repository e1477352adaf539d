//! YAML identity registry reader.
//!
//! The registry maps a contest handle (the local part of the user's email)
//! to the submitter's GitHub login, or to null when they have none:
//!
//! ```yaml
//! hakatashi: hakatashi
//! alice: ~
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::IdentityError;

/// Raw, unresolved identity registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRegistry {
    entries: BTreeMap<String, Option<String>>,
}

impl IdentityRegistry {
    /// Load the registry from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IdentityError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading identity registry");

        if !path.exists() {
            return Err(IdentityError::RegistryFile {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| IdentityError::RegistryFile {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        Self::from_yaml_str(&contents).map_err(|detail| IdentityError::RegistryFile {
            path: path.display().to_string(),
            detail,
        })
    }

    /// Parse a registry document. An empty document is an empty registry.
    pub fn from_yaml_str(contents: &str) -> Result<Self, String> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        // Keys and logins are read as written: `1e3` stays `1e3`.
        let entries: BTreeMap<String, Option<String>> =
            serde_yaml::from_str(contents).map_err(|e| e.to_string())?;

        // A blank login is as good as null.
        let entries: BTreeMap<_, _> = entries
            .into_iter()
            .map(|(handle, login)| (handle, login.filter(|l| !l.trim().is_empty())))
            .collect();

        debug!(count = entries.len(), "parsed identity registry");
        Ok(Self { entries })
    }

    /// Iterate `(handle, github login)` pairs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(handle, login)| (handle.as_str(), login.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
