//! File writes into the archive work tree.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::errors::ArchiveError;

/// Check that `round` names exactly one directory below the archive root.
pub fn validate_round(round: &str) -> Result<(), ArchiveError> {
    if is_single_component(round) {
        Ok(())
    } else {
        Err(ArchiveError::InvalidRound(round.to_string()))
    }
}

/// Check that `filename` names exactly one file inside a round directory.
pub fn validate_filename(filename: &str) -> Result<(), ArchiveError> {
    if is_single_component(filename) {
        Ok(())
    } else {
        Err(ArchiveError::InvalidFilename(filename.to_string()))
    }
}

fn is_single_component(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Writes submission code under `<root>/<round>/`.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    root: PathBuf,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `<root>/<round>` if it does not exist yet.
    pub fn ensure_round_dir(&self, round: &str) -> Result<PathBuf, ArchiveError> {
        validate_round(round)?;
        let dir = self.root.join(round);
        std::fs::create_dir_all(&dir).map_err(|source| ArchiveError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(dir)
    }

    /// Write `content` to `<root>/<round>/<filename>`, replacing any
    /// previous file. Returns the path relative to the root.
    pub fn write(
        &self,
        round: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, ArchiveError> {
        validate_filename(filename)?;
        let dir = self.ensure_round_dir(round)?;
        let target = dir.join(filename);
        std::fs::write(&target, content).map_err(|source| ArchiveError::Io {
            path: target.display().to_string(),
            source,
        })?;
        debug!(path = %target.display(), bytes = content.len(), "wrote archive file");
        Ok(Path::new(round).join(filename))
    }
}
