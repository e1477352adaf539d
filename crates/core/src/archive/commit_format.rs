//! Commit message formatting for archive commits.

use crate::config::ArchiveSection;

/// Formats commit messages from the configured template.
///
/// Placeholders: `{filename}`, `{bytes}`, `{round}`, `{language}`.
#[derive(Debug, Clone)]
pub struct CommitFormatter {
    template: String,
}

impl CommitFormatter {
    pub fn new(config: &ArchiveSection) -> Self {
        Self::from_template(&config.commit_message)
    }

    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Fill the template in one left-to-right pass. Inserted values are
    /// copied verbatim, so braces inside a file name are never expanded.
    pub fn format(&self, filename: &str, bytes: u64, round: &str, language: &str) -> String {
        let bytes = bytes.to_string();
        let placeholders = [
            ("{filename}", filename),
            ("{bytes}", bytes.as_str()),
            ("{round}", round),
            ("{language}", language),
        ];

        let mut out = String::with_capacity(self.template.len() + filename.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            match placeholders
                .iter()
                .find(|(placeholder, _)| tail.starts_with(placeholder))
            {
                Some((placeholder, value)) => {
                    out.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for CommitFormatter {
    fn default() -> Self {
        Self::new(&ArchiveSection::default())
    }
}
