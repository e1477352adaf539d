//! Slug -> extension resolution over the override table and the registry.

use tracing::debug;

use super::overrides::{ExtensionOverride, OverrideTable};
use super::registry::LanguageRegistry;

/// Where a resolved extension came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionSource {
    /// A literal extension from the override table.
    Override,
    /// The first extension of the named canonical language.
    Registry { language: String },
    /// Neither table knew the slug.
    Fallback,
}

/// Result of resolving one slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExtension {
    /// The slug that was looked up in the registry (after any redirect).
    pub effective_slug: String,
    /// Extension including its leading dot.
    pub extension: String,
    pub source: ExtensionSource,
}

/// Pure resolver over a fixed override table and registry.
#[derive(Debug, Clone, Default)]
pub struct ExtensionResolver {
    overrides: OverrideTable,
    registry: LanguageRegistry,
}

impl ExtensionResolver {
    pub fn new(overrides: OverrideTable, registry: LanguageRegistry) -> Self {
        Self {
            overrides,
            registry,
        }
    }

    /// Extension for `slug`, including the leading dot.
    pub fn resolve(&self, slug: &str) -> String {
        self.resolve_detailed(slug).extension
    }

    /// Resolve `slug` and report which rule produced the extension.
    ///
    /// A redirect is followed once; the alternate slug is not looked up in
    /// the override table again.
    pub fn resolve_detailed(&self, slug: &str) -> ResolvedExtension {
        let effective_slug = match self.overrides.get(slug) {
            Some(ExtensionOverride::DirectExtension(extension)) => {
                debug!(slug, %extension, "extension from override table");
                return ResolvedExtension {
                    effective_slug: slug.to_string(),
                    extension: extension.clone(),
                    source: ExtensionSource::Override,
                };
            }
            Some(ExtensionOverride::AliasRedirect(alternate)) => alternate.as_str(),
            None => slug,
        };

        if let Some((language, entry)) = self.registry.find(effective_slug) {
            debug!(slug, effective_slug, language, "extension from language registry");
            return ResolvedExtension {
                effective_slug: effective_slug.to_string(),
                extension: entry.extensions[0].clone(),
                source: ExtensionSource::Registry {
                    language: language.to_string(),
                },
            };
        }

        debug!(slug, effective_slug, "no registry match, using slug as extension");
        ResolvedExtension {
            effective_slug: effective_slug.to_string(),
            extension: format!(".{}", effective_slug),
            source: ExtensionSource::Fallback,
        }
    }
}
