//! Language slug -> file extension resolution.
//!
//! The lookup order is:
//! 1. Override table (`languages.yml`): a `.ext` value is returned as is
//! 2. Canonical registry (linguist), matched against the slug or the
//!    override's alternate slug by name or alias, case-insensitively
//! 3. Fallback: `.` followed by the effective slug

pub mod overrides;
pub mod registry;
pub mod resolver;

pub use overrides::{ExtensionOverride, OverrideTable};
pub use registry::{LanguageEntry, LanguageRegistry};
pub use resolver::{ExtensionResolver, ExtensionSource, ResolvedExtension};
