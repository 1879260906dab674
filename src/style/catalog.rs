//! StyleCatalog trait definition.
//!
//! Abstracts the style/genre metadata source so the planner can run against
//! a static snapshot, a remote service, or a mock in tests.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A catalog style entry: canonical slug, display name and known aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleEntry {
    pub slug: String,
    pub name: String,
    pub aliases: Vec<String>,
}

/// Trait for style catalog backends.
///
/// Resolution is case- and alias-insensitive. `get_similar_slugs` returns
/// neighbors ranked best-first; the ranking order is part of the contract
/// because relaxed expansion consumes it prefix-wise.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait StyleCatalog: Send + Sync {
    /// All known styles.
    fn get_all(&self) -> Result<Vec<StyleEntry>>;

    /// Free-text search over names and aliases.
    fn search(&self, query: &str) -> Result<Vec<StyleEntry>>;

    /// Resolve a single name/alias/slug to its canonical slug, if known.
    fn resolve_slug(&self, name: &str) -> Result<Option<String>>;

    /// Look up a style by its canonical slug.
    fn get_by_slug(&self, slug: &str) -> Result<Option<StyleEntry>>;

    /// Ranked similar slugs for a style, best first.
    fn get_similar_slugs(&self, slug: &str) -> Result<Vec<String>>;

    /// Resolve a batch of requested names to canonical slugs, preserving
    /// input order. Unresolvable names fall back to a literal slug form.
    fn normalize(&self, selected: &[String]) -> Result<Vec<String>> {
        let mut slugs = Vec::with_capacity(selected.len());
        for name in selected {
            match self.resolve_slug(name)? {
                Some(slug) => slugs.push(slug),
                None => slugs.push(super::slugify(name)),
            }
        }
        Ok(slugs)
    }
}
