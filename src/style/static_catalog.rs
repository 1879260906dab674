//! In-memory style catalog backed by a static snapshot.
//!
//! Useful as a production backend for pre-baked style dumps and as the
//! default fixture in tests.

use super::catalog::{StyleCatalog, StyleEntry};
use anyhow::Result;
use std::collections::HashMap;

/// Style catalog held fully in memory.
pub struct StaticStyleCatalog {
    entries: Vec<StyleEntry>,
    // lowercase name/alias/slug -> canonical slug
    lookup: HashMap<String, String>,
    similar: HashMap<String, Vec<String>>,
}

impl StaticStyleCatalog {
    pub fn new(entries: Vec<StyleEntry>, similar: HashMap<String, Vec<String>>) -> Self {
        let mut lookup = HashMap::new();
        for entry in &entries {
            lookup.insert(entry.slug.to_lowercase(), entry.slug.clone());
            lookup.insert(entry.name.to_lowercase(), entry.slug.clone());
            for alias in &entry.aliases {
                lookup.insert(alias.to_lowercase(), entry.slug.clone());
            }
        }
        Self {
            entries,
            lookup,
            similar,
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![], HashMap::new())
    }
}

impl StyleCatalog for StaticStyleCatalog {
    fn get_all(&self) -> Result<Vec<StyleEntry>> {
        Ok(self.entries.clone())
    }

    fn search(&self, query: &str) -> Result<Vec<StyleEntry>> {
        let needle = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.slug.contains(&needle)
                    || e.aliases.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    fn resolve_slug(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lookup.get(&name.trim().to_lowercase()).cloned())
    }

    fn get_by_slug(&self, slug: &str) -> Result<Option<StyleEntry>> {
        Ok(self.entries.iter().find(|e| e.slug == slug).cloned())
    }

    fn get_similar_slugs(&self, slug: &str) -> Result<Vec<String>> {
        Ok(self.similar.get(slug).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(slug: &str, name: &str, aliases: &[&str]) -> StyleEntry {
        StyleEntry {
            slug: slug.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn catalog() -> StaticStyleCatalog {
        let mut similar = HashMap::new();
        similar.insert(
            "prog-rock".to_string(),
            vec!["art-rock".to_string(), "krautrock".to_string()],
        );
        StaticStyleCatalog::new(
            vec![
                entry("prog-rock", "Progressive Rock", &["Prog"]),
                entry("art-rock", "Art Rock", &[]),
                entry("krautrock", "Krautrock", &[]),
            ],
            similar,
        )
    }

    #[test]
    fn test_resolve_is_case_and_alias_insensitive() {
        let catalog = catalog();
        assert_eq!(
            catalog.resolve_slug("PROG").unwrap(),
            Some("prog-rock".to_string())
        );
        assert_eq!(
            catalog.resolve_slug("progressive rock").unwrap(),
            Some("prog-rock".to_string())
        );
        assert_eq!(catalog.resolve_slug("unknown style").unwrap(), None);
    }

    #[test]
    fn test_normalize_falls_back_to_literal_slug() {
        let catalog = catalog();
        let slugs = catalog
            .normalize(&["Prog".to_string(), "Shoegaze Revival".to_string()])
            .unwrap();
        assert_eq!(slugs, vec!["prog-rock", "shoegaze-revival"]);
    }

    #[test]
    fn test_similar_slugs_ranked() {
        let catalog = catalog();
        assert_eq!(
            catalog.get_similar_slugs("prog-rock").unwrap(),
            vec!["art-rock", "krautrock"]
        );
        assert!(catalog.get_similar_slugs("jazz").unwrap().is_empty());
    }

    #[test]
    fn test_search_matches_names_and_aliases() {
        let catalog = catalog();
        assert_eq!(catalog.search("rock").unwrap().len(), 3);
        assert_eq!(catalog.search("prog").unwrap().len(), 1);
    }
}
