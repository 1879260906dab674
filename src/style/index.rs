//! Per-library style membership indexes.
//!
//! `LibraryStyleIndex` is built once per library snapshot and maps style
//! slugs to the sorted, deduplicated entity ids carrying them.
//! `LibraryStyleContext` is the per-request inversion: entity id to style
//! set, plus per-style coverage counts.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Immutable slug -> sorted-unique entity id index for one library snapshot.
#[derive(Debug, Clone, Default)]
pub struct LibraryStyleIndex {
    artists_by_slug: BTreeMap<String, Vec<u64>>,
    albums_by_slug: BTreeMap<String, Vec<u64>>,
}

impl LibraryStyleIndex {
    /// Build from `(entity_id, style slugs)` pairs. Ids per slug come out
    /// sorted and deduplicated regardless of input order.
    pub fn build<'a, A, B>(artists: A, albums: B) -> Self
    where
        A: IntoIterator<Item = (u64, &'a [String])>,
        B: IntoIterator<Item = (u64, &'a [String])>,
    {
        Self {
            artists_by_slug: collect_index(artists),
            albums_by_slug: collect_index(albums),
        }
    }

    pub fn artists_with_slug(&self, slug: &str) -> &[u64] {
        self.artists_by_slug
            .get(slug)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn albums_with_slug(&self, slug: &str) -> &[u64] {
        self.albums_by_slug
            .get(slug)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.artists_by_slug
            .keys()
            .chain(self.albums_by_slug.keys())
            .map(String::as_str)
    }

    /// Derive the per-request membership context.
    pub fn context(&self) -> LibraryStyleContext {
        let mut artist_styles: HashMap<u64, BTreeSet<String>> = HashMap::new();
        let mut album_styles: HashMap<u64, BTreeSet<String>> = HashMap::new();
        let mut coverage: HashMap<String, usize> = HashMap::new();

        for (slug, ids) in &self.artists_by_slug {
            *coverage.entry(slug.clone()).or_default() += ids.len();
            for id in ids {
                artist_styles.entry(*id).or_default().insert(slug.clone());
            }
        }
        for (slug, ids) in &self.albums_by_slug {
            *coverage.entry(slug.clone()).or_default() += ids.len();
            for id in ids {
                album_styles.entry(*id).or_default().insert(slug.clone());
            }
        }

        LibraryStyleContext {
            artist_styles,
            album_styles,
            coverage,
        }
    }
}

fn collect_index<'a, I>(pairs: I) -> BTreeMap<String, Vec<u64>>
where
    I: IntoIterator<Item = (u64, &'a [String])>,
{
    let mut by_slug: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
    for (id, slugs) in pairs {
        for slug in slugs {
            by_slug.entry(slug.to_lowercase()).or_default().insert(id);
        }
    }
    by_slug
        .into_iter()
        .map(|(slug, ids)| (slug, ids.into_iter().collect()))
        .collect()
}

/// Per-request style membership maps derived from the index.
#[derive(Debug, Clone, Default)]
pub struct LibraryStyleContext {
    artist_styles: HashMap<u64, BTreeSet<String>>,
    album_styles: HashMap<u64, BTreeSet<String>>,
    coverage: HashMap<String, usize>,
}

impl LibraryStyleContext {
    pub fn artist_styles(&self, id: u64) -> Option<&BTreeSet<String>> {
        self.artist_styles.get(&id)
    }

    pub fn album_styles(&self, id: u64) -> Option<&BTreeSet<String>> {
        self.album_styles.get(&id)
    }

    /// Number of library entities carrying a style.
    pub fn coverage(&self, slug: &str) -> usize {
        self.coverage.get(slug).copied().unwrap_or(0)
    }

    pub fn coverage_map(&self) -> &HashMap<String, usize> {
        &self.coverage
    }
}
