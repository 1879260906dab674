//! Data model for planning requests and the resulting prompt plans.

use crate::style::LibraryStyleContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How adventurous recommendations should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveryMode {
    Similar,
    Adjacent,
    Exploratory,
}

impl DiscoveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMode::Similar => "similar",
            DiscoveryMode::Adjacent => "adjacent",
            DiscoveryMode::Exploratory => "exploratory",
        }
    }
}

/// How much of the library to surface in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingStrategy {
    Minimal,
    Balanced,
    Comprehensive,
}

impl SamplingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingStrategy::Minimal => "minimal",
            SamplingStrategy::Balanced => "balanced",
            SamplingStrategy::Comprehensive => "comprehensive",
        }
    }
}

/// User-facing knobs that shape sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSettings {
    pub discovery_mode: DiscoveryMode,
    pub sampling_strategy: SamplingStrategy,
    pub style_filters: Vec<String>,
    pub relax_style_matching: bool,
    pub max_recommendations: usize,
}

/// A library artist offered as a sampling candidate.
///
/// `weight` is supplied by the caller (recency x style-match strength, or
/// whatever scoring the orchestrator runs); the planner only uses it for
/// ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryArtist {
    pub id: u64,
    pub name: String,
    pub styles: Vec<String>,
    pub weight: f64,
    pub added: Option<DateTime<Utc>>,
}

/// A library album offered as a sampling candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryAlbum {
    pub id: u64,
    pub title: String,
    pub artist_id: Option<u64>,
    pub artist_name: Option<String>,
    pub styles: Vec<String>,
    pub weight: f64,
    pub added: Option<DateTime<Utc>>,
    pub release_year: Option<i32>,
}

/// Immutable bundle describing one planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub artists: Vec<LibraryArtist>,
    pub albums: Vec<LibraryAlbum>,
    pub settings: SamplingSettings,
    /// true: recommend artists (artist-mode sampling); false: albums.
    pub recommend_artists: bool,
    pub target_tokens: i64,
    pub available_tokens: i64,
    pub model_key: String,
    pub context_window: i64,
}

/// Read-only per-run snapshot of aggregate library stats.
#[derive(Debug, Clone, Default)]
pub struct LibraryProfile {
    pub artist_count: usize,
    pub album_count: usize,
    pub top_genres: Vec<String>,
    pub style_context: LibraryStyleContext,
}

/// An album selected into the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySampleAlbum {
    pub id: u64,
    pub title: String,
    pub artist_name: String,
    pub matched_styles: Vec<String>,
    pub weight: f64,
    pub added: Option<DateTime<Utc>>,
    pub release_year: Option<i32>,
}

/// An artist selected into the sample, with its albums nested in artist mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySampleArtist {
    pub id: u64,
    pub name: String,
    pub matched_styles: Vec<String>,
    pub weight: f64,
    pub added: Option<DateTime<Utc>>,
    pub albums: Vec<LibrarySampleAlbum>,
}

/// The bounded, deterministically ordered library sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySample {
    pub artists: Vec<LibrarySampleArtist>,
    pub albums: Vec<LibrarySampleAlbum>,
    pub artist_count: usize,
    pub album_count: usize,
}

/// Numeric caps bounding sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionPolicy {
    pub max_artists: usize,
    pub max_album_groups: usize,
    pub max_albums_per_group: usize,
    pub min_albums_per_group: usize,
}

impl CompressionPolicy {
    /// Base policy per sampling strategy, before token bounding.
    pub fn for_strategy(strategy: SamplingStrategy) -> Self {
        match strategy {
            SamplingStrategy::Minimal => Self {
                max_artists: 10,
                max_album_groups: 6,
                max_albums_per_group: 3,
                min_albums_per_group: 1,
            },
            SamplingStrategy::Balanced => Self {
                max_artists: 20,
                max_album_groups: 12,
                max_albums_per_group: 4,
                min_albums_per_group: 1,
            },
            SamplingStrategy::Comprehensive => Self {
                max_artists: 40,
                max_album_groups: 24,
                max_albums_per_group: 5,
                min_albums_per_group: 1,
            },
        }
    }
}

/// Style bookkeeping carried alongside the sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePlanContext {
    /// Strict slugs, alphabetical.
    pub selected_slugs: Vec<String>,
    /// Relaxed superset, alphabetical.
    pub expanded_slugs: Vec<String>,
    /// Sampled entities per matched style.
    pub matched_style_counts: HashMap<String, usize>,
    /// Library-wide entities per style (from the style context).
    pub style_coverage: HashMap<String, usize>,
    /// Selected slugs that matched nothing in the final sample.
    pub trimmed_styles: Vec<String>,
    /// Expanded-only slugs that did match sampled entities.
    pub inferred_styles: Vec<String>,
    pub relaxed: bool,
    pub relaxed_threshold: f64,
}

/// The unit of work product: a deterministic, bounded library sample plus
/// the bookkeeping the renderer and cache need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptPlan {
    pub sample: LibrarySample,
    pub style_context: StylePlanContext,
    pub compression: CompressionPolicy,
    pub cache_key: String,
    pub library_fingerprint: String,
    pub sample_fingerprint: String,
    pub sample_seed: u64,
    pub from_cache: bool,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self::for_strategy(SamplingStrategy::Balanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_presets_scale_with_strategy() {
        let minimal = CompressionPolicy::for_strategy(SamplingStrategy::Minimal);
        let balanced = CompressionPolicy::for_strategy(SamplingStrategy::Balanced);
        let comprehensive = CompressionPolicy::for_strategy(SamplingStrategy::Comprehensive);

        assert!(minimal.max_artists < balanced.max_artists);
        assert!(balanced.max_artists < comprehensive.max_artists);
        assert!(minimal.max_album_groups < comprehensive.max_album_groups);
    }

    #[test]
    fn test_plan_round_trips_through_json() {
        let plan = PromptPlan {
            cache_key: "abc".to_string(),
            sample_seed: 42,
            ..Default::default()
        };
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: PromptPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }
}
