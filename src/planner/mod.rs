//! Library prompt planning.
//!
//! Orchestrates style selection, candidate scoring, deterministic ordering,
//! truncation, fingerprinting and cache interaction to produce a
//! [`PromptPlan`]. The same inputs always produce the same plan regardless
//! of collection ordering; the renderer downstream relies on the ordering
//! and bounding established here and must never re-sort.

mod models;
mod ordering;

pub use models::{
    CompressionPolicy, DiscoveryMode, LibraryAlbum, LibraryArtist, LibraryProfile,
    LibrarySample, LibrarySampleAlbum, LibrarySampleArtist, PromptPlan, RecommendationRequest,
    SamplingSettings, SamplingStrategy, StylePlanContext,
};
pub use ordering::{compare_albums, compare_artists, truncate_albums};

use crate::budget;
use crate::cache::PlanCache;
use crate::config::PlannerConfig;
use crate::hashing::StableHash;
use crate::metrics;
use crate::style::{StyleCatalog, StyleSelection, StyleSelectionService};
use chrono::Duration;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Rough per-entity token costs used to bound the sample to the budget.
const TOKENS_PER_ARTIST: i64 = 12;
const TOKENS_PER_ALBUM: i64 = 10;
const PROMPT_OVERHEAD_TOKENS: i64 = 200;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("planning was cancelled")]
    Cancelled,

    #[error("invalid cache capacity: {0}")]
    InvalidCapacity(usize),
}

/// Stable digest of the library's coarse structure: counts and top genres,
/// never entity contents. Callers use it to invalidate cached plans when
/// the library changes.
pub fn library_fingerprint(profile: &LibraryProfile) -> String {
    let mut components = vec![
        format!("artists:{}", profile.artist_count),
        format!("albums:{}", profile.album_count),
    ];
    let mut genres: Vec<String> = profile
        .top_genres
        .iter()
        .map(|g| g.to_lowercase())
        .collect();
    genres.sort();
    genres.dedup();
    components.extend(genres.into_iter().map(|g| format!("genre:{g}")));
    StableHash::from_components(&components).full_hash
}

/// Produces deterministic, bounded, cacheable prompt plans.
pub struct LibraryPromptPlanner {
    selection: StyleSelectionService,
    cache: Arc<PlanCache>,
    config: PlannerConfig,
}

impl LibraryPromptPlanner {
    pub fn new(
        catalog: Arc<dyn StyleCatalog>,
        cache: Arc<PlanCache>,
        config: PlannerConfig,
    ) -> Self {
        let selection = StyleSelectionService::new(
            catalog,
            config.absolute_relaxed_cap,
            config.max_relaxed_inflation,
        );
        Self {
            selection,
            cache,
            config,
        }
    }

    /// Produce a plan for `request` against `profile`.
    ///
    /// Cache hits return an independent copy with `from_cache = true`.
    /// Cancellation is cooperative and leaves the cache untouched.
    pub fn plan(
        &self,
        profile: &LibraryProfile,
        request: &RecommendationRequest,
        cancel: &CancellationToken,
    ) -> Result<PromptPlan, PlanError> {
        if cancel.is_cancelled() {
            return Err(PlanError::Cancelled);
        }

        let token_budget = self.token_budget(request);
        let cache_key = self.cache_key(profile, request, token_budget);

        if let Some(plan) = self.cache.try_get(&cache_key) {
            debug!(cache_key = %cache_key, "Plan served from cache");
            return Ok(plan);
        }

        let selection = self.selection.build(&request.settings, cancel)?;
        let compression = self.bound_compression(
            CompressionPolicy::for_strategy(request.settings.sampling_strategy),
            token_budget,
        );

        if cancel.is_cancelled() {
            return Err(PlanError::Cancelled);
        }

        let sample = if request.recommend_artists {
            self.sample_artists(profile, request, &selection, &compression)
        } else {
            self.sample_albums(profile, request, &selection, &compression)
        };

        let style_context = build_style_context(
            profile,
            request,
            &selection,
            &sample,
            self.config.relaxed_threshold,
        );

        let content_hash = sample_content_hash(&sample);
        let plan = PromptPlan {
            sample,
            style_context,
            compression,
            cache_key: cache_key.clone(),
            library_fingerprint: library_fingerprint(profile),
            sample_fingerprint: content_hash.full_hash,
            sample_seed: content_hash.seed,
            from_cache: false,
        };

        self.cache.set(
            &cache_key,
            &plan,
            Duration::seconds(self.config.cache_ttl_secs as i64),
        );
        metrics::record_plan_built();
        debug!(
            cache_key = %plan.cache_key,
            sample_fingerprint = %plan.sample_fingerprint,
            artists = plan.sample.artist_count,
            albums = plan.sample.album_count,
            "Plan built"
        );

        Ok(plan)
    }

    /// Effective token budget: the target clamped into the context window
    /// minus headroom, further capped by the caller's available tokens.
    fn token_budget(&self, request: &RecommendationRequest) -> i64 {
        let target = budget::clamp_target_tokens(
            request.target_tokens,
            request.context_window,
            self.config.token_headroom,
        );
        let desired = if request.available_tokens > 0 {
            target.min(request.available_tokens)
        } else {
            target
        };
        budget::enforce(
            request.context_window,
            self.config.token_headroom,
            desired,
            |cap| {
                warn!(
                    cap,
                    context_window = request.context_window,
                    "Token target clamped to context window"
                )
            },
        )
    }

    /// Shrink the compression caps until the estimated token cost fits the
    /// budget. Deterministic halving; floors at one entity per dimension.
    fn bound_compression(&self, base: CompressionPolicy, token_budget: i64) -> CompressionPolicy {
        let estimate = |p: &CompressionPolicy| {
            PROMPT_OVERHEAD_TOKENS
                + p.max_artists as i64 * TOKENS_PER_ARTIST
                + (p.max_album_groups * p.max_albums_per_group) as i64 * TOKENS_PER_ALBUM
        };

        let mut policy = base;
        while estimate(&policy) > token_budget
            && (policy.max_artists > 1
                || policy.max_album_groups > 1
                || policy.max_albums_per_group > 1)
        {
            policy.max_artists = (policy.max_artists / 2).max(1);
            policy.max_album_groups = (policy.max_album_groups / 2).max(1);
            policy.max_albums_per_group = policy.max_albums_per_group.saturating_sub(1).max(1);
        }
        policy.min_albums_per_group = policy.min_albums_per_group.min(policy.max_albums_per_group);
        policy
    }

    /// Cache key over everything that shapes the plan: normalized filters,
    /// settings, mode, model, token bounds and a coarse structural digest of
    /// the library (counts only, never contents).
    fn cache_key(
        &self,
        profile: &LibraryProfile,
        request: &RecommendationRequest,
        token_budget: i64,
    ) -> String {
        let mut filters: Vec<String> = request
            .settings
            .style_filters
            .iter()
            .map(|f| crate::style::slugify(f))
            .filter(|f| !f.is_empty())
            .collect();
        filters.sort();
        filters.dedup();

        let mut components = vec![
            format!(
                "mode:{}",
                if request.recommend_artists {
                    "artists"
                } else {
                    "albums"
                }
            ),
            format!("discovery:{}", request.settings.discovery_mode.as_str()),
            format!("strategy:{}", request.settings.sampling_strategy.as_str()),
            format!("relaxed:{}", request.settings.relax_style_matching),
            format!("maxrecs:{}", request.settings.max_recommendations),
            format!("model:{}", request.model_key),
            format!("ctx:{}", request.context_window),
            format!("budget:{token_budget}"),
            format!("lib:{}:{}", profile.artist_count, profile.album_count),
        ];
        components.extend(filters.into_iter().map(|f| format!("style:{f}")));

        StableHash::from_components(&components).full_hash
    }

    fn sample_artists(
        &self,
        profile: &LibraryProfile,
        request: &RecommendationRequest,
        selection: &StyleSelection,
        compression: &CompressionPolicy,
    ) -> LibrarySample {
        let has_filters = !selection.selected.is_empty();

        let mut candidates: Vec<(&LibraryArtist, Vec<String>)> = request
            .artists
            .iter()
            .filter_map(|artist| {
                let matched = matched_styles(
                    &artist.styles,
                    profile.style_context.artist_styles(artist.id),
                    &selection.expanded,
                    has_filters,
                );
                if has_filters && matched.is_empty() {
                    None
                } else {
                    Some((artist, matched))
                }
            })
            .collect();
        candidates.sort_by(|(a, _), (b, _)| compare_artists(a, b));
        candidates.truncate(compression.max_artists);

        let mut album_count = 0;
        let artists: Vec<LibrarySampleArtist> = candidates
            .into_iter()
            .map(|(artist, matched)| {
                let mut albums: Vec<&LibraryAlbum> = request
                    .albums
                    .iter()
                    .filter(|album| album.artist_id == Some(artist.id))
                    .collect();
                albums.sort_by(|a, b| compare_albums(a, b));
                albums.truncate(compression.max_albums_per_group);
                album_count += albums.len();

                LibrarySampleArtist {
                    id: artist.id,
                    name: artist.name.clone(),
                    matched_styles: matched,
                    weight: artist.weight,
                    added: artist.added,
                    albums: albums
                        .into_iter()
                        .map(|album| sample_album(album, profile, selection, has_filters))
                        .collect(),
                }
            })
            .collect();

        LibrarySample {
            artist_count: artists.len(),
            album_count,
            artists,
            albums: vec![],
        }
    }

    fn sample_albums(
        &self,
        profile: &LibraryProfile,
        request: &RecommendationRequest,
        selection: &StyleSelection,
        compression: &CompressionPolicy,
    ) -> LibrarySample {
        let has_filters = !selection.selected.is_empty();

        let mut candidates: Vec<LibraryAlbum> = request
            .albums
            .iter()
            .filter(|album| {
                if !has_filters {
                    return true;
                }
                !matched_styles(
                    &album.styles,
                    profile.style_context.album_styles(album.id),
                    &selection.expanded,
                    has_filters,
                )
                .is_empty()
            })
            .cloned()
            .collect();
        candidates.sort_by(compare_albums);

        let kept = truncate_albums(&candidates, compression);
        let albums: Vec<LibrarySampleAlbum> = kept
            .iter()
            .map(|album| sample_album(album, profile, selection, has_filters))
            .collect();

        LibrarySample {
            artist_count: 0,
            album_count: albums.len(),
            artists: vec![],
            albums,
        }
    }
}

/// Styles an entity contributes to the sample: the intersection of its
/// membership with the expanded selection, or its full membership when no
/// filters are set. Always sorted and deduplicated.
fn matched_styles(
    own: &[String],
    context: Option<&BTreeSet<String>>,
    expanded: &BTreeSet<String>,
    has_filters: bool,
) -> Vec<String> {
    let membership: BTreeSet<String> = match context {
        Some(styles) => styles.clone(),
        None => own.iter().map(|s| s.to_lowercase()).collect(),
    };
    if !has_filters {
        return membership.into_iter().collect();
    }
    membership
        .into_iter()
        .filter(|s| expanded.contains(s))
        .collect()
}

fn sample_album(
    album: &LibraryAlbum,
    profile: &LibraryProfile,
    selection: &StyleSelection,
    has_filters: bool,
) -> LibrarySampleAlbum {
    let artist_name = album.artist_name.clone().unwrap_or_else(|| {
        // Synthetic display name for albums lacking artist metadata.
        format!("Artist {}", album.artist_id.unwrap_or(album.id))
    });
    LibrarySampleAlbum {
        id: album.id,
        title: album.title.clone(),
        artist_name,
        matched_styles: matched_styles(
            &album.styles,
            profile.style_context.album_styles(album.id),
            &selection.expanded,
            has_filters,
        ),
        weight: album.weight,
        added: album.added,
        release_year: album.release_year,
    }
}

/// Canonical content hash of the final sample: artists then albums, each
/// sorted by id ascending, identity and display text joined with fixed
/// positional delimiters. Length-prefixed framing downstream makes literal
/// delimiter characters in names safe.
fn sample_content_hash(sample: &LibrarySample) -> StableHash {
    let mut artist_rows: Vec<(u64, &str)> = sample
        .artists
        .iter()
        .map(|a| (a.id, a.name.as_str()))
        .collect();
    artist_rows.sort_by_key(|(id, _)| *id);

    let mut album_rows: Vec<(u64, &str)> = sample
        .albums
        .iter()
        .chain(sample.artists.iter().flat_map(|a| a.albums.iter()))
        .map(|a| (a.id, a.title.as_str()))
        .collect();
    album_rows.sort_by_key(|(id, _)| *id);

    let components: Vec<String> = artist_rows
        .into_iter()
        .map(|(id, name)| format!("artist|{id}|{name}"))
        .chain(
            album_rows
                .into_iter()
                .map(|(id, title)| format!("album|{id}|{title}")),
        )
        .collect();

    StableHash::from_components(&components)
}

fn build_style_context(
    profile: &LibraryProfile,
    request: &RecommendationRequest,
    selection: &StyleSelection,
    sample: &LibrarySample,
    relaxed_threshold: f64,
) -> StylePlanContext {
    let mut matched_style_counts: HashMap<String, usize> = HashMap::new();
    let sampled_styles = sample
        .artists
        .iter()
        .flat_map(|a| a.matched_styles.iter())
        .chain(
            sample
                .artists
                .iter()
                .flat_map(|a| a.albums.iter())
                .flat_map(|al| al.matched_styles.iter()),
        )
        .chain(sample.albums.iter().flat_map(|a| a.matched_styles.iter()));
    for style in sampled_styles {
        *matched_style_counts.entry(style.clone()).or_default() += 1;
    }

    // Coverage for every slug the plan mentions, from the library context.
    let mut style_coverage: HashMap<String, usize> = HashMap::new();
    for slug in selection.expanded.iter().chain(matched_style_counts.keys()) {
        style_coverage.insert(slug.clone(), profile.style_context.coverage(slug));
    }

    let trimmed_styles: Vec<String> = selection
        .selected
        .iter()
        .filter(|slug| !matched_style_counts.contains_key(*slug))
        .cloned()
        .collect();

    let inferred_styles: Vec<String> = selection
        .expanded
        .iter()
        .filter(|slug| {
            !selection.selected.contains(*slug) && matched_style_counts.contains_key(*slug)
        })
        .cloned()
        .collect();

    StylePlanContext {
        selected_slugs: selection.selected.iter().cloned().collect(),
        expanded_slugs: selection.expanded.iter().cloned().collect(),
        matched_style_counts,
        style_coverage,
        trimmed_styles,
        inferred_styles,
        relaxed: request.settings.relax_style_matching,
        relaxed_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::style::StaticStyleCatalog;

    fn empty_planner() -> LibraryPromptPlanner {
        let clock = Arc::new(ManualClock::from_system());
        let cache = Arc::new(PlanCache::new(8, clock).unwrap());
        LibraryPromptPlanner::new(
            Arc::new(StaticStyleCatalog::empty()),
            cache,
            PlannerConfig::default(),
        )
    }

    fn bare_request(recommend_artists: bool) -> RecommendationRequest {
        RecommendationRequest {
            artists: vec![],
            albums: vec![],
            settings: SamplingSettings {
                discovery_mode: DiscoveryMode::Similar,
                sampling_strategy: SamplingStrategy::Balanced,
                style_filters: vec![],
                relax_style_matching: false,
                max_recommendations: 10,
            },
            recommend_artists,
            target_tokens: 2000,
            available_tokens: 4000,
            model_key: "test-model".to_string(),
            context_window: 8000,
        }
    }

    #[test]
    fn test_empty_library_yields_empty_plan() {
        let planner = empty_planner();
        let plan = planner
            .plan(
                &LibraryProfile::default(),
                &bare_request(true),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(plan.sample.artist_count, 0);
        assert_eq!(plan.sample.album_count, 0);
        assert!(!plan.from_cache);
        assert!(!plan.sample_fingerprint.is_empty());
    }

    #[test]
    fn test_cancelled_before_start() {
        let planner = empty_planner();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = planner.plan(&LibraryProfile::default(), &bare_request(true), &cancel);
        assert!(matches!(result, Err(PlanError::Cancelled)));
    }

    #[test]
    fn test_library_fingerprint_ignores_genre_order_and_case() {
        let a = LibraryProfile {
            artist_count: 10,
            album_count: 50,
            top_genres: vec!["Rock".to_string(), "jazz".to_string()],
            ..Default::default()
        };
        let b = LibraryProfile {
            artist_count: 10,
            album_count: 50,
            top_genres: vec!["JAZZ".to_string(), "rock".to_string()],
            ..Default::default()
        };
        assert_eq!(library_fingerprint(&a), library_fingerprint(&b));
    }

    #[test]
    fn test_library_fingerprint_tracks_counts() {
        let a = LibraryProfile {
            artist_count: 10,
            album_count: 50,
            ..Default::default()
        };
        let b = LibraryProfile {
            artist_count: 11,
            album_count: 50,
            ..Default::default()
        };
        assert_ne!(library_fingerprint(&a), library_fingerprint(&b));
    }

    #[test]
    fn test_bound_compression_shrinks_to_budget() {
        let planner = empty_planner();
        let base = CompressionPolicy::for_strategy(SamplingStrategy::Comprehensive);
        let bounded = planner.bound_compression(base, 400);
        assert!(bounded.max_artists < base.max_artists);
        assert!(bounded.max_artists >= 1);
        assert!(bounded.min_albums_per_group <= bounded.max_albums_per_group);
    }

    #[test]
    fn test_bound_compression_keeps_policy_when_budget_ample() {
        let planner = empty_planner();
        let base = CompressionPolicy::for_strategy(SamplingStrategy::Minimal);
        let bounded = planner.bound_compression(base, 100_000);
        assert_eq!(bounded, base);
    }

    #[test]
    fn test_synthetic_artist_name_for_orphan_albums() {
        let planner = empty_planner();
        let mut request = bare_request(false);
        request.albums.push(LibraryAlbum {
            id: 77,
            title: "Untagged".to_string(),
            artist_id: None,
            artist_name: None,
            styles: vec![],
            weight: 1.0,
            added: None,
            release_year: None,
        });
        let plan = planner
            .plan(
                &LibraryProfile::default(),
                &request,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(plan.sample.albums[0].artist_name, "Artist 77");
    }
}
