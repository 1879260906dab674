//! Resolves requested style filters into a strict slug set plus a bounded
//! relaxed superset.
//!
//! Expansion walks the strict slugs in alphabetical order and consumes each
//! catalog neighbor list prefix-wise, so the result is reproducible for a
//! given catalog snapshot.

use super::catalog::StyleCatalog;
use super::slugify;
use crate::planner::PlanError;
use crate::planner::SamplingSettings;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Strict and relaxed slug selections for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSelection {
    pub selected: BTreeSet<String>,
    pub expanded: BTreeSet<String>,
}

/// Resolves style filters against the catalog with bounded relaxed expansion.
pub struct StyleSelectionService {
    catalog: Arc<dyn StyleCatalog>,
    absolute_relaxed_cap: usize,
    max_relaxed_inflation: f64,
}

impl StyleSelectionService {
    pub fn new(
        catalog: Arc<dyn StyleCatalog>,
        absolute_relaxed_cap: usize,
        max_relaxed_inflation: f64,
    ) -> Self {
        Self {
            catalog,
            absolute_relaxed_cap,
            max_relaxed_inflation,
        }
    }

    /// Resolve `settings.style_filters` into strict + expanded slug sets.
    ///
    /// Catalog failures degrade to literal slugs instead of propagating; the
    /// only error surfaced is cancellation.
    pub fn build(
        &self,
        settings: &SamplingSettings,
        cancel: &CancellationToken,
    ) -> Result<StyleSelection, PlanError> {
        if settings.style_filters.is_empty() {
            return Ok(StyleSelection::default());
        }

        let selected = self.normalize_filters(&settings.style_filters);
        let mut expanded = selected.clone();

        if settings.relax_style_matching && !selected.is_empty() {
            let cap = self.expansion_cap(selected.len());
            debug!(
                strict = selected.len(),
                cap, "Expanding style selection with relaxed matching"
            );

            'expansion: for slug in &selected {
                if expanded.len() >= cap {
                    break;
                }
                if cancel.is_cancelled() {
                    return Err(PlanError::Cancelled);
                }
                let similar = match self.catalog.get_similar_slugs(slug) {
                    Ok(similar) => similar,
                    Err(err) => {
                        warn!(slug = %slug, error = %err, "Style catalog failed, skipping expansion for slug");
                        continue;
                    }
                };
                for neighbor in similar {
                    if expanded.len() >= cap {
                        break 'expansion;
                    }
                    let neighbor = neighbor.to_lowercase();
                    if !neighbor.is_empty() {
                        expanded.insert(neighbor);
                    }
                }
            }
        }

        Ok(StyleSelection { selected, expanded })
    }

    /// Normalize filters via the catalog; unresolvable filters and catalog
    /// failures degrade to literal slugs.
    fn normalize_filters(&self, filters: &[String]) -> BTreeSet<String> {
        let slugs = match self.catalog.normalize(filters) {
            Ok(slugs) => slugs,
            Err(err) => {
                warn!(error = %err, "Style catalog failed, treating filters as literal slugs");
                filters.iter().map(|f| slugify(f)).collect()
            }
        };
        slugs
            .into_iter()
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Hard ceiling on the expanded set size, strict slugs included.
    fn expansion_cap(&self, strict_count: usize) -> usize {
        let inflated = (strict_count as f64 * self.max_relaxed_inflation).ceil() as usize;
        self.absolute_relaxed_cap.min(inflated).max(strict_count)
    }
}
