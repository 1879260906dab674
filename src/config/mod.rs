//! Planner configuration.
//!
//! A TOML file form with all-optional fields resolves into a validated
//! `PlannerConfig`; anything unset falls back to defaults. Contract
//! violations (zero capacity, non-positive inflation) are rejected eagerly,
//! distinct from documented clamps elsewhere.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// TOML file form. Every field optional; missing values use defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannerFileConfig {
    pub cache_ttl_secs: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub absolute_relaxed_cap: Option<usize>,
    pub max_relaxed_inflation: Option<f64>,
    pub relaxed_threshold: Option<f64>,
    pub token_headroom: Option<i64>,
}

impl PlannerFileConfig {
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {:?}", path.as_ref()))?;
        Ok(config)
    }
}

/// Resolved, validated planner configuration.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Sliding TTL applied to cached plans.
    pub cache_ttl_secs: u64,
    /// Maximum number of plans held by the cache.
    pub cache_capacity: usize,
    /// Hard ceiling on the relaxed style slug set.
    pub absolute_relaxed_cap: usize,
    /// Relaxed set may grow to at most `strict_count x` this factor.
    pub max_relaxed_inflation: f64,
    /// Similarity threshold reported in the plan's style context.
    pub relaxed_threshold: f64,
    /// Tokens reserved out of the context window for the response.
    pub token_headroom: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            cache_capacity: 64,
            absolute_relaxed_cap: 12,
            max_relaxed_inflation: 2.0,
            relaxed_threshold: 0.7,
            token_headroom: 500,
        }
    }
}

impl PlannerConfig {
    /// Merge an optional file config over the defaults and validate.
    pub fn resolve(file: Option<PlannerFileConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let config = Self {
            cache_ttl_secs: file.cache_ttl_secs.unwrap_or(defaults.cache_ttl_secs),
            cache_capacity: file.cache_capacity.unwrap_or(defaults.cache_capacity),
            absolute_relaxed_cap: file
                .absolute_relaxed_cap
                .unwrap_or(defaults.absolute_relaxed_cap),
            max_relaxed_inflation: file
                .max_relaxed_inflation
                .unwrap_or(defaults.max_relaxed_inflation),
            relaxed_threshold: file.relaxed_threshold.unwrap_or(defaults.relaxed_threshold),
            token_headroom: file.token_headroom.unwrap_or(defaults.token_headroom),
        };

        if config.cache_capacity == 0 {
            bail!("cache_capacity must be at least 1");
        }
        if config.cache_ttl_secs == 0 {
            bail!("cache_ttl_secs must be at least 1");
        }
        if config.absolute_relaxed_cap == 0 {
            bail!("absolute_relaxed_cap must be at least 1");
        }
        if config.max_relaxed_inflation <= 0.0 {
            bail!(
                "max_relaxed_inflation must be positive, got {}",
                config.max_relaxed_inflation
            );
        }
        if !(0.0..=1.0).contains(&config.relaxed_threshold) {
            bail!(
                "relaxed_threshold must be in [0, 1], got {}",
                config.relaxed_threshold
            );
        }
        if config.token_headroom < 0 {
            bail!(
                "token_headroom must be non-negative, got {}",
                config.token_headroom
            );
        }

        info!(
            cache_ttl_secs = config.cache_ttl_secs,
            cache_capacity = config.cache_capacity,
            absolute_relaxed_cap = config.absolute_relaxed_cap,
            "Planner configuration resolved"
        );
        Ok(config)
    }
}
