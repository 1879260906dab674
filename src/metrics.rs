use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Registry};

/// Metric name prefix for all planner metrics
const PREFIX: &str = "prompt_planner";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Plan Cache Metrics
    pub static ref PLAN_CACHE_HITS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_plan_cache_hits_total"),
        "Total plan cache hits"
    ).expect("Failed to create plan_cache_hits_total metric");

    pub static ref PLAN_CACHE_MISSES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_plan_cache_misses_total"),
        "Total plan cache misses"
    ).expect("Failed to create plan_cache_misses_total metric");

    pub static ref PLAN_CACHE_EVICTIONS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_plan_cache_evictions_total"),
        "Total plan cache evictions (capacity and TTL)"
    ).expect("Failed to create plan_cache_evictions_total metric");

    pub static ref PLAN_CACHE_SIZE: Gauge = Gauge::new(
        format!("{PREFIX}_plan_cache_size"),
        "Number of entries currently held by the plan cache"
    ).expect("Failed to create plan_cache_size metric");

    // Planner Metrics
    pub static ref PLANS_BUILT_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_plans_built_total"),
        "Total plans built from scratch (cache misses that completed)"
    ).expect("Failed to create plans_built_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(PLAN_CACHE_HITS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAN_CACHE_MISSES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAN_CACHE_EVICTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAN_CACHE_SIZE.clone()));
    let _ = REGISTRY.register(Box::new(PLANS_BUILT_TOTAL.clone()));

    tracing::info!("Planner metrics initialized");
}

/// Record a plan cache hit
pub fn record_cache_hit() {
    PLAN_CACHE_HITS_TOTAL.inc();
}

/// Record a plan cache miss
pub fn record_cache_miss() {
    PLAN_CACHE_MISSES_TOTAL.inc();
}

/// Record evicted entries (capacity pressure or expired sweep)
pub fn record_cache_evictions(count: usize) {
    PLAN_CACHE_EVICTIONS_TOTAL.inc_by(count as f64);
}

/// Update the cache size gauge after a mutation
pub fn set_cache_size(size: usize) {
    PLAN_CACHE_SIZE.set(size as f64);
}

/// Record a plan built from scratch
pub fn record_plan_built() {
    PLANS_BUILT_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        init_metrics();

        let metric_families = REGISTRY.gather();
        assert!(!metric_families.is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_cache_counters() {
        init_metrics();

        record_cache_hit();
        record_cache_miss();
        record_cache_evictions(3);
        set_cache_size(7);
        record_plan_built();

        let metrics = REGISTRY.gather();
        let hit_metric = metrics
            .iter()
            .find(|m| m.get_name() == "prompt_planner_plan_cache_hits_total");

        assert!(hit_metric.is_some(), "Cache hit metric should exist");
    }
}
