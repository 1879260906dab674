//! Token budget arithmetic.
//!
//! Clamps requested token targets to what the model's context window can
//! actually hold, leaving headroom for the response.

use tracing::debug;

/// Clamp `target` into `[0, context_window - headroom]`.
///
/// Negative targets and negative computed caps both floor at 0; that is
/// defined behavior, not an error.
pub fn clamp_target_tokens(target: i64, context_window: i64, headroom: i64) -> i64 {
    let cap = (context_window - headroom).max(0);
    target.clamp(0, cap)
}

/// Cap `current` at `context_window - headroom`, invoking `on_clamp` with the
/// computed cap exactly once iff the value was actually reduced. A computed
/// cap of 0 always fires `on_clamp` and yields 0.
pub fn enforce<F: FnOnce(i64)>(
    context_window: i64,
    headroom: i64,
    current: i64,
    on_clamp: F,
) -> i64 {
    let cap = (context_window - headroom).max(0);
    if current > cap || cap == 0 {
        debug!(current, cap, context_window, headroom, "Token budget clamped");
        on_clamp(cap);
        return cap.min(current.max(0));
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_clamp_over_budget() {
        assert_eq!(clamp_target_tokens(5000, 4000, 500), 3500);
    }

    #[test]
    fn test_clamp_negative_target_floors_at_zero() {
        assert_eq!(clamp_target_tokens(-100, 4000, 500), 0);
    }

    #[test]
    fn test_clamp_within_budget_unchanged() {
        assert_eq!(clamp_target_tokens(2000, 4000, 500), 2000);
    }

    #[test]
    fn test_clamp_headroom_exceeds_window() {
        assert_eq!(clamp_target_tokens(2000, 400, 500), 0);
    }

    #[test]
    fn test_enforce_reduces_and_fires_once() {
        let fired = Cell::new(0u32);
        let result = enforce(4000, 500, 5000, |cap| {
            fired.set(fired.get() + 1);
            assert_eq!(cap, 3500);
        });
        assert_eq!(result, 3500);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_enforce_no_reduction_no_callback() {
        let fired = Cell::new(false);
        let result = enforce(4000, 500, 1000, |_| fired.set(true));
        assert_eq!(result, 1000);
        assert!(!fired.get());
    }

    #[test]
    fn test_enforce_zero_cap_fires_and_returns_zero() {
        let fired = Cell::new(false);
        let result = enforce(400, 500, 0, |cap| {
            fired.set(true);
            assert_eq!(cap, 0);
        });
        assert_eq!(result, 0);
        assert!(fired.get());
    }
}
