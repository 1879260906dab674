//! Prompt Planner Library
//!
//! Turns a large, arbitrarily-ordered music library into a bounded,
//! deterministic, cacheable plan describing which artists and albums to
//! surface to a text-generation provider for recommendation prompts.

pub mod budget;
pub mod cache;
pub mod clock;
pub mod config;
pub mod hashing;
pub mod metrics;
pub mod planner;
pub mod style;

// Re-export commonly used types for convenience
pub use cache::PlanCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PlannerConfig, PlannerFileConfig};
pub use hashing::StableHash;
pub use planner::{
    library_fingerprint, CompressionPolicy, DiscoveryMode, LibraryAlbum, LibraryArtist,
    LibraryProfile, LibraryPromptPlanner, PlanError, PromptPlan, RecommendationRequest,
    SamplingSettings, SamplingStrategy,
};
pub use style::{
    LibraryStyleContext, LibraryStyleIndex, StaticStyleCatalog, StyleCatalog, StyleEntry,
    StyleSelection, StyleSelectionService,
};
