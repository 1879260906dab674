//! Style resolution: catalog collaborator trait, per-library style indexes
//! and the bounded relaxed-expansion selection service.

mod catalog;
mod index;
mod selection;
mod static_catalog;

pub use catalog::{StyleCatalog, StyleEntry};
pub use index::{LibraryStyleContext, LibraryStyleIndex};
pub use selection::{StyleSelection, StyleSelectionService};
pub use static_catalog::StaticStyleCatalog;

#[cfg(feature = "mock")]
pub use catalog::MockStyleCatalog;

/// Turn a free-form style name into a literal slug: lowercased, trimmed,
/// non-alphanumeric runs collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
