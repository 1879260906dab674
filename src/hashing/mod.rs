//! Deterministic content hashing for plan fingerprints and cache keys.
//!
//! Components are framed with a length prefix before hashing, so delimiter
//! characters appearing literally inside a component can never collide with
//! differently-segmented input.

use sha2::{Digest, Sha256};

/// Hard cap on the number of components consumed per hash.
pub const MAX_COMPONENTS: usize = 4096;

/// Per-component truncation limit, in characters.
pub const MAX_COMPONENT_CHARS: usize = 24_576;

/// Result of hashing a bounded sequence of string components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableHash {
    /// Lowercase hex digest of the full SHA-256.
    pub full_hash: String,
    /// Short deterministic derivative of the digest, usable as an RNG seed.
    pub seed: u64,
    /// Number of components actually consumed (after the cap).
    pub component_count: usize,
}

impl StableHash {
    /// Hash a sequence of string components in the order given.
    ///
    /// Ordering is the caller's responsibility: canonicalize (sort, lowercase)
    /// before calling if order independence is required. Components beyond
    /// [`MAX_COMPONENTS`] are ignored; each component is truncated to
    /// [`MAX_COMPONENT_CHARS`] characters before inclusion.
    pub fn compute<I, S>(components: I) -> StableHash
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        let mut count = 0usize;

        for component in components.into_iter().take(MAX_COMPONENTS) {
            let text = truncate_chars(component.as_ref(), MAX_COMPONENT_CHARS);
            hasher.update((text.len() as u64).to_be_bytes());
            hasher.update(text.as_bytes());
            count += 1;
        }

        let digest = hasher.finalize();

        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);

        StableHash {
            full_hash: to_hex(&digest),
            seed: u64::from_be_bytes(seed_bytes),
            component_count: count,
        }
    }

    /// Convenience form over a slice of anything string-like.
    pub fn from_components<S: AsRef<str>>(components: &[S]) -> StableHash {
        Self::compute(components.iter().map(|c| c.as_ref()))
    }

    /// Like [`compute`](Self::compute), but absent components normalize to
    /// the empty string instead of being skipped.
    pub fn compute_optional<I, S>(components: I) -> StableHash
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        Self::compute(
            components
                .into_iter()
                .map(|c| c.map(|s| s.as_ref().to_string()).unwrap_or_default()),
        )
    }
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_input_identical_hash() {
        let a = StableHash::from_components(&["rock", "metal", "jazz"]);
        let b = StableHash::from_components(&["rock", "metal", "jazz"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_sensitive_as_given() {
        let a = StableHash::from_components(&["rock", "metal"]);
        let b = StableHash::from_components(&["metal", "rock"]);
        assert_ne!(a.full_hash, b.full_hash);
    }

    #[test]
    fn test_component_cap_at_4096() {
        let components: Vec<String> = (0..5000).map(|i| format!("component-{i}")).collect();
        let hash = StableHash::from_components(&components);
        assert_eq!(hash.component_count, 4096);

        // Extras beyond the cap must not influence the digest.
        let capped = StableHash::from_components(&components[..4096]);
        assert_eq!(hash.full_hash, capped.full_hash);
        assert_eq!(hash.seed, capped.seed);
    }

    #[test]
    fn test_long_component_truncated_to_prefix() {
        let long: String = "x".repeat(30_000);
        let prefix: String = "x".repeat(MAX_COMPONENT_CHARS);

        let a = StableHash::from_components(&[long]);
        let b = StableHash::from_components(&[prefix]);

        assert_eq!(a.full_hash, b.full_hash);
        assert_eq!(a.seed, b.seed);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // Multi-byte chars: truncation must not split a char.
        let long: String = "é".repeat(MAX_COMPONENT_CHARS + 100);
        let hash = StableHash::from_components(&[long]);
        assert_eq!(hash.component_count, 1);
        assert_eq!(hash.full_hash.len(), 64);
    }

    #[test]
    fn test_framing_prevents_false_collisions() {
        // Same concatenated text, different segmentation.
        let a = StableHash::from_components(&["ab|c", "d"]);
        let b = StableHash::from_components(&["ab|", "cd"]);
        let c = StableHash::from_components(&["ab|c|d"]);
        assert_ne!(a.full_hash, b.full_hash);
        assert_ne!(a.full_hash, c.full_hash);
        assert_ne!(b.full_hash, c.full_hash);
    }

    #[test]
    fn test_empty_component_distinct_from_absent() {
        let a = StableHash::from_components(&[""]);
        let b = StableHash::from_components::<&str>(&[]);
        assert_ne!(a.full_hash, b.full_hash);
        assert_eq!(a.component_count, 1);
        assert_eq!(b.component_count, 0);
    }

    #[test]
    fn test_absent_components_normalize_to_empty() {
        let a = StableHash::compute_optional([Some("rock"), None, Some("jazz")]);
        let b = StableHash::from_components(&["rock", "", "jazz"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_derived_from_digest() {
        let hash = StableHash::from_components(&["seed-source"]);
        let prefix = &hash.full_hash[..16];
        assert_eq!(format!("{:016x}", hash.seed), prefix);
    }
}
