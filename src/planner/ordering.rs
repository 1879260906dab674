//! Candidate ordering and prefix truncation.
//!
//! The comparator chain is a load-bearing contract consumed by the renderer:
//! weight descending, then added descending (missing timestamps are oldest),
//! then (albums only) title ascending, then id ascending. Truncation is pure
//! prefix truncation over the ordered sequence; nothing re-sorts afterwards.

use super::models::{CompressionPolicy, LibraryAlbum, LibraryArtist};
use std::cmp::Ordering;
use std::collections::HashMap;

pub fn compare_artists(a: &LibraryArtist, b: &LibraryArtist) -> Ordering {
    b.weight
        .partial_cmp(&a.weight)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.added.cmp(&a.added))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn compare_albums(a: &LibraryAlbum, b: &LibraryAlbum) -> Ordering {
    b.weight
        .partial_cmp(&a.weight)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.added.cmp(&a.added))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

// Albums without an artist id group by their own id, one group each.
fn group_key(album: &LibraryAlbum) -> (bool, u64) {
    match album.artist_id {
        Some(artist_id) => (true, artist_id),
        None => (false, album.id),
    }
}

/// Truncate an already-ordered album sequence to the compression bounds.
///
/// Walks the sequence once: new groups open in encounter order until
/// `max_album_groups`, each group accepts up to `max_albums_per_group`, and
/// groups that end up below `min_albums_per_group` are dropped. Survivors
/// keep their original relative order.
pub fn truncate_albums(ordered: &[LibraryAlbum], policy: &CompressionPolicy) -> Vec<LibraryAlbum> {
    let mut group_sizes: HashMap<(bool, u64), usize> = HashMap::new();
    let mut accepted: Vec<LibraryAlbum> = Vec::new();

    for album in ordered {
        let key = group_key(album);
        match group_sizes.get_mut(&key) {
            Some(size) => {
                if *size >= policy.max_albums_per_group {
                    continue;
                }
                *size += 1;
            }
            None => {
                if group_sizes.len() >= policy.max_album_groups {
                    continue;
                }
                group_sizes.insert(key, 1);
            }
        }
        accepted.push(album.clone());
    }

    if policy.min_albums_per_group > 1 {
        accepted.retain(|album| {
            group_sizes
                .get(&group_key(album))
                .is_some_and(|size| *size >= policy.min_albums_per_group)
        });
    }

    accepted
}
