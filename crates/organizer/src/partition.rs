use common::{ParentGenre, Track};

use crate::genres::classify_track;

#[derive(Clone, Debug, PartialEq)]
pub struct GenreGroup {
    pub genre: ParentGenre,
    pub tracks: Vec<Track>,
}

impl GenreGroup {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Buckets every track by parent genre, in `ParentGenre` declaration order.
/// Genres without tracks are left out.
pub fn group_by_genre(tracks: Vec<Track>) -> Vec<GenreGroup> {
    let mut buckets: Vec<Vec<Track>> = vec![Vec::new(); ParentGenre::COUNT];
    for track in tracks {
        let genre = classify_track(&track);
        buckets[genre.index()].push(track);
    }
    ParentGenre::ALL
        .iter()
        .copied()
        .zip(buckets)
        .filter(|(_, tracks)| !tracks.is_empty())
        .map(|(genre, tracks)| GenreGroup { genre, tracks })
        .collect()
}

/// Splits `tracks` into at most `limit` genre groups, largest first.
///
/// Groups that do not make the cut are folded into Other when Other is
/// retained, otherwise into the lowest-ranked retained group. No track is
/// ever dropped.
pub fn partition(tracks: Vec<Track>, limit: usize) -> Vec<GenreGroup> {
    let mut groups = group_by_genre(tracks);
    // stable: equal sizes keep declaration order
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    if groups.len() <= limit {
        return groups;
    }
    if limit == 0 {
        // callers reject this upstream; keep everything together rather than lose tracks
        return vec![merge_all(groups)];
    }

    let overflow = groups.split_off(limit);
    let target = groups
        .iter()
        .position(|group| group.genre == ParentGenre::Other)
        .unwrap_or(limit - 1);
    for group in overflow {
        groups[target].tracks.extend(group.tracks);
    }
    groups
}

fn merge_all(groups: Vec<GenreGroup>) -> GenreGroup {
    let mut other = GenreGroup {
        genre: ParentGenre::Other,
        tracks: Vec::new(),
    };
    for group in groups {
        other.tracks.extend(group.tracks);
    }
    other
}
