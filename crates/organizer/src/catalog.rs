use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use common::{PlaylistRef, PlaylistSummary, Track};
use tracing::debug;

use crate::error::CatalogError;
use crate::jobs::{JobStage, NoProgress, ProgressSink};
use crate::OrganizerOptions;

#[derive(Clone, Debug, Default)]
pub struct LibraryPage {
    pub tracks: Vec<Track>,
    pub total: usize,
    /// Offset of the next page, `None` once the library is exhausted.
    pub next: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct PlaylistPage {
    pub playlists: Vec<PlaylistSummary>,
    pub total: usize,
    pub next: Option<usize>,
}

/// Remote music catalog, bound to one user's credentials.
pub trait Catalog: Send + Sync + 'static {
    fn fetch_library_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<LibraryPage, CatalogError>> + Send;

    fn fetch_artist_genres(
        &self,
        artist_ids: &[String],
    ) -> impl Future<Output = Result<HashMap<String, Vec<String>>, CatalogError>> + Send;

    fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> impl Future<Output = Result<PlaylistRef, CatalogError>> + Send;

    fn find_playlist_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<PlaylistRef>, CatalogError>> + Send;

    fn clear_playlist(
        &self,
        playlist_id: &str,
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;

    fn add_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;

    fn list_owned_playlists(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<PlaylistPage, CatalogError>> + Send;

    fn update_playlist_details(
        &self,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;
}

pub(crate) async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Pulls the whole saved-track library, one page at a time.
pub async fn fetch_library<C: Catalog>(
    catalog: &C,
    options: &OrganizerOptions,
    sink: &dyn ProgressSink,
) -> Result<Vec<Track>, CatalogError> {
    let page_size = options.library_page_size.max(1);
    let mut tracks: Vec<Track> = Vec::new();
    let mut offset = 0usize;
    loop {
        let page = catalog.fetch_library_page(offset, page_size).await?;
        let received = page.tracks.len();
        tracks.extend(page.tracks);
        sink.report(JobStage::Fetching, tracks.len(), page.total.max(tracks.len()));
        debug!(offset, received, total = page.total, "library page fetched");

        match page.next {
            Some(next) if next > offset => offset = next,
            _ => break,
        }
    }
    Ok(tracks)
}

/// Total saved-track count, read from a one-item page.
pub async fn library_size<C: Catalog>(catalog: &C) -> Result<usize, CatalogError> {
    Ok(catalog.fetch_library_page(0, 1).await?.total)
}

/// Distinct artist ids referenced by `tracks`, in first-seen order.
pub fn distinct_artist_ids(tracks: &[Track]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ids = Vec::new();
    for track in tracks {
        for artist in &track.artists {
            if !artist.id.is_empty() && seen.insert(artist.id.as_str()) {
                ids.push(artist.id.clone());
            }
        }
    }
    ids
}

/// Looks up genre tags for every artist on `tracks`, in paced batches.
pub async fn resolve_artist_genres<C: Catalog>(
    catalog: &C,
    tracks: &[Track],
    options: &OrganizerOptions,
) -> Result<HashMap<String, Vec<String>>, CatalogError> {
    let artist_ids = distinct_artist_ids(tracks);
    let mut genres: HashMap<String, Vec<String>> = HashMap::with_capacity(artist_ids.len());
    for batch in artist_ids.chunks(options.artist_batch_size.max(1)) {
        let resolved = catalog.fetch_artist_genres(batch).await?;
        debug!(requested = batch.len(), resolved = resolved.len(), "artist batch resolved");
        genres.extend(resolved);
        pace(options.batch_delay).await;
    }
    Ok(genres)
}

/// Fills each track (and its artists) with the artists' tags. Duplicate tags
/// collapse; first-seen order is kept.
pub fn enrich_tracks(tracks: &mut [Track], artist_genres: &HashMap<String, Vec<String>>) {
    for track in tracks.iter_mut() {
        let mut merged: Vec<String> = Vec::new();
        for artist in track.artists.iter_mut() {
            let Some(tags) = artist_genres.get(&artist.id) else {
                continue;
            };
            artist.genres = tags.clone();
            for tag in tags {
                if !merged.contains(tag) {
                    merged.push(tag.clone());
                }
            }
        }
        track.genres = merged;
    }
}

/// Distinct micro-genre tags across `tracks`, sorted.
pub fn discovered_genres(tracks: &[Track]) -> Vec<String> {
    tracks
        .iter()
        .flat_map(|track| track.genres.iter().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Full library with every track's tags filled in.
pub async fn fetch_enriched_library<C: Catalog>(
    catalog: &C,
    options: &OrganizerOptions,
) -> Result<Vec<Track>, CatalogError> {
    let mut tracks = fetch_library(catalog, options, &NoProgress).await?;
    let artist_genres = resolve_artist_genres(catalog, &tracks, options).await?;
    enrich_tracks(&mut tracks, &artist_genres);
    Ok(tracks)
}

pub async fn add_tracks_batched<C: Catalog>(
    catalog: &C,
    playlist_id: &str,
    track_ids: &[String],
    options: &OrganizerOptions,
) -> Result<(), CatalogError> {
    for batch in track_ids.chunks(options.track_batch_size.max(1)) {
        catalog.add_tracks(playlist_id, batch).await?;
        pace(options.batch_delay).await;
    }
    Ok(())
}

/// Replaces a playlist's contents with `track_ids`.
pub async fn rewrite_playlist<C: Catalog>(
    catalog: &C,
    playlist_id: &str,
    track_ids: &[String],
    options: &OrganizerOptions,
) -> Result<(), CatalogError> {
    catalog.clear_playlist(playlist_id).await?;
    add_tracks_batched(catalog, playlist_id, track_ids, options).await
}

/// Every playlist owned by `owner_id`, across all pages.
pub async fn list_all_owned_playlists<C: Catalog>(
    catalog: &C,
    owner_id: &str,
    options: &OrganizerOptions,
) -> Result<Vec<PlaylistSummary>, CatalogError> {
    let page_size = options.library_page_size.max(1);
    let mut playlists = Vec::new();
    let mut offset = 0usize;
    loop {
        let page = catalog
            .list_owned_playlists(owner_id, offset, page_size)
            .await?;
        playlists.extend(page.playlists);
        match page.next {
            Some(next) if next > offset => offset = next,
            _ => break,
        }
    }
    Ok(playlists)
}
