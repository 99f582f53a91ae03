//! In-memory collaborators for the crate's tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use common::{Artist, PlaylistAssignment, PlaylistRef, PlaylistSummary, Track, UserSettings};
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::catalog::{Catalog, LibraryPage, PlaylistPage};
use crate::error::CatalogError;
use crate::store::SettingsStore;
use crate::OrganizerOptions;

pub const OWNER: &str = "user-1";

pub fn test_options() -> OrganizerOptions {
    OrganizerOptions {
        batch_delay: Duration::ZERO,
        ..OrganizerOptions::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogCall {
    FetchLibrary { offset: usize, limit: usize },
    FetchArtists(Vec<String>),
    Create { name: String, description: String },
    Find { name: String },
    Clear(String),
    Add { playlist_id: String, track_ids: Vec<String> },
    ListOwned { offset: usize },
    UpdateDetails { playlist_id: String, name: Option<String>, description: Option<String> },
}

impl CatalogCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            CatalogCall::Create { .. }
                | CatalogCall::Clear(_)
                | CatalogCall::Add { .. }
                | CatalogCall::UpdateDetails { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Fail {
    Library,
    Artists,
    Create,
    Clear(String),
    Add(String),
}

#[derive(Default)]
struct FakeState {
    library: Vec<Track>,
    artists: HashMap<String, Artist>,
    playlists: Vec<PlaylistSummary>,
    playlist_tracks: HashMap<String, Vec<String>>,
    calls: Vec<CatalogCall>,
    failures: HashSet<Fail>,
    next_playlist: usize,
}

/// Scripted catalog. Clones share state.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    state: Arc<Mutex<FakeState>>,
}

fn unavailable() -> CatalogError {
    CatalogError::Http {
        status: 503,
        body: "unavailable".to_string(),
    }
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_artist(&self, id: &str, genres: &[&str]) {
        self.state.lock().artists.insert(
            id.to_string(),
            Artist {
                id: id.to_string(),
                name: format!("Artist {id}"),
                genres: genres.iter().map(|genre| genre.to_string()).collect(),
            },
        );
    }

    /// Appends a saved track. Artists are attached without tags, the way the
    /// library endpoint reports them.
    pub fn add_track(&self, id: &str, artist_ids: &[&str], added_at: Option<OffsetDateTime>) {
        let artists = artist_ids
            .iter()
            .map(|artist_id| Artist {
                id: artist_id.to_string(),
                name: format!("Artist {artist_id}"),
                genres: Vec::new(),
            })
            .collect();
        self.state.lock().library.push(Track {
            id: id.to_string(),
            name: format!("Track {id}"),
            artists,
            genres: Vec::new(),
            added_at,
        });
    }

    pub fn add_playlist(&self, id: &str, name: &str, owner_id: &str) {
        self.state.lock().playlists.push(PlaylistSummary {
            id: id.to_string(),
            name: name.to_string(),
            url: playlist_url(id),
            owner_id: owner_id.to_string(),
            track_count: 0,
            image_url: None,
        });
    }

    pub fn set_playlist_tracks(&self, id: &str, track_ids: &[&str]) {
        self.state.lock().playlist_tracks.insert(
            id.to_string(),
            track_ids.iter().map(|track| track.to_string()).collect(),
        );
    }

    pub fn fail(&self, point: Fail) {
        self.state.lock().failures.insert(point);
    }

    pub fn library(&self) -> Vec<Track> {
        self.state.lock().library.clone()
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<CatalogCall> {
        self.calls()
            .into_iter()
            .filter(CatalogCall::is_mutation)
            .collect()
    }

    pub fn playlist_tracks(&self, id: &str) -> Vec<String> {
        self.state
            .lock()
            .playlist_tracks
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn playlist(&self, id: &str) -> Option<PlaylistSummary> {
        self.state
            .lock()
            .playlists
            .iter()
            .find(|playlist| playlist.id == id)
            .cloned()
    }

    pub fn playlist_names(&self) -> Vec<String> {
        self.state
            .lock()
            .playlists
            .iter()
            .map(|playlist| playlist.name.clone())
            .collect()
    }
}

fn playlist_url(id: &str) -> String {
    format!("https://catalog.test/playlist/{id}")
}

impl Catalog for FakeCatalog {
    async fn fetch_library_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<LibraryPage, CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::FetchLibrary { offset, limit });
        if state.failures.contains(&Fail::Library) {
            return Err(unavailable());
        }
        let total = state.library.len();
        let start = offset.min(total);
        let end = offset.saturating_add(limit).min(total);
        Ok(LibraryPage {
            tracks: state.library[start..end].to_vec(),
            total,
            next: (end < total).then_some(end),
        })
    }

    async fn fetch_artist_genres(
        &self,
        artist_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::FetchArtists(artist_ids.to_vec()));
        if state.failures.contains(&Fail::Artists) {
            return Err(unavailable());
        }
        Ok(artist_ids
            .iter()
            .filter_map(|id| {
                state
                    .artists
                    .get(id)
                    .map(|artist| (id.clone(), artist.genres.clone()))
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistRef, CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::Create {
            name: name.to_string(),
            description: description.to_string(),
        });
        if state.failures.contains(&Fail::Create) {
            return Err(unavailable());
        }
        state.next_playlist += 1;
        let id = format!("pl-{}", state.next_playlist);
        state.playlists.push(PlaylistSummary {
            id: id.clone(),
            name: name.to_string(),
            url: playlist_url(&id),
            owner_id: owner_id.to_string(),
            track_count: 0,
            image_url: None,
        });
        Ok(PlaylistRef {
            url: playlist_url(&id),
            id,
            name: name.to_string(),
        })
    }

    async fn find_playlist_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<PlaylistRef>, CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::Find {
            name: name.to_string(),
        });
        Ok(state
            .playlists
            .iter()
            .find(|playlist| playlist.owner_id == owner_id && playlist.name == name)
            .map(|playlist| PlaylistRef {
                id: playlist.id.clone(),
                name: playlist.name.clone(),
                url: playlist.url.clone(),
            }))
    }

    async fn clear_playlist(&self, playlist_id: &str) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::Clear(playlist_id.to_string()));
        if state.failures.contains(&Fail::Clear(playlist_id.to_string())) {
            return Err(unavailable());
        }
        state.playlist_tracks.insert(playlist_id.to_string(), Vec::new());
        if let Some(playlist) = state.playlists.iter_mut().find(|p| p.id == playlist_id) {
            playlist.track_count = 0;
        }
        Ok(())
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::Add {
            playlist_id: playlist_id.to_string(),
            track_ids: track_ids.to_vec(),
        });
        if state.failures.contains(&Fail::Add(playlist_id.to_string())) {
            return Err(unavailable());
        }
        let stored = state
            .playlist_tracks
            .entry(playlist_id.to_string())
            .or_default();
        stored.extend(track_ids.iter().cloned());
        let count = stored.len();
        if let Some(playlist) = state.playlists.iter_mut().find(|p| p.id == playlist_id) {
            playlist.track_count = count;
        }
        Ok(())
    }

    async fn list_owned_playlists(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<PlaylistPage, CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::ListOwned { offset });
        let total = state.playlists.len();
        let start = offset.min(total);
        let end = offset.saturating_add(limit).min(total);
        let playlists = state.playlists[start..end]
            .iter()
            .filter(|playlist| playlist.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(PlaylistPage {
            playlists,
            total,
            next: (end < total).then_some(end),
        })
    }

    async fn update_playlist_details(
        &self,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        state.calls.push(CatalogCall::UpdateDetails {
            playlist_id: playlist_id.to_string(),
            name: name.map(str::to_string),
            description: description.map(str::to_string),
        });
        if let (Some(name), Some(playlist)) = (
            name,
            state.playlists.iter_mut().find(|p| p.id == playlist_id),
        ) {
            playlist.name = name.to_string();
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryStoreError(&'static str);

impl fmt::Display for MemoryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for MemoryStoreError {}

#[derive(Default)]
pub struct MemoryStore {
    settings: Mutex<HashMap<String, UserSettings>>,
    assignments: Mutex<BTreeMap<(String, String), PlaylistAssignment>>,
    fail_settings: Mutex<bool>,
    fail_upserts: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_settings(&self) {
        *self.fail_settings.lock() = true;
    }

    pub fn fail_upserts(&self) {
        *self.fail_upserts.lock() = true;
    }

    pub fn insert_assignment(&self, assignment: PlaylistAssignment) {
        self.assignments.lock().insert(
            (assignment.user_id.clone(), assignment.playlist_id.clone()),
            assignment,
        );
    }

    pub fn assignment(&self, user_id: &str, playlist_id: &str) -> Option<PlaylistAssignment> {
        self.assignments
            .lock()
            .get(&(user_id.to_string(), playlist_id.to_string()))
            .cloned()
    }
}

impl SettingsStore for MemoryStore {
    type Error = MemoryStoreError;

    fn user_settings(&self, user_id: &str) -> Result<UserSettings, Self::Error> {
        if *self.fail_settings.lock() {
            return Err(MemoryStoreError("settings unavailable"));
        }
        Ok(self
            .settings
            .lock()
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserSettings::defaults(user_id)))
    }

    fn save_user_settings(&self, settings: &UserSettings) -> Result<(), Self::Error> {
        self.settings
            .lock()
            .insert(settings.user_id.clone(), settings.clone());
        Ok(())
    }

    fn playlist_assignments(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, PlaylistAssignment>, Self::Error> {
        Ok(self
            .assignments
            .lock()
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, playlist), assignment)| (playlist.clone(), assignment.clone()))
            .collect())
    }

    fn playlist_assignment(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<PlaylistAssignment>, Self::Error> {
        Ok(self.assignment(user_id, playlist_id))
    }

    fn upsert_playlist_assignment(
        &self,
        assignment: &PlaylistAssignment,
    ) -> Result<(), Self::Error> {
        if *self.fail_upserts.lock() {
            return Err(MemoryStoreError("upsert rejected"));
        }
        self.insert_assignment(assignment.clone());
        Ok(())
    }
}
