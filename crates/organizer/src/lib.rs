use std::sync::Arc;
use std::time::Duration;

pub mod catalog;
pub mod error;
pub mod genres;
pub mod jobs;
pub mod partition;
pub mod pipeline;
pub mod playlists;
pub mod settings;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, LibraryPage, PlaylistPage};
pub use error::{CatalogError, OrganizerError};
pub use jobs::{Job, JobHandle, JobRegistry, JobStage, JobStatus, NoProgress, ProgressSink};
pub use partition::{partition, GenreGroup};
pub use pipeline::{OrganizeResult, PlaylistResult};
pub use playlists::{ManagedPlaylist, ManagedPlaylists, RefreshResult};
pub use settings::SettingsUpdate;
pub use store::SettingsStore;
pub use sync::{PlaylistSyncStatus, SyncAllResult, SyncStatus};

pub const DEFAULT_DESCRIPTION_FOOTER: &str = " \u{2022} made with Genre Organizer";

#[derive(Clone, Debug)]
pub struct OrganizerOptions {
    pub min_playlists: usize,
    pub max_playlists: usize,
    pub library_page_size: usize,
    pub artist_batch_size: usize,
    pub track_batch_size: usize,
    /// Pause after every artist lookup batch and every track add batch.
    pub batch_delay: Duration,
    /// Slack subtracted from sync timestamps before comparing `added_at`.
    pub sync_buffer: Duration,
    pub description_footer: String,
}

impl Default for OrganizerOptions {
    fn default() -> Self {
        Self {
            min_playlists: 1,
            max_playlists: 50,
            library_page_size: 50,
            artist_batch_size: 50,
            track_batch_size: 100,
            batch_delay: Duration::from_millis(100),
            sync_buffer: Duration::from_secs(60),
            description_footer: DEFAULT_DESCRIPTION_FOOTER.to_string(),
        }
    }
}

/// Entry point for every organizer operation.
///
/// Cheap to clone; clones share the job registry and the settings store.
pub struct Organizer<S> {
    store: Arc<S>,
    jobs: JobRegistry,
    options: OrganizerOptions,
}

impl<S> Clone for Organizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            jobs: self.jobs.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S: SettingsStore> Organizer<S> {
    pub fn new(store: Arc<S>, options: OrganizerOptions) -> Self {
        Self {
            store,
            jobs: JobRegistry::new(),
            options,
        }
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn options(&self) -> &OrganizerOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
