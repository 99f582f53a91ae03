use std::sync::Arc;

use common::{ParentGenre, PlaylistAssignment, UserSettings};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{
    add_tracks_batched, discovered_genres, enrich_tracks, fetch_library, resolve_artist_genres,
    Catalog,
};
use crate::error::{CatalogError, OrganizerError};
use crate::jobs::{Job, JobHandle, JobReporter, JobStage, ProgressSink};
use crate::partition::{partition, GenreGroup};
use crate::store::SettingsStore;
use crate::{Organizer, OrganizerOptions};

pub const FETCH_FAILED: &str = "Failed to fetch your liked songs. Please try again.";
pub const ANALYZE_FAILED: &str = "Failed to analyze song genres. Please try again.";
pub const CREATE_FAILED: &str = "Failed to create playlists. Please try again.";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizeResult {
    pub playlists: Vec<PlaylistResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistResult {
    pub name: String,
    pub genre: ParentGenre,
    pub playlist_id: String,
    pub url: String,
    pub track_count: usize,
}

impl<S: SettingsStore> Organizer<S> {
    /// Validates the request and spawns the organize pipeline.
    ///
    /// The job is visible through [`Organizer::organize_status`] as soon as
    /// this returns. Counts outside the configured bounds, negative ones
    /// included, fail with `InvalidPlaylistCount`.
    pub fn start_organize<C: Catalog>(
        &self,
        catalog: C,
        user_id: &str,
        playlist_count: i64,
        replace_existing: bool,
    ) -> Result<JobHandle, OrganizerError> {
        let options = &self.options;
        let playlist_count = usize::try_from(playlist_count)
            .ok()
            .filter(|count| (options.min_playlists..=options.max_playlists).contains(count))
            .ok_or(OrganizerError::InvalidPlaylistCount {
                requested: playlist_count,
                min: options.min_playlists,
                max: options.max_playlists,
            })?;

        let id = self.jobs.create(user_id);
        let run = PipelineRun {
            catalog,
            store: Arc::clone(&self.store),
            options: self.options.clone(),
            user_id: user_id.to_string(),
            playlist_count,
            replace_existing,
        };
        let reporter = self.jobs.reporter(id);
        info!(job_id = %id, user_id, playlist_count, replace_existing, "organize job queued");
        let task = tokio::spawn(async move { run.execute(reporter).await });
        Ok(JobHandle::new(id, task))
    }

    pub fn organize_status(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(id)
    }
}

struct PipelineRun<C, S> {
    catalog: C,
    store: Arc<S>,
    options: OrganizerOptions,
    user_id: String,
    playlist_count: usize,
    replace_existing: bool,
}

impl<C: Catalog, S: SettingsStore> PipelineRun<C, S> {
    async fn execute(self, reporter: JobReporter) {
        let job_id = reporter.id();
        reporter.mark_processing();

        let mut tracks = match fetch_library(&self.catalog, &self.options, &reporter).await {
            Ok(tracks) => tracks,
            Err(err) => {
                warn!(%job_id, error = %err, "library fetch failed");
                reporter.fail(FETCH_FAILED);
                return;
            }
        };

        let total = tracks.len();
        reporter.report(JobStage::Analyzing, 0, total);
        match resolve_artist_genres(&self.catalog, &tracks, &self.options).await {
            Ok(artist_genres) => enrich_tracks(&mut tracks, &artist_genres),
            Err(err) => {
                warn!(%job_id, error = %err, "artist genre lookup failed");
                reporter.fail(ANALYZE_FAILED);
                return;
            }
        }
        reporter.set_discovered(discovered_genres(&tracks));
        reporter.report(JobStage::Analyzing, total, total);

        let groups = partition(tracks, self.playlist_count);
        reporter.report(JobStage::Creating, 0, groups.len());
        let settings = self.settings();
        let year = OffsetDateTime::now_utc().year();

        let mut result = OrganizeResult::default();
        for (index, group) in groups.iter().enumerate() {
            match self.materialize(&settings, group, year).await {
                Ok(created) => result.playlists.push(created),
                Err(err) => {
                    warn!(%job_id, genre = %group.genre, error = %err, "playlist materialization failed");
                    reporter.fail(CREATE_FAILED);
                    return;
                }
            }
            reporter.report(JobStage::Creating, index + 1, groups.len());
        }

        info!(%job_id, tracks = total, playlists = result.playlists.len(), "organize job completed");
        reporter.complete(result);
    }

    fn settings(&self) -> UserSettings {
        match self.store.user_settings(&self.user_id) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(user_id = %self.user_id, error = %err, "settings unavailable, using defaults");
                UserSettings::defaults(&self.user_id)
            }
        }
    }

    async fn materialize(
        &self,
        settings: &UserSettings,
        group: &GenreGroup,
        year: i32,
    ) -> Result<PlaylistResult, CatalogError> {
        let name = settings.build_playlist_name(group.genre, year);
        let description = settings.build_description(group.genre, year);

        let existing = if self.replace_existing {
            self.catalog
                .find_playlist_by_name(&self.user_id, &name)
                .await?
        } else {
            None
        };
        let playlist = match existing {
            Some(playlist) => {
                self.catalog.clear_playlist(&playlist.id).await?;
                playlist
            }
            None => {
                self.catalog
                    .create_playlist(&self.user_id, &name, &description)
                    .await?
            }
        };

        let track_ids: Vec<String> = group.tracks.iter().map(|track| track.id.clone()).collect();
        add_tracks_batched(&self.catalog, &playlist.id, &track_ids, &self.options).await?;
        self.record_assignment(&playlist.id, group.genre);

        Ok(PlaylistResult {
            name,
            genre: group.genre,
            playlist_id: playlist.id,
            url: playlist.url,
            track_count: track_ids.len(),
        })
    }

    fn record_assignment(&self, playlist_id: &str, genre: ParentGenre) {
        let existing = match self.store.playlist_assignment(&self.user_id, playlist_id) {
            Ok(existing) => existing,
            Err(err) => {
                warn!(playlist_id, error = %err, "assignment lookup failed");
                None
            }
        };
        let mut assignment =
            existing.unwrap_or_else(|| PlaylistAssignment::new(&self.user_id, playlist_id));
        assignment.genre = Some(genre);
        assignment.last_synced_at = Some(OffsetDateTime::now_utc());
        if let Err(err) = self.store.upsert_playlist_assignment(&assignment) {
            warn!(playlist_id, error = %err, "assignment upsert failed; playlist will miss future syncs");
        }
    }
}
