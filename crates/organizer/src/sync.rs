use std::collections::HashMap;

use common::{ParentGenre, PlaylistAssignment, Track};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::catalog::{
    enrich_tracks, fetch_enriched_library, fetch_library, resolve_artist_genres,
    rewrite_playlist, Catalog,
};
use crate::error::OrganizerError;
use crate::genres::classify_track;
use crate::jobs::NoProgress;
use crate::partition::group_by_genre;
use crate::store::SettingsStore;
use crate::Organizer;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub new_track_count: usize,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub oldest_synced_at: Option<OffsetDateTime>,
    pub playlists: Vec<PlaylistSyncStatus>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSyncStatus {
    pub playlist_id: String,
    pub genre: ParentGenre,
    pub new_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncAllResult {
    pub playlists_updated: usize,
    pub total_tracks: usize,
    pub failed_playlist_genres: Vec<ParentGenre>,
}

impl<S: SettingsStore> Organizer<S> {
    /// Counts library tracks added since the oldest playlist sync, per
    /// assigned playlist. Nothing is written.
    pub async fn sync_status<C: Catalog>(
        &self,
        catalog: &C,
        user_id: &str,
    ) -> Result<SyncStatus, OrganizerError> {
        let assignments = self
            .store
            .playlist_assignments(user_id)
            .map_err(OrganizerError::store)?;
        let Some(oldest) = assignments
            .values()
            .filter_map(|assignment| assignment.last_synced_at)
            .min()
        else {
            return Ok(SyncStatus::default());
        };

        let threshold = oldest - self.options.sync_buffer;
        let mut fresh: Vec<Track> = fetch_library(catalog, &self.options, &NoProgress)
            .await?
            .into_iter()
            .filter(|track| track.added_after(threshold))
            .collect();
        if fresh.is_empty() {
            return Ok(SyncStatus {
                new_track_count: 0,
                oldest_synced_at: Some(oldest),
                playlists: Vec::new(),
            });
        }

        let artist_genres = resolve_artist_genres(catalog, &fresh, &self.options).await?;
        enrich_tracks(&mut fresh, &artist_genres);
        let mut tally: HashMap<ParentGenre, usize> = HashMap::new();
        for track in &fresh {
            *tally.entry(classify_track(track)).or_default() += 1;
        }

        let playlists = assignments
            .values()
            .filter_map(|assignment| {
                let genre = assignment.genre?;
                let new_count = tally.get(&genre).copied().unwrap_or(0);
                (new_count > 0).then(|| PlaylistSyncStatus {
                    playlist_id: assignment.playlist_id.clone(),
                    genre,
                    new_count,
                })
            })
            .collect();

        Ok(SyncStatus {
            new_track_count: fresh.len(),
            oldest_synced_at: Some(oldest),
            playlists,
        })
    }

    /// Rewrites every assigned playlist that has tracks added since its last
    /// sync with the full current set for its genre.
    pub async fn sync_all<C: Catalog>(
        &self,
        catalog: &C,
        user_id: &str,
    ) -> Result<SyncAllResult, OrganizerError> {
        let assignments = self
            .store
            .playlist_assignments(user_id)
            .map_err(OrganizerError::store)?;
        let targets: Vec<(&PlaylistAssignment, ParentGenre)> = assignments
            .values()
            .filter_map(|assignment| assignment.genre.map(|genre| (assignment, genre)))
            .collect();
        let mut result = SyncAllResult::default();
        if targets.is_empty() {
            return Ok(result);
        }

        let tracks = fetch_enriched_library(catalog, &self.options).await?;
        let groups: HashMap<ParentGenre, Vec<Track>> = group_by_genre(tracks)
            .into_iter()
            .map(|group| (group.genre, group.tracks))
            .collect();

        for (assignment, genre) in targets {
            let playlist_id = assignment.playlist_id.as_str();
            let Some(group) = groups.get(&genre).filter(|group| !group.is_empty()) else {
                debug!(playlist_id, %genre, "no tracks for genre, skipping");
                continue;
            };
            if let Some(last_synced_at) = assignment.last_synced_at {
                let threshold = last_synced_at - self.options.sync_buffer;
                if !group.iter().any(|track| track.added_after(threshold)) {
                    debug!(playlist_id, %genre, "no new tracks, skipping");
                    continue;
                }
            }

            let track_ids: Vec<String> = group.iter().map(|track| track.id.clone()).collect();
            match rewrite_playlist(catalog, playlist_id, &track_ids, &self.options).await {
                Ok(()) => {
                    self.mark_synced(assignment.clone(), genre);
                    result.playlists_updated += 1;
                    result.total_tracks += track_ids.len();
                }
                Err(err) => {
                    warn!(playlist_id, %genre, error = %err, "playlist sync failed");
                    result.failed_playlist_genres.push(genre);
                }
            }
        }

        info!(
            user_id,
            updated = result.playlists_updated,
            tracks = result.total_tracks,
            failed = result.failed_playlist_genres.len(),
            "sync finished"
        );
        Ok(result)
    }

    /// Stamps the assignment with the current time. Store failures are logged
    /// and otherwise ignored.
    pub(crate) fn mark_synced(&self, mut assignment: PlaylistAssignment, genre: ParentGenre) {
        assignment.genre = Some(genre);
        assignment.last_synced_at = Some(OffsetDateTime::now_utc());
        if let Err(err) = self.store.upsert_playlist_assignment(&assignment) {
            warn!(
                playlist_id = %assignment.playlist_id,
                error = %err,
                "assignment upsert failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::testing::{test_options, CatalogCall, Fail, FakeCatalog, MemoryStore, OWNER};
    use time::macros::datetime;

    const SYNCED: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

    fn assign(store: &MemoryStore, playlist_id: &str, genre: Option<ParentGenre>, at: Option<OffsetDateTime>) {
        let mut assignment = PlaylistAssignment::new(OWNER, playlist_id);
        assignment.genre = genre;
        assignment.last_synced_at = at;
        store.insert_assignment(assignment);
    }

    fn library() -> FakeCatalog {
        let catalog = FakeCatalog::new();
        catalog.add_artist("ar-rock", &["rock"]);
        catalog.add_artist("ar-jazz", &["bebop"]);
        catalog.add_artist("ar-pop", &["dance pop"]);
        catalog.add_track("r-old", &["ar-rock"], Some(datetime!(2024-02-01 00:00 UTC)));
        catalog.add_track("r-new", &["ar-rock"], Some(datetime!(2024-03-01 13:00 UTC)));
        catalog.add_track("r-undated", &["ar-rock"], None);
        catalog.add_track("j-new", &["ar-jazz"], Some(datetime!(2024-03-02 09:00 UTC)));
        catalog.add_track("p-new", &["ar-pop"], Some(datetime!(2024-03-03 09:00 UTC)));
        catalog
    }

    fn organizer(store: MemoryStore) -> Organizer<MemoryStore> {
        Organizer::new(Arc::new(store), test_options())
    }

    #[tokio::test]
    async fn status_without_synced_playlists_skips_the_catalog() {
        let organizer = organizer(MemoryStore::new());
        let catalog = library();
        let status = organizer.sync_status(&catalog, OWNER).await.unwrap();
        assert_eq!(status, SyncStatus::default());
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn status_counts_new_tracks_per_assigned_playlist() {
        let store = MemoryStore::new();
        assign(&store, "pl-a", Some(ParentGenre::Rock), Some(SYNCED));
        assign(&store, "pl-b", Some(ParentGenre::Jazz), Some(datetime!(2024-03-05 00:00 UTC)));
        assign(&store, "pl-c", None, Some(SYNCED));
        assign(&store, "pl-d", Some(ParentGenre::Metal), Some(SYNCED));
        let organizer = organizer(store);

        let status = organizer.sync_status(&library(), OWNER).await.unwrap();
        assert_eq!(status.new_track_count, 3);
        assert_eq!(status.oldest_synced_at, Some(SYNCED));
        assert_eq!(
            status.playlists,
            vec![
                PlaylistSyncStatus {
                    playlist_id: "pl-a".to_string(),
                    genre: ParentGenre::Rock,
                    new_count: 1,
                },
                PlaylistSyncStatus {
                    playlist_id: "pl-b".to_string(),
                    genre: ParentGenre::Jazz,
                    new_count: 1,
                },
            ]
        );
    }

    #[tokio::test]
    async fn status_buffer_absorbs_small_skew() {
        let store = MemoryStore::new();
        assign(&store, "pl-a", Some(ParentGenre::Rock), Some(SYNCED));
        let organizer = organizer(store);
        let catalog = FakeCatalog::new();
        catalog.add_artist("ar-rock", &["rock"]);
        catalog.add_track("edge", &["ar-rock"], Some(SYNCED - Duration::from_secs(30)));
        catalog.add_track("early", &["ar-rock"], Some(SYNCED - Duration::from_secs(120)));

        let status = organizer.sync_status(&catalog, OWNER).await.unwrap();
        assert_eq!(status.new_track_count, 1);
        assert_eq!(status.playlists[0].new_count, 1);
    }

    #[tokio::test]
    async fn sync_all_skips_playlists_without_new_tracks() {
        let store = MemoryStore::new();
        let later = datetime!(2024-04-01 00:00 UTC);
        assign(&store, "pl-a", Some(ParentGenre::Rock), Some(later));
        let organizer = organizer(store);
        let catalog = library();

        let result = organizer.sync_all(&catalog, OWNER).await.unwrap();
        assert_eq!(result, SyncAllResult::default());
        assert!(catalog.mutations().is_empty());
        let stored = organizer.store().assignment(OWNER, "pl-a").unwrap();
        assert_eq!(stored.last_synced_at, Some(later));
    }

    #[tokio::test]
    async fn sync_all_rewrites_the_full_genre_set() {
        let store = MemoryStore::new();
        assign(&store, "pl-a", Some(ParentGenre::Rock), Some(SYNCED));
        assign(&store, "pl-b", Some(ParentGenre::Jazz), None);
        assign(&store, "pl-d", Some(ParentGenre::Metal), Some(SYNCED));
        let organizer = organizer(store);
        let catalog = library();
        catalog.set_playlist_tracks("pl-a", &["r-old", "gone"]);

        let result = organizer.sync_all(&catalog, OWNER).await.unwrap();
        assert_eq!(result.playlists_updated, 2);
        assert_eq!(result.total_tracks, 4);
        assert!(result.failed_playlist_genres.is_empty());
        assert_eq!(
            catalog.playlist_tracks("pl-a"),
            vec!["r-old", "r-new", "r-undated"]
        );
        assert_eq!(catalog.playlist_tracks("pl-b"), vec!["j-new"]);
        assert!(!catalog.calls().contains(&CatalogCall::Clear("pl-d".to_string())));

        let stored = organizer.store().assignment(OWNER, "pl-a").unwrap();
        assert!(stored.last_synced_at.unwrap() > SYNCED);
    }

    #[tokio::test]
    async fn sync_all_isolates_playlist_failures() {
        let store = MemoryStore::new();
        assign(&store, "pl-a", Some(ParentGenre::Rock), Some(SYNCED));
        assign(&store, "pl-b", Some(ParentGenre::Jazz), Some(SYNCED));
        let organizer = organizer(store);
        let catalog = library();
        catalog.fail(Fail::Clear("pl-a".to_string()));

        let result = organizer.sync_all(&catalog, OWNER).await.unwrap();
        assert_eq!(result.playlists_updated, 1);
        assert_eq!(result.total_tracks, 1);
        assert_eq!(result.failed_playlist_genres, vec![ParentGenre::Rock]);
        let stored = organizer.store().assignment(OWNER, "pl-a").unwrap();
        assert_eq!(stored.last_synced_at, Some(SYNCED));
    }

    #[tokio::test]
    async fn sync_all_surfaces_library_failures() {
        let store = MemoryStore::new();
        assign(&store, "pl-a", Some(ParentGenre::Rock), Some(SYNCED));
        let organizer = organizer(store);
        let catalog = library();
        catalog.fail(Fail::Library);
        let err = organizer.sync_all(&catalog, OWNER).await.unwrap_err();
        assert!(matches!(err, OrganizerError::Catalog(_)));
    }
}
