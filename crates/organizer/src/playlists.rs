use common::{ParentGenre, PlaylistAssignment, GENRE_TOKEN, YEAR_TOKEN};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::catalog::{
    fetch_enriched_library, library_size, list_all_owned_playlists, rewrite_playlist, Catalog,
};
use crate::error::OrganizerError;
use crate::genres::classify_track;
use crate::store::SettingsStore;
use crate::Organizer;

/// A catalog playlist that looks organizer-made, with whatever we stored for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManagedPlaylist {
    pub id: String,
    pub name: String,
    pub url: String,
    pub track_count: usize,
    pub image_url: Option<String>,
    pub genre: Option<ParentGenre>,
    pub custom_name: Option<String>,
    pub custom_description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_synced_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedPlaylists {
    pub playlists: Vec<ManagedPlaylist>,
    pub total_tracks: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshResult {
    pub playlist_id: String,
    pub genre: ParentGenre,
    pub track_count: usize,
}

/// Fixed text of a name template, with the placeholders cut out.
fn template_fragments(template: &str) -> Vec<&str> {
    template
        .split(GENRE_TOKEN)
        .flat_map(|part| part.split(YEAR_TOKEN))
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

fn starts_with_genre(name: &str, genre: ParentGenre) -> bool {
    let genre_name = genre.name();
    name == genre_name
        || name
            .strip_prefix(genre_name)
            .is_some_and(|rest| rest.starts_with(' '))
}

pub fn is_organizer_playlist(name: &str, name_template: &str) -> bool {
    if name.to_lowercase().contains("organizer") {
        return true;
    }
    let fragments = template_fragments(name_template);
    if !fragments.is_empty() && fragments.iter().all(|fragment| name.contains(fragment)) {
        return true;
    }
    ParentGenre::ALL
        .iter()
        .any(|genre| starts_with_genre(name, *genre))
}

/// Recovers the genre a playlist was named after.
pub fn genre_from_name(name: &str, name_template: &str) -> Option<ParentGenre> {
    if let Some((prefix, rest)) = name_template.split_once(GENRE_TOKEN) {
        if !prefix.contains(YEAR_TOKEN) {
            let suffix = rest.split(YEAR_TOKEN).next().unwrap_or_default();
            let candidate = name.strip_prefix(prefix).and_then(|stripped| {
                if suffix.is_empty() {
                    Some(stripped)
                } else {
                    stripped.find(suffix).map(|end| &stripped[..end])
                }
            });
            if let Some(genre) = candidate.and_then(ParentGenre::parse) {
                return Some(genre);
            }
        }
    }

    let lowered = name.to_lowercase();
    ParentGenre::ALL
        .iter()
        .copied()
        .find(|genre| starts_with_genre(name, *genre))
        .or_else(|| {
            ParentGenre::ALL
                .iter()
                .copied()
                .find(|genre| lowered.starts_with(&genre.name().to_lowercase()))
        })
}

impl<S: SettingsStore> Organizer<S> {
    pub async fn library_size<C: Catalog>(&self, catalog: &C) -> Result<usize, OrganizerError> {
        Ok(library_size(catalog).await?)
    }

    pub async fn list_managed_playlists<C: Catalog>(
        &self,
        catalog: &C,
        user_id: &str,
    ) -> Result<ManagedPlaylists, OrganizerError> {
        let settings = self
            .store
            .user_settings(user_id)
            .map_err(OrganizerError::store)?;
        let assignments = self
            .store
            .playlist_assignments(user_id)
            .map_err(OrganizerError::store)?;
        let owned = list_all_owned_playlists(catalog, user_id, &self.options).await?;

        let mut managed = ManagedPlaylists::default();
        for playlist in owned {
            let assignment = assignments.get(&playlist.id);
            let assigned_genre = assignment.and_then(|assignment| assignment.genre);
            if assigned_genre.is_none()
                && !is_organizer_playlist(&playlist.name, &settings.name_template)
            {
                continue;
            }
            let genre =
                assigned_genre.or_else(|| genre_from_name(&playlist.name, &settings.name_template));
            managed.total_tracks += playlist.track_count;
            managed.playlists.push(ManagedPlaylist {
                genre,
                custom_name: assignment.and_then(|a| a.custom_name.clone()),
                custom_description: assignment.and_then(|a| a.custom_description.clone()),
                last_synced_at: assignment.and_then(|a| a.last_synced_at),
                id: playlist.id,
                name: playlist.name,
                url: playlist.url,
                track_count: playlist.track_count,
                image_url: playlist.image_url,
            });
        }
        Ok(managed)
    }

    /// Rewrites one playlist with the current tracks of its genre.
    pub async fn refresh_playlist<C: Catalog>(
        &self,
        catalog: &C,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<RefreshResult, OrganizerError> {
        let stored = self
            .store
            .playlist_assignment(user_id, playlist_id)
            .map_err(OrganizerError::store)?;
        let mut assignment =
            stored.unwrap_or_else(|| PlaylistAssignment::new(user_id, playlist_id));

        let genre = match assignment.genre {
            Some(genre) => genre,
            None => {
                let genre = self.discover_genre(catalog, user_id, playlist_id).await?;
                assignment.genre = Some(genre);
                if let Err(err) = self.store.upsert_playlist_assignment(&assignment) {
                    warn!(playlist_id, error = %err, "could not persist discovered genre");
                }
                genre
            }
        };

        let tracks = fetch_enriched_library(catalog, &self.options).await?;
        let track_ids: Vec<String> = tracks
            .iter()
            .filter(|track| classify_track(track) == genre)
            .map(|track| track.id.clone())
            .collect();
        rewrite_playlist(catalog, playlist_id, &track_ids, &self.options).await?;
        self.mark_synced(assignment, genre);

        info!(user_id, playlist_id, %genre, tracks = track_ids.len(), "playlist refreshed");
        Ok(RefreshResult {
            playlist_id: playlist_id.to_string(),
            genre,
            track_count: track_ids.len(),
        })
    }

    async fn discover_genre<C: Catalog>(
        &self,
        catalog: &C,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<ParentGenre, OrganizerError> {
        let owned = list_all_owned_playlists(catalog, user_id, &self.options).await?;
        let playlist = owned
            .iter()
            .find(|playlist| playlist.id == playlist_id)
            .ok_or_else(|| OrganizerError::PlaylistNotFound(playlist_id.to_string()))?;
        let settings = self
            .store
            .user_settings(user_id)
            .map_err(OrganizerError::store)?;
        genre_from_name(&playlist.name, &settings.name_template)
            .ok_or_else(|| OrganizerError::UnknownPlaylistGenre(playlist_id.to_string()))
    }

    /// Renames and/or re-describes a playlist and remembers the override.
    ///
    /// Non-premium users get the configured footer appended to the
    /// description sent to the catalog. The stored override keeps the text
    /// as entered. A blank name clears the stored name override and leaves
    /// the catalog name alone.
    pub async fn update_playlist_details<C: Catalog>(
        &self,
        catalog: &C,
        user_id: &str,
        playlist_id: &str,
        custom_name: Option<String>,
        custom_description: Option<String>,
    ) -> Result<PlaylistAssignment, OrganizerError> {
        let custom_name = custom_name.map(|name| name.trim().to_string());
        let published_name = custom_name.as_deref().filter(|name| !name.is_empty());

        let published_description = match custom_description.as_deref() {
            Some(description) => {
                let premium = match self.store.user_settings(user_id) {
                    Ok(settings) => settings.is_premium,
                    Err(err) => {
                        warn!(user_id, error = %err, "settings unavailable, assuming free tier");
                        false
                    }
                };
                if premium {
                    Some(description.to_string())
                } else {
                    Some(format!("{}{}", description, self.options.description_footer))
                }
            }
            None => None,
        };

        if published_name.is_some() || published_description.is_some() {
            catalog
                .update_playlist_details(
                    playlist_id,
                    published_name,
                    published_description.as_deref(),
                )
                .await?;
        }

        let mut assignment = self
            .store
            .playlist_assignment(user_id, playlist_id)
            .map_err(OrganizerError::store)?
            .unwrap_or_else(|| PlaylistAssignment::new(user_id, playlist_id));
        if let Some(name) = custom_name {
            assignment.custom_name = Some(name).filter(|name| !name.is_empty());
        }
        if custom_description.is_some() {
            assignment.custom_description = custom_description;
        }
        self.store
            .upsert_playlist_assignment(&assignment)
            .map_err(OrganizerError::store)?;
        Ok(assignment)
    }
}
