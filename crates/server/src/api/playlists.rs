use axum::{
    extract::{Path as AxumPath, State},
    Extension, Json,
};
use common::PlaylistAssignment;
use organizer::{ManagedPlaylists, RefreshResult};

use crate::api::organizer_error;
use crate::state::{AppState, Credentials, JsonResult, UpdatePlaylistRequest};

pub async fn list_playlists(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
) -> JsonResult<ManagedPlaylists> {
    let catalog = state.catalog_for(&credentials);
    let playlists = state
        .organizer
        .list_managed_playlists(&catalog, &credentials.user_id)
        .await
        .map_err(|err| organizer_error(err, "failed to list playlists"))?;
    Ok(Json(playlists))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
    AxumPath(playlist_id): AxumPath<String>,
    Json(payload): Json<UpdatePlaylistRequest>,
) -> JsonResult<PlaylistAssignment> {
    let catalog = state.catalog_for(&credentials);
    let assignment = state
        .organizer
        .update_playlist_details(
            &catalog,
            &credentials.user_id,
            &playlist_id,
            payload.custom_name,
            payload.custom_description,
        )
        .await
        .map_err(|err| organizer_error(err, "failed to update playlist"))?;
    Ok(Json(assignment))
}

pub async fn refresh_playlist(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
    AxumPath(playlist_id): AxumPath<String>,
) -> JsonResult<RefreshResult> {
    let catalog = state.catalog_for(&credentials);
    let result = state
        .organizer
        .refresh_playlist(&catalog, &credentials.user_id, &playlist_id)
        .await
        .map_err(|err| organizer_error(err, "failed to refresh playlist"))?;
    Ok(Json(result))
}
