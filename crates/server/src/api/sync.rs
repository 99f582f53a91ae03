use axum::{extract::State, Extension, Json};
use organizer::{SyncAllResult, SyncStatus};
use tracing::info;

use crate::api::organizer_error;
use crate::state::{AppState, Credentials, JsonResult};

pub async fn sync_status(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
) -> JsonResult<SyncStatus> {
    let catalog = state.catalog_for(&credentials);
    let status = state
        .organizer
        .sync_status(&catalog, &credentials.user_id)
        .await
        .map_err(|err| organizer_error(err, "failed to get sync status"))?;
    Ok(Json(status))
}

pub async fn sync_all(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
) -> JsonResult<SyncAllResult> {
    let catalog = state.catalog_for(&credentials);
    let result = state
        .organizer
        .sync_all(&catalog, &credentials.user_id)
        .await
        .map_err(|err| organizer_error(err, "failed to sync playlists"))?;
    info!(
        user_id = %credentials.user_id,
        updated = result.playlists_updated,
        failed = result.failed_playlist_genres.len(),
        "sync request finished"
    );
    Ok(Json(result))
}
