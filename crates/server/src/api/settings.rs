use axum::{extract::State, Extension, Json};
use common::UserSettings;
use organizer::SettingsUpdate;

use crate::api::organizer_error;
use crate::state::{AppState, Credentials, JsonResult};

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
) -> JsonResult<UserSettings> {
    let settings = state
        .organizer
        .settings(&credentials.user_id)
        .map_err(|err| organizer_error(err, "failed to load settings"))?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
    Json(payload): Json<SettingsUpdate>,
) -> JsonResult<UserSettings> {
    let settings = state
        .organizer
        .update_settings(&credentials.user_id, payload)
        .map_err(|err| organizer_error(err, "failed to save settings"))?;
    Ok(Json(settings))
}
