use axum::{
    extract::{rejection::JsonRejection, Path as AxumPath, State},
    http::StatusCode,
    Extension, Json,
};
use organizer::{Job, JobStatus};
use uuid::Uuid;

use crate::api::organizer_error;
use crate::state::{AppState, Credentials, ErrorResponse, JsonResult, OrganizeAccepted, OrganizeRequest};
use crate::utils::json_error;

pub async fn start_organize(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
    payload: Result<Json<OrganizeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrganizeAccepted>), (StatusCode, Json<ErrorResponse>)> {
    let Json(payload) = payload.map_err(bad_request_body)?;
    let catalog = state.catalog_for(&credentials);
    // The job outlives the request; progress is polled through the registry.
    let handle = state
        .organizer
        .start_organize(
            catalog,
            &credentials.user_id,
            payload.playlist_count,
            payload.replace_existing,
        )
        .map_err(|err| organizer_error(err, "failed to start organize job"))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(OrganizeAccepted {
            job_id: handle.id(),
            status: JobStatus::Pending,
        }),
    ))
}

pub async fn organize_status(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
    AxumPath(job_id): AxumPath<Uuid>,
) -> JsonResult<Job> {
    match state.organizer.organize_status(job_id) {
        Some(job) if job.user_id == credentials.user_id => Ok(Json(job)),
        _ => Err(json_error(StatusCode::NOT_FOUND, "job not found")),
    }
}

/// Malformed bodies share the 400 path with out-of-range counts.
fn bad_request_body(rejection: JsonRejection) -> (StatusCode, Json<ErrorResponse>) {
    json_error(StatusCode::BAD_REQUEST, rejection.body_text())
}
