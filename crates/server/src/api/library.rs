use std::collections::HashMap;
use std::time::Duration;

use axum::{extract::State, Extension, Json};
use time::OffsetDateTime;

use crate::api::organizer_error;
use crate::state::{AppState, Credentials, JsonResult, LibraryCountResponse};

pub async fn library_count(
    State(state): State<AppState>,
    Extension(credentials): Extension<Credentials>,
) -> JsonResult<LibraryCountResponse> {
    let ttl = Duration::from_secs(state.config.read().library_count_ttl_secs);
    let now = OffsetDateTime::now_utc();
    let cached = state.library_counts.read().get(&credentials.user_id).cloned();
    if let Some(cached) = cached.filter(|cached| is_fresh(cached, now, ttl)) {
        return Ok(Json(cached));
    }

    let catalog = state.catalog_for(&credentials);
    let count = state
        .organizer
        .library_size(&catalog)
        .await
        .map_err(|err| organizer_error(err, "failed to count library tracks"))?;
    let entry = LibraryCountResponse {
        count,
        cached_at: now,
    };
    remember(
        &mut state.library_counts.write(),
        &credentials.user_id,
        entry.clone(),
        ttl,
    );
    Ok(Json(entry))
}

/// Stores `entry` and evicts every other user's expired count.
fn remember(
    counts: &mut HashMap<String, LibraryCountResponse>,
    user_id: &str,
    entry: LibraryCountResponse,
    ttl: Duration,
) {
    let now = entry.cached_at;
    counts.retain(|_, cached| is_fresh(cached, now, ttl));
    counts.insert(user_id.to_string(), entry);
}

fn is_fresh(cached: &LibraryCountResponse, now: OffsetDateTime, ttl: Duration) -> bool {
    let age = now - cached.cached_at;
    !age.is_negative() && age < ttl
}
