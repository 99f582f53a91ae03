pub mod library;
pub mod organize;
pub mod playlists;
pub mod settings;
pub mod sync;

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use organizer::{CatalogError, OrganizerError};
use tracing::warn;

use crate::state::{AppState, Credentials, ErrorResponse, HealthResponse};
use crate::utils::{json_error, json_error_response};

const TOKEN_COOKIE: &str = "access_token";
const USER_COOKIE: &str = "user_id";
const USER_HEADER: &str = "x-user-id";

pub fn api_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/organize", post(organize::start_organize))
        .route("/organize/:job_id", get(organize::organize_status))
        .route("/sync/status", get(sync::sync_status))
        .route("/sync", post(sync::sync_all))
        .route("/library/count", get(library::library_count))
        .route("/playlists", get(playlists::list_playlists))
        .route("/playlists/:playlist_id", put(playlists::update_playlist))
        .route("/playlists/:playlist_id/refresh", post(playlists::refresh_playlist))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .layer(middleware::from_fn(require_auth));

    Router::new().merge(protected).with_state(state)
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn require_auth(mut req: axum::http::Request<Body>, next: Next) -> Response {
    match extract_credentials(req.headers()) {
        Some(credentials) => {
            req.extensions_mut().insert(credentials);
            next.run(req).await
        }
        None => json_error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
    }
}

pub fn extract_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let access_token = extract_token(headers)?;
    let user_id = extract_user_id(headers)?;
    Some(Credentials {
        access_token,
        user_id,
    })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    cookie_value(headers, TOKEN_COOKIE)
}

fn extract_user_id(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(USER_HEADER) {
        if let Ok(value) = value.to_str() {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    cookie_value(headers, USER_COOKIE)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    parse_cookie_value(cookie, name)
}

fn parse_cookie_value(cookie: &str, name: &str) -> Option<String> {
    for part in cookie.split(';') {
        let mut iter = part.trim().splitn(2, '=');
        let key = iter.next().unwrap_or_default().trim();
        let Some(value) = iter.next() else {
            continue;
        };
        let value = value.trim();
        if key == name && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Maps a core error onto a response. Validation errors echo their message;
/// upstream and storage failures are logged and answered with `context`.
pub(crate) fn organizer_error(
    err: OrganizerError,
    context: &str,
) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        OrganizerError::PlaylistNotFound(_) => json_error(StatusCode::NOT_FOUND, err.to_string()),
        err if err.is_client_error() => json_error(StatusCode::BAD_REQUEST, err.to_string()),
        OrganizerError::Catalog(CatalogError::Http { status: 401, .. }) => {
            warn!("{}: catalog rejected the access token", context);
            json_error(StatusCode::UNAUTHORIZED, "catalog session expired")
        }
        OrganizerError::Catalog(err) => {
            warn!("{}: {}", context, err);
            json_error(StatusCode::BAD_GATEWAY, context)
        }
        err => {
            warn!("{}: {}", context, err);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    }
}
