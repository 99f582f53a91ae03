use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use organizer::{JobStatus, Organizer};
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::external::ExternalCatalog;
use crate::user_data::UserDataStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<ServerConfig>>,
    pub organizer: Organizer<UserDataStore>,
    pub external_client: Client,
    pub library_counts: Arc<RwLock<HashMap<String, LibraryCountResponse>>>,
}

impl AppState {
    /// Catalog client acting with the caller's access token.
    pub fn catalog_for(&self, credentials: &Credentials) -> ExternalCatalog {
        let config = self.config.read();
        ExternalCatalog::new(
            self.external_client.clone(),
            &config.catalog_api_url,
            &credentials.access_token,
            config.catalog_timeout(),
        )
    }
}

/// Caller identity, attached to the request by the auth middleware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub user_id: String,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct OrganizeRequest {
    pub playlist_count: i64,
    #[serde(default)]
    pub replace_existing: bool,
}

#[derive(Debug, Serialize)]
pub struct OrganizeAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistRequest {
    pub custom_name: Option<String>,
    pub custom_description: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LibraryCountResponse {
    pub count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub cached_at: OffsetDateTime,
}
