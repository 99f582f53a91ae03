use std::collections::HashMap;
use std::time::Duration;

use common::{Artist, PlaylistRef, PlaylistSummary, Track};
use organizer::{Catalog, CatalogError, LibraryPage, PlaylistPage};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::utils::url_escape;

const PLAYLIST_PAGE_SIZE: usize = 50;

/// Catalog web API client bound to one user's access token.
#[derive(Clone)]
pub struct ExternalCatalog {
    client: Client,
    base_url: String,
    access_token: String,
    timeout: Duration,
}

impl ExternalCatalog {
    pub fn new(client: Client, base_url: &str, access_token: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            timeout,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, CatalogError> {
        let response = request
            .send()
            .await
            .map_err(|err| CatalogError::Transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CatalogError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CatalogError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| CatalogError::Decode(err.to_string()))
    }
}

#[derive(Deserialize)]
struct SavedTracksResponse {
    #[serde(default)]
    items: Vec<SavedTrackItem>,
    #[serde(default)]
    total: usize,
    next: Option<String>,
}

#[derive(Deserialize)]
struct SavedTrackItem {
    #[serde(with = "time::serde::rfc3339")]
    added_at: OffsetDateTime,
    track: Option<TrackObject>,
}

#[derive(Deserialize)]
struct TrackObject {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
}

#[derive(Deserialize)]
struct ArtistObject {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Deserialize)]
struct ArtistsResponse {
    #[serde(default)]
    artists: Vec<Option<ArtistObject>>,
}

#[derive(Deserialize)]
struct PlaylistObject {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    external_urls: ExternalUrls,
    owner: Option<OwnerObject>,
    tracks: Option<TrackCount>,
    #[serde(default)]
    images: Option<Vec<ImageObject>>,
}

#[derive(Default, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: String,
}

#[derive(Deserialize)]
struct OwnerObject {
    id: String,
}

#[derive(Deserialize)]
struct TrackCount {
    #[serde(default)]
    total: usize,
}

#[derive(Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Deserialize)]
struct PlaylistsResponse {
    #[serde(default)]
    items: Vec<Option<PlaylistObject>>,
    #[serde(default)]
    total: usize,
    next: Option<String>,
}

#[derive(Serialize)]
struct CreatePlaylistBody<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
}

#[derive(Serialize)]
struct UrisBody {
    uris: Vec<String>,
}

#[derive(Serialize)]
struct DetailsBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

fn library_page(payload: SavedTracksResponse, offset: usize) -> LibraryPage {
    let received = payload.items.len();
    let tracks = payload
        .items
        .into_iter()
        .filter_map(|item| {
            let track = item.track?;
            Some(Track {
                id: track.id?,
                name: track.name,
                artists: track
                    .artists
                    .into_iter()
                    .filter_map(artist_from)
                    .collect(),
                genres: Vec::new(),
                added_at: Some(item.added_at),
            })
        })
        .collect();
    LibraryPage {
        tracks,
        total: payload.total,
        next: payload
            .next
            .filter(|_| received > 0)
            .map(|_| offset + received),
    }
}

fn artist_from(artist: ArtistObject) -> Option<Artist> {
    Some(Artist {
        id: artist.id?,
        name: artist.name,
        genres: artist.genres,
    })
}

fn playlist_summary(playlist: PlaylistObject) -> Option<PlaylistSummary> {
    let owner_id = playlist.owner?.id;
    Some(PlaylistSummary {
        id: playlist.id,
        name: playlist.name,
        url: playlist.external_urls.spotify,
        owner_id,
        track_count: playlist.tracks.map(|tracks| tracks.total).unwrap_or(0),
        image_url: playlist
            .images
            .and_then(|images| images.into_iter().next())
            .map(|image| image.url),
    })
}

fn playlist_page(payload: PlaylistsResponse, owner_id: &str, offset: usize) -> PlaylistPage {
    let received = payload.items.len();
    let playlists = payload
        .items
        .into_iter()
        .flatten()
        .filter_map(playlist_summary)
        .filter(|playlist| playlist.owner_id == owner_id)
        .collect();
    PlaylistPage {
        playlists,
        total: payload.total,
        next: payload
            .next
            .filter(|_| received > 0)
            .map(|_| offset + received),
    }
}

fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

impl Catalog for ExternalCatalog {
    async fn fetch_library_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<LibraryPage, CatalogError> {
        let request = self
            .request(Method::GET, "/me/tracks")
            .query(&[("offset", offset), ("limit", limit)]);
        let payload: SavedTracksResponse = self.send_json(request).await?;
        Ok(library_page(payload, offset))
    }

    async fn fetch_artist_genres(
        &self,
        artist_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, CatalogError> {
        if artist_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let request = self
            .request(Method::GET, "/artists")
            .query(&[("ids", artist_ids.join(","))]);
        let payload: ArtistsResponse = self.send_json(request).await?;
        Ok(payload
            .artists
            .into_iter()
            .flatten()
            .filter_map(artist_from)
            .map(|artist| (artist.id, artist.genres))
            .collect())
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistRef, CatalogError> {
        let path = format!("/users/{}/playlists", url_escape(owner_id));
        let request = self.request(Method::POST, &path).json(&CreatePlaylistBody {
            name,
            description,
            public: false,
        });
        let created: PlaylistObject = self.send_json(request).await?;
        debug!(playlist_id = %created.id, name, "playlist created");
        Ok(PlaylistRef {
            id: created.id,
            name: created.name,
            url: created.external_urls.spotify,
        })
    }

    async fn find_playlist_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<PlaylistRef>, CatalogError> {
        let mut offset = 0usize;
        loop {
            let page = self
                .list_owned_playlists(owner_id, offset, PLAYLIST_PAGE_SIZE)
                .await?;
            if let Some(found) = page.playlists.into_iter().find(|p| p.name == name) {
                return Ok(Some(PlaylistRef {
                    id: found.id,
                    name: found.name,
                    url: found.url,
                }));
            }
            match page.next {
                Some(next) if next > offset => offset = next,
                _ => return Ok(None),
            }
        }
    }

    async fn clear_playlist(&self, playlist_id: &str) -> Result<(), CatalogError> {
        let path = format!("/playlists/{}/tracks", url_escape(playlist_id));
        let request = self
            .request(Method::PUT, &path)
            .json(&UrisBody { uris: Vec::new() });
        self.send(request).await?;
        Ok(())
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), CatalogError> {
        if track_ids.is_empty() {
            return Ok(());
        }
        let path = format!("/playlists/{}/tracks", url_escape(playlist_id));
        let uris = track_ids.iter().map(|id| track_uri(id)).collect();
        let request = self.request(Method::POST, &path).json(&UrisBody { uris });
        self.send(request).await?;
        Ok(())
    }

    async fn list_owned_playlists(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<PlaylistPage, CatalogError> {
        let request = self
            .request(Method::GET, "/me/playlists")
            .query(&[("offset", offset), ("limit", limit)]);
        let payload: PlaylistsResponse = self.send_json(request).await?;
        Ok(playlist_page(payload, owner_id, offset))
    }

    async fn update_playlist_details(
        &self,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), CatalogError> {
        if name.is_none() && description.is_none() {
            return Ok(());
        }
        let path = format!("/playlists/{}", url_escape(playlist_id));
        let request = self
            .request(Method::PUT, &path)
            .json(&DetailsBody { name, description });
        self.send(request).await?;
        Ok(())
    }
}
