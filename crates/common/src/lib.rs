use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const GENRE_TOKEN: &str = "{genre}";
pub const YEAR_TOKEN: &str = "{year}";

const DEFAULT_NAME_TEMPLATE: &str = "{genre} by Organizer";
const DEFAULT_DESCRIPTION_TEMPLATE: &str = "Organized by Genre Organizer";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Union of the artists' micro-genres once the track has been enriched.
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub added_at: Option<OffsetDateTime>,
}

impl Track {
    pub fn added_after(&self, threshold: OffsetDateTime) -> bool {
        matches!(self.added_at, Some(added_at) if added_at > threshold)
    }
}

/// The closed set of buckets every track is filed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParentGenre {
    Rock,
    Pop,
    #[serde(rename = "Hip-Hop")]
    HipHop,
    Electronic,
    #[serde(rename = "R&B")]
    RnB,
    Jazz,
    Classical,
    Country,
    Metal,
    Folk,
    Latin,
    Blues,
    Reggae,
    Punk,
    Indie,
    Soul,
    Funk,
    World,
    Other,
}

impl ParentGenre {
    pub const COUNT: usize = 19;

    pub const ALL: [ParentGenre; ParentGenre::COUNT] = [
        ParentGenre::Rock,
        ParentGenre::Pop,
        ParentGenre::HipHop,
        ParentGenre::Electronic,
        ParentGenre::RnB,
        ParentGenre::Jazz,
        ParentGenre::Classical,
        ParentGenre::Country,
        ParentGenre::Metal,
        ParentGenre::Folk,
        ParentGenre::Latin,
        ParentGenre::Blues,
        ParentGenre::Reggae,
        ParentGenre::Punk,
        ParentGenre::Indie,
        ParentGenre::Soul,
        ParentGenre::Funk,
        ParentGenre::World,
        ParentGenre::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParentGenre::Rock => "Rock",
            ParentGenre::Pop => "Pop",
            ParentGenre::HipHop => "Hip-Hop",
            ParentGenre::Electronic => "Electronic",
            ParentGenre::RnB => "R&B",
            ParentGenre::Jazz => "Jazz",
            ParentGenre::Classical => "Classical",
            ParentGenre::Country => "Country",
            ParentGenre::Metal => "Metal",
            ParentGenre::Folk => "Folk",
            ParentGenre::Latin => "Latin",
            ParentGenre::Blues => "Blues",
            ParentGenre::Reggae => "Reggae",
            ParentGenre::Punk => "Punk",
            ParentGenre::Indie => "Indie",
            ParentGenre::Soul => "Soul",
            ParentGenre::Funk => "Funk",
            ParentGenre::World => "World",
            ParentGenre::Other => "Other",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        ParentGenre::ALL
            .iter()
            .copied()
            .find(|genre| genre.name().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for ParentGenre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub owner_id: String,
    pub track_count: usize,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Persisted link between a catalog playlist and the genre it holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistAssignment {
    pub user_id: String,
    pub playlist_id: String,
    #[serde(default)]
    pub genre: Option<ParentGenre>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_synced_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub custom_description: Option<String>,
}

impl PlaylistAssignment {
    pub fn new(user_id: &str, playlist_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            playlist_id: playlist_id.to_string(),
            genre: None,
            last_synced_at: None,
            custom_name: None,
            custom_description: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub name_template: String,
    pub description_template: String,
    #[serde(default)]
    pub is_premium: bool,
}

impl UserSettings {
    pub fn defaults(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name_template: DEFAULT_NAME_TEMPLATE.to_string(),
            description_template: DEFAULT_DESCRIPTION_TEMPLATE.to_string(),
            is_premium: false,
        }
    }

    pub fn build_playlist_name(&self, genre: ParentGenre, year: i32) -> String {
        render_template(&self.name_template, genre, year)
    }

    pub fn build_description(&self, genre: ParentGenre, year: i32) -> String {
        render_template(&self.description_template, genre, year)
    }
}

pub fn is_valid_name_template(template: &str) -> bool {
    template.contains(GENRE_TOKEN)
}

pub fn render_template(template: &str, genre: ParentGenre, year: i32) -> String {
    template
        .replace(GENRE_TOKEN, genre.name())
        .replace(YEAR_TOKEN, &year.to_string())
}
