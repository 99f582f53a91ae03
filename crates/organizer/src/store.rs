use std::collections::BTreeMap;

use common::{PlaylistAssignment, UserSettings};

/// Per-user settings and playlist assignments, keyed storage only.
///
/// Upserts replace the whole row; concurrent writers to the same row are
/// last-writer-wins.
pub trait SettingsStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stored settings, or the defaults when the user has none yet.
    fn user_settings(&self, user_id: &str) -> Result<UserSettings, Self::Error>;

    fn save_user_settings(&self, settings: &UserSettings) -> Result<(), Self::Error>;

    fn playlist_assignments(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, PlaylistAssignment>, Self::Error>;

    fn playlist_assignment(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<PlaylistAssignment>, Self::Error>;

    fn upsert_playlist_assignment(&self, assignment: &PlaylistAssignment)
        -> Result<(), Self::Error>;
}
