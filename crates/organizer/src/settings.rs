use common::{is_valid_name_template, UserSettings};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::OrganizerError;
use crate::store::SettingsStore;
use crate::Organizer;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub name_template: String,
    #[serde(default)]
    pub description_template: String,
}

impl<S: SettingsStore> Organizer<S> {
    pub fn settings(&self, user_id: &str) -> Result<UserSettings, OrganizerError> {
        self.store
            .user_settings(user_id)
            .map_err(OrganizerError::store)
    }

    /// Replaces both templates. The name template must keep `{genre}` so
    /// playlists stay distinguishable.
    pub fn update_settings(
        &self,
        user_id: &str,
        update: SettingsUpdate,
    ) -> Result<UserSettings, OrganizerError> {
        if !is_valid_name_template(&update.name_template) {
            return Err(OrganizerError::InvalidTemplate(update.name_template));
        }
        let mut settings = self.settings(user_id)?;
        settings.name_template = update.name_template;
        settings.description_template = update.description_template;
        self.store
            .save_user_settings(&settings)
            .map_err(OrganizerError::store)?;
        info!(user_id, "settings updated");
        Ok(settings)
    }
}
