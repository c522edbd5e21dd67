//! Settings Service

use crate::db::sqlite::{Settings, SettingsUpdate};
use crate::error::Result;
use crate::state::AppState;

pub struct SettingsService;

impl SettingsService {
    pub fn get_settings(state: &AppState) -> Result<Settings> {
        state.sqlite.get_settings()
    }

    /// Persist a partial update and push it into the running components
    pub fn update_settings(state: &AppState, update: SettingsUpdate) -> Result<Settings> {
        let feed_changed = update.quote_feed_url.is_some() || update.request_timeout_secs.is_some();
        let settings = state.sqlite.update_settings(update)?;
        state.apply_settings(&settings, feed_changed)?;
        Ok(settings)
    }
}
