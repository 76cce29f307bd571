use qifa_shared::{PreferenceKey, Preferences};

use crate::store::AppStore;

impl AppStore {
    /// Flip one preference and return the new set.
    pub fn toggle_preference(&mut self, key: PreferenceKey) -> Preferences {
        self.state.preferences.toggle(key);
        tracing::debug!(?key, "preference toggled");
        self.persist();
        self.state.preferences
    }
}
