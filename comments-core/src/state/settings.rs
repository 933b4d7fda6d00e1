//! Global UI settings: current user, active tab, comments on/off.

use shared_types::Author;

use crate::state::actions::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsState {
    pub user: Option<Author>,
    pub current_tab: Option<String>,
    pub comments_enabled: bool,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            user: None,
            current_tab: None,
            comments_enabled: true,
        }
    }
}

/// Typed key/value patch; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub user: Option<Option<Author>>,
    pub current_tab: Option<Option<String>>,
    pub comments_enabled: Option<bool>,
}

pub fn settings_reducer(state: &SettingsState, action: &Action) -> SettingsState {
    let Action::UpdateGlobalSettings(update) = action else {
        return state.clone();
    };

    let mut next = state.clone();
    if let Some(user) = &update.user {
        next.user = user.clone();
    }
    if let Some(current_tab) = &update.current_tab {
        next.current_tab = current_tab.clone();
    }
    if let Some(comments_enabled) = update.comments_enabled {
        next.comments_enabled = comments_enabled;
    }
    next
}
