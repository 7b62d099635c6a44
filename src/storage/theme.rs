use super::ExpiringStore;
use crate::types::Result;
use crate::types::constants::THEME_KEY;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl ExpiringStore {
    /// Saved theme preference, falling back to light.
    pub fn theme(&self) -> Theme {
        self.get(THEME_KEY).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.set(THEME_KEY, &theme, None)
    }

    /// Flips the saved theme and returns the new one.
    pub fn toggle_theme(&self) -> Result<Theme> {
        let theme = self.theme().toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }
}
