//! Composition root: one of each store, built from a config directory

use tracing::info;

use crate::config::AppPaths;
use crate::font_discovery::{FontItem, SystemFonts, list_fonts};
use crate::store::{PreferenceStore, ProfileStore};

pub struct App {
    paths: AppPaths,
    pub preferences: PreferenceStore,
    pub profiles: ProfileStore,
}

impl App {
    /// Stores are cheap to build; each file is read on first use
    pub fn open(paths: AppPaths) -> Self {
        info!(dir = %paths.dir().display(), "Opening configuration");
        Self {
            preferences: PreferenceStore::open(&paths),
            profiles: ProfileStore::open(&paths),
            paths,
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn fonts(&self) -> Vec<FontItem> {
        list_fonts(&SystemFonts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, PreferenceSet, Theme};
    use serde_json::json;

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let app = App::open(AppPaths::new(dir.path()));
        let values = json!({ "general.theme": "dark", "editor.font": "Hack" });
        app.preferences.set(values.as_object().unwrap()).unwrap();
        app.profiles.create_group("", "prod").unwrap();
        app.profiles
            .save_connection("prod", None, ConnectionConfig::new("db1"))
            .unwrap();
        drop(app);

        let reopened = App::open(AppPaths::new(dir.path()));
        let prefs = reopened.preferences.get();
        assert_eq!(prefs.general.theme, Theme::Dark);
        assert_eq!(prefs.editor.font, "Hack");
        assert!(reopened.profiles.get("prod/db1").is_ok());
        assert!(reopened.paths().preferences().exists());
        assert!(reopened.paths().connections().exists());
    }

    #[test]
    fn test_corrupt_preferences_fall_back_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());
        std::fs::write(paths.preferences(), "[general\ntheme = ").unwrap();

        let app = App::open(paths.clone());
        assert_eq!(app.preferences.get(), PreferenceSet::default());

        let values = json!({ "general.theme": "dark" });
        assert!(app.preferences.set(values.as_object().unwrap()).is_err());
        assert_eq!(
            std::fs::read_to_string(paths.preferences()).unwrap(),
            "[general\ntheme = "
        );

        app.preferences.restore().unwrap();
        assert!(app.preferences.set(values.as_object().unwrap()).is_ok());
    }
}
