//! Preference store: read, merge-write and restore of the user preference set

use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::info;

use crate::config::{AppPaths, PreferenceSet, PreferenceUpdate};
use crate::error::Result;
use crate::persistence::{Persisted, Storage, TomlFile};

pub struct PreferenceStore<S = TomlFile<PreferenceSet>> {
    cell: Persisted<PreferenceSet, S>,
}

impl PreferenceStore {
    /// Store backed by `preferences.toml` in the config directory
    pub fn open(paths: &AppPaths) -> Self {
        Self::new(TomlFile::new(paths.preferences()))
    }
}

impl<S> PreferenceStore<S>
where
    S: Storage<PreferenceSet>,
{
    pub fn new(storage: S) -> Self {
        Self {
            cell: Persisted::new(storage),
        }
    }

    pub fn storage(&self) -> &S {
        self.cell.storage()
    }

    /// Current preferences. Loads from storage on first use; a missing or
    /// unreadable file yields the factory defaults.
    pub fn get(&self) -> PreferenceSet {
        self.cell.snapshot()
    }

    /// Merge a flat `section.field` map into the stored preferences.
    /// Unknown keys and invalid values are rejected before anything is written.
    pub fn set(&self, values: &Map<String, Value>) -> Result<PreferenceSet> {
        let update = PreferenceUpdate::from_flat(values)?;
        self.apply(&update)
    }

    pub fn apply(&self, update: &PreferenceUpdate) -> Result<PreferenceSet> {
        update.validate()?;
        let (prefs, ()) = self.cell.update(|prefs| {
            update.apply(prefs);
            Ok(())
        })?;
        info!("Preferences updated");
        Ok(prefs)
    }

    /// Replace everything with the factory defaults and persist them
    pub fn restore(&self) -> Result<PreferenceSet> {
        let prefs = self.cell.replace(PreferenceSet::default())?;
        info!("Preferences restored to defaults");
        Ok(prefs)
    }
}

static GLOBAL: OnceLock<PreferenceStore> = OnceLock::new();

/// Process-wide store for hosts that cannot pass one down from `App`.
/// Built once from the default paths, however many threads race to it.
pub fn global() -> &'static PreferenceStore {
    GLOBAL.get_or_init(|| {
        let store = PreferenceStore::open(&AppPaths::resolve(None));
        info!(path = %store.storage().path().display(), "Initializing global preference store");
        store
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;
    use crate::error::ConfigError;
    use crate::persistence::testing::MemoryStorage;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::thread;

    fn flat(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn memory_store() -> PreferenceStore<MemoryStorage<PreferenceSet>> {
        PreferenceStore::new(MemoryStorage::empty())
    }

    #[test]
    fn test_get_without_stored_value_returns_defaults() {
        let store = memory_store();
        assert_eq!(store.get(), PreferenceSet::default());
    }

    #[test]
    fn test_set_merges_and_persists() {
        let store = memory_store();
        store.set(&flat(json!({ "general.theme": "dark" }))).unwrap();
        let prefs = store.set(&flat(json!({ "editor.font_size": 20 }))).unwrap();

        assert_eq!(prefs.general.theme, Theme::Dark);
        assert_eq!(prefs.editor.font_size, 20);
        assert_eq!(store.get(), prefs);
        assert_eq!(store.storage().stored.lock().unwrap().clone(), Some(prefs));
    }

    #[test]
    fn test_invalid_update_leaves_state_unchanged() {
        let store = memory_store();
        store.set(&flat(json!({ "general.font_size": 18 }))).unwrap();

        let err = store
            .set(&flat(json!({ "general.font_size": 16, "general.bogus": true })))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert_eq!(store.get().general.font_size, 18);
    }

    #[test]
    fn test_persistence_failure_leaves_state_unchanged() {
        let store = memory_store();
        store.storage().set_fail_saves(true);

        let err = store.set(&flat(json!({ "general.theme": "dark" }))).unwrap_err();
        assert!(matches!(err, ConfigError::Persistence { .. }));
        assert_eq!(store.get().general.theme, Theme::Light);
    }

    #[test]
    fn test_restore_is_idempotent() {
        let store = memory_store();
        store
            .set(&flat(json!({ "general.theme": "auto", "general.aside_width": 500 })))
            .unwrap();

        let first = store.restore().unwrap();
        let second = store.restore().unwrap();
        assert_eq!(first, PreferenceSet::default());
        assert_eq!(first, second);
        assert_eq!(store.get(), PreferenceSet::default());
    }

    #[test]
    fn test_restore_failure_keeps_current() {
        let store = memory_store();
        store.set(&flat(json!({ "general.theme": "dark" }))).unwrap();
        store.storage().set_fail_saves(true);

        assert!(store.restore().is_err());
        assert_eq!(store.get().general.theme, Theme::Dark);
    }

    #[test]
    fn test_concurrent_first_access_single_instance_single_load() {
        static STORE: OnceLock<PreferenceStore<MemoryStorage<PreferenceSet>>> = OnceLock::new();

        let handles: Vec<_> = (0..12)
            .map(|_| {
                thread::spawn(|| {
                    let store = STORE.get_or_init(memory_store);
                    let _ = store.get();
                    store as *const _ as usize
                })
            })
            .collect();

        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(STORE.get().unwrap().storage().loads(), 1);
    }

    #[test]
    fn test_readers_never_see_torn_writes() {
        let store = Arc::new(memory_store());

        let writers: Vec<_> = (0..4u16)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25u16 {
                        let size = 8 + (w * 25 + i) % 50;
                        if i % 10 == 9 {
                            store.restore().unwrap();
                        } else {
                            store
                                .set(&flat(json!({
                                    "general.font_size": size,
                                    "editor.font_size": size
                                })))
                                .unwrap();
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    let prefs = store.get();
                    assert_eq!(prefs.general.font_size, prefs.editor.font_size);
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();
        assert!(store.storage().saves.load(Ordering::SeqCst) >= 100);
    }
}
