//! The process-wide preference store. Runs in its own test binary because it
//! points `WRDM_CONFIG_DIR` at a scratch directory for the whole process.

use std::thread;

use wrdm_config::config::{PreferenceSet, Theme};
use wrdm_config::constants::config::DIR_ENV;
use wrdm_config::store::preferences::global;

#[test]
fn test_global_store_is_shared_and_uses_env_dir() {
    let dir = tempfile::tempdir().unwrap();
    // SAFETY: set before any thread of this test binary reads the environment
    unsafe { std::env::set_var(DIR_ENV, dir.path()) };

    let handles: Vec<_> = (0..12)
        .map(|_| {
            thread::spawn(|| {
                let store = global();
                assert_eq!(store.get(), PreferenceSet::default());
                store as *const _ as usize
            })
        })
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addresses.windows(2).all(|w| w[0] == w[1]));

    let store = global();
    assert!(store.storage().path().starts_with(dir.path()));

    let values = serde_json::json!({ "general.theme": "dark" });
    store.set(values.as_object().unwrap()).unwrap();
    assert!(dir.path().join("preferences.toml").exists());
    assert_eq!(global().get().general.theme, Theme::Dark);
}
