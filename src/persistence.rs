//! Durable storage for configuration values
//!
//! `Storage` is the seam to the backing medium. `TomlFile` is the production
//! implementation; `Persisted` wraps any storage with the lazy-load and
//! copy-apply-save-swap transaction both stores are built on.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

use crate::constants::config::TEMP_SUFFIX;
use crate::error::{ConfigError, Result};

/// Backing medium for one configuration value
pub trait Storage<T>: Send + Sync {
    /// Read the stored value. Returns `ConfigError::NotFound` when nothing
    /// has been saved yet.
    fn load(&self) -> Result<T>;

    fn save(&self, value: &T) -> Result<()>;
}

/// A value stored as a pretty-printed TOML document
#[derive(Debug)]
pub struct TomlFile<T> {
    path: PathBuf,
    _value: PhantomData<fn() -> T>,
}

impl<T> TomlFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _value: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Storage<T> for TomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<T> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(ConfigError::persistence(&self.path, e)),
        };

        let value = toml::from_str(&contents).map_err(|e| {
            ConfigError::persistence(&self.path, format!("failed to parse TOML: {e}"))
        })?;
        debug!(path = %self.path.display(), "Loaded config file");
        Ok(value)
    }

    /// Written to a sibling scratch file first and renamed over the target,
    /// so readers of the file never see half a document.
    fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::persistence(parent, e))?;
        }

        let contents = toml::to_string_pretty(value).map_err(|e| {
            ConfigError::persistence(&self.path, format!("failed to serialize TOML: {e}"))
        })?;

        let scratch = self.path.with_extension(TEMP_SUFFIX);
        fs::write(&scratch, contents).map_err(|e| ConfigError::persistence(&scratch, e))?;
        fs::rename(&scratch, &self.path).map_err(|e| {
            let _ = fs::remove_file(&scratch);
            ConfigError::persistence(&self.path, e)
        })?;

        info!(path = %self.path.display(), "Saved config file");
        Ok(())
    }
}

struct Slot<T> {
    value: RwLock<T>,
    /// Set when the backing medium existed but could not be read or failed
    /// the value check; writes are refused until a full `replace` succeeds
    /// so the file is not clobbered.
    load_error: Mutex<Option<String>>,
}

/// A lazily loaded, storage-backed value.
///
/// The first access of any kind runs `Storage::load` exactly once, even under
/// concurrent first use. Writers are serialized; each write works on a copy,
/// persists it and only then swaps it in, so readers observe either the old
/// or the new value and a failed write changes nothing.
pub struct Persisted<T, S> {
    storage: S,
    /// Run on the loaded value; a failure is treated like an unreadable store
    check: fn(&T) -> Result<()>,
    slot: OnceLock<Slot<T>>,
    writer: Mutex<()>,
}

fn accept_any<T>(_: &T) -> Result<()> {
    Ok(())
}

impl<T, S> Persisted<T, S>
where
    T: Clone + Default,
    S: Storage<T>,
{
    pub fn new(storage: S) -> Self {
        Self::with_check(storage, accept_any::<T>)
    }

    /// Like `new`, but a stored value that fails `check` is not served
    pub fn with_check(storage: S, check: fn(&T) -> Result<()>) -> Self {
        Self {
            storage,
            check,
            slot: OnceLock::new(),
            writer: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn slot(&self) -> &Slot<T> {
        self.slot.get_or_init(|| {
            let loaded = self.storage.load().and_then(|value| {
                (self.check)(&value)?;
                Ok(value)
            });
            let (value, load_error) = match loaded {
                Ok(value) => (value, None),
                Err(ConfigError::NotFound(location)) => {
                    info!(location = %location, "No stored value, starting from defaults");
                    (T::default(), None)
                }
                Err(e) => {
                    error!(error = %e, "Failed to load stored value, using defaults until restored");
                    (T::default(), Some(e.to_string()))
                }
            };
            Slot {
                value: RwLock::new(value),
                load_error: Mutex::new(load_error),
            }
        })
    }

    /// Copy of the current value
    pub fn snapshot(&self) -> T {
        self.read(T::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self
            .slot()
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Apply `f` to a copy of the value, persist the copy, then publish it.
    ///
    /// If `f` or the save fails the live value is untouched.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<(T, R)> {
        let slot = self.slot();
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(reason) = slot
            .load_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            warn!(reason = %reason, "Refusing to overwrite unreadable stored value");
            return Err(ConfigError::Persistence {
                location: "stored value".to_string(),
                message: format!("unreadable, restore defaults first: {reason}"),
            });
        }

        let mut next = self.snapshot();
        let output = f(&mut next)?;
        self.storage.save(&next)?;
        *slot.value.write().unwrap_or_else(PoisonError::into_inner) = next.clone();
        Ok((next, output))
    }

    /// Persist `value` and publish it wholesale. Clears a previous load error.
    pub fn replace(&self, value: T) -> Result<T> {
        let slot = self.slot();
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        self.storage.save(&value)?;
        *slot.value.write().unwrap_or_else(PoisonError::into_inner) = value.clone();
        slot.load_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(value)
    }
}
