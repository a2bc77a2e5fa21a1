//! User preference schema
//!
//! `PreferenceSet` is the full stored value. `PreferenceUpdate` is the
//! partial-update payload: every field optional, every field validated, and
//! unknown keys rejected rather than ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::constants::preferences as defaults;
use crate::constants::validation::*;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the host's light/dark setting
    Auto,
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            other => Err(ConfigError::validation(
                "general.theme",
                format!("expected one of light, dark, auto; got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        })
    }
}

/// Complete preference set as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreferenceSet {
    #[serde(default)]
    pub general: GeneralPreferences,
    #[serde(default)]
    pub editor: EditorPreferences,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralPreferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_language")]
    pub language: String,
    /// Font family for the UI; empty means the toolkit default
    #[serde(default)]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
    #[serde(default)]
    pub use_sys_proxy: bool,
    #[serde(default)]
    pub use_sys_proxy_http: bool,
    #[serde(default)]
    pub check_update: bool,
    /// Width of the connection sidebar in pixels
    #[serde(default = "default_aside_width")]
    pub aside_width: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPreferences {
    #[serde(default)]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
}

fn default_language() -> String {
    defaults::LANGUAGE.to_string()
}

fn default_font_size() -> u16 {
    defaults::FONT_SIZE
}

fn default_aside_width() -> u16 {
    defaults::ASIDE_WIDTH
}

impl Default for GeneralPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: default_language(),
            font: String::new(),
            font_size: default_font_size(),
            use_sys_proxy: false,
            use_sys_proxy_http: false,
            check_update: false,
            aside_width: default_aside_width(),
        }
    }
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            font: String::new(),
            font_size: default_font_size(),
        }
    }
}

/// Partial update: `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub general: GeneralUpdate,
    pub editor: EditorUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralUpdate {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub font: Option<String>,
    pub font_size: Option<u16>,
    pub use_sys_proxy: Option<bool>,
    pub use_sys_proxy_http: Option<bool>,
    pub check_update: Option<bool>,
    pub aside_width: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorUpdate {
    pub font: Option<String>,
    pub font_size: Option<u16>,
}

/// Keys whose values are strings
const TEXT_KEYS: [&str; 4] = [
    "general.theme",
    "general.language",
    "general.font",
    "editor.font",
];

impl PreferenceUpdate {
    pub fn is_text_key(key: &str) -> bool {
        TEXT_KEYS.contains(&key)
    }

    /// Parse a flat map of dotted keys (`"general.font_size": 16`).
    ///
    /// A section may also be given as a nested object
    /// (`"editor": {"font": "Fira Code"}`); both spellings can be mixed.
    pub fn from_flat(values: &Map<String, Value>) -> Result<Self> {
        let mut update = PreferenceUpdate::default();
        for (key, value) in values {
            match value {
                Value::Object(section) if !key.contains('.') => {
                    for (field, value) in section {
                        update.set_field(&format!("{key}.{field}"), value)?;
                    }
                }
                _ => update.set_field(key, value)?,
            }
        }
        update.validate()?;
        Ok(update)
    }

    fn set_field(&mut self, key: &str, value: &Value) -> Result<()> {
        match key {
            "general.theme" => self.general.theme = Some(expect_str(key, value)?.parse()?),
            "general.language" => {
                self.general.language = Some(expect_str(key, value)?.trim().to_lowercase())
            }
            "general.font" => self.general.font = Some(expect_str(key, value)?.to_string()),
            "general.font_size" => self.general.font_size = Some(expect_u16(key, value)?),
            "general.use_sys_proxy" => self.general.use_sys_proxy = Some(expect_bool(key, value)?),
            "general.use_sys_proxy_http" => {
                self.general.use_sys_proxy_http = Some(expect_bool(key, value)?)
            }
            "general.check_update" => self.general.check_update = Some(expect_bool(key, value)?),
            "general.aside_width" => self.general.aside_width = Some(expect_u16(key, value)?),
            "editor.font" => self.editor.font = Some(expect_str(key, value)?.to_string()),
            "editor.font_size" => self.editor.font_size = Some(expect_u16(key, value)?),
            _ => return Err(ConfigError::validation(key, "unknown preference key")),
        }
        Ok(())
    }

    /// Range and format checks for every field that is set
    pub fn validate(&self) -> Result<()> {
        if let Some(language) = &self.general.language {
            let valid_chars = language
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
            if !valid_chars || !(MIN_LANGUAGE_LEN..=MAX_LANGUAGE_LEN).contains(&language.len()) {
                return Err(ConfigError::validation(
                    "general.language",
                    format!("'{language}' is not a language tag"),
                ));
            }
        }
        if let Some(size) = self.general.font_size {
            check_range("general.font_size", size, MIN_FONT_SIZE, MAX_FONT_SIZE)?;
        }
        if let Some(size) = self.editor.font_size {
            check_range("editor.font_size", size, MIN_FONT_SIZE, MAX_FONT_SIZE)?;
        }
        if let Some(width) = self.general.aside_width {
            check_range("general.aside_width", width, MIN_ASIDE_WIDTH, MAX_ASIDE_WIDTH)?;
        }
        Ok(())
    }

    /// Combine two updates; fields set in `later` win
    pub fn merge(self, later: PreferenceUpdate) -> PreferenceUpdate {
        PreferenceUpdate {
            general: GeneralUpdate {
                theme: later.general.theme.or(self.general.theme),
                language: later.general.language.or(self.general.language),
                font: later.general.font.or(self.general.font),
                font_size: later.general.font_size.or(self.general.font_size),
                use_sys_proxy: later.general.use_sys_proxy.or(self.general.use_sys_proxy),
                use_sys_proxy_http: later
                    .general
                    .use_sys_proxy_http
                    .or(self.general.use_sys_proxy_http),
                check_update: later.general.check_update.or(self.general.check_update),
                aside_width: later.general.aside_width.or(self.general.aside_width),
            },
            editor: EditorUpdate {
                font: later.editor.font.or(self.editor.font),
                font_size: later.editor.font_size.or(self.editor.font_size),
            },
        }
    }

    /// Write every set field into `prefs`. Call `validate` first.
    pub fn apply(&self, prefs: &mut PreferenceSet) {
        let general = &mut prefs.general;
        if let Some(theme) = self.general.theme {
            general.theme = theme;
        }
        if let Some(language) = &self.general.language {
            general.language = language.clone();
        }
        if let Some(font) = &self.general.font {
            general.font = font.clone();
        }
        if let Some(size) = self.general.font_size {
            general.font_size = size;
        }
        if let Some(enabled) = self.general.use_sys_proxy {
            general.use_sys_proxy = enabled;
        }
        if let Some(enabled) = self.general.use_sys_proxy_http {
            general.use_sys_proxy_http = enabled;
        }
        if let Some(enabled) = self.general.check_update {
            general.check_update = enabled;
        }
        if let Some(width) = self.general.aside_width {
            general.aside_width = width;
        }

        if let Some(font) = &self.editor.font {
            prefs.editor.font = font.clone();
        }
        if let Some(size) = self.editor.font_size {
            prefs.editor.font_size = size;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == PreferenceUpdate::default()
    }
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ConfigError::validation(key, format!("expected a string, got {value}")))
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::validation(key, format!("expected a boolean, got {value}")))
}

/// Accepts whole floats too (`16.0`), since front ends often send numbers as doubles
fn expect_u16(key: &str, value: &Value) -> Result<u16> {
    let number = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| {
            ConfigError::validation(key, format!("expected a whole number, got {value}"))
        })?;
    u16::try_from(number)
        .map_err(|_| ConfigError::validation(key, format!("{number} is out of range")))
}

fn check_range(key: &str, value: u16, min: u16, max: u16) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::validation(
            key,
            format!("{value} is outside {min}..={max}"),
        ))
    }
}
