//! Application-wide constants
//!
//! File names, factory defaults and validation bounds live here so the
//! stores, the profile tree and the CLI agree on a single value.

/// On-disk layout of the configuration directory
pub mod config {
    /// Directory created under the platform config dir
    pub const APP_DIR: &str = "wrdm";

    /// Environment variable overriding the whole config directory
    pub const DIR_ENV: &str = "WRDM_CONFIG_DIR";

    pub const PREFERENCES_FILE: &str = "preferences.toml";

    pub const CONNECTIONS_FILE: &str = "connections.toml";

    /// Suffix for the scratch file written before an atomic rename
    pub const TEMP_SUFFIX: &str = "tmp";
}

/// Factory preference values (restored by `restore`)
pub mod preferences {
    pub const LANGUAGE: &str = "en";
    pub const FONT_SIZE: u16 = 14;
    pub const ASIDE_WIDTH: u16 = 300;
}

/// Values a freshly created connection profile starts with
pub mod connection {
    pub const ADDR: &str = "127.0.0.1";
    pub const PORT: u16 = 6379;
    pub const DEFAULT_FILTER: &str = "*";
    pub const KEY_SEPARATOR: &str = ":";

    /// Seconds
    pub const CONN_TIMEOUT: u32 = 60;

    /// Seconds
    pub const EXEC_TIMEOUT: u32 = 60;

    /// Separator between sibling names in a node path ("group/server")
    pub const PATH_SEPARATOR: char = '/';
}

/// Font discovery
pub mod font {
    /// Families starting with this marker are hidden system faces
    pub const HIDDEN_MARKER: char = '.';
}

/// Bounds enforced on preference updates
pub mod validation {
    pub const MIN_FONT_SIZE: u16 = 8;
    pub const MAX_FONT_SIZE: u16 = 64;
    pub const MIN_ASIDE_WIDTH: u16 = 100;
    pub const MAX_ASIDE_WIDTH: u16 = 1200;
    pub const MIN_LANGUAGE_LEN: usize = 2;
    pub const MAX_LANGUAGE_LEN: usize = 16;
}
