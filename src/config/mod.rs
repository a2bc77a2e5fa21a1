//! Configuration data model
//!
//! - **preferences**: the user preference schema and partial updates
//! - **connection**: connection profile types (tree node, wire shape, flat group)
//! - **profile**: the saved-connection tree and its mutation rules
//! - **paths**: where the configuration files live

pub mod connection;
pub mod paths;
pub mod preferences;
pub mod profile;

// Re-export commonly used types
pub use connection::{Connection, ConnectionConfig, ConnectionDB, ConnectionGroup, ProfileNode};
pub use paths::AppPaths;
pub use preferences::{PreferenceSet, PreferenceUpdate, Theme};
pub use profile::ConnectionProfiles;
