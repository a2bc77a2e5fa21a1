//! Error type shared by the preference store, the profile tree and storage

use std::path::Path;
use thiserror::Error;

/// Failures surfaced by configuration operations.
///
/// None of these are retried internally. Every variant leaves the live
/// in-memory state exactly as it was before the failing call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Backing file could not be read, parsed or written
    #[error("persistence error at {location}: {message}")]
    Persistence { location: String, message: String },

    /// Nothing stored yet at the requested location
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed update payload or field value
    #[error("invalid value for '{key}': {reason}")]
    Validation { key: String, reason: String },

    /// Two siblings in the same group would share a name
    #[error("a node named '{name}' already exists in '{parent}'")]
    DuplicateName { parent: String, name: String },

    /// Leaf without an address/port, or a group carrying connection fields
    #[error("invalid node '{node}': {reason}")]
    InvalidNode { node: String, reason: String },

    /// Re-parenting that would place a node under itself
    #[error("cannot move '{node}' into its own subtree '{target}'")]
    Cycle { node: String, target: String },
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_node(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNode {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub fn persistence(location: impl AsRef<Path>, err: impl std::fmt::Display) -> Self {
        Self::Persistence {
            location: location.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
