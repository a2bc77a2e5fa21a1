//! Local configuration for the wrdm database client: user preferences, saved
//! connection profiles and host font discovery.

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod font_discovery;
pub mod persistence;
pub mod response;
pub mod store;

pub use app::App;
pub use error::{ConfigError, Result};
pub use response::Response;
