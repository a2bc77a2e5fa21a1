//! Storage-backed stores handed to callers
//!
//! Both stores own their value exclusively. Callers get copies back, and every
//! change goes through a validated, persisted, all-or-nothing update.

pub mod preferences;
pub mod profiles;

pub use preferences::PreferenceStore;
pub use profiles::ProfileStore;
