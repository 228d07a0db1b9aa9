//! External collaborator clients: preference storage and weapon config

pub mod preferences;
pub mod weapons;

pub use preferences::{PlayerPreferences, PreferenceStore};
pub use weapons::WeaponConfigSource;
