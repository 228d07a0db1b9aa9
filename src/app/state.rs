//! Application state shared across routes

use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::game::{GameWorld, WorldHandle};
use crate::identity::IdentityService;
use crate::store::{PreferenceStore, WeaponConfigSource};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: WorldHandle,
}

impl AppState {
    /// Wire collaborators and build the world. The returned [`GameWorld`]
    /// owns all simulation state; the caller spawns its run loop.
    pub fn new(config: Config) -> (Self, GameWorld) {
        let config = Arc::new(config);

        let identity = IdentityService::new(config.identity_secret.clone());

        let preferences = PreferenceStore::new(
            config.preferences_url.clone(),
            config.preferences_api_key.clone(),
        );

        // A bad weapon config file degrades to the default loadout rather
        // than refusing to start
        let weapons = match WeaponConfigSource::load(config.weapon_config_path.as_deref()) {
            Ok(weapons) => weapons,
            Err(e) => {
                warn!(error = %e, "Weapon config unavailable, using default loadout");
                WeaponConfigSource::default()
            }
        };

        let (world, handle) =
            GameWorld::new(config.clone(), identity, preferences, Arc::new(weapons));

        (
            Self {
                config,
                world: handle,
            },
            world,
        )
    }
}
