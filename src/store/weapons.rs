//! Weapon mount configuration per ship variant
//!
//! Loadouts come from an optional JSON file mapping variant keys to mount
//! lists, loaded once at startup and cached; unknown variants fall back to
//! the built-in default loadout so a missing or bad config never blocks
//! gameplay.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::game::guns::WeaponMount;

/// Variant-keyed weapon mount source
pub struct WeaponConfigSource {
    variants: DashMap<String, Arc<Vec<WeaponMount>>>,
    default_loadout: Arc<Vec<WeaponMount>>,
}

impl WeaponConfigSource {
    /// Load variant loadouts from a JSON file. A `None` path yields a
    /// source that always serves the default loadout.
    pub fn load(path: Option<&str>) -> Result<Self, WeaponConfigError> {
        let source = Self::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)?;
            source.load_json(&text)?;
            info!(path, variants = source.variants.len(), "Loaded weapon config");
        }
        Ok(source)
    }

    /// Parse and cache a variant map from JSON text
    pub fn load_json(&self, text: &str) -> Result<(), WeaponConfigError> {
        let map: HashMap<String, Vec<WeaponMount>> = serde_json::from_str(text)?;
        for (variant, mounts) in map {
            self.variants.insert(variant, Arc::new(mounts));
        }
        Ok(())
    }

    /// Mounts for a variant, or the default loadout when unknown
    pub fn for_variant(&self, variant: &str) -> Arc<Vec<WeaponMount>> {
        self.variants
            .get(variant)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.default_loadout.clone())
    }

    fn default_mounts() -> Vec<WeaponMount> {
        vec![WeaponMount {
            id: "nose".to_string(),
            x: 12.0,
            y: 0.0,
            rotation: 0.0,
            fire_rate: 200,
            projectile_speed: 300.0,
            projectile_lifetime: 3000,
            damage: 10.0,
            spread: 0.0,
        }]
    }
}

impl Default for WeaponConfigSource {
    fn default() -> Self {
        Self {
            variants: DashMap::new(),
            default_loadout: Arc::new(Self::default_mounts()),
        }
    }
}

/// Weapon config errors
#[derive(Debug, thiserror::Error)]
pub enum WeaponConfigError {
    #[error("Failed to read weapon config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse weapon config: {0}")]
    Parse(#[from] serde_json::Error),
}
