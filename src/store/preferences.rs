//! HTTP client for the external preference store
//!
//! The store is an opaque key-value service keyed by an external account id
//! with an anonymous opaque id as fallback. It is never on the tick path:
//! callers fetch and save fire-and-forget, and any failure degrades to
//! defaults. When no base URL is configured the store is disabled and
//! every read yields defaults.

use std::collections::HashMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Variant key used when a player has no stored preference
pub const DEFAULT_VARIANT: &str = "spaceShips_001";

/// Stored per-player selections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPreferences {
    pub selected_variant: String,
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default)]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for PlayerPreferences {
    fn default() -> Self {
        Self {
            selected_variant: DEFAULT_VARIANT.to_string(),
            colors: HashMap::new(),
            last_updated: None,
        }
    }
}

/// Payload for saving preferences
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavePreferences<'a> {
    user_id: &'a str,
    username: &'a str,
    opaque_id: Option<&'a str>,
    selected_variant: &'a str,
    colors: &'a HashMap<String, String>,
}

/// Preference store client
#[derive(Clone)]
pub struct PreferenceStore {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl PreferenceStore {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// A store with persistence disabled; reads yield defaults, saves are
    /// no-ops.
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Fetch preferences by external user id, falling back to the opaque
    /// id. Any failure (store unreachable, bad payload) yields defaults.
    pub async fn get(&self, user_id: Option<&str>, opaque_id: Option<&str>) -> PlayerPreferences {
        let Some(base) = &self.base_url else {
            return PlayerPreferences::default();
        };

        for (param, key) in [("userId", user_id), ("opaqueId", opaque_id)] {
            let Some(key) = key else { continue };
            let url = format!("{}/preferences?{}={}", base, param, key);
            let mut request = self.client.get(&url);
            if let Some(api_key) = &self.api_key {
                request = request.bearer_auth(api_key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<PlayerPreferences>().await {
                        Ok(prefs) => return prefs,
                        Err(e) => {
                            warn!(error = %e, "Malformed preference payload, using defaults")
                        }
                    }
                }
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                    debug!(key, "No stored preferences");
                }
                Ok(response) => {
                    warn!(status = %response.status(), "Preference store error, using defaults")
                }
                Err(e) => warn!(error = %e, "Preference store unreachable, using defaults"),
            }
        }

        PlayerPreferences::default()
    }

    /// Persist a selection. Failures are reported to the caller, who logs
    /// and carries on; gameplay never depends on this succeeding.
    pub async fn save(
        &self,
        user_id: &str,
        username: &str,
        opaque_id: Option<&str>,
        selected_variant: &str,
        colors: &HashMap<String, String>,
    ) -> Result<(), PreferenceError> {
        let Some(base) = &self.base_url else {
            debug!("Preference store disabled, selection not persisted");
            return Ok(());
        };

        let url = format!("{}/preferences", base);
        let mut request = self.client.post(&url).json(&SavePreferences {
            user_id,
            username,
            opaque_id,
            selected_variant,
            colors,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(PreferenceError::Request)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PreferenceError::Api { status, body });
        }
        Ok(())
    }
}

/// Preference store errors
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_store_yields_defaults() {
        let store = PreferenceStore::disabled();
        let prefs = store.get(Some("user-1"), None).await;
        assert_eq!(prefs.selected_variant, DEFAULT_VARIANT);
        assert!(prefs.colors.is_empty());
    }

    #[tokio::test]
    async fn disabled_store_save_is_a_noop() {
        let store = PreferenceStore::disabled();
        let result = store
            .save("user-1", "Nova", None, "spaceShips_002", &HashMap::new())
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn preferences_parse_with_camel_case_fields() {
        let prefs: PlayerPreferences = serde_json::from_str(
            r##"{"selectedVariant":"spaceShips_003","colors":{"#AC3939":"#FF8A00"}}"##,
        )
        .unwrap();
        assert_eq!(prefs.selected_variant, "spaceShips_003");
        assert_eq!(prefs.colors.len(), 1);
    }
}
