//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Sanitized input flags for one player. Every field is coerced from
/// whatever JSON the client sent: truthy becomes true, anything else false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputState {
    /// Thrust forward
    #[serde(deserialize_with = "truthy")]
    pub up: bool,
    /// Reverse thrust
    #[serde(deserialize_with = "truthy")]
    pub down: bool,
    /// Rotate left (legacy alias of rotate_left)
    #[serde(deserialize_with = "truthy")]
    pub left: bool,
    /// Rotate right (legacy alias of rotate_right)
    #[serde(deserialize_with = "truthy")]
    pub right: bool,
    #[serde(deserialize_with = "truthy")]
    pub rotate_left: bool,
    #[serde(deserialize_with = "truthy")]
    pub rotate_right: bool,
    #[serde(deserialize_with = "truthy")]
    pub fire: bool,
    #[serde(deserialize_with = "truthy")]
    pub boost: bool,
}

impl InputState {
    /// Net rotation direction: -1 left, 1 right, 0 when neither or both
    pub fn turn(&self) -> i8 {
        let left = self.left || self.rotate_left;
        let right = self.right || self.rotate_right;
        right as i8 - left as i8
    }
}

/// Profile fields shared by profile-update and variant-selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileFields {
    pub display_name: Option<String>,
    /// External account id (preference store key)
    pub user_id: Option<String>,
    /// External anonymous/opaque id (fallback preference store key)
    pub opaque_id: Option<String>,
    /// Selected ship visual variant
    pub variant_key: Option<String>,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMsg {
    /// Present or request credentials. The only message accepted before a
    /// connection has an associated player.
    Handshake {
        #[serde(default, deserialize_with = "lenient_string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient_string")]
        token: Option<String>,
    },

    /// Replace the player's current input vector
    Input(InputState),

    /// Update display name / visual selection (not persisted)
    ProfileUpdate(ProfileFields),

    /// Claim a variant: persisted and weapon mounts reloaded
    VariantSelection(ProfileFields),
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMsg {
    /// Handshake ack carrying the credentials to store
    Connected { id: Uuid, token: String },

    /// Full authoritative world state, broadcast every tick
    Snapshot {
        players: HashMap<Uuid, PlayerSnapshot>,
        projectiles: HashMap<Uuid, ProjectileSnapshot>,
    },

    /// Tells the client to discard stored credentials and re-handshake
    Rejection { reason: String },
}

/// Player entry in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    pub rotation: f32,
    pub vx: f32,
    pub vy: f32,
    pub username: String,
    pub variant_key: String,
    /// Echo of the last accepted input vector
    pub input_echo: InputState,
}

/// Projectile entry in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub owner_id: Uuid,
    pub damage: f32,
    pub radius: f32,
}

/// JavaScript-style truthiness for input flags
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    })
}

/// Accept only strings; any other JSON type is treated as absent rather
/// than failing the whole message.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_flags_are_coerced_truthy() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"input","up":1,"down":"","left":"0","right":null,"rotateLeft":true,"fire":{},"boost":0}"#,
        )
        .unwrap();
        let ClientMsg::Input(input) = msg else {
            panic!("expected input message");
        };
        assert!(input.up);
        assert!(!input.down);
        assert!(input.left); // non-empty string is truthy
        assert!(!input.right);
        assert!(input.rotate_left);
        assert!(!input.rotate_right); // missing defaults to false
        assert!(input.fire);
        assert!(!input.boost);
    }

    #[test]
    fn handshake_tolerates_non_string_credentials() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"handshake","id":123,"token":["x"]}"#).unwrap();
        let ClientMsg::Handshake { id, token } = msg else {
            panic!("expected handshake");
        };
        assert_eq!(id, None);
        assert_eq!(token, None);
    }

    #[test]
    fn handshake_without_credentials_parses() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"handshake"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::Handshake {
                id: None,
                token: None
            }
        ));
    }

    #[test]
    fn message_type_tags_are_kebab_case() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"variant-selection","displayName":"Nova","variantKey":"spaceShips_002"}"#,
        )
        .unwrap();
        let ClientMsg::VariantSelection(fields) = msg else {
            panic!("expected variant-selection");
        };
        assert_eq!(fields.display_name.as_deref(), Some("Nova"));
        assert_eq!(fields.variant_key.as_deref(), Some("spaceShips_002"));
    }

    #[test]
    fn unknown_message_type_fails_parse() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn server_messages_serialize_with_camel_case_fields() {
        let msg = ServerMsg::Connected {
            id: Uuid::nil(),
            token: "t".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "connected");

        let rejection = ServerMsg::Rejection {
            reason: "unknown-session".to_string(),
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["type"], "rejection");
        assert_eq!(json["reason"], "unknown-session");
    }

    #[test]
    fn turn_is_zero_when_both_directions_held() {
        let input = InputState {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(input.turn(), 0);

        let input = InputState {
            rotate_left: true,
            ..Default::default()
        };
        assert_eq!(input.turn(), -1);
    }
}
