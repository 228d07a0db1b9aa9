//! Game simulation modules

pub mod guns;
pub mod lifecycle;
pub mod physics;
pub mod projectiles;
pub mod snapshot;
pub mod world;

pub use world::{GameWorld, WorldHandle};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::store::PlayerPreferences;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Identifies one WebSocket connection, distinct from the player id it may
/// come to control.
pub type ConnectionId = Uuid;

/// Everything the world task reacts to besides its own timers. All state
/// mutation funnels through this channel, including results of background
/// store lookups re-entering the loop.
#[derive(Debug)]
pub enum WorldCommand {
    /// A socket opened; `tx` is its outbound message queue
    Connected {
        conn_id: ConnectionId,
        tx: mpsc::Sender<ServerMsg>,
    },

    /// A parsed client message arrived on a connection
    Message { conn_id: ConnectionId, msg: ClientMsg },

    /// The socket closed
    Disconnected { conn_id: ConnectionId },

    /// A background preference fetch completed
    PreferencesLoaded {
        player_id: Uuid,
        prefs: PlayerPreferences,
    },
}
