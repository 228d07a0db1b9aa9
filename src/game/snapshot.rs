//! Snapshot assembly for the per-tick broadcast
//!
//! Visibility rules live here: a player appears in the broadcast only while
//! active and only after claiming a usable display name. Bodies of hidden
//! players keep simulating; they are filtered at assembly, not removed.

use std::collections::HashMap;

use uuid::Uuid;

use super::projectiles::Projectile;
use super::world::Player;
use crate::ws::protocol::{PlayerSnapshot, ProjectileSnapshot, ServerMsg};

/// Build the authoritative state message for one tick
pub fn build(
    players: &HashMap<Uuid, Player>,
    projectiles: &HashMap<Uuid, Projectile>,
) -> ServerMsg {
    let players = players
        .values()
        .filter(|p| p.lifecycle.is_active() && p.name_claimed)
        .filter_map(|p| {
            let username = p.display_name.clone()?;
            Some((
                p.id,
                PlayerSnapshot {
                    x: p.body.x,
                    y: p.body.y,
                    rotation: p.body.rotation,
                    vx: p.body.vx,
                    vy: p.body.vy,
                    username,
                    variant_key: p.variant_key.clone(),
                    input_echo: p.input.clone(),
                },
            ))
        })
        .collect();

    let projectiles = projectiles
        .iter()
        .map(|(id, p)| {
            (
                *id,
                ProjectileSnapshot {
                    x: p.x,
                    y: p.y,
                    vx: p.vx,
                    vy: p.vy,
                    owner_id: p.owner_id,
                    damage: p.damage,
                    radius: p.radius,
                },
            )
        })
        .collect();

    ServerMsg::Snapshot {
        players,
        projectiles,
    }
}
