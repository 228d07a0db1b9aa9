//! Per-mount fire-rate gating and muzzle geometry

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::physics::Body;
use super::projectiles::ProjectileEngine;

/// A weapon attachment point. Offsets are ship-local; `rotation` is the
/// mounting angle in degrees relative to the ship heading. Cooldowns are
/// keyed by `id`, so reordering mounts in config never crosses wires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponMount {
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub rotation: f32,
    /// Minimum inter-shot interval in milliseconds
    pub fire_rate: u64,
    /// Muzzle speed in units per second
    pub projectile_speed: f32,
    /// Requested lifetime in milliseconds (server clamps to the world max)
    pub projectile_lifetime: u64,
    pub damage: f32,
    /// Spread cone in degrees; the fire angle is perturbed within ±spread/2
    #[serde(default)]
    pub spread: f32,
}

/// Computes mount world-space poses and drives spawns through the
/// fire-rate gate. Each mount fires independently; holding fire sustains
/// fire at each mount's own rate.
pub struct GunController;

impl GunController {
    /// Rotate a mount's ship-local offset by the ship heading and translate
    /// into world space. Returns (x, y, fire angle in degrees).
    pub fn mount_world_pose(mount: &WeaponMount, body: &Body) -> (f32, f32, f32) {
        let (sin, cos) = body.rotation.sin_cos();
        let x = body.x + mount.x * cos - mount.y * sin;
        let y = body.y + mount.x * sin + mount.y * cos;
        let angle_deg = body.rotation.to_degrees() + mount.rotation;
        (x, y, angle_deg)
    }

    /// Fire every mount that is off cooldown. Returns how many shots spawned.
    pub fn try_fire(
        owner_id: Uuid,
        body: &Body,
        mounts: &[WeaponMount],
        cooldowns: &mut HashMap<String, u64>,
        projectiles: &mut ProjectileEngine,
        now: u64,
    ) -> usize {
        let mut fired = 0;

        for mount in mounts {
            if let Some(&last) = cooldowns.get(&mount.id) {
                if now.saturating_sub(last) < mount.fire_rate {
                    continue;
                }
            }

            let (x, y, angle_deg) = Self::mount_world_pose(mount, body);
            if projectiles
                .spawn(owner_id, x, y, angle_deg, mount, body.vx, body.vy, now)
                .is_some()
            {
                cooldowns.insert(mount.id.clone(), now);
                fired += 1;
            }
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(id: &str, fire_rate: u64) -> WeaponMount {
        WeaponMount {
            id: id.to_string(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            fire_rate,
            projectile_speed: 300.0,
            projectile_lifetime: 3000,
            damage: 10.0,
            spread: 0.0,
        }
    }

    fn engine() -> ProjectileEngine {
        ProjectileEngine::new(100, 5000, 800.0, 450.0)
    }

    #[test]
    fn fire_rate_gates_each_mount() {
        let owner = Uuid::new_v4();
        let body = Body::new(0.0, 0.0, 10.0);
        let mounts = vec![mount("nose", 200)];
        let mut cooldowns = HashMap::new();
        let mut projectiles = engine();

        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 1000),
            1
        );
        // Held fire inside the window spawns nothing
        for now in [1050, 1100, 1199] {
            assert_eq!(
                GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, now),
                0
            );
        }
        // Accepted again exactly at the interval
        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 1200),
            1
        );
        assert_eq!(projectiles.count(), 2);
    }

    #[test]
    fn mounts_fire_independently() {
        let owner = Uuid::new_v4();
        let body = Body::new(0.0, 0.0, 10.0);
        let mounts = vec![mount("left-wing", 100), mount("right-wing", 300)];
        let mut cooldowns = HashMap::new();
        let mut projectiles = engine();

        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 0),
            2
        );
        // Fast mount ready, slow mount still cooling
        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 100),
            1
        );
        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 300),
            2
        );
    }

    #[test]
    fn mount_pose_rotates_with_ship_heading() {
        let mut forward = mount("nose", 200);
        forward.x = 12.0;

        let mut body = Body::new(100.0, 100.0, 10.0);
        let (x, y, angle) = GunController::mount_world_pose(&forward, &body);
        assert!((x - 112.0).abs() < 1e-3);
        assert!((y - 100.0).abs() < 1e-3);
        assert!(angle.abs() < 1e-3);

        body.rotation = std::f32::consts::FRAC_PI_2;
        let (x, y, angle) = GunController::mount_world_pose(&forward, &body);
        assert!((x - 100.0).abs() < 1e-3);
        assert!((y - 112.0).abs() < 1e-3);
        assert!((angle - 90.0).abs() < 1e-3);
    }

    #[test]
    fn shots_inherit_ship_velocity() {
        let owner = Uuid::new_v4();
        let mut body = Body::new(0.0, 0.0, 10.0);
        body.vx = 40.0;
        let mounts = vec![mount("nose", 200)];
        let mut cooldowns = HashMap::new();
        let mut projectiles = engine();

        GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 0);
        let p = projectiles.all().values().next().unwrap();
        assert!((p.vx - 340.0).abs() < 1e-3);
    }

    /// Reference scenario: 800x450 world, 5000 ms clamp, single mount with
    /// lifetime 3000, fire rate 200, speed 300, damage 10, ship at origin
    /// heading 0.
    #[test]
    fn reference_fire_scenario() {
        let owner = Uuid::new_v4();
        let body = Body::new(0.0, 0.0, 10.0);
        let mounts = vec![mount("nose", 200)];
        let mut cooldowns = HashMap::new();
        let mut projectiles = engine();

        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 0),
            1
        );
        {
            let p = projectiles.all().values().next().unwrap();
            assert!((p.x - 0.0).abs() < 1e-3 && (p.y - 0.0).abs() < 1e-3);
            assert!((p.vx - 300.0).abs() < 1e-3, "300 u/s along heading");
            assert!(p.vy.abs() < 1e-3);
            assert_eq!(p.damage, 10.0);
            assert_eq!(p.lifetime_ms, 3000);
        }

        // Second shot only after 200 ms
        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 150),
            0
        );
        assert_eq!(
            GunController::try_fire(owner, &body, &mounts, &mut cooldowns, &mut projectiles, 200),
            1
        );

        // First projectile expires at 3000 ms
        projectiles.advance(3000, 1.0 / 60.0);
        assert_eq!(projectiles.count(), 2);
        projectiles.advance(3001, 1.0 / 60.0);
        assert_eq!(projectiles.count(), 1);
    }
}
