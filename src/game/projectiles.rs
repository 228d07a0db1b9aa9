//! Projectile ownership, flight, expiry, and hit detection

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use super::guns::WeaponMount;
use super::physics::wrap;

/// An in-flight projectile
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub damage: f32,
    pub radius: f32,
    /// Spawn timestamp in unix millis
    pub spawned_at: u64,
    /// Already clamped to the world maximum at spawn
    pub lifetime_ms: u64,
}

/// Hit record emitted by collision detection. Damage application is an
/// external combat-resolution concern; this core only reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub projectile_id: Uuid,
    pub player_id: Uuid,
    pub shooter_id: Uuid,
    pub damage: f32,
}

/// Default collider radius for every projectile
const PROJECTILE_RADIUS: f32 = 2.0;

/// Owns all in-flight projectiles
pub struct ProjectileEngine {
    projectiles: HashMap<Uuid, Projectile>,
    max_projectiles: usize,
    max_lifetime_ms: u64,
    width: f32,
    height: f32,
    rng: ChaCha8Rng,
}

impl ProjectileEngine {
    pub fn new(max_projectiles: usize, max_lifetime_ms: u64, width: f32, height: f32) -> Self {
        Self {
            projectiles: HashMap::new(),
            max_projectiles,
            max_lifetime_ms,
            width,
            height,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Deterministic spread for tests
    #[cfg(test)]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn all(&self) -> &HashMap<Uuid, Projectile> {
        &self.projectiles
    }

    /// Spawn a projectile from a weapon mount. Spread perturbs the fire
    /// angle uniformly within ±spread/2; the owner's velocity is inherited.
    /// Returns None when the projectile cap is reached (capped, not an error).
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        &mut self,
        owner_id: Uuid,
        x: f32,
        y: f32,
        angle_deg: f32,
        mount: &WeaponMount,
        owner_vx: f32,
        owner_vy: f32,
        now: u64,
    ) -> Option<Uuid> {
        if self.projectiles.len() >= self.max_projectiles {
            debug!(owner_id = %owner_id, cap = self.max_projectiles, "Projectile cap reached, shot dropped");
            return None;
        }

        let spread = mount.spread.to_radians();
        let angle = angle_deg.to_radians() + (self.rng.gen::<f32>() - 0.5) * spread;

        let id = Uuid::new_v4();
        let projectile = Projectile {
            id,
            owner_id,
            x,
            y,
            vx: angle.cos() * mount.projectile_speed + owner_vx,
            vy: angle.sin() * mount.projectile_speed + owner_vy,
            damage: mount.damage,
            radius: PROJECTILE_RADIUS,
            spawned_at: now,
            lifetime_ms: mount.projectile_lifetime.min(self.max_lifetime_ms),
        };
        self.projectiles.insert(id, projectile);
        Some(id)
    }

    /// Integrate every projectile by one tick, wrap at world bounds, and
    /// expire by age.
    pub fn advance(&mut self, now: u64, dt: f32) {
        let (width, height) = (self.width, self.height);
        for projectile in self.projectiles.values_mut() {
            projectile.x = wrap(projectile.x + projectile.vx * dt, width);
            projectile.y = wrap(projectile.y + projectile.vy * dt, height);
        }
        self.projectiles
            .retain(|_, p| now.saturating_sub(p.spawned_at) <= p.lifetime_ms);
    }

    /// Circle-test every projectile against every target except its owner.
    /// A projectile is removed on its first hit in iteration order, so it
    /// can never register twice.
    pub fn detect_collisions(&mut self, targets: &[(Uuid, f32, f32, f32)]) -> Vec<Hit> {
        let mut hits = Vec::new();

        for projectile in self.projectiles.values() {
            for &(player_id, px, py, radius) in targets {
                if player_id == projectile.owner_id {
                    continue;
                }
                let dx = projectile.x - px;
                let dy = projectile.y - py;
                let reach = projectile.radius + radius;
                if dx * dx + dy * dy < reach * reach {
                    hits.push(Hit {
                        projectile_id: projectile.id,
                        player_id,
                        shooter_id: projectile.owner_id,
                        damage: projectile.damage,
                    });
                    break;
                }
            }
        }

        for hit in &hits {
            self.projectiles.remove(&hit.projectile_id);
        }

        hits
    }

    /// Safety net for stuck entries: drop anything older than the world
    /// maximum plus a grace second. Returns how many were removed.
    pub fn emergency_sweep(&mut self, now: u64) -> usize {
        let cutoff = self.max_lifetime_ms + 1000;
        let before = self.projectiles.len();
        self.projectiles
            .retain(|_, p| now.saturating_sub(p.spawned_at) <= cutoff);
        before - self.projectiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(lifetime: u64, fire_rate: u64, speed: f32) -> WeaponMount {
        WeaponMount {
            id: "nose".to_string(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            fire_rate,
            projectile_speed: speed,
            projectile_lifetime: lifetime,
            damage: 10.0,
            spread: 0.0,
        }
    }

    fn engine() -> ProjectileEngine {
        ProjectileEngine::new(100, 5000, 800.0, 450.0).with_rng_seed(7)
    }

    #[test]
    fn lifetime_is_clamped_to_world_maximum() {
        let mut engine = engine();
        let owner = Uuid::new_v4();

        let id = engine
            .spawn(owner, 0.0, 0.0, 0.0, &mount(30_000, 200, 300.0), 0.0, 0.0, 1000)
            .unwrap();
        assert_eq!(engine.all()[&id].lifetime_ms, 5000);

        let id = engine
            .spawn(owner, 0.0, 0.0, 0.0, &mount(3000, 200, 300.0), 0.0, 0.0, 1000)
            .unwrap();
        assert_eq!(engine.all()[&id].lifetime_ms, 3000);
    }

    #[test]
    fn projectile_expires_after_lifetime() {
        let mut engine = engine();
        engine
            .spawn(Uuid::new_v4(), 0.0, 0.0, 0.0, &mount(3000, 200, 300.0), 0.0, 0.0, 1000)
            .unwrap();

        engine.advance(4000, 1.0 / 60.0);
        assert_eq!(engine.count(), 1, "still alive at exactly spawn+lifetime");

        engine.advance(4001, 1.0 / 60.0);
        assert_eq!(engine.count(), 0, "removed immediately after expiry");
    }

    #[test]
    fn velocity_inherits_owner_motion() {
        let mut engine = engine();
        let id = engine
            .spawn(Uuid::new_v4(), 0.0, 0.0, 0.0, &mount(3000, 200, 300.0), 50.0, -20.0, 0)
            .unwrap();
        let p = &engine.all()[&id];
        assert!((p.vx - 350.0).abs() < 1e-3);
        assert!((p.vy - -20.0).abs() < 1e-3);
    }

    #[test]
    fn spread_zero_fires_exactly_along_angle() {
        let mut engine = engine();
        let id = engine
            .spawn(Uuid::new_v4(), 0.0, 0.0, 90.0, &mount(3000, 200, 300.0), 0.0, 0.0, 0)
            .unwrap();
        let p = &engine.all()[&id];
        assert!(p.vx.abs() < 1e-3);
        assert!((p.vy - 300.0).abs() < 1e-3);
    }

    #[test]
    fn spread_stays_within_half_angle() {
        let mut engine = engine();
        let mut wide = mount(3000, 200, 300.0);
        wide.spread = 30.0;
        for _ in 0..50 {
            let id = engine
                .spawn(Uuid::new_v4(), 0.0, 0.0, 0.0, &wide, 0.0, 0.0, 0)
                .unwrap();
            let p = engine.all()[&id].clone();
            let angle = p.vy.atan2(p.vx).to_degrees();
            assert!(angle.abs() <= 15.0 + 1e-3, "angle {} outside ±15°", angle);
        }
    }

    #[test]
    fn positions_wrap_at_world_bounds() {
        let mut engine = engine();
        let id = engine
            .spawn(Uuid::new_v4(), 799.0, 1.0, 0.0, &mount(5000, 200, 300.0), 0.0, -300.0, 0)
            .unwrap();
        engine.advance(16, 1.0 / 60.0);
        let p = &engine.all()[&id];
        assert!((0.0..800.0).contains(&p.x));
        assert!((0.0..450.0).contains(&p.y));
    }

    #[test]
    fn projectile_hits_at_most_once() {
        let mut engine = engine();
        let shooter = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        engine
            .spawn(shooter, 100.0, 100.0, 0.0, &mount(3000, 200, 300.0), 0.0, 0.0, 0)
            .unwrap();

        // Two overlapping targets; only the first checked registers
        let hits = engine.detect_collisions(&[(a, 100.0, 100.0, 10.0), (b, 101.0, 100.0, 10.0)]);
        assert_eq!(hits.len(), 1);
        assert_eq!(engine.count(), 0, "projectile removed on first hit");

        let hits = engine.detect_collisions(&[(a, 100.0, 100.0, 10.0)]);
        assert!(hits.is_empty());
    }

    #[test]
    fn owner_is_never_hit_by_own_projectile() {
        let mut engine = engine();
        let shooter = Uuid::new_v4();
        engine
            .spawn(shooter, 100.0, 100.0, 0.0, &mount(3000, 200, 300.0), 0.0, 0.0, 0)
            .unwrap();
        let hits = engine.detect_collisions(&[(shooter, 100.0, 100.0, 10.0)]);
        assert!(hits.is_empty());
        assert_eq!(engine.count(), 1);
    }

    #[test]
    fn spawn_is_refused_at_cap() {
        let mut engine = ProjectileEngine::new(2, 5000, 800.0, 450.0).with_rng_seed(7);
        let owner = Uuid::new_v4();
        let m = mount(3000, 200, 300.0);
        assert!(engine.spawn(owner, 0.0, 0.0, 0.0, &m, 0.0, 0.0, 0).is_some());
        assert!(engine.spawn(owner, 0.0, 0.0, 0.0, &m, 0.0, 0.0, 0).is_some());
        assert!(engine.spawn(owner, 0.0, 0.0, 0.0, &m, 0.0, 0.0, 0).is_none());
        assert_eq!(engine.count(), 2);
    }

    #[test]
    fn emergency_sweep_drops_stuck_entries() {
        let mut engine = engine();
        engine
            .spawn(Uuid::new_v4(), 0.0, 0.0, 0.0, &mount(3000, 200, 300.0), 0.0, 0.0, 0)
            .unwrap();
        assert_eq!(engine.emergency_sweep(5000), 0);
        assert_eq!(engine.emergency_sweep(6001), 1);
        assert_eq!(engine.count(), 0);
    }
}
