//! Ship rigid bodies and movement constraints
//!
//! Bodies are circular colliders with air friction and a directly-set
//! heading (infinite rotational inertia, so nothing can spin a ship).
//! The world is a torus: both axes wrap independently.

use crate::ws::protocol::InputState;

/// Physics tuning shared by every ship body
#[derive(Debug, Clone, Copy)]
pub struct PhysicsConfig {
    /// Turn rate in radians per second
    pub rotation_speed: f32,
    /// Forward acceleration in units per second squared
    pub thrust_accel: f32,
    /// Reverse thrust as a fraction of forward thrust
    pub reverse_factor: f32,
    /// Thrust multiplier while boost is held
    pub boost_factor: f32,
    /// Per-tick velocity decay, 0..1
    pub air_friction: f32,
    /// Collider radius for every ship body
    pub body_radius: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 5.0,
            thrust_accel: 120.0,
            reverse_factor: 0.5,
            boost_factor: 2.0,
            air_friction: 0.025,
            body_radius: 10.0,
        }
    }
}

/// A ship rigid body. Lives from player creation until final removal,
/// independent of lifecycle state.
#[derive(Debug, Clone)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    pub rotation: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
}

impl Body {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            x,
            y,
            rotation: 0.0,
            vx: 0.0,
            vy: 0.0,
            radius,
        }
    }
}

/// Wrap a coordinate into [0, extent)
pub fn wrap(value: f32, extent: f32) -> f32 {
    value.rem_euclid(extent)
}

/// Steps ship bodies by exactly one fixed timestep per invocation
pub struct PhysicsEngine {
    config: PhysicsConfig,
    width: f32,
    height: f32,
    dt: f32,
}

impl PhysicsEngine {
    pub fn new(config: PhysicsConfig, width: f32, height: f32, dt: f32) -> Self {
        Self {
            config,
            width,
            height,
            dt,
        }
    }

    pub fn body_radius(&self) -> f32 {
        self.config.body_radius
    }

    /// Advance one body by one fixed tick. `input` is None for players that
    /// are not accepting input (grace or sleeping); their bodies keep
    /// coasting, decaying and wrapping like everyone else's.
    pub fn step_body(&self, body: &mut Body, input: Option<&InputState>) {
        let dt = self.dt;

        if let Some(input) = input {
            // Angular velocity applied directly; both directions cancel
            body.rotation += input.turn() as f32 * self.config.rotation_speed * dt;
            body.rotation = body.rotation.rem_euclid(std::f32::consts::TAU);

            let accel = if input.up {
                let boost = if input.boost {
                    self.config.boost_factor
                } else {
                    1.0
                };
                self.config.thrust_accel * boost
            } else if input.down {
                -self.config.thrust_accel * self.config.reverse_factor
            } else {
                0.0
            };

            body.vx += body.rotation.cos() * accel * dt;
            body.vy += body.rotation.sin() * accel * dt;
        }

        // Air friction, then integrate
        let keep = 1.0 - self.config.air_friction;
        body.vx *= keep;
        body.vy *= keep;

        body.x = wrap(body.x + body.vx * dt, self.width);
        body.y = wrap(body.y + body.vy * dt, self.height);
    }
}
