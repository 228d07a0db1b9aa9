//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Hard upper clamp on projectile lifetime, regardless of configuration
/// or what a weapon mount requests.
pub const PROJECTILE_LIFETIME_CAP_MS: u64 = 5000;

/// Placeholder secret used when IDENTITY_SECRET is unset. Tokens issued
/// under it are worthless across deployments.
pub const DEV_IDENTITY_SECRET: &str = "dev-identity-secret";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Secret for deriving per-player credential tokens
    pub identity_secret: String,

    /// Base URL of the external preference store (persistence disabled when unset)
    pub preferences_url: Option<String>,
    /// API key sent to the preference store
    pub preferences_api_key: Option<String>,

    /// Path to a JSON file mapping variant keys to weapon mounts
    pub weapon_config_path: Option<String>,

    /// Allowed client origins for CORS, comma-separated (permissive when unset)
    pub client_origin: Option<String>,

    /// Simulation tuning
    pub world: WorldConfig,
}

/// World simulation tuning knobs
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// World width in units
    pub width: f32,
    /// World height in units
    pub height: f32,
    /// Maximum concurrent projectiles
    pub max_projectiles: usize,
    /// Maximum projectile lifetime in milliseconds (clamped to the hard cap)
    pub max_projectile_lifetime_ms: u64,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// How long a disconnected player's state is kept for reconnection
    pub grace_period_ms: u64,
    /// Input silence after which an active player is demoted to sleeping
    pub idle_sleep_ms: u64,
    /// Time a sleeping player is kept before final removal
    pub sleep_expiry_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 450.0,
            max_projectiles: 100,
            max_projectile_lifetime_ms: PROJECTILE_LIFETIME_CAP_MS,
            tick_rate: 60,
            grace_period_ms: 120_000,
            idle_sleep_ms: 60_000,
            sleep_expiry_ms: 1_800_000,
        }
    }
}

impl WorldConfig {
    /// Fixed simulation timestep in seconds
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Fixed simulation timestep as a duration
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate.max(1) as u64)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PaaS platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let defaults = WorldConfig::default();
        let world = WorldConfig {
            width: env_or("WORLD_WIDTH", defaults.width),
            height: env_or("WORLD_HEIGHT", defaults.height),
            max_projectiles: env_or("MAX_PROJECTILES", defaults.max_projectiles),
            max_projectile_lifetime_ms: env_or("PROJECTILE_LIFETIME", PROJECTILE_LIFETIME_CAP_MS)
                .min(PROJECTILE_LIFETIME_CAP_MS),
            tick_rate: env_or("TICK_RATE", defaults.tick_rate),
            grace_period_ms: env_or("GRACE_PERIOD_SECS", 120u64) * 1000,
            idle_sleep_ms: env_or("IDLE_SLEEP_SECS", 60u64) * 1000,
            sleep_expiry_ms: env_or("SLEEP_EXPIRY_SECS", 1800u64) * 1000,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            identity_secret: env::var("IDENTITY_SECRET")
                .unwrap_or_else(|_| DEV_IDENTITY_SECRET.to_string()),

            preferences_url: env::var("PREFERENCES_URL").ok(),
            preferences_api_key: env::var("PREFERENCES_API_KEY").ok(),

            weapon_config_path: env::var("WEAPON_CONFIG_PATH").ok(),

            client_origin: env::var("CLIENT_ORIGIN").ok(),

            world,
        })
    }

    /// True when running with the built-in development secret
    pub fn uses_dev_secret(&self) -> bool {
        self.identity_secret == DEV_IDENTITY_SECRET
    }
}

/// Parse an environment variable, falling back to a default on absence
/// or a malformed value.
fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,
}
