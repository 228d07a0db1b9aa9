//! The authoritative world and its tick loop
//!
//! A single task owns every piece of mutable simulation state: players,
//! bodies, projectiles, connections. Sockets and background store calls
//! talk to it exclusively through the command channel, so no lock ever
//! guards game state. One world instance serves the whole process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::identity::IdentityService;
use crate::store::preferences::DEFAULT_VARIANT;
use crate::store::{PlayerPreferences, PreferenceStore, WeaponConfigSource};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, InputState, ProfileFields, ServerMsg};

use super::guns::{GunController, WeaponMount};
use super::lifecycle::{self, LifecycleConfig, LifecycleState, Transition};
use super::physics::{Body, PhysicsConfig, PhysicsEngine};
use super::projectiles::ProjectileEngine;
use super::snapshot;
use super::{ConnectionId, WorldCommand};

/// Maintenance cadence for lifecycle transitions and the projectile
/// safety sweep
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(5);

/// Command queue depth; drained every tick
const COMMAND_QUEUE_DEPTH: usize = 256;

/// Client-side placeholder name prefix; never shown in snapshots
const ANON_PREFIX: &str = "Anon_";

/// Rejection reason telling the client to discard credentials and
/// re-handshake
const REASON_UNKNOWN_SESSION: &str = "unknown-session";

fn usable_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with(ANON_PREFIX)
}

fn rejection() -> ServerMsg {
    ServerMsg::Rejection {
        reason: REASON_UNKNOWN_SESSION.to_string(),
    }
}

/// A player record (authoritative). Lives from first handshake until the
/// lifecycle sweep removes it; surviving disconnects and sleep in between.
pub struct Player {
    pub id: Uuid,
    pub body: Body,
    pub input: InputState,
    pub display_name: Option<String>,
    /// Set while the current display name is usable; gates snapshot
    /// visibility
    pub name_claimed: bool,
    pub variant_key: String,
    pub mounts: Arc<Vec<WeaponMount>>,
    /// Last shot timestamp per mount id
    pub cooldowns: HashMap<String, u64>,
    pub last_input_at: u64,
    pub lifecycle: LifecycleState,
    /// One background preference fetch per player record
    prefs_requested: bool,
}

impl Player {
    fn new(id: Uuid, x: f32, y: f32, radius: f32, mounts: Arc<Vec<WeaponMount>>, now: u64) -> Self {
        Self {
            id,
            body: Body::new(x, y, radius),
            input: InputState::default(),
            display_name: None,
            name_claimed: false,
            variant_key: DEFAULT_VARIANT.to_string(),
            mounts,
            cooldowns: HashMap::new(),
            last_input_at: now,
            lifecycle: LifecycleState::Active,
            prefs_requested: false,
        }
    }
}

/// One open socket and the player it controls, if any
struct Connection {
    tx: mpsc::Sender<ServerMsg>,
    player: Option<Uuid>,
}

/// Live gauges for the health endpoint
#[derive(Default)]
pub struct WorldStats {
    players: AtomicUsize,
    connections: AtomicUsize,
    projectiles: AtomicUsize,
}

impl WorldStats {
    pub fn players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn projectiles(&self) -> usize {
        self.projectiles.load(Ordering::Relaxed)
    }
}

/// Cheap clonable handle to the running world task
#[derive(Clone)]
pub struct WorldHandle {
    cmd_tx: mpsc::Sender<WorldCommand>,
    stats: Arc<WorldStats>,
}

impl WorldHandle {
    /// Queue a command. Returns false when the world task is gone.
    pub async fn send(&self, cmd: WorldCommand) -> bool {
        self.cmd_tx.send(cmd).await.is_ok()
    }

    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }
}

/// The authoritative world
pub struct GameWorld {
    config: Arc<Config>,
    lifecycle: LifecycleConfig,
    tick_dt: f32,

    physics: PhysicsEngine,
    projectiles: ProjectileEngine,
    players: HashMap<Uuid, Player>,
    connections: HashMap<ConnectionId, Connection>,

    identity: IdentityService,
    preferences: PreferenceStore,
    weapons: Arc<WeaponConfigSource>,

    cmd_tx: mpsc::Sender<WorldCommand>,
    cmd_rx: mpsc::Receiver<WorldCommand>,
    stats: Arc<WorldStats>,
}

impl GameWorld {
    pub fn new(
        config: Arc<Config>,
        identity: IdentityService,
        preferences: PreferenceStore,
        weapons: Arc<WeaponConfigSource>,
    ) -> (Self, WorldHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let stats = Arc::new(WorldStats::default());

        let handle = WorldHandle {
            cmd_tx: cmd_tx.clone(),
            stats: stats.clone(),
        };

        let world_cfg = &config.world;
        let tick_dt = world_cfg.tick_delta();
        let world = Self {
            lifecycle: LifecycleConfig {
                grace_period_ms: world_cfg.grace_period_ms,
                idle_sleep_ms: world_cfg.idle_sleep_ms,
                sleep_expiry_ms: world_cfg.sleep_expiry_ms,
            },
            tick_dt,
            physics: PhysicsEngine::new(
                PhysicsConfig::default(),
                world_cfg.width,
                world_cfg.height,
                tick_dt,
            ),
            projectiles: ProjectileEngine::new(
                world_cfg.max_projectiles,
                world_cfg.max_projectile_lifetime_ms,
                world_cfg.width,
                world_cfg.height,
            ),
            players: HashMap::new(),
            connections: HashMap::new(),
            identity,
            preferences,
            weapons,
            cmd_tx,
            cmd_rx,
            stats,
            config,
        };

        (world, handle)
    }

    /// Run the fixed-rate tick loop. A missed deadline skips ahead rather
    /// than bursting catch-up ticks.
    pub async fn run(mut self) {
        info!(
            tick_rate = self.config.world.tick_rate,
            width = self.config.world.width,
            height = self.config.world.height,
            "World task started"
        );

        let mut tick = interval(self.config.world.tick_duration());
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut maintenance = interval(MAINTENANCE_INTERVAL);
        maintenance.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let now = unix_millis();
                    self.drain_commands(now);
                    self.step(now);
                }
                _ = maintenance.tick() => {
                    self.sweep(unix_millis());
                }
            }
        }
    }

    fn drain_commands(&mut self, now: u64) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            self.handle_command(cmd, now);
        }
    }

    /// One simulation tick: integrate ships, sustain held fire, fly
    /// projectiles, detect hits, broadcast.
    fn step(&mut self, now: u64) {
        for player in self.players.values_mut() {
            let input = if player.lifecycle.is_active() {
                Some(&player.input)
            } else {
                None
            };
            self.physics.step_body(&mut player.body, input);
        }

        for player in self.players.values_mut() {
            if player.lifecycle.is_active() && player.input.fire {
                GunController::try_fire(
                    player.id,
                    &player.body,
                    &player.mounts,
                    &mut player.cooldowns,
                    &mut self.projectiles,
                    now,
                );
            }
        }

        self.projectiles.advance(now, self.tick_dt);

        let targets: Vec<(Uuid, f32, f32, f32)> = self
            .players
            .values()
            .filter(|p| p.lifecycle.is_active())
            .map(|p| (p.id, p.body.x, p.body.y, p.body.radius))
            .collect();
        for hit in self.projectiles.detect_collisions(&targets) {
            debug!(
                player_id = %hit.player_id,
                shooter_id = %hit.shooter_id,
                damage = hit.damage,
                "Projectile hit"
            );
        }

        let msg = snapshot::build(&self.players, self.projectiles.all());
        self.broadcast(msg, now);
        self.update_stats();
    }

    /// Periodic lifecycle transitions plus the projectile safety sweep
    fn sweep(&mut self, now: u64) {
        let lifecycle_cfg = self.lifecycle;

        let mut removals = Vec::new();
        for player in self.players.values_mut() {
            match lifecycle::sweep_decision(
                &player.lifecycle,
                player.last_input_at,
                now,
                &lifecycle_cfg,
            ) {
                Some(Transition::Sleep) => {
                    player.lifecycle = LifecycleState::Sleeping { since: now };
                    player.input = InputState::default();
                    info!(player_id = %player.id, "Idle player demoted to sleeping");
                }
                Some(Transition::Remove) => removals.push(player.id),
                None => {}
            }
        }
        for player_id in removals {
            self.remove_player(player_id);
        }

        let swept = self.projectiles.emergency_sweep(now);
        if swept > 0 {
            warn!(count = swept, "Safety sweep removed stuck projectiles");
        }
        self.update_stats();
    }

    fn handle_command(&mut self, cmd: WorldCommand, now: u64) {
        match cmd {
            WorldCommand::Connected { conn_id, tx } => {
                self.connections.insert(conn_id, Connection { tx, player: None });
                debug!(conn_id = %conn_id, connections = self.connections.len(), "Connection opened");
            }
            WorldCommand::Message { conn_id, msg } => self.handle_message(conn_id, msg, now),
            WorldCommand::Disconnected { conn_id } => self.handle_disconnect(conn_id, now),
            WorldCommand::PreferencesLoaded { player_id, prefs } => {
                self.handle_preferences_loaded(player_id, prefs)
            }
        }
        self.update_stats();
    }

    fn handle_message(&mut self, conn_id: ConnectionId, msg: ClientMsg, now: u64) {
        if let ClientMsg::Handshake { id, token } = msg {
            self.handle_handshake(conn_id, id, token, now);
            return;
        }

        let Some(player_id) = self.connections.get(&conn_id).and_then(|c| c.player) else {
            debug!(conn_id = %conn_id, "Message before handshake, rejecting");
            self.send_to(conn_id, rejection());
            return;
        };

        let Some(player) = self.players.get_mut(&player_id) else {
            // The player record was swept while this socket stayed open
            if let Some(conn) = self.connections.get_mut(&conn_id) {
                conn.player = None;
            }
            debug!(conn_id = %conn_id, player_id = %player_id, "Message for removed player, rejecting");
            self.send_to(conn_id, rejection());
            return;
        };

        // Any valid message wakes a sleeping player
        if player.lifecycle.is_sleeping() {
            player.lifecycle = LifecycleState::Active;
            player.last_input_at = now;
            info!(player_id = %player_id, "Sleeping player reactivated");
        }

        match msg {
            ClientMsg::Input(input) => self.handle_input(player_id, input, now),
            ClientMsg::ProfileUpdate(fields) => self.handle_profile(player_id, fields, false),
            ClientMsg::VariantSelection(fields) => self.handle_profile(player_id, fields, true),
            ClientMsg::Handshake { .. } => {}
        }
    }

    /// Resolve credentials into a player id, resuming state when the token
    /// checks out and minting a fresh identity otherwise.
    fn handle_handshake(
        &mut self,
        conn_id: ConnectionId,
        id: Option<String>,
        token: Option<String>,
        now: u64,
    ) {
        let resumed = match (id.as_deref(), token.as_deref()) {
            (Some(id), Some(token)) if self.identity.verify(id, token) => {
                Uuid::parse_str(id).ok()
            }
            _ => None,
        };
        if resumed.is_none() && id.is_some() {
            debug!(conn_id = %conn_id, "Handshake credentials rejected, issuing fresh identity");
        }

        let player_id = resumed.unwrap_or_else(Uuid::new_v4);
        let token = self.identity.issue(&player_id.to_string());

        let spawn_x = self.config.world.width / 2.0;
        let spawn_y = self.config.world.height / 2.0;

        match self.players.get_mut(&player_id) {
            Some(player) => match player.lifecycle {
                LifecycleState::GraceDisconnected { .. } => {
                    player.lifecycle = LifecycleState::Active;
                    player.last_input_at = now;
                    info!(player_id = %player_id, "Player reconnected within grace window");
                }
                LifecycleState::Sleeping { .. } => {
                    player.lifecycle = LifecycleState::Active;
                    player.last_input_at = now;
                    info!(player_id = %player_id, "Sleeping player reactivated by handshake");
                }
                LifecycleState::Active => {
                    debug!(player_id = %player_id, "Additional connection for active player");
                }
            },
            None => {
                let player = Player::new(
                    player_id,
                    spawn_x,
                    spawn_y,
                    self.physics.body_radius(),
                    self.weapons.for_variant(DEFAULT_VARIANT),
                    now,
                );
                self.players.insert(player_id, player);
                info!(player_id = %player_id, players = self.players.len(), "Player created");
            }
        }

        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.player = Some(player_id);
        }
        self.send_to(conn_id, ServerMsg::Connected {
            id: player_id,
            token,
        });
    }

    /// Replace the input vector and attempt an immediate shot when fire is
    /// down; held fire is then sustained by the tick loop.
    fn handle_input(&mut self, player_id: Uuid, input: InputState, now: u64) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        player.input = input;
        player.last_input_at = now;

        if player.input.fire {
            GunController::try_fire(
                player.id,
                &player.body,
                &player.mounts,
                &mut player.cooldowns,
                &mut self.projectiles,
                now,
            );
        }
    }

    /// Apply display-name and variant changes. `persist` distinguishes a
    /// variant claim (saved to the preference store) from a plain update.
    fn handle_profile(&mut self, player_id: Uuid, fields: ProfileFields, persist: bool) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };

        if let Some(name) = fields.display_name.as_deref().map(str::trim) {
            player.display_name = Some(name.to_string());
            player.name_claimed = usable_name(name);
        }

        if let Some(variant) = &fields.variant_key {
            if *variant != player.variant_key {
                player.variant_key = variant.clone();
                player.mounts = self.weapons.for_variant(variant);
                // Cooldowns are keyed by mount id and survive the swap
            }
        }

        if persist {
            let Some(key) = fields.user_id.clone().or_else(|| fields.opaque_id.clone()) else {
                debug!(player_id = %player_id, "Variant claim without store key, not persisted");
                return;
            };
            let store = self.preferences.clone();
            let username = player.display_name.clone().unwrap_or_default();
            let variant = player.variant_key.clone();
            let opaque = fields.opaque_id.clone();
            tokio::spawn(async move {
                if let Err(e) = store
                    .save(&key, &username, opaque.as_deref(), &variant, &HashMap::new())
                    .await
                {
                    warn!(player_id = %player_id, error = %e, "Failed to persist variant claim");
                }
            });
        } else if !player.prefs_requested
            && (fields.user_id.is_some() || fields.opaque_id.is_some())
        {
            // First sighting of store keys: load saved selections in the
            // background and re-enter through the command channel
            player.prefs_requested = true;
            let store = self.preferences.clone();
            let cmd_tx = self.cmd_tx.clone();
            let user_id = fields.user_id.clone();
            let opaque_id = fields.opaque_id.clone();
            tokio::spawn(async move {
                let prefs = store.get(user_id.as_deref(), opaque_id.as_deref()).await;
                let _ = cmd_tx
                    .send(WorldCommand::PreferencesLoaded { player_id, prefs })
                    .await;
            });
        }
    }

    /// Apply a background preference fetch, unless the player has already
    /// picked a variant themselves in the meantime.
    fn handle_preferences_loaded(&mut self, player_id: Uuid, prefs: PlayerPreferences) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        if player.variant_key != DEFAULT_VARIANT {
            debug!(player_id = %player_id, "Stored preferences outraced by explicit selection");
            return;
        }
        if prefs.selected_variant != player.variant_key {
            player.variant_key = prefs.selected_variant;
            player.mounts = self.weapons.for_variant(&player.variant_key);
            debug!(player_id = %player_id, variant = %player.variant_key, "Applied stored variant");
        }
    }

    /// Socket closed: start the grace window unless another connection
    /// still controls the player.
    fn handle_disconnect(&mut self, conn_id: ConnectionId, now: u64) {
        let Some(conn) = self.connections.remove(&conn_id) else {
            return;
        };
        debug!(conn_id = %conn_id, connections = self.connections.len(), "Connection closed");

        let Some(player_id) = conn.player else {
            return;
        };
        if self
            .connections
            .values()
            .any(|c| c.player == Some(player_id))
        {
            return;
        }

        if let Some(player) = self.players.get_mut(&player_id) {
            if player.lifecycle.is_active() {
                player.lifecycle = LifecycleState::GraceDisconnected { since: now };
                player.input = InputState::default();
                info!(player_id = %player_id, "Player entered disconnect grace");
            }
        }
    }

    fn remove_player(&mut self, player_id: Uuid) {
        if self.players.remove(&player_id).is_some() {
            info!(player_id = %player_id, players = self.players.len(), "Player removed");
        }
        for conn in self.connections.values_mut() {
            if conn.player == Some(player_id) {
                conn.player = None;
            }
        }
    }

    fn send_to(&self, conn_id: ConnectionId, msg: ServerMsg) {
        if let Some(conn) = self.connections.get(&conn_id) {
            let _ = conn.tx.try_send(msg);
        }
    }

    /// Fan a message out to every connection. A full queue skips this
    /// message for that client only; a closed queue is a disconnect.
    fn broadcast(&mut self, msg: ServerMsg, now: u64) {
        let mut closed = Vec::new();
        for (conn_id, conn) in &self.connections {
            match conn.tx.try_send(msg.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(conn_id = %conn_id, "Send queue full, snapshot skipped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*conn_id),
            }
        }
        for conn_id in closed {
            self.handle_disconnect(conn_id, now);
        }
    }

    fn update_stats(&self) {
        self.stats.players.store(self.players.len(), Ordering::Relaxed);
        self.stats
            .connections
            .store(self.connections.len(), Ordering::Relaxed);
        self.stats
            .projectiles
            .store(self.projectiles.count(), Ordering::Relaxed);
    }
}
