//! Player lifecycle state machine
//!
//! A player is exactly one of active, grace-disconnected, or sleeping.
//! Legacy iterations tracked disconnection and sleep in separate tables
//! with inconsistent precedence; here a single enum makes the two
//! structurally exclusive, so entering either state implicitly clears the
//! other's pending timer. Removal is terminal and implicit (the record is
//! deleted).

/// Membership state of a player in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Connected and accepting input
    Active,
    /// Socket closed; state preserved for reconnection until the grace
    /// window elapses
    GraceDisconnected { since: u64 },
    /// Idle; body retained, input not accepted, reactivated by any valid
    /// message
    Sleeping { since: u64 },
}

impl LifecycleState {
    pub fn is_active(&self) -> bool {
        matches!(self, LifecycleState::Active)
    }

    pub fn is_sleeping(&self) -> bool {
        matches!(self, LifecycleState::Sleeping { .. })
    }
}

/// Sweep thresholds, all in milliseconds
#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    pub grace_period_ms: u64,
    pub idle_sleep_ms: u64,
    pub sleep_expiry_ms: u64,
}

/// What the periodic sweep should do with one player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Demote an idle active player to sleeping
    Sleep,
    /// Destroy the body and delete the record
    Remove,
}

/// Decide the sweep action for one player
pub fn sweep_decision(
    state: &LifecycleState,
    last_input_at: u64,
    now: u64,
    config: &LifecycleConfig,
) -> Option<Transition> {
    match state {
        LifecycleState::Active => (now.saturating_sub(last_input_at) >= config.idle_sleep_ms)
            .then_some(Transition::Sleep),
        LifecycleState::GraceDisconnected { since } => {
            (now.saturating_sub(*since) >= config.grace_period_ms).then_some(Transition::Remove)
        }
        LifecycleState::Sleeping { since } => {
            (now.saturating_sub(*since) >= config.sleep_expiry_ms).then_some(Transition::Remove)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: LifecycleConfig = LifecycleConfig {
        grace_period_ms: 120_000,
        idle_sleep_ms: 60_000,
        sleep_expiry_ms: 1_800_000,
    };

    #[test]
    fn active_with_recent_input_stays_put() {
        assert_eq!(
            sweep_decision(&LifecycleState::Active, 1000, 30_000, &CONFIG),
            None
        );
    }

    #[test]
    fn active_idle_past_threshold_sleeps() {
        assert_eq!(
            sweep_decision(&LifecycleState::Active, 0, 60_000, &CONFIG),
            Some(Transition::Sleep)
        );
    }

    #[test]
    fn grace_within_window_is_preserved() {
        let state = LifecycleState::GraceDisconnected { since: 100_000 };
        assert_eq!(sweep_decision(&state, 0, 150_000, &CONFIG), None);
    }

    #[test]
    fn grace_expiry_removes() {
        let state = LifecycleState::GraceDisconnected { since: 0 };
        assert_eq!(
            sweep_decision(&state, 0, 120_000, &CONFIG),
            Some(Transition::Remove)
        );
    }

    #[test]
    fn sleeping_is_not_subject_to_idle_or_grace_timers() {
        let state = LifecycleState::Sleeping { since: 1_000_000 };
        assert_eq!(sweep_decision(&state, 0, 1_500_000, &CONFIG), None);
    }

    #[test]
    fn sleeping_expires_after_long_bound() {
        let state = LifecycleState::Sleeping { since: 0 };
        assert_eq!(sweep_decision(&state, 0, 1_799_999, &CONFIG), None);
        assert_eq!(
            sweep_decision(&state, 0, 1_800_000, &CONFIG),
            Some(Transition::Remove)
        );
    }
}
