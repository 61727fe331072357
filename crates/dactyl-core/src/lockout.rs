//! Authentication lockout policy
//!
//! Repeated failed matches escalate from no restriction to a timed backoff
//! and, eventually, a permanent lockout that requires an explicit reset. The
//! authenticate session consumes only the three-valued [`LockoutPolicy`]
//! contract; thresholds and the timed window are injected configuration, not
//! constants baked into the session.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Restriction in effect after a failed attempt is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutMode {
    /// No restriction
    None,
    /// Temporary backoff that decays after the configured window
    Timed,
    /// Locked until failed attempts are explicitly reset
    Permanent,
}

/// Injected lockout thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Consecutive failures before each timed lockout
    pub timed_threshold: u32,

    /// Consecutive failures before a permanent lockout
    pub permanent_threshold: u32,

    /// How long a timed lockout stays in effect, in milliseconds
    pub timed_duration_ms: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            timed_threshold: 5,
            permanent_threshold: 20,
            timed_duration_ms: 30_000,
        }
    }
}

/// Contract the authenticate session drives.
pub trait LockoutPolicy: Send + Sync {
    /// Records one failed match and reports the mode it escalated to.
    fn handle_failed_attempt(&self) -> LockoutMode;

    /// Clears the failure counter. Called unconditionally on any success.
    fn reset_failed_attempts(&self);
}

#[derive(Debug, Default)]
struct TrackerState {
    failed_attempts: u32,
    last_failure_ms: u64,
}

/// Failure counter and timer behind the [`LockoutPolicy`] contract.
#[derive(Debug)]
pub struct FailureTracker {
    config: LockoutConfig,
    state: Mutex<TrackerState>,
}

impl FailureTracker {
    /// Create a tracker with the given thresholds
    pub fn new(config: LockoutConfig) -> Self {
        // A zero timed threshold would make every attempt a lockout decision.
        let config = LockoutConfig {
            timed_threshold: config.timed_threshold.max(1),
            permanent_threshold: config.permanent_threshold.max(1),
            ..config
        };
        Self {
            config,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Current count of consecutive failed attempts
    pub fn failed_attempts(&self) -> u32 {
        self.lock_state().failed_attempts
    }

    /// Mode in effect at `now_ms` (unix epoch milliseconds). Timed lockouts
    /// decay once the configured window has elapsed since the last failure;
    /// permanent lockouts only clear through [`LockoutPolicy::reset_failed_attempts`].
    pub fn mode_at(&self, now_ms: u64) -> LockoutMode {
        let state = self.lock_state();
        if state.failed_attempts >= self.config.permanent_threshold {
            return LockoutMode::Permanent;
        }
        if state.failed_attempts > 0
            && state.failed_attempts % self.config.timed_threshold == 0
            && now_ms.saturating_sub(state.last_failure_ms) < self.config.timed_duration_ms
        {
            return LockoutMode::Timed;
        }
        LockoutMode::None
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LockoutPolicy for FailureTracker {
    fn handle_failed_attempt(&self) -> LockoutMode {
        let mut state = self.lock_state();
        state.failed_attempts += 1;
        state.last_failure_ms = now_ms();

        if state.failed_attempts >= self.config.permanent_threshold {
            LockoutMode::Permanent
        } else if state.failed_attempts % self.config.timed_threshold == 0 {
            LockoutMode::Timed
        } else {
            LockoutMode::None
        }
    }

    fn reset_failed_attempts(&self) {
        self.lock_state().failed_attempts = 0;
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
