//! Haptic and telemetry boundaries
//!
//! Emission itself belongs to the platform layer; sessions only signal
//! through these traits at the points the state machine defines.

/// Haptic confirmation of capture outcomes.
pub trait Haptics: Send + Sync {
    /// Short buzz after a successful capture or match
    fn success(&self);

    /// Double buzz after a failed match
    fn error(&self);
}

/// Usage counters recorded by sessions.
pub trait Telemetry: Send + Sync {
    /// One sample per authentication attempt, recorded before delivery
    fn auth_attempt(&self, matched: bool);

    /// One sample per delivered enrollment step
    fn enrollment(&self);

    /// The daemon returned a non-zero code starting `op`
    fn start_error(&self, op: &str, code: i32);
}

/// Discards all feedback; used by tests and headless deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl Haptics for NullFeedback {
    fn success(&self) {}
    fn error(&self) {}
}

impl Telemetry for NullFeedback {
    fn auth_attempt(&self, _matched: bool) {}
    fn enrollment(&self) {}
    fn start_error(&self, _op: &str, _code: i32) {}
}
