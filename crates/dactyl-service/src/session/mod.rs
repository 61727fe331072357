//! Client session state machines
//!
//! One session per in-flight enroll / authenticate / remove operation. The
//! dispatcher holds at most one active session per user/sensor pair, calls
//! `start` to issue the daemon-side operation, and routes daemon callbacks
//! into the result handlers. `remaining == 0` is the uniform terminal signal
//! across every callback shape. Sessions are discarded after termination,
//! never reused.

mod authenticate;
mod enroll;
mod remove;

pub use authenticate::AuthenticateSession;
pub use enroll::{EnrollSession, ENROLL_TIMEOUT};
pub use remove::RemoveSession;

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, warn};

use crate::feedback::{Haptics, Telemetry};
use crate::hal::{ErrorKind, HalProvider, OK};
use crate::receiver::EventReceiver;

/// Shared identity and wiring for one in-flight operation.
pub struct SessionContext {
    pub(crate) hal: Arc<dyn HalProvider>,
    pub(crate) receiver: Weak<dyn EventReceiver>,
    pub(crate) user_id: i32,
    pub(crate) group_id: u32,
    pub(crate) restricted: bool,
    pub(crate) owner: String,
    pub(crate) device_id: i64,
    pub(crate) haptics: Arc<dyn Haptics>,
    pub(crate) telemetry: Arc<dyn Telemetry>,
    /// Monotonic: set exactly once, under this session's one lock
    cancelled: Mutex<bool>,
}

/// Outcome of one daemon-side cancellation request.
pub(crate) enum CancelOutcome {
    /// A previous stop already cancelled; nothing was sent
    AlreadyCancelled,
    /// No daemon connection to cancel through
    NoService,
    /// The daemon rejected the cancel with this code
    Failed(i32),
    /// Cancelled; the flag is now set
    Cancelled,
}

impl SessionContext {
    /// Wire up the identity for one operation. `owner` tags log lines with
    /// the requesting package; `restricted` hides template names from the
    /// caller.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hal: Arc<dyn HalProvider>,
        receiver: Weak<dyn EventReceiver>,
        user_id: i32,
        group_id: u32,
        restricted: bool,
        owner: impl Into<String>,
        device_id: i64,
        haptics: Arc<dyn Haptics>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            hal,
            receiver,
            user_id,
            group_id,
            restricted,
            owner: owner.into(),
            device_id,
            haptics,
            telemetry,
            cancelled: Mutex::new(false),
        }
    }

    /// The caller's receiver, if it is still reachable
    pub(crate) fn receiver(&self) -> Option<Arc<dyn EventReceiver>> {
        self.receiver.upgrade()
    }

    /// Run the already-cancelled check and the daemon cancel call under the
    /// session's single lock, so a stop racing an in-flight callback requests
    /// daemon cancellation at most once.
    pub(crate) fn cancel_hal(&self, op: &str) -> CancelOutcome {
        let mut cancelled = self.lock_cancelled();
        if *cancelled {
            warn!(op, owner = %self.owner, "stop: already cancelled");
            return CancelOutcome::AlreadyCancelled;
        }
        let Some(hal) = self.hal.hal() else {
            warn!(op, "stop: no fingerprint daemon");
            return CancelOutcome::NoService;
        };
        let result = hal.cancel();
        if result != OK {
            warn!(op, result, "daemon cancel failed");
            return CancelOutcome::Failed(result);
        }
        *cancelled = true;
        debug!(op, owner = %self.owner, "daemon cancel requested");
        CancelOutcome::Cancelled
    }

    /// Set the cancelled flag without another daemon call
    pub(crate) fn mark_cancelled(&self) {
        *self.lock_cancelled() = true;
    }

    /// Deliver an error to the receiver, logging rather than escalating a
    /// delivery failure.
    pub(crate) fn deliver_error(&self, kind: ErrorKind, vendor_code: i32) {
        if let Some(receiver) = self.receiver() {
            if let Err(e) = receiver.on_error(self.device_id, kind, vendor_code) {
                warn!(error = %e, ?kind, "failed to notify error");
            }
        }
    }

    fn lock_cancelled(&self) -> std::sync::MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Contract shared by every session variant.
///
/// Each variant implements exactly one result handler meaningfully; the
/// defaults debug-log the misroute and report done, so a callback routed to
/// the wrong session kind never hangs the dispatcher. Enumeration sessions
/// live outside this crate and only rely on the shared default here.
pub trait Session: Send + Sync {
    /// The session's shared identity and wiring
    fn context(&self) -> &SessionContext;

    /// Issue the daemon-side operation. Returns [`OK`](crate::hal::OK) on
    /// success, the daemon's code on failure, or
    /// [`ERROR_NO_SERVICE`](crate::hal::ERROR_NO_SERVICE) when no daemon
    /// connection exists.
    fn start(&self) -> i32;

    /// Request daemon-side cancellation. Idempotent: a second stop returns
    /// success without contacting the daemon again.
    fn stop(&self, initiated_by_caller: bool) -> i32;

    /// Daemon reported enrollment progress
    fn on_enroll_result(&self, template_id: u32, group_id: u32, remaining: u32) -> bool {
        let _ = (template_id, group_id, remaining);
        debug!(owner = %self.context().owner, "enroll result for a non-enroll session");
        true
    }

    /// Daemon reported a match attempt (template id 0 means no match)
    fn on_authenticated(&self, template_id: u32, group_id: u32) -> bool {
        let _ = (template_id, group_id);
        debug!(owner = %self.context().owner, "match result for a non-authenticate session");
        true
    }

    /// Daemon reported removal progress
    fn on_removed(&self, template_id: u32, group_id: u32, remaining: u32) -> bool {
        let _ = (template_id, group_id, remaining);
        debug!(owner = %self.context().owner, "removal result for a non-remove session");
        true
    }

    /// Daemon reported enumeration progress
    fn on_enumeration_result(&self, template_id: u32, group_id: u32, remaining: u32) -> bool {
        let _ = (template_id, group_id, remaining);
        debug!(owner = %self.context().owner, "enumeration result for this session kind");
        true
    }
}
