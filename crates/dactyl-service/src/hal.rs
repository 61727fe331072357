//! Daemon IPC boundary
//!
//! The hardware daemon owns sensor capture and matching; the service only
//! sees the synchronous call surface below. Calls block on the invoking
//! thread and report an integer result code, 0 meaning success, bounded by
//! the daemon's own timeouts.

use std::sync::Arc;

/// Success result code for daemon calls and session operations.
pub const OK: i32 = 0;

/// Returned when no daemon connection can be obtained at all.
///
/// Internal to the service: it is never delivered through a receiver because
/// with the daemon gone there is no channel to deliver an error through.
pub const ERROR_NO_SERVICE: i32 = 3;

/// Error kinds surfaced to callers through
/// [`EventReceiver::on_error`](crate::receiver::EventReceiver::on_error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The daemon is unreachable or reported a failure starting the operation
    HwUnavailable,
    /// The operation was cancelled on the caller's behalf
    Canceled,
    /// Authentication is suspended by a timed lockout
    Lockout,
    /// Authentication is suspended until failed attempts are reset
    LockoutPermanent,
}

impl ErrorKind {
    /// Historical wire code for this error kind
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::HwUnavailable => 1,
            ErrorKind::Canceled => 5,
            ErrorKind::Lockout => 7,
            ErrorKind::LockoutPermanent => 9,
        }
    }
}

/// Synchronous call surface of the fingerprint daemon.
///
/// Every call returns an integer result code with 0 as success; anything else
/// terminates the session that issued it.
pub trait FingerprintHal: Send + Sync {
    /// Begin capturing an enrollment under `group_id`. The token proves the
    /// caller recently passed credential verification.
    fn enroll(&self, token: &[u8], group_id: u32, timeout_secs: u32) -> i32;

    /// Begin matching against the templates enrolled under `group_id`.
    fn authenticate(&self, op_id: i64, group_id: u32) -> i32;

    /// Delete a template from the sensor's storage.
    fn remove(&self, group_id: u32, template_id: u32) -> i32;

    /// Cancel whichever operation is in flight.
    fn cancel(&self) -> i32;
}

/// Obtains the current daemon connection, which may be gone.
pub trait HalProvider: Send + Sync {
    /// The live connection, or `None` when the daemon process is absent.
    fn hal(&self) -> Option<Arc<dyn FingerprintHal>>;
}
