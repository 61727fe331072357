//! Session-to-caller callback boundary

use thiserror::Error;

use dactyl_core::Template;

use crate::hal::ErrorKind;

/// Delivery failure to the caller's receiver.
///
/// The remote side may legitimately have gone away mid-operation; sessions
/// log these and carry on rather than escalating.
#[derive(Debug, Error)]
#[error("receiver delivery failed: {0}")]
pub struct ReceiverError(pub String);

/// Result of one callback delivery attempt
pub type Delivery = std::result::Result<(), ReceiverError>;

/// Callbacks a session delivers to the caller that requested the operation.
///
/// Sessions hold this behind a weak reference: a receiver that has been
/// dropped is treated as "client not listening", never as an error.
pub trait EventReceiver: Send + Sync {
    /// Progress or completion of an enrollment; terminal at `remaining == 0`.
    fn on_enroll_result(
        &self,
        device_id: i64,
        template_id: u32,
        group_id: u32,
        remaining: u32,
    ) -> Delivery;

    /// A match was found. Restricted sessions deliver the template with an
    /// empty name.
    fn on_authentication_succeeded(
        &self,
        device_id: i64,
        template: Template,
        user_id: i32,
    ) -> Delivery;

    /// The capture completed but matched no enrolled template.
    fn on_authentication_failed(&self, device_id: i64) -> Delivery;

    /// Progress or completion of a removal; terminal at `remaining == 0`.
    fn on_removed(&self, device_id: i64, template_id: u32, group_id: u32, remaining: u32)
        -> Delivery;

    /// The operation ended abnormally.
    fn on_error(&self, device_id: i64, kind: ErrorKind, vendor_code: i32) -> Delivery;
}
