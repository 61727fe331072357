//! Core types shared across the fingerprint service

use serde::{Deserialize, Serialize};

/// Template id the daemon reports when a match attempt found nothing.
pub const NO_TEMPLATE: u32 = 0;

/// Metadata for one enrolled fingerprint.
///
/// The raw biometric data never leaves the hardware daemon; this record only
/// carries the attributes the service needs to name, group, and address a
/// template. `template_id` is assigned by the daemon and is unique within a
/// user's registry at any instant, though an id may be reused after removal.
/// `name` is the only caller-mutable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Display name, generated unique-per-user at enroll time if not supplied
    pub name: String,

    /// Group the template was enrolled under
    pub group_id: u32,

    /// Daemon-assigned template id
    pub template_id: u32,

    /// Id of the sensor device the template lives on
    pub device_id: i64,
}

impl Template {
    /// Create a new template record
    pub fn new(name: impl Into<String>, group_id: u32, template_id: u32, device_id: i64) -> Self {
        Self {
            name: name.into(),
            group_id,
            template_id,
            device_id,
        }
    }
}
