//! Dactyl Core - template metadata, registry file format, and lockout policy
//!
//! This crate provides the foundational types for the dactyl fingerprint
//! service: the enrolled-template record, the versioned durable document each
//! user's registry is persisted as, and the escalating lockout policy
//! consulted after failed matches.

pub mod document;
pub mod error;
pub mod lockout;
pub mod types;

pub use document::{RegistryDocument, DOCUMENT_VERSION};
pub use error::{CoreError, Result};
pub use lockout::{FailureTracker, LockoutConfig, LockoutMode, LockoutPolicy};
pub use types::{Template, NO_TEMPLATE};
