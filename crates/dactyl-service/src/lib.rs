//! Dactyl Service - fingerprint session state machines and template registry
//!
//! This crate mediates enroll / authenticate / remove operations between a
//! dispatcher and the hardware daemon that performs actual sensor matching:
//! - Session state machines with idempotent cancellation
//! - Escalating lockout after repeated failed matches
//! - Crash-safe per-user template registry with asynchronous persistence

pub mod config;
pub mod error;
pub mod feedback;
pub mod hal;
pub mod receiver;
pub mod registry;
pub mod session;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use feedback::{Haptics, NullFeedback, Telemetry};
pub use hal::{ErrorKind, FingerprintHal, HalProvider, ERROR_NO_SERVICE, OK};
pub use receiver::{Delivery, EventReceiver, ReceiverError};
pub use registry::{RegistryStore, TemplateRegistry};
pub use session::{
    AuthenticateSession, EnrollSession, RemoveSession, Session, SessionContext, ENROLL_TIMEOUT,
};
