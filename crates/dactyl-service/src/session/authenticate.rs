use std::sync::Arc;

use tracing::{debug, error, warn};

use dactyl_core::{LockoutMode, LockoutPolicy, Template, NO_TEMPLATE};

use crate::hal::{ErrorKind, ERROR_NO_SERVICE, OK};
use crate::registry::RegistryStore;

use super::{CancelOutcome, Session, SessionContext};

/// Listens for match attempts until a success, a lockout, or cancellation.
///
/// Every failed attempt is reported to the caller and counted against the
/// user's lockout state; a success resets that state before the caller hears
/// about it. `op_id` is the caller's opaque operation handle, passed through
/// to the daemon untouched.
pub struct AuthenticateSession {
    context: SessionContext,
    registries: Arc<RegistryStore>,
    lockout: Arc<dyn LockoutPolicy>,
    op_id: i64,
}

impl AuthenticateSession {
    pub fn new(
        context: SessionContext,
        registries: Arc<RegistryStore>,
        lockout: Arc<dyn LockoutPolicy>,
        op_id: i64,
    ) -> Self {
        Self {
            context,
            registries,
            lockout,
            op_id,
        }
    }

    /// The template the daemon matched, with its enrolled name resolved for
    /// callers allowed to see it. Restricted callers get identity only.
    fn matched_template(&self, template_id: u32, group_id: u32) -> Template {
        let name = if self.context.restricted {
            String::new()
        } else {
            self.registries
                .templates_for(self.context.user_id)
                .ok()
                .and_then(|templates| {
                    templates
                        .into_iter()
                        .find(|t| t.template_id == template_id)
                        .map(|t| t.name)
                })
                .unwrap_or_default()
        };
        Template::new(name, group_id, template_id, self.context.device_id)
    }

    fn handle_failure(&self) -> bool {
        self.context.haptics.error();
        let listening = match self.context.receiver() {
            Some(receiver) => match receiver.on_authentication_failed(self.context.device_id) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "failed to notify failed attempt");
                    false
                }
            },
            None => {
                debug!("receiver gone before failure delivery");
                false
            }
        };
        match self.lockout.handle_failed_attempt() {
            // Nobody left to keep listening for means the session is over.
            LockoutMode::None => !listening,
            mode => {
                warn!(
                    user_id = self.context.user_id,
                    ?mode,
                    "too many failed attempts, locking out"
                );
                self.stop(false);
                let kind = match mode {
                    LockoutMode::Permanent => ErrorKind::LockoutPermanent,
                    _ => ErrorKind::Lockout,
                };
                self.context.deliver_error(kind, 0);
                true
            }
        }
    }

    fn handle_success(&self, template_id: u32, group_id: u32) -> bool {
        self.lockout.reset_failed_attempts();
        self.context.haptics.success();
        let Some(receiver) = self.context.receiver() else {
            debug!("receiver gone before success delivery");
            return true;
        };
        let template = self.matched_template(template_id, group_id);
        if let Err(e) =
            receiver.on_authentication_succeeded(self.context.device_id, template, self.context.user_id)
        {
            warn!(error = %e, "failed to notify authentication success");
        }
        true
    }
}

impl Session for AuthenticateSession {
    fn context(&self) -> &SessionContext {
        &self.context
    }

    fn start(&self) -> i32 {
        let Some(hal) = self.context.hal.hal() else {
            warn!("authenticate: no fingerprint daemon");
            return ERROR_NO_SERVICE;
        };
        let result = hal.authenticate(self.op_id, self.context.group_id);
        if result != OK {
            error!(result, owner = %self.context.owner, "daemon authenticate failed");
            self.context.telemetry.start_error("authenticate", result);
            self.context.deliver_error(ErrorKind::HwUnavailable, 0);
        }
        result
    }

    fn stop(&self, _initiated_by_caller: bool) -> i32 {
        match self.context.cancel_hal("authenticate") {
            CancelOutcome::AlreadyCancelled => OK,
            CancelOutcome::NoService => ERROR_NO_SERVICE,
            CancelOutcome::Failed(code) => code,
            // The daemon acknowledges the cancellation itself; nothing is
            // synthesized here.
            CancelOutcome::Cancelled => OK,
        }
    }

    fn on_authenticated(&self, template_id: u32, group_id: u32) -> bool {
        let authenticated = template_id != NO_TEMPLATE;
        self.context.telemetry.auth_attempt(authenticated);
        if authenticated {
            debug!(template_id, owner = %self.context.owner, "fingerprint matched");
            self.handle_success(template_id, group_id)
        } else {
            debug!(owner = %self.context.owner, "fingerprint did not match");
            self.handle_failure()
        }
    }
}
