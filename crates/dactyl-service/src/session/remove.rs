use std::sync::Arc;

use tracing::{debug, error, warn};

use dactyl_core::NO_TEMPLATE;

use crate::hal::{ErrorKind, ERROR_NO_SERVICE, OK};
use crate::registry::RegistryStore;

use super::{CancelOutcome, Session, SessionContext};

/// Deletes one template (or a whole group when `template_id` is 0) and keeps
/// the registry in step with what the daemon reports back.
pub struct RemoveSession {
    context: SessionContext,
    registries: Arc<RegistryStore>,
    template_id: u32,
}

impl RemoveSession {
    pub fn new(context: SessionContext, registries: Arc<RegistryStore>, template_id: u32) -> Self {
        Self {
            context,
            registries,
            template_id,
        }
    }
}

impl Session for RemoveSession {
    fn context(&self) -> &SessionContext {
        &self.context
    }

    fn start(&self) -> i32 {
        let Some(hal) = self.context.hal.hal() else {
            warn!("remove: no fingerprint daemon");
            return ERROR_NO_SERVICE;
        };
        let result = hal.remove(self.context.group_id, self.template_id);
        if result != OK {
            error!(result, owner = %self.context.owner, "daemon remove failed");
            self.context.telemetry.start_error("remove", result);
            self.context.deliver_error(ErrorKind::HwUnavailable, 0);
        }
        result
    }

    fn stop(&self, _initiated_by_caller: bool) -> i32 {
        match self.context.cancel_hal("remove") {
            CancelOutcome::AlreadyCancelled => OK,
            CancelOutcome::NoService => ERROR_NO_SERVICE,
            CancelOutcome::Failed(code) => code,
            // Only enrollment synthesizes a cancellation acknowledgment.
            CancelOutcome::Cancelled => OK,
        }
    }

    fn on_removed(&self, template_id: u32, _group_id: u32, remaining: u32) -> bool {
        if template_id != NO_TEMPLATE {
            if let Err(e) = self
                .registries
                .remove_for(self.context.user_id, template_id)
            {
                error!(error = %e, template_id, "failed to drop removed template");
            }
        }
        let Some(receiver) = self.context.receiver() else {
            debug!("receiver gone before removal delivery");
            return true;
        };
        // Callers identify removals by the group they asked about, not the
        // group the daemon stores internally.
        if let Err(e) = receiver.on_removed(
            self.context.device_id,
            template_id,
            self.context.group_id,
            remaining,
        ) {
            // Logged only; the batch still runs to its terminal step.
            warn!(error = %e, "failed to notify removal");
        }
        remaining == 0
    }
}
