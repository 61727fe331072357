use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::hal::{ErrorKind, ERROR_NO_SERVICE, OK};
use crate::registry::RegistryStore;

use super::{CancelOutcome, Session, SessionContext};

/// How long the daemon keeps the sensor armed for an enrollment.
pub const ENROLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives one enrollment from the first touch to the committed template.
///
/// Progress steps flow straight through to the caller; only the terminal
/// step (`remaining == 0`) commits the new template to the user's registry.
/// The hardware auth token is wiped from memory when the session drops.
pub struct EnrollSession {
    context: SessionContext,
    registries: Arc<RegistryStore>,
    token: Zeroizing<Vec<u8>>,
    timeout: Duration,
}

impl EnrollSession {
    pub fn new(
        context: SessionContext,
        registries: Arc<RegistryStore>,
        token: Vec<u8>,
        timeout: Duration,
    ) -> Self {
        Self {
            context,
            registries,
            token: Zeroizing::new(token),
            timeout,
        }
    }

    fn send_enroll_result(&self, template_id: u32, group_id: u32, remaining: u32) -> bool {
        self.context.haptics.success();
        self.context.telemetry.enrollment();
        let Some(receiver) = self.context.receiver() else {
            debug!("receiver gone before enroll delivery");
            return true;
        };
        if let Err(e) =
            receiver.on_enroll_result(self.context.device_id, template_id, group_id, remaining)
        {
            warn!(error = %e, "failed to notify enroll result");
            return true;
        }
        remaining == 0
    }
}

impl Session for EnrollSession {
    fn context(&self) -> &SessionContext {
        &self.context
    }

    fn start(&self) -> i32 {
        let Some(hal) = self.context.hal.hal() else {
            warn!("enroll: no fingerprint daemon");
            return ERROR_NO_SERVICE;
        };
        let timeout_secs = self.timeout.as_secs() as u32;
        let result = hal.enroll(&self.token, self.context.group_id, timeout_secs);
        if result != OK {
            error!(result, owner = %self.context.owner, "daemon enroll failed");
            self.context.telemetry.start_error("enroll", result);
            self.context.deliver_error(ErrorKind::HwUnavailable, 0);
        }
        result
    }

    fn stop(&self, initiated_by_caller: bool) -> i32 {
        match self.context.cancel_hal("enroll") {
            CancelOutcome::AlreadyCancelled => OK,
            CancelOutcome::NoService => ERROR_NO_SERVICE,
            CancelOutcome::Failed(code) => {
                if initiated_by_caller {
                    // The daemon may finish the enrollment anyway, but the
                    // caller asked out and must hear the acknowledgment.
                    self.context.deliver_error(ErrorKind::Canceled, 0);
                    self.context.mark_cancelled();
                    OK
                } else {
                    code
                }
            }
            CancelOutcome::Cancelled => {
                if initiated_by_caller {
                    self.context.deliver_error(ErrorKind::Canceled, 0);
                }
                OK
            }
        }
    }

    fn on_enroll_result(&self, template_id: u32, group_id: u32, remaining: u32) -> bool {
        if group_id != self.context.group_id {
            warn!(
                got = group_id,
                expected = self.context.group_id,
                "daemon reported a different group, trusting the daemon"
            );
        }
        if remaining == 0 {
            if let Err(e) = self
                .registries
                .add_for(self.context.user_id, template_id, group_id)
            {
                error!(error = %e, template_id, "failed to commit enrolled template");
            }
        }
        self.send_enroll_result(template_id, group_id, remaining)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::hal::{ErrorKind, ERROR_NO_SERVICE, OK};
    use crate::session::test_support::{
        context, registries, weak_receiver, Event, FakeHal, FakeProvider, RecordingReceiver,
    };
    use crate::session::{Session, SessionContext};

    use super::{EnrollSession, ENROLL_TIMEOUT};

    fn session(ctx: SessionContext, store: Arc<crate::registry::RegistryStore>) -> EnrollSession {
        EnrollSession::new(ctx, store, vec![0xAA; 69], ENROLL_TIMEOUT)
    }

    #[tokio::test]
    async fn start_issues_daemon_enroll() {
        let hal = Arc::new(FakeHal::default());
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let s = session(
            context(FakeProvider::up(Arc::clone(&hal)), weak_receiver(&receiver), false),
            registries(&dir),
        );
        assert_eq!(s.start(), OK);
        assert_eq!(hal.enroll_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_without_daemon_reports_no_service() {
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let s = session(
            context(FakeProvider::down(), weak_receiver(&receiver), false),
            registries(&dir),
        );
        assert_eq!(s.start(), ERROR_NO_SERVICE);
        assert!(receiver.events().is_empty());
    }

    #[tokio::test]
    async fn start_failure_reports_hardware_unavailable() {
        let hal = Arc::new(FakeHal {
            enroll_result: 2,
            ..FakeHal::default()
        });
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let s = session(
            context(FakeProvider::up(hal), weak_receiver(&receiver), false),
            registries(&dir),
        );
        assert_eq!(s.start(), 2);
        assert_eq!(receiver.events(), vec![Event::Error(ErrorKind::HwUnavailable)]);
    }

    #[tokio::test]
    async fn progress_steps_deliver_without_committing() {
        let hal = Arc::new(FakeHal::default());
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let store = registries(&dir);
        let s = session(
            context(FakeProvider::up(hal), weak_receiver(&receiver), false),
            Arc::clone(&store),
        );
        assert!(!s.on_enroll_result(3, 1, 2));
        assert!(store.templates_for(0).unwrap().is_empty());
        assert_eq!(
            receiver.events(),
            vec![Event::EnrollResult {
                template_id: 3,
                group_id: 1,
                remaining: 2,
            }]
        );
    }

    #[tokio::test]
    async fn terminal_step_commits_the_template() {
        let hal = Arc::new(FakeHal::default());
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let store = registries(&dir);
        let s = session(
            context(FakeProvider::up(hal), weak_receiver(&receiver), false),
            Arc::clone(&store),
        );
        assert!(!s.on_enroll_result(3, 1, 1));
        assert!(s.on_enroll_result(3, 1, 0));
        let templates = store.templates_for(0).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].template_id, 3);
        assert_eq!(templates[0].group_id, 1);
    }

    #[tokio::test]
    async fn daemon_group_wins_on_mismatch() {
        let hal = Arc::new(FakeHal::default());
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let store = registries(&dir);
        let s = session(
            context(FakeProvider::up(hal), weak_receiver(&receiver), false),
            Arc::clone(&store),
        );
        assert!(s.on_enroll_result(3, 9, 0));
        assert_eq!(store.templates_for(0).unwrap()[0].group_id, 9);
    }

    #[tokio::test]
    async fn every_delivered_step_records_an_enroll_sample() {
        use std::sync::atomic::{AtomicU32, Ordering};

        use crate::feedback::{NullFeedback, Telemetry};
        use crate::session::test_support::DEVICE_ID;

        #[derive(Default)]
        struct CountingTelemetry {
            enrollments: AtomicU32,
        }

        impl Telemetry for CountingTelemetry {
            fn auth_attempt(&self, _matched: bool) {}
            fn enrollment(&self) {
                self.enrollments.fetch_add(1, Ordering::SeqCst);
            }
            fn start_error(&self, _op: &str, _code: i32) {}
        }

        let hal = Arc::new(FakeHal::default());
        let receiver = Arc::new(RecordingReceiver::default());
        let telemetry = Arc::new(CountingTelemetry::default());
        let dir = tempfile::tempdir().unwrap();
        let ctx = SessionContext::new(
            FakeProvider::up(hal),
            weak_receiver(&receiver),
            0,
            1,
            false,
            "com.example.tests",
            DEVICE_ID,
            Arc::new(NullFeedback),
            Arc::clone(&telemetry) as Arc<dyn Telemetry>,
        );
        let s = EnrollSession::new(ctx, registries(&dir), vec![0xAA; 69], ENROLL_TIMEOUT);
        s.on_enroll_result(3, 1, 2);
        s.on_enroll_result(3, 1, 1);
        s.on_enroll_result(3, 1, 0);
        assert_eq!(telemetry.enrollments.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn caller_stop_acknowledges_cancellation() {
        let hal = Arc::new(FakeHal::default());
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let s = session(
            context(FakeProvider::up(Arc::clone(&hal)), weak_receiver(&receiver), false),
            registries(&dir),
        );
        assert_eq!(s.stop(true), OK);
        assert_eq!(hal.cancels(), 1);
        assert_eq!(receiver.events(), vec![Event::Error(ErrorKind::Canceled)]);
    }

    #[tokio::test]
    async fn failed_daemon_cancel_still_acknowledges_the_caller() {
        let hal = Arc::new(FakeHal {
            cancel_result: 5,
            ..FakeHal::default()
        });
        let receiver = Arc::new(RecordingReceiver::default());
        let dir = tempfile::tempdir().unwrap();
        let s = session(
            context(FakeProvider::up(Arc::clone(&hal)), weak_receiver(&receiver), false),
            registries(&dir),
        );
        assert_eq!(s.stop(true), OK);
        assert_eq!(receiver.events(), vec![Event::Error(ErrorKind::Canceled)]);
        // The flag was set; a second stop never re-contacts the daemon.
        assert_eq!(s.stop(true), OK);
        assert_eq!(hal.cancels(), 1);
    }
}
