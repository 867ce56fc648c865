use chrono_tz::Tz;

use crate::{
    config::PanelConfig,
    error::{SetpointError, SyncError},
    poll::{PollState, RequestOutcome, Trigger},
    presentation::ErrorPresentation,
    setpoint::{plan_absolute, plan_adjust, NotificationFlags, SetpointField},
    types::{PanelView, PollStatus, Snapshot, SetpointUpdate},
};

/// Owned panel state: poll lifecycle, transient flags and error banner.
///
/// Time is always passed in by the caller so the engine stays clock-free.
#[derive(Debug, Clone)]
pub struct PanelEngine {
    pub config: PanelConfig,
    poll: PollState,
    notifications: NotificationFlags,
    errors: ErrorPresentation,
}

impl PanelEngine {
    pub fn new(mut config: PanelConfig) -> Self {
        config.sanitize();
        Self {
            config,
            poll: PollState::new(),
            notifications: NotificationFlags::default(),
            errors: ErrorPresentation::default(),
        }
    }

    pub fn poll(&self) -> &PollState {
        &self.poll
    }

    pub fn status(&self) -> PollStatus {
        self.poll.status()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.poll.snapshot()
    }

    pub fn sync_error(&self) -> Option<&SyncError> {
        self.poll.sync_error()
    }

    pub fn errors(&self) -> &ErrorPresentation {
        &self.errors
    }

    pub fn is_stopped(&self) -> bool {
        self.poll.is_stopped()
    }

    pub fn request_refresh(&mut self, trigger: Trigger) -> RequestOutcome {
        self.poll.request(trigger)
    }

    pub fn begin_cycle(&mut self) -> Option<Trigger> {
        let trigger = self.poll.begin_cycle()?;
        self.errors.clear();
        Some(trigger)
    }

    pub fn complete_cycle(&mut self, result: Result<Snapshot, SyncError>) -> bool {
        if !self.poll.complete_cycle(result) {
            return false;
        }
        if let Some(err) = self.poll.sync_error() {
            self.errors.show(err);
        }
        true
    }

    pub fn plan_adjust(
        &self,
        field: SetpointField,
        delta: f32,
    ) -> Result<SetpointUpdate, SetpointError> {
        self.ensure_running()?;
        plan_adjust(
            self.snapshot().map(|snapshot| &snapshot.setpoints),
            field,
            delta,
            self.config.setpoint_step_c,
        )
    }

    pub fn plan_absolute(
        &self,
        field: SetpointField,
        value: f32,
    ) -> Result<SetpointUpdate, SetpointError> {
        self.ensure_running()?;
        plan_absolute(
            self.snapshot().map(|snapshot| &snapshot.setpoints),
            field,
            value,
            self.config.setpoint_step_c,
        )
    }

    fn ensure_running(&self) -> Result<(), SetpointError> {
        if self.poll.is_stopped() {
            return Err(SetpointError::Stopped);
        }
        Ok(())
    }

    /// Raises the field's flag and queues the re-synchronizing cycle.
    pub fn record_mutation_success(
        &mut self,
        field: SetpointField,
        now_ms: u64,
    ) -> RequestOutcome {
        if self.poll.is_stopped() {
            return RequestOutcome::Ignored;
        }
        self.notifications
            .raise(field, now_ms, self.config.notification_duration_ms);
        self.poll.request(Trigger::Mutation)
    }

    pub fn record_mutation_failure(&mut self, err: SetpointError) -> bool {
        let err = SyncError::from(err);
        if !self.poll.set_error(err.clone()) {
            return false;
        }
        self.errors.show(&err);
        true
    }

    pub fn toggle_error(&mut self) -> bool {
        self.errors.toggle()
    }

    pub fn expire_notifications(&mut self, now_ms: u64) -> bool {
        self.notifications.expire(now_ms)
    }

    pub fn stop(&mut self) {
        self.poll.stop();
    }

    pub fn view(&self, now_ms: u64, timezone: Tz) -> PanelView {
        let snapshot = self.poll.snapshot().cloned();
        PanelView {
            status: self.poll.status(),
            average_temp: snapshot.as_ref().and_then(Snapshot::average_temperature),
            last_update: snapshot.as_ref().map(|snapshot| {
                snapshot
                    .updated_at
                    .with_timezone(&timezone)
                    .format("%H:%M:%S")
                    .to_string()
            }),
            snapshot,
            error: self.errors.message().map(str::to_string),
            error_expanded: self.errors.is_expanded(),
            applied: self.notifications.applied(now_ms),
            completed_cycles: self.poll.completed_cycles(),
            stopped: self.poll.is_stopped(),
        }
    }
}
