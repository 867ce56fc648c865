use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use regpac_common::{RequestOutcome, SetpointError, SetpointField, SetpointUpdate};

use crate::{client::RegulatorApi, scheduler::PanelHandle};

/// Sends setpoint changes and raises the matching "applied" flag.
///
/// Deltas are always applied to the confirmed snapshot value, never to a
/// value still in flight.
#[derive(Clone)]
pub struct SetpointController {
    handle: PanelHandle,
    api: Arc<dyn RegulatorApi>,
}

impl SetpointController {
    pub fn new(handle: PanelHandle, api: Arc<dyn RegulatorApi>) -> Self {
        Self { handle, api }
    }

    pub async fn adjust(&self, field: SetpointField, delta: f32) -> Result<(), SetpointError> {
        let plan = self.handle.engine.lock().await.plan_adjust(field, delta);
        self.apply(field, plan).await
    }

    pub async fn set_absolute(&self, field: SetpointField, value: f32) -> Result<(), SetpointError> {
        let plan = self.handle.engine.lock().await.plan_absolute(field, value);
        self.apply(field, plan).await
    }

    async fn apply(
        &self,
        field: SetpointField,
        plan: Result<SetpointUpdate, SetpointError>,
    ) -> Result<(), SetpointError> {
        let result = match plan {
            Ok(update) => {
                info!(
                    "setting {} (offPeak {}, fullCost {})",
                    field.as_str(),
                    update.off_peak_cost,
                    update.full_cost
                );
                self.api
                    .post_setpoint(update)
                    .await
                    .map_err(SetpointError::from)
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                let (outcome, duration_ms) = {
                    let mut engine = self.handle.engine.lock().await;
                    let outcome = engine.record_mutation_success(field, self.handle.clock.now_ms());
                    (outcome, engine.config.notification_duration_ms)
                };
                if outcome != RequestOutcome::Ignored {
                    self.handle.wake_if_needed(outcome);
                    spawn_flag_expiry(self.handle.clone(), Duration::from_millis(duration_ms));
                }
                self.handle.publish().await;
                Ok(())
            }
            Err(err) => {
                warn!("setpoint update failed: {err}");
                self.handle
                    .engine
                    .lock()
                    .await
                    .record_mutation_failure(err.clone());
                self.handle.publish().await;
                Err(err)
            }
        }
    }
}

fn spawn_flag_expiry(handle: PanelHandle, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let cleared = handle
            .engine
            .lock()
            .await
            .expire_notifications(handle.clock.now_ms());
        if cleared {
            handle.publish().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregator::SnapshotAggregator,
        clock::{Clock, SystemClock},
        fake::FakeRegulator,
        scheduler::PollScheduler,
    };
    use chrono_tz::Tz;
    use regpac_common::{FetchFailure, PanelConfig, PollStatus, Trigger};

    struct Rig {
        fake: Arc<FakeRegulator>,
        scheduler: PollScheduler,
        controller: SetpointController,
    }

    async fn rig() -> Rig {
        let fake = Arc::new(FakeRegulator::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let handle = PanelHandle::new(PanelConfig::default(), clock.clone(), Tz::Europe__Paris);
        let scheduler = PollScheduler::start(
            handle.clone(),
            SnapshotAggregator::new(fake.clone(), clock),
            Duration::from_millis(10_000),
        );
        let controller = SetpointController::new(handle, fake.clone());
        settle().await;
        Rig {
            fake,
            scheduler,
            controller,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn adjust_sends_rounded_full_pair() {
        let rig = rig().await;
        rig.controller
            .adjust(SetpointField::OffPeak, 0.3)
            .await
            .unwrap();

        assert_eq!(
            rig.fake.posted(),
            vec![SetpointUpdate {
                off_peak_cost: 19.5,
                full_cost: 17.0,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_adjusts_do_not_stack() {
        let rig = rig().await;
        rig.controller
            .adjust(SetpointField::OffPeak, 0.5)
            .await
            .unwrap();
        rig.controller
            .adjust(SetpointField::OffPeak, 0.5)
            .await
            .unwrap();

        let posted = rig.fake.posted();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].off_peak_cost, 19.5);
        assert_eq!(posted[1].off_peak_cost, 19.5);
    }

    #[tokio::test(start_paused = true)]
    async fn success_forces_refresh_with_confirmed_value() {
        let rig = rig().await;
        let mut rx = rig.scheduler.handle().subscribe();
        rig.controller
            .set_absolute(SetpointField::FullCost, 18.0)
            .await
            .unwrap();

        let view = rx
            .wait_for(|view| view.completed_cycles >= 2)
            .await
            .map(|view| (*view).clone())
            .unwrap();
        assert_eq!(view.snapshot.unwrap().setpoints.full_cost_temp, 18.0);
    }

    #[tokio::test(start_paused = true)]
    async fn applied_flag_clears_after_one_second() {
        let rig = rig().await;
        rig.controller
            .adjust(SetpointField::FullCost, 1.0)
            .await
            .unwrap();

        let handle = rig.scheduler.handle();
        let view = handle.view().await;
        assert!(view.applied.full_cost);
        assert!(!view.applied.off_peak);

        // A timer cycle in between must not affect the flag.
        handle.refresh_and_wait(Trigger::Manual).await;
        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert!(handle.view().await.applied.full_cost);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert!(!handle.subscribe().borrow().applied.full_cost);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_update_surfaces_error_only() {
        let rig = rig().await;
        let handle = rig.scheduler.handle();
        let before = handle.view().await;
        rig.fake
            .fail_post(FetchFailure::http("Setpoint update", 500, "eeprom busy"));

        let err = rig
            .controller
            .adjust(SetpointField::OffPeak, 0.5)
            .await
            .unwrap_err();
        settle().await;

        let view = handle.view().await;
        assert_eq!(err.to_string(), "Setpoint update error (500): eeprom busy");
        assert_eq!(view.error.as_deref(), Some("Setpoint update error (500): eeprom busy"));
        assert!(!view.applied.off_peak);
        assert_eq!(view.snapshot, before.snapshot);
        assert_eq!(view.completed_cycles, before.completed_cycles);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_panel_sends_nothing() {
        let rig = rig().await;
        let handle = rig.scheduler.handle().clone();
        rig.scheduler.stop().await;
        let before = handle.view().await;

        let err = rig
            .controller
            .adjust(SetpointField::OffPeak, 0.5)
            .await
            .unwrap_err();
        settle().await;

        assert_eq!(err, SetpointError::Stopped);
        assert!(rig.fake.posted().is_empty());
        assert_eq!(handle.view().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_before_first_snapshot() {
        let fake = Arc::new(FakeRegulator::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let handle = PanelHandle::new(PanelConfig::default(), clock, Tz::Europe__Paris);
        let controller = SetpointController::new(handle.clone(), fake.clone());

        let err = controller
            .adjust(SetpointField::OffPeak, 0.5)
            .await
            .unwrap_err();

        assert_eq!(err, SetpointError::NotLoaded);
        assert!(fake.posted().is_empty());
        let view = handle.view().await;
        assert_eq!(view.status, PollStatus::Idle);
        assert_eq!(
            view.error.as_deref(),
            Some("Setpoint update error: setpoints not loaded yet")
        );
    }
}
