use std::{sync::Arc, time::Duration};

use chrono_tz::Tz;
use tokio::{
    sync::{watch, Mutex, Notify},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use regpac_common::{PanelConfig, PanelEngine, PanelView, RequestOutcome, Trigger};

use crate::{aggregator::SnapshotAggregator, clock::Clock};

/// Shared access to the panel engine.
///
/// Every write goes through the engine mutex and is followed by a
/// `publish`, so watchers only ever see whole views.
#[derive(Clone)]
pub struct PanelHandle {
    pub(crate) engine: Arc<Mutex<PanelEngine>>,
    pub(crate) clock: Arc<dyn Clock>,
    timezone: Tz,
    wake: Arc<Notify>,
    view_tx: Arc<watch::Sender<PanelView>>,
    cancel: CancellationToken,
}

impl PanelHandle {
    pub fn new(config: PanelConfig, clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        let engine = PanelEngine::new(config);
        let (view_tx, _) = watch::channel(engine.view(clock.now_ms(), timezone));
        Self {
            engine: Arc::new(Mutex::new(engine)),
            clock,
            timezone,
            wake: Arc::new(Notify::new()),
            view_tx: Arc::new(view_tx),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn view(&self) -> PanelView {
        let engine = self.engine.lock().await;
        engine.view(self.clock.now_ms(), self.timezone)
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelView> {
        self.view_tx.subscribe()
    }

    pub async fn request_refresh(&self, trigger: Trigger) -> RequestOutcome {
        let outcome = self.engine.lock().await.request_refresh(trigger);
        self.wake_if_needed(outcome);
        outcome
    }

    /// Requests a cycle and resolves once a cycle started after the
    /// request has completed (or the panel stopped).
    pub async fn refresh_and_wait(&self, trigger: Trigger) -> PanelView {
        let target = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.request_refresh(trigger);
            self.wake_if_needed(outcome);
            engine.poll().started_cycles() + 1
        };

        let mut rx = self.subscribe();
        let waited = rx
            .wait_for(|view| view.stopped || view.completed_cycles >= target)
            .await
            .map(|view| (*view).clone());
        match waited {
            Ok(view) => view,
            Err(_) => self.view().await,
        }
    }

    pub async fn toggle_error(&self) -> PanelView {
        self.engine.lock().await.toggle_error();
        self.publish().await
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        self.engine.lock().await.stop();
        self.publish().await;
    }

    pub(crate) fn wake_if_needed(&self, outcome: RequestOutcome) {
        if outcome != RequestOutcome::Ignored {
            self.wake.notify_one();
        }
    }

    pub(crate) async fn publish(&self) -> PanelView {
        let view = self.view().await;
        self.view_tx.send_replace(view.clone());
        view
    }
}

/// Drives cycles on a fixed cadence and on request.
pub struct PollScheduler {
    handle: PanelHandle,
    task: JoinHandle<()>,
}

impl PollScheduler {
    /// Starts immediately; the first cycle does not wait for the timer.
    pub fn start(handle: PanelHandle, aggregator: SnapshotAggregator, period: Duration) -> Self {
        let task = tokio::spawn(run_loop(handle.clone(), aggregator, period));
        Self { handle, task }
    }

    pub fn handle(&self) -> &PanelHandle {
        &self.handle
    }

    /// Cancels the timer. A cycle already in flight finishes and is
    /// discarded.
    pub async fn stop(self) {
        self.handle.stop().await;
        drop(self.task);
    }
}

async fn run_loop(handle: PanelHandle, aggregator: SnapshotAggregator, period: Duration) {
    handle.request_refresh(Trigger::Start).await;

    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("poll scheduler started, period {}ms", period.as_millis());
    loop {
        run_pending_cycles(&handle, &aggregator).await;

        tokio::select! {
            _ = handle.cancel.cancelled() => break,
            _ = interval.tick() => {
                handle.request_refresh(Trigger::Timer).await;
            }
            _ = handle.wake.notified() => {}
        }
    }
    info!("poll scheduler stopped");
}

async fn run_pending_cycles(handle: &PanelHandle, aggregator: &SnapshotAggregator) {
    loop {
        let Some(trigger) = handle.engine.lock().await.begin_cycle() else {
            return;
        };
        handle.publish().await;
        debug!("cycle started ({})", trigger.as_str());

        let result = aggregator.run_cycle().await;
        match &result {
            Ok(_) => debug!("cycle succeeded ({})", trigger.as_str()),
            Err(err) => warn!("cycle failed: {err}"),
        }

        let applied = handle.engine.lock().await.complete_cycle(result);
        if !applied {
            debug!("discarding cycle result, panel stopped");
            return;
        }
        handle.publish().await;
    }
}
