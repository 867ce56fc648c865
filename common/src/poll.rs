use crate::{error::SyncError, types::PollStatus, types::Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    Timer,
    Manual,
    Mutation,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Timer => "timer",
            Self::Manual => "manual",
            Self::Mutation => "mutation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The next `begin_cycle` will start it.
    Scheduled,
    /// A cycle is in flight; this one runs right after it.
    Queued,
    /// Folded into a request that was already waiting.
    Coalesced,
    Ignored,
}

/// Cycle lifecycle plus the single live snapshot and error.
///
/// At most one cycle is in flight: `begin_cycle` refuses while `Loading`,
/// and requests made meanwhile collapse into one follow-up cycle.
#[derive(Debug, Clone)]
pub struct PollState {
    status: PollStatus,
    snapshot: Option<Snapshot>,
    sync_error: Option<SyncError>,
    pending: Option<Trigger>,
    stopped: bool,
    started_cycles: u64,
    completed_cycles: u64,
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}

impl PollState {
    pub fn new() -> Self {
        Self {
            status: PollStatus::Idle,
            snapshot: None,
            sync_error: None,
            pending: None,
            stopped: false,
            started_cycles: 0,
            completed_cycles: 0,
        }
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn sync_error(&self) -> Option<&SyncError> {
        self.sync_error.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn started_cycles(&self) -> u64 {
        self.started_cycles
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    pub fn request(&mut self, trigger: Trigger) -> RequestOutcome {
        if self.stopped {
            return RequestOutcome::Ignored;
        }
        if self.pending.is_some() {
            return RequestOutcome::Coalesced;
        }

        self.pending = Some(trigger);
        if self.status == PollStatus::Loading {
            RequestOutcome::Queued
        } else {
            RequestOutcome::Scheduled
        }
    }

    /// Enters `Loading` if a request is waiting and nothing is in flight.
    pub fn begin_cycle(&mut self) -> Option<Trigger> {
        if self.stopped || self.status == PollStatus::Loading {
            return None;
        }
        let trigger = self.pending.take()?;

        self.status = PollStatus::Loading;
        self.sync_error = None;
        self.started_cycles += 1;
        Some(trigger)
    }

    /// Returns false when the result was discarded.
    pub fn complete_cycle(&mut self, result: Result<Snapshot, SyncError>) -> bool {
        if self.stopped || self.status != PollStatus::Loading {
            return false;
        }

        self.completed_cycles += 1;
        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.status = PollStatus::Ready;
            }
            Err(err) => {
                self.sync_error = Some(err);
                self.status = PollStatus::Failed;
            }
        }
        true
    }

    /// Overwrites the live error without touching the snapshot or status.
    pub fn set_error(&mut self, err: SyncError) -> bool {
        if self.stopped {
            return false;
        }
        self.sync_error = Some(err);
        true
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        self.pending = None;
    }
}
