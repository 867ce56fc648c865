pub mod aggregator;
pub mod client;
pub mod clock;
pub mod host;
pub mod scheduler;
pub mod setpoint;

#[cfg(test)]
mod fake;

pub use aggregator::SnapshotAggregator;
pub use client::{HttpRegulatorClient, RegulatorApi};
pub use clock::{Clock, SystemClock};
pub use scheduler::{PanelHandle, PollScheduler};
pub use setpoint::SetpointController;
