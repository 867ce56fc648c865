pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod poll;
pub mod presentation;
pub mod setpoint;
pub mod types;

pub use api::*;
pub use config::{NetworkConfig, PanelConfig, RuntimeConfig};
pub use engine::PanelEngine;
pub use error::{FetchFailure, SetpointError, SyncError};
pub use poll::{PollState, RequestOutcome, Trigger};
pub use presentation::ErrorPresentation;
pub use setpoint::{round_to_step, NotificationFlags, SetpointField};
pub use types::{
    AppliedFlags, HeaterState, HeaterStatusPayload, PanelView, PollStatus, PriceLevel,
    PricingTier, SetpointPair, SetpointPayload, SetpointUpdate, Snapshot, TemperatureReading,
    TemperaturesPayload,
};
