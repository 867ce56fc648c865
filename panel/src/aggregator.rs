use std::sync::Arc;

use tracing::debug;

use regpac_common::{PricingTier, Snapshot, SyncError};

use crate::{client::RegulatorApi, clock::Clock};

/// Fetches every resource for one cycle and merges the results.
#[derive(Clone)]
pub struct SnapshotAggregator {
    api: Arc<dyn RegulatorApi>,
    clock: Arc<dyn Clock>,
}

impl SnapshotAggregator {
    pub fn new(api: Arc<dyn RegulatorApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    pub async fn run_cycle(&self) -> Result<Snapshot, SyncError> {
        let (temperatures, heater, setpoints, tempo) = tokio::join!(
            self.api.temperatures(),
            self.api.heater_status(),
            self.api.setpoints(),
            self.api.tempo(),
        );

        let tempo = tempo.unwrap_or_else(|failure| {
            debug!("{failure}; using default tier");
            PricingTier::default()
        });

        Ok(Snapshot {
            temperatures: temperatures?,
            heater: heater?,
            setpoints: setpoints?,
            tempo,
            updated_at: self.clock.now_utc(),
        })
    }
}
