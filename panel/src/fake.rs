use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use regpac_common::{
    FetchFailure, HeaterState, PriceLevel, PricingTier, Resource, SetpointPair, SetpointUpdate,
    TemperatureReading,
};

use crate::client::RegulatorApi;

/// In-memory regulator. A posted setpoint becomes the served one.
pub struct FakeRegulator {
    state: Mutex<FakeState>,
    /// Held by a test to keep the temperatures fetch in flight.
    pub latch: tokio::sync::Mutex<()>,
    temperature_fetches: AtomicU64,
}

struct FakeState {
    temperatures: Vec<TemperatureReading>,
    heater: HeaterState,
    setpoints: SetpointPair,
    tempo: PricingTier,
    failures: HashMap<Resource, FetchFailure>,
    post_failure: Option<FetchFailure>,
    posted: Vec<SetpointUpdate>,
}

impl Default for FakeRegulator {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                temperatures: vec![
                    TemperatureReading {
                        name: "salon".into(),
                        temperature: 19.5,
                    },
                    TemperatureReading {
                        name: "chambre".into(),
                        temperature: 18.5,
                    },
                ],
                heater: HeaterState { on: true },
                setpoints: SetpointPair {
                    off_peak_temp: 19.0,
                    full_cost_temp: 17.0,
                },
                tempo: PricingTier {
                    today: PriceLevel::Low,
                    tomorrow: PriceLevel::High,
                },
                failures: HashMap::new(),
                post_failure: None,
                posted: Vec::new(),
            }),
            latch: tokio::sync::Mutex::new(()),
            temperature_fetches: AtomicU64::new(0),
        }
    }
}

impl FakeRegulator {
    pub fn fail(&self, resource: Resource, failure: FetchFailure) {
        self.state.lock().unwrap().failures.insert(resource, failure);
    }

    pub fn recover(&self, resource: Resource) {
        self.state.lock().unwrap().failures.remove(&resource);
    }

    pub fn fail_post(&self, failure: FetchFailure) {
        self.state.lock().unwrap().post_failure = Some(failure);
    }

    pub fn set_heater(&self, on: bool) {
        self.state.lock().unwrap().heater = HeaterState { on };
    }

    pub fn posted(&self) -> Vec<SetpointUpdate> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn temperature_fetches(&self) -> u64 {
        self.temperature_fetches.load(Ordering::SeqCst)
    }

    fn check(&self, resource: Resource) -> Result<(), FetchFailure> {
        match self.state.lock().unwrap().failures.get(&resource) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegulatorApi for FakeRegulator {
    async fn temperatures(&self) -> Result<Vec<TemperatureReading>, FetchFailure> {
        self.temperature_fetches.fetch_add(1, Ordering::SeqCst);
        drop(self.latch.lock().await);
        self.check(Resource::Temperatures)?;
        Ok(self.state.lock().unwrap().temperatures.clone())
    }

    async fn heater_status(&self) -> Result<HeaterState, FetchFailure> {
        self.check(Resource::HeaterStatus)?;
        Ok(self.state.lock().unwrap().heater)
    }

    async fn setpoints(&self) -> Result<SetpointPair, FetchFailure> {
        self.check(Resource::Setpoints)?;
        Ok(self.state.lock().unwrap().setpoints)
    }

    async fn tempo(&self) -> Result<PricingTier, FetchFailure> {
        self.check(Resource::Tempo).map_err(FetchFailure::optional)?;
        Ok(self.state.lock().unwrap().tempo)
    }

    async fn post_setpoint(&self, update: SetpointUpdate) -> Result<(), FetchFailure> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.post_failure.clone() {
            return Err(failure);
        }
        state.posted.push(update);
        state.setpoints = SetpointPair {
            off_peak_temp: update.off_peak_cost,
            full_cost_temp: update.full_cost,
        };
        Ok(())
    }
}
