use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use regpac_common::{
    resource_url, FetchFailure, HeaterState, HeaterStatusPayload, PricingTier, Resource,
    SetpointPair, SetpointPayload, SetpointUpdate, TemperatureReading, TemperaturesPayload,
    LABEL_SETPOINT_UPDATE, PATH_SETPOINT,
};

/// The regulator's HTTP API as seen by the panel.
#[async_trait]
pub trait RegulatorApi: Send + Sync {
    async fn temperatures(&self) -> Result<Vec<TemperatureReading>, FetchFailure>;

    async fn heater_status(&self) -> Result<HeaterState, FetchFailure>;

    async fn setpoints(&self) -> Result<SetpointPair, FetchFailure>;

    /// Any failure comes back as `OptionalResourceUnavailable`.
    async fn tempo(&self) -> Result<PricingTier, FetchFailure>;

    async fn post_setpoint(&self, update: SetpointUpdate) -> Result<(), FetchFailure>;
}

#[derive(Debug, Clone)]
pub struct HttpRegulatorClient {
    http: Client,
    base_url: String,
}

impl HttpRegulatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch<T: DeserializeOwned>(&self, resource: Resource) -> Result<T, FetchFailure> {
        let label = resource.label();
        let url = resource_url(&self.base_url, resource.path());
        debug!("fetching {url}");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| FetchFailure::network(label, err))?;
        let response = ensure_success(label, response).await?;

        response
            .json::<T>()
            .await
            .map_err(|err| FetchFailure::decode(label, err))
    }
}

async fn ensure_success(label: &'static str, response: Response) -> Result<Response, FetchFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(FetchFailure::http(label, status.as_u16(), body))
}

#[async_trait]
impl RegulatorApi for HttpRegulatorClient {
    async fn temperatures(&self) -> Result<Vec<TemperatureReading>, FetchFailure> {
        self.fetch::<TemperaturesPayload>(Resource::Temperatures)
            .await
            .map(|payload| payload.temperatures)
    }

    async fn heater_status(&self) -> Result<HeaterState, FetchFailure> {
        self.fetch::<HeaterStatusPayload>(Resource::HeaterStatus)
            .await
            .map(HeaterState::from)
    }

    async fn setpoints(&self) -> Result<SetpointPair, FetchFailure> {
        self.fetch::<SetpointPayload>(Resource::Setpoints)
            .await
            .map(SetpointPair::from)
    }

    async fn tempo(&self) -> Result<PricingTier, FetchFailure> {
        self.fetch::<PricingTier>(Resource::Tempo)
            .await
            .map_err(FetchFailure::optional)
    }

    async fn post_setpoint(&self, update: SetpointUpdate) -> Result<(), FetchFailure> {
        let url = resource_url(&self.base_url, PATH_SETPOINT);
        let response = self
            .http
            .post(&url)
            .json(&update)
            .send()
            .await
            .map_err(|err| FetchFailure::network(LABEL_SETPOINT_UPDATE, err))?;

        ensure_success(LABEL_SETPOINT_UPDATE, response).await?;
        Ok(())
    }
}
