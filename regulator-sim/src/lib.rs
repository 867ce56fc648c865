pub mod host;

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use regpac_common::{
    HeaterStatusPayload, PriceLevel, PricingTier, SetpointPair, SetpointPayload, SetpointUpdate,
    TemperatureReading, TemperaturesPayload, PATH_HEATER_STATUS, PATH_SETPOINT,
    PATH_TEMPERATURES, PATH_TEMPO,
};

/// Hours (local to the simulator) during which the off-peak setpoint applies.
const OFF_PEAK_START_HOUR: u32 = 22;
const OFF_PEAK_END_HOUR: u32 = 6;

const INVALID_SETPOINT: &str = "Invalid setpoint temperature value";

/// In-memory stand-in for the regulator backend.
#[derive(Clone)]
pub struct SimRegulator {
    state: Arc<Mutex<SimState>>,
}

struct SimState {
    sensors: Vec<Sensor>,
    heater_on: bool,
    setpoints: SetpointPair,
    tempo: Option<PricingTier>,
    injected: HashMap<&'static str, Injected>,
}

struct Sensor {
    name: &'static str,
    base: f32,
    temperature: f32,
}

#[derive(Clone)]
struct Injected {
    status: StatusCode,
    body: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

impl Default for SimRegulator {
    fn default() -> Self {
        let sensors = vec![
            Sensor::new("salon", 19.5),
            Sensor::new("chambre", 18.5),
        ];
        Self {
            state: Arc::new(Mutex::new(SimState {
                sensors,
                heater_on: false,
                setpoints: SetpointPair {
                    off_peak_temp: 19.0,
                    full_cost_temp: 17.0,
                },
                tempo: Some(PricingTier {
                    today: PriceLevel::Low,
                    tomorrow: PriceLevel::Normal,
                }),
                injected: HashMap::new(),
            })),
        }
    }
}

impl Sensor {
    fn new(name: &'static str, base: f32) -> Self {
        Self {
            name,
            base,
            temperature: base,
        }
    }
}

impl SimRegulator {
    /// Makes the route at `path` answer `status` with a plain-text `body`
    /// until `recover` is called.
    pub async fn fail(&self, path: &'static str, status: u16, body: impl Into<String>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.state.lock().await.injected.insert(
            path,
            Injected {
                status,
                body: body.into(),
            },
        );
    }

    pub async fn recover(&self, path: &'static str) {
        self.state.lock().await.injected.remove(path);
    }

    /// `None` removes the tempo endpoint, as on older firmware.
    pub async fn set_tempo(&self, tempo: Option<PricingTier>) {
        self.state.lock().await.tempo = tempo;
    }

    pub async fn setpoints(&self) -> SetpointPair {
        self.state.lock().await.setpoints
    }

    pub async fn heater_on(&self) -> bool {
        self.state.lock().await.heater_on
    }

    /// Moves every sensor along a slow sawtooth and re-runs regulation.
    pub async fn drift(&self, tick: u64, hour: u32) {
        let mut state = self.state.lock().await;
        let heating = state.heater_on;
        for (offset, sensor) in state.sensors.iter_mut().enumerate() {
            let step = (tick + offset as u64) % 8;
            let boost = if heating { 0.3 } else { 0.0 };
            sensor.temperature = round_tenth(sensor.base + step as f32 * 0.1 + boost);
        }
        state.regulate(hour);
    }

    async fn injected(&self, path: &'static str) -> Option<Response> {
        let state = self.state.lock().await;
        state
            .injected
            .get(path)
            .cloned()
            .map(|injected| (injected.status, injected.body).into_response())
    }
}

impl SimState {
    fn average(&self) -> Option<f32> {
        if self.sensors.is_empty() {
            return None;
        }
        let sum: f32 = self.sensors.iter().map(|sensor| sensor.temperature).sum();
        Some(sum / self.sensors.len() as f32)
    }

    fn active_setpoint(&self, hour: u32) -> f32 {
        if is_off_peak(hour) {
            self.setpoints.off_peak_temp
        } else {
            self.setpoints.full_cost_temp
        }
    }

    fn regulate(&mut self, hour: u32) {
        let Some(average) = self.average() else {
            return;
        };
        let target = self.active_setpoint(hour);
        let heater_on = average < target;
        if heater_on != self.heater_on {
            info!("heater {} (average {average:.1}, target {target:.1})", on_off(heater_on));
        }
        self.heater_on = heater_on;
    }
}

pub fn router(sim: SimRegulator) -> Router {
    let api = Router::new()
        .route(&format!("/{PATH_TEMPERATURES}"), get(handle_get_temperatures))
        .route(&format!("/{PATH_HEATER_STATUS}"), get(handle_get_heater_status))
        .route(
            &format!("/{PATH_SETPOINT}"),
            get(handle_get_setpoint).post(handle_post_setpoint),
        )
        .route(&format!("/{PATH_TEMPO}"), get(handle_get_tempo))
        .with_state(sim);

    Router::new().nest("/api", api)
}

async fn handle_get_temperatures(State(sim): State<SimRegulator>) -> Response {
    if let Some(response) = sim.injected(PATH_TEMPERATURES).await {
        return response;
    }
    let state = sim.state.lock().await;
    let temperatures = state
        .sensors
        .iter()
        .map(|sensor| TemperatureReading {
            name: sensor.name.to_string(),
            temperature: sensor.temperature,
        })
        .collect();
    Json(TemperaturesPayload { temperatures }).into_response()
}

async fn handle_get_heater_status(State(sim): State<SimRegulator>) -> Response {
    if let Some(response) = sim.injected(PATH_HEATER_STATUS).await {
        return response;
    }
    let heater_on = sim.state.lock().await.heater_on;
    Json(HeaterStatusPayload { heater_on }).into_response()
}

async fn handle_get_setpoint(State(sim): State<SimRegulator>) -> Response {
    if let Some(response) = sim.injected(PATH_SETPOINT).await {
        return response;
    }
    let setpoints = sim.state.lock().await.setpoints;
    Json(SetpointPayload::from(setpoints)).into_response()
}

async fn handle_post_setpoint(State(sim): State<SimRegulator>, body: Bytes) -> Response {
    if let Some(response) = sim.injected(PATH_SETPOINT).await {
        return response;
    }

    let Some(update) = parse_setpoint_update(&body) else {
        warn!("rejected setpoint body: {}", String::from_utf8_lossy(&body));
        return error_response(StatusCode::BAD_REQUEST, INVALID_SETPOINT);
    };

    let mut state = sim.state.lock().await;
    state.setpoints = SetpointPair {
        off_peak_temp: update.off_peak_cost,
        full_cost_temp: update.full_cost,
    };
    info!(
        "setpoints updated (off-peak {:.1}, full cost {:.1})",
        update.off_peak_cost, update.full_cost
    );
    state.regulate(current_hour());

    Json(MessageBody {
        message: "setpoint temperature updated",
    })
    .into_response()
}

async fn handle_get_tempo(State(sim): State<SimRegulator>) -> Response {
    if let Some(response) = sim.injected(PATH_TEMPO).await {
        return response;
    }
    match sim.state.lock().await.tempo {
        Some(tempo) => Json(tempo).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Tempo data not available"),
    }
}

/// Accepts numbers or numeric strings for both fields.
fn parse_setpoint_update(body: &[u8]) -> Option<SetpointUpdate> {
    let value: Value = serde_json::from_slice(body).ok()?;
    Some(SetpointUpdate {
        off_peak_cost: number_field(&value, "off_peak_cost")?,
        full_cost: number_field(&value, "full_cost")?,
    })
}

fn number_field(value: &Value, name: &str) -> Option<f32> {
    let number = match value.get(name)? {
        Value::Number(number) => number.as_f64()? as f32,
        Value::String(raw) => raw.trim().parse::<f32>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn is_off_peak(hour: u32) -> bool {
    hour >= OFF_PEAK_START_HOUR || hour < OFF_PEAK_END_HOUR
}

fn current_hour() -> u32 {
    use chrono::Timelike;
    chrono::Local::now().hour()
}

fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
