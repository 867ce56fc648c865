use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use regpac_common::{RuntimeConfig, SetpointError, SetpointField, Trigger};

use crate::{
    aggregator::SnapshotAggregator,
    client::HttpRegulatorClient,
    clock::{Clock, SystemClock},
    scheduler::{PanelHandle, PollScheduler},
    setpoint::SetpointController,
};

#[derive(Clone)]
pub struct AppState {
    handle: PanelHandle,
    setpoints: SetpointController,
}

impl AppState {
    pub fn new(handle: PanelHandle, setpoints: SetpointController) -> Self {
        Self { handle, setpoints }
    }
}

struct AppStore {
    runtime_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });

    if let Ok(base) = std::env::var("REGULATOR_API_BASE") {
        runtime.network.api_base_url = base;
    }
    if let Some(port) = std::env::var("PANEL_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        runtime.network.http_port = port;
    }
    if runtime.timezone.parse::<Tz>().is_err() {
        warn!(
            "unknown timezone {:?}, falling back to default",
            runtime.timezone
        );
    }
    runtime.sanitize();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let api = Arc::new(HttpRegulatorClient::new(runtime.network.api_base_url.clone()));
    let handle = PanelHandle::new(runtime.panel.clone(), clock.clone(), runtime.tz());
    let scheduler = PollScheduler::start(
        handle.clone(),
        SnapshotAggregator::new(api.clone(), clock),
        Duration::from_millis(runtime.panel.poll_interval_ms),
    );
    info!("polling regulator at {}", api.base_url());
    let setpoints = SetpointController::new(handle.clone(), api);

    let web_root = std::env::var("PANEL_WEB_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(format!("{}/web", env!("CARGO_MANIFEST_DIR"))));
    let app = router(AppState::new(handle, setpoints), web_root);

    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.network.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind panel server at {addr}"))?;

    info!("panel listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("panel server failed")?;

    scheduler.stop().await;
    Ok(())
}

pub fn router(state: AppState, web_root: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/panel/state", get(handle_get_state))
        .route("/panel/refresh", post(handle_refresh))
        .route("/panel/setpoint/adjust", post(handle_adjust_setpoint))
        .route("/panel/setpoint", post(handle_set_setpoint))
        .route("/panel/error/toggle", post(handle_toggle_error))
        .fallback_service(ServeDir::new(web_root.as_ref()))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down panel");
}

async fn handle_get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.handle.view().await)
}

async fn handle_refresh(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.handle.refresh_and_wait(Trigger::Manual).await)
}

async fn handle_adjust_setpoint(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let field = match parse_field(&params) {
        Ok(field) => field,
        Err(response) => return response,
    };
    let delta = match parse_number(&params, "delta") {
        Ok(delta) => delta,
        Err(response) => return response,
    };

    let result = state.setpoints.adjust(field, delta).await;
    setpoint_response(&state, result).await
}

async fn handle_set_setpoint(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let field = match parse_field(&params) {
        Ok(field) => field,
        Err(response) => return response,
    };
    let value = match parse_number(&params, "value") {
        Ok(value) => value,
        Err(response) => return response,
    };

    let result = state.setpoints.set_absolute(field, value).await;
    setpoint_response(&state, result).await
}

async fn handle_toggle_error(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.handle.toggle_error().await)
}

async fn setpoint_response(
    state: &AppState,
    result: Result<(), SetpointError>,
) -> axum::response::Response {
    match result {
        Ok(()) => Json(state.handle.view().await).into_response(),
        Err(err) => {
            let status = match &err {
                SetpointError::InvalidValue => StatusCode::BAD_REQUEST,
                SetpointError::NotLoaded => StatusCode::CONFLICT,
                SetpointError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
                SetpointError::Rejected(_) => StatusCode::BAD_GATEWAY,
            };
            error_response(status, &err.to_string())
        }
    }
}

fn parse_field(
    params: &HashMap<String, String>,
) -> Result<SetpointField, axum::response::Response> {
    let Some(raw) = params.get("field") else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing 'field' parameter",
        ));
    };
    raw.parse::<SetpointField>()
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid setpoint field"))
}

fn parse_number(
    params: &HashMap<String, String>,
    name: &str,
) -> Result<f32, axum::response::Response> {
    let Some(raw) = params.get(name) else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            &format!("Missing '{name}' parameter"),
        ));
    };
    match raw.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            "Invalid temperature value",
        )),
    }
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("PANEL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.regpac"));

        Self {
            runtime_path: data_dir.join("runtime.json"),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(&self.runtime_path).await {
            Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
                .with_context(|| format!("invalid {}", self.runtime_path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
