use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::{current_hour, router, SimRegulator};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = std::env::var("REGULATOR_SIM_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let sim = SimRegulator::default();
    spawn_drift_loop(sim.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind regulator simulator at {addr}"))?;

    info!("regulator simulator listening on http://{addr}/api");
    axum::serve(listener, router(sim))
        .await
        .context("regulator simulator failed")?;
    Ok(())
}

fn spawn_drift_loop(sim: SimRegulator) {
    tokio::spawn(async move {
        let mut tick: u64 = 0;
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            tick = tick.saturating_add(1);
            sim.drift(tick, current_hour()).await;
        }
    });
}
