use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub poll_interval_ms: u64,
    pub notification_duration_ms: u64,
    pub setpoint_step_c: f32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            notification_duration_ms: 1_000,
            setpoint_step_c: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub api_base_url: String,
    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".to_string(),
            http_port: 8081,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            panel: PanelConfig::default(),
            network: NetworkConfig::default(),
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl PanelConfig {
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.clamp(1_000, 3_600_000);
        self.notification_duration_ms = self.notification_duration_ms.clamp(100, 60_000);
        if !self.setpoint_step_c.is_finite() || self.setpoint_step_c <= 0.0 {
            self.setpoint_step_c = 0.5;
        }
        self.setpoint_step_c = self.setpoint_step_c.clamp(0.1, 5.0);
    }
}

impl NetworkConfig {
    pub fn sanitize(&mut self) {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = if trimmed.is_empty() {
            NetworkConfig::default().api_base_url
        } else {
            trimmed.to_string()
        };
        if self.http_port == 0 {
            self.http_port = NetworkConfig::default().http_port;
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.panel.sanitize();
        self.network.sanitize();
        if self.timezone.parse::<Tz>().is_err() {
            self.timezone = default_timezone();
        }
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::Europe__Paris)
    }
}
