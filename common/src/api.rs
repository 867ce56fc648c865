pub const PATH_TEMPERATURES: &str = "temperatures";
pub const PATH_HEATER_STATUS: &str = "heater/status";
pub const PATH_SETPOINT: &str = "setpoint";
pub const PATH_TEMPO: &str = "tempo";

pub const LABEL_SETPOINT_UPDATE: &str = "Setpoint update";

/// A logical resource read from the regulator on every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Temperatures,
    HeaterStatus,
    Setpoints,
    Tempo,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Self::Temperatures,
        Self::HeaterStatus,
        Self::Setpoints,
        Self::Tempo,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Temperatures => PATH_TEMPERATURES,
            Self::HeaterStatus => PATH_HEATER_STATUS,
            Self::Setpoints => PATH_SETPOINT,
            Self::Tempo => PATH_TEMPO,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Temperatures => "Temperatures",
            Self::HeaterStatus => "Heater status",
            Self::Setpoints => "Setpoints",
            Self::Tempo => "Tempo",
        }
    }

    /// Older regulator firmware has no tempo endpoint.
    pub fn is_mandatory(self) -> bool {
        !matches!(self, Self::Tempo)
    }
}

pub fn resource_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
