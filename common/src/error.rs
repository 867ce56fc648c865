use std::fmt::Display;

use serde::Serialize;

/// Why a single resource fetch did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("{label} error: {reason}")]
    Network { label: &'static str, reason: String },

    #[error("{label} error ({status}): {body}")]
    Http {
        label: &'static str,
        status: u16,
        body: String,
    },

    #[error("{label} error: invalid payload: {reason}")]
    Decode { label: &'static str, reason: String },

    #[error("{label} unavailable: {cause}")]
    OptionalResourceUnavailable {
        label: &'static str,
        cause: Box<FetchFailure>,
    },
}

impl FetchFailure {
    pub fn network(label: &'static str, reason: impl Display) -> Self {
        Self::Network {
            label,
            reason: reason.to_string(),
        }
    }

    pub fn http(label: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            label,
            status,
            body: body.into(),
        }
    }

    pub fn decode(label: &'static str, reason: impl Display) -> Self {
        Self::Decode {
            label,
            reason: reason.to_string(),
        }
    }

    pub fn optional(self) -> Self {
        match self {
            Self::OptionalResourceUnavailable { .. } => self,
            other => Self::OptionalResourceUnavailable {
                label: other.label(),
                cause: Box::new(other),
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Network { label, .. }
            | Self::Http { label, .. }
            | Self::Decode { label, .. }
            | Self::OptionalResourceUnavailable { label, .. } => label,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::OptionalResourceUnavailable { cause, .. } => cause.status(),
            _ => None,
        }
    }
}

/// The single live error surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct SyncError {
    pub message: String,
}

impl SyncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<FetchFailure> for SyncError {
    fn from(failure: FetchFailure) -> Self {
        Self::new(failure.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetpointError {
    #[error("Setpoint update error: setpoints not loaded yet")]
    NotLoaded,

    #[error("Setpoint update error: invalid value")]
    InvalidValue,

    #[error("Setpoint update error: panel stopped")]
    Stopped,

    #[error(transparent)]
    Rejected(#[from] FetchFailure),
}

impl From<SetpointError> for SyncError {
    fn from(err: SetpointError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Resource, LABEL_SETPOINT_UPDATE};

    #[test]
    fn http_failure_message_carries_status_and_body() {
        let failure = FetchFailure::http(Resource::HeaterStatus.label(), 500, "relay offline");
        assert_eq!(
            SyncError::from(failure).message,
            "Heater status error (500): relay offline"
        );
    }

    #[test]
    fn optional_wraps_once_and_keeps_status() {
        let failure = FetchFailure::http(Resource::Tempo.label(), 404, "").optional();
        assert_eq!(failure.status(), Some(404));
        assert_eq!(failure.clone().optional(), failure);
        assert_eq!(failure.label(), "Tempo");
    }

    #[test]
    fn rejected_mutation_reports_server_diagnostic() {
        let err = SetpointError::from(FetchFailure::http(
            LABEL_SETPOINT_UPDATE,
            400,
            r#"{"error":"Invalid setpoint temperature value"}"#,
        ));
        assert_eq!(
            SyncError::from(err).message,
            r#"Setpoint update error (400): {"error":"Invalid setpoint temperature value"}"#
        );
    }
}
