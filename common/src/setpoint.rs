use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    error::SetpointError,
    types::{AppliedFlags, SetpointPair, SetpointUpdate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetpointField {
    OffPeak,
    FullCost,
}

impl SetpointField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OffPeak => "offPeak",
            Self::FullCost => "fullCost",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::OffPeak => 0,
            Self::FullCost => 1,
        }
    }
}

impl FromStr for SetpointField {
    type Err = SetpointError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('_', "").as_str() {
            "offpeak" => Ok(Self::OffPeak),
            "fullcost" => Ok(Self::FullCost),
            _ => Err(SetpointError::InvalidValue),
        }
    }
}

/// Rounds to the nearest multiple of `step`; halves go up.
pub fn round_to_step(value: f32, step: f32) -> f32 {
    (value / step + 0.5).floor() * step
}

impl SetpointPair {
    pub fn get(&self, field: SetpointField) -> f32 {
        match field {
            SetpointField::OffPeak => self.off_peak_temp,
            SetpointField::FullCost => self.full_cost_temp,
        }
    }

    pub fn with(self, field: SetpointField, value: f32) -> Self {
        match field {
            SetpointField::OffPeak => Self {
                off_peak_temp: value,
                ..self
            },
            SetpointField::FullCost => Self {
                full_cost_temp: value,
                ..self
            },
        }
    }

    pub fn to_update(self) -> SetpointUpdate {
        SetpointUpdate {
            off_peak_cost: self.off_peak_temp,
            full_cost: self.full_cost_temp,
        }
    }
}

/// Builds the full-pair request for `confirmed[field] + delta`.
pub fn plan_adjust(
    confirmed: Option<&SetpointPair>,
    field: SetpointField,
    delta: f32,
    step: f32,
) -> Result<SetpointUpdate, SetpointError> {
    let confirmed = confirmed.ok_or(SetpointError::NotLoaded)?;
    if !delta.is_finite() {
        return Err(SetpointError::InvalidValue);
    }
    plan_absolute(Some(confirmed), field, confirmed.get(field) + delta, step)
}

pub fn plan_absolute(
    confirmed: Option<&SetpointPair>,
    field: SetpointField,
    value: f32,
    step: f32,
) -> Result<SetpointUpdate, SetpointError> {
    let confirmed = confirmed.ok_or(SetpointError::NotLoaded)?;
    if !value.is_finite() {
        return Err(SetpointError::InvalidValue);
    }
    Ok(confirmed
        .with(field, round_to_step(value, step))
        .to_update())
}

/// Transient "just applied" markers, one per field.
///
/// A flag is raised until its deadline; raising it again pushes the
/// deadline out.
#[derive(Debug, Clone, Default)]
pub struct NotificationFlags {
    deadlines: [Option<u64>; 2],
}

impl NotificationFlags {
    pub fn raise(&mut self, field: SetpointField, now_ms: u64, duration_ms: u64) {
        self.deadlines[field.index()] = Some(now_ms.saturating_add(duration_ms));
    }

    pub fn is_raised(&self, field: SetpointField, now_ms: u64) -> bool {
        self.deadlines[field.index()]
            .map(|deadline| now_ms < deadline)
            .unwrap_or(false)
    }

    /// Drops expired flags; returns true if any was cleared.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        let mut cleared = false;
        for slot in &mut self.deadlines {
            if matches!(slot, Some(deadline) if now_ms >= *deadline) {
                *slot = None;
                cleared = true;
            }
        }
        cleared
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.deadlines.iter().flatten().copied().min()
    }

    pub fn applied(&self, now_ms: u64) -> AppliedFlags {
        AppliedFlags {
            off_peak: self.is_raised(SetpointField::OffPeak, now_ms),
            full_cost: self.is_raised(SetpointField::FullCost, now_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAIR: SetpointPair = SetpointPair {
        off_peak_temp: 19.0,
        full_cost_temp: 17.0,
    };

    #[test]
    fn adjust_rounds_to_nearest_half() {
        let update = plan_adjust(Some(&PAIR), SetpointField::OffPeak, 0.3, 0.5).unwrap();
        assert_eq!(
            update,
            SetpointUpdate {
                off_peak_cost: 19.5,
                full_cost: 17.0,
            }
        );
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(round_to_step(19.25, 0.5), 19.5);
        assert_eq!(round_to_step(19.2, 0.5), 19.0);
        assert_eq!(round_to_step(-0.25, 0.5), 0.0);
    }

    #[test]
    fn adjust_fills_untouched_field_from_confirmed() {
        let update = plan_adjust(Some(&PAIR), SetpointField::FullCost, -0.5, 0.5).unwrap();
        assert_eq!(update.off_peak_cost, 19.0);
        assert_eq!(update.full_cost, 16.5);
    }

    #[test]
    fn repeated_adjusts_share_the_confirmed_base() {
        let first = plan_adjust(Some(&PAIR), SetpointField::OffPeak, 0.5, 0.5).unwrap();
        let second = plan_adjust(Some(&PAIR), SetpointField::OffPeak, 0.5, 0.5).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.off_peak_cost, 19.5);
    }

    #[test]
    fn absolute_value_is_rounded() {
        let update = plan_absolute(Some(&PAIR), SetpointField::FullCost, 18.74, 0.5).unwrap();
        assert_eq!(update.full_cost, 18.5);
        assert_eq!(update.off_peak_cost, 19.0);
    }

    #[test]
    fn refuses_without_confirmed_values_or_with_nan() {
        assert_eq!(
            plan_adjust(None, SetpointField::OffPeak, 0.5, 0.5),
            Err(SetpointError::NotLoaded)
        );
        assert_eq!(
            plan_absolute(Some(&PAIR), SetpointField::OffPeak, f32::NAN, 0.5),
            Err(SetpointError::InvalidValue)
        );
        assert_eq!(
            plan_adjust(Some(&PAIR), SetpointField::OffPeak, f32::INFINITY, 0.5),
            Err(SetpointError::InvalidValue)
        );
    }

    #[test]
    fn parses_field_names() {
        assert_eq!("offPeak".parse::<SetpointField>(), Ok(SetpointField::OffPeak));
        assert_eq!("full_cost".parse::<SetpointField>(), Ok(SetpointField::FullCost));
        assert!("comfort".parse::<SetpointField>().is_err());
    }

    #[test]
    fn flags_expire_after_duration() {
        let mut flags = NotificationFlags::default();
        flags.raise(SetpointField::FullCost, 5_000, 1_000);

        assert!(flags.is_raised(SetpointField::FullCost, 5_000));
        assert!(flags.is_raised(SetpointField::FullCost, 5_999));
        assert!(!flags.is_raised(SetpointField::OffPeak, 5_000));
        assert_eq!(flags.next_deadline(), Some(6_000));

        assert!(!flags.expire(5_999));
        assert!(flags.expire(6_000));
        assert!(!flags.is_raised(SetpointField::FullCost, 6_000));
        assert_eq!(flags.next_deadline(), None);
    }

    #[test]
    fn raising_again_extends_the_flag() {
        let mut flags = NotificationFlags::default();
        flags.raise(SetpointField::OffPeak, 0, 1_000);
        flags.raise(SetpointField::OffPeak, 600, 1_000);

        assert!(!flags.expire(1_000));
        assert_eq!(
            flags.applied(1_000),
            AppliedFlags {
                off_peak: true,
                full_cost: false,
            }
        );
        assert!(flags.expire(1_600));
    }
}
