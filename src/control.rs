use chrono::{Duration, Local, NaiveDateTime, NaiveTime, Timelike};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// The SubmitControlScreenChanges schema. A null field means "no change".
pub(crate) const CONTROL_FIELDS: [&str; 9] = [
    "CoolNextPeriod",
    "CoolSetpoint",
    "DeviceID",
    "FanMode",
    "HeatNextPeriod",
    "HeatSetpoint",
    "StatusCool",
    "StatusHeat",
    "SystemSwitch",
];

/// Build the full payload for a control submission: every field defaulted to
/// null, `DeviceID` filled in, then the caller's updates overlaid. Keys
/// outside the fixed schema are rejected.
pub(crate) fn control_payload(device_id: i64, updates: Map<String, Value>) -> Result<Value> {
    let mut data = Map::new();
    for field in CONTROL_FIELDS {
        data.insert(field.to_string(), Value::Null);
    }
    data.insert("DeviceID".to_string(), Value::from(device_id));

    for (key, value) in updates {
        if !CONTROL_FIELDS.contains(&key.as_str()) {
            return Err(Error::InvalidControlField(key));
        }
        data.insert(key, value);
    }

    Ok(Value::Object(data))
}

/// When a temporary setpoint hold should end.
///
/// The portal's `HeatNextPeriod`/`CoolNextPeriod` fields are quarter-hour
/// slot indexes: 0 is midnight, 1 is 12:15am, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldEnd {
    /// A specific time of day (within the next 24 hours).
    At(NaiveTime),
    /// A delta from now; must be less than a day.
    After(Duration),
}

/// Coerce an optional hold end into a quarter-hour slot index. `None` maps
/// to `None`, leaving the end time up to the thermostat.
pub(crate) fn hold_end_slot(end: Option<HoldEnd>) -> Result<Option<u32>> {
    match end {
        None => Ok(None),
        Some(HoldEnd::At(time)) => Ok(Some(time_slot(time))),
        Some(HoldEnd::After(delta)) => {
            duration_slot(Local::now().naive_local(), delta).map(Some)
        }
    }
}

fn time_slot(time: NaiveTime) -> u32 {
    time.hour() * 4 + (f64::from(time.minute()) / 15.0).round() as u32
}

fn duration_slot(now: NaiveDateTime, delta: Duration) -> Result<u32> {
    if delta >= Duration::days(1) {
        return Err(Error::InvalidHoldDuration(delta));
    }
    Ok(time_slot((now + delta).time()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn time_slots_round_to_quarter_hours() {
        assert_eq!(time_slot(at(0, 0)), 0);
        assert_eq!(time_slot(at(0, 15)), 1);
        assert_eq!(time_slot(at(1, 0)), 4);
        assert_eq!(time_slot(at(1, 16)), 5);
        assert_eq!(time_slot(at(1, 41)), 7);
        assert_eq!(time_slot(at(23, 59)), 96);
    }

    #[test]
    fn duration_of_a_day_or_more_is_rejected() {
        let now = NaiveDateTime::parse_from_str("2020-01-01T01:00", "%Y-%m-%dT%H:%M").unwrap();
        assert!(matches!(
            duration_slot(now, Duration::hours(24)),
            Err(Error::InvalidHoldDuration(_))
        ));
        assert!(matches!(
            duration_slot(now, Duration::days(2)),
            Err(Error::InvalidHoldDuration(_))
        ));
    }

    #[test]
    fn duration_wraps_past_midnight() {
        let now = NaiveDateTime::parse_from_str("2020-01-01T01:00", "%Y-%m-%dT%H:%M").unwrap();
        let delta = Duration::hours(23) + Duration::minutes(59);
        assert_eq!(duration_slot(now, delta).unwrap(), 4);
    }

    #[test]
    fn no_end_means_no_slot() {
        assert_eq!(hold_end_slot(None).unwrap(), None);
        assert_eq!(hold_end_slot(Some(HoldEnd::At(at(1, 0)))).unwrap(), Some(4));
    }

    #[test]
    fn payload_defaults_everything_to_null() {
        let payload = control_payload(99, Map::new()).unwrap();
        let obj = payload.as_object().unwrap();
        assert_eq!(obj.len(), 9);
        assert_eq!(obj["DeviceID"], json!(99));
        for field in CONTROL_FIELDS {
            if field != "DeviceID" {
                assert_eq!(obj[field], Value::Null, "{field} should default to null");
            }
        }
    }

    #[test]
    fn payload_overlays_updates() {
        let mut updates = Map::new();
        updates.insert("HeatSetpoint".to_string(), json!(72));
        updates.insert("SystemSwitch".to_string(), json!(1));
        let payload = control_payload(7, updates).unwrap();
        assert_eq!(payload["HeatSetpoint"], json!(72));
        assert_eq!(payload["SystemSwitch"], json!(1));
        assert_eq!(payload["CoolSetpoint"], Value::Null);
    }

    #[test]
    fn payload_rejects_unknown_keys() {
        let mut updates = Map::new();
        updates.insert("NotARealKey".to_string(), json!(1));
        assert!(matches!(
            control_payload(7, updates),
            Err(Error::InvalidControlField(k)) if k == "NotARealKey"
        ));
    }
}
