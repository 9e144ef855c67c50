use serde_json::{Map, Value};

/// Position of the system switch as reported by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    EmHeat,
    Heat,
    Off,
    Cool,
    AutoHeat,
    AutoCool,
    SouthernAway,
    Unknown,
}

impl SystemMode {
    pub fn from_portal(v: i64) -> Option<Self> {
        match v {
            0 => Some(SystemMode::EmHeat),
            1 => Some(SystemMode::Heat),
            2 => Some(SystemMode::Off),
            3 => Some(SystemMode::Cool),
            4 => Some(SystemMode::AutoHeat),
            5 => Some(SystemMode::AutoCool),
            6 => Some(SystemMode::SouthernAway),
            7 => Some(SystemMode::Unknown),
            _ => None,
        }
    }

    pub fn as_portal(&self) -> i64 {
        match self {
            SystemMode::EmHeat => 0,
            SystemMode::Heat => 1,
            SystemMode::Off => 2,
            SystemMode::Cool => 3,
            SystemMode::AutoCool => 5,
            SystemMode::AutoHeat => 4,
            SystemMode::SouthernAway => 6,
            SystemMode::Unknown => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    Auto,
    On,
    Circulate,
    FollowSchedule,
    Unknown,
}

impl FanMode {
    pub fn from_portal(v: i64) -> Option<Self> {
        match v {
            0 => Some(FanMode::Auto),
            1 => Some(FanMode::On),
            2 => Some(FanMode::Circulate),
            3 => Some(FanMode::FollowSchedule),
            4 => Some(FanMode::Unknown),
            _ => None,
        }
    }

    pub fn as_portal(&self) -> i64 {
        match self {
            FanMode::Auto => 0,
            FanMode::On => 1,
            FanMode::Circulate => 2,
            FanMode::FollowSchedule => 3,
            FanMode::Unknown => 4,
        }
    }
}

/// Outdoor readings scraped from a device's control page. Each field is
/// independently optional; the portal does not expose them for every device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutdoorWeather {
    pub temperature: Option<i64>,
    pub humidity: Option<i64>,
}

/// One merged mapping per device, assembled from a zone-list entry, the
/// scraped display name, the CheckDataSession detail blob, and the scraped
/// outdoor weather. Portal fields pass through verbatim; typed access is
/// validated here, at the accessor, not at merge time.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRecord {
    fields: Map<String, Value>,
}

impl ZoneRecord {
    /// Merge the three sources onto the zone-list entry. Precedence is
    /// later-wins: entry, then `Name`, then detail, then weather.
    pub(crate) fn merge(
        mut entry: Map<String, Value>,
        name: &str,
        detail: Value,
        weather: OutdoorWeather,
    ) -> Self {
        entry.insert("Name".to_string(), Value::from(name));
        if let Value::Object(detail) = detail {
            for (k, v) in detail {
                entry.insert(k, v);
            }
        }
        entry.insert(
            "OutdoorTemperature".to_string(),
            weather.temperature.map_or(Value::Null, Value::from),
        );
        entry.insert(
            "OutdoorHumidity".to_string(),
            weather.humidity.map_or(Value::Null, Value::from),
        );
        ZoneRecord { fields: entry }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn device_id(&self) -> Option<i64> {
        self.fields.get("DeviceID").and_then(Value::as_i64)
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("Name").and_then(Value::as_str)
    }

    pub fn display_units(&self) -> Option<&str> {
        self.fields.get("DispUnits").and_then(Value::as_str)
    }

    pub fn display_temp_available(&self) -> bool {
        self.fields
            .get("DispTempAvailable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn display_temp(&self) -> Option<i64> {
        self.fields.get("DispTemp").and_then(Value::as_f64).map(|v| v as i64)
    }

    pub fn outdoor_temperature(&self) -> Option<i64> {
        self.fields.get("OutdoorTemperature").and_then(Value::as_i64)
    }

    pub fn outdoor_humidity(&self) -> Option<i64> {
        self.fields.get("OutdoorHumidity").and_then(Value::as_i64)
    }

    fn ui_data(&self, key: &str) -> Option<&Value> {
        self.fields.get("latestData")?.get("uiData")?.get(key)
    }

    fn fan_data(&self, key: &str) -> Option<&Value> {
        self.fields.get("latestData")?.get("fanData")?.get(key)
    }

    pub fn system_switch_position(&self) -> Option<i64> {
        self.ui_data("SystemSwitchPosition").and_then(Value::as_i64)
    }

    pub fn equipment_output_status(&self) -> Option<i64> {
        self.ui_data("EquipmentOutputStatus").and_then(Value::as_i64)
    }

    pub fn heat_setpoint(&self) -> Option<i64> {
        self.ui_data("HeatSetpoint").and_then(Value::as_f64).map(|v| v as i64)
    }

    pub fn cool_setpoint(&self) -> Option<i64> {
        self.ui_data("CoolSetpoint").and_then(Value::as_f64).map(|v| v as i64)
    }

    pub fn indoor_temperature(&self) -> Option<i64> {
        self.ui_data("DispTemperature").and_then(Value::as_f64).map(|v| v as i64)
    }

    pub fn indoor_humidity(&self) -> Option<i64> {
        self.ui_data("IndoorHumidity").and_then(Value::as_i64)
    }

    pub fn fan_mode(&self) -> Option<i64> {
        self.fan_data("fanMode").and_then(Value::as_i64)
    }

    pub fn fan_is_running(&self) -> Option<bool> {
        self.fan_data("fanIsRunning").and_then(Value::as_bool)
    }
}
