use std::fmt::Display;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::control::{self, HoldEnd};
use crate::{Error, FanMode, Result, SystemMode, TccClient, ZoneRecord};

/// One thermostat-controlled area, layered over a merged [`ZoneRecord`].
///
/// The view is never the authority for data: every read accessor re-runs the
/// client's full zone aggregation and replaces the held record first, so a
/// read is always a portal round trip. Control methods build partial update
/// maps and forward them through the owning client.
#[derive(Debug)]
pub struct Zone<'a> {
    /// The key used to re-locate this zone's record on refresh. Settable;
    /// pointing it at an id the account does not have makes the next read
    /// fail with [`Error::ZoneNotFound`].
    pub device_id: i64,
    record: ZoneRecord,
    client: &'a TccClient,
}

impl<'a> Zone<'a> {
    pub(crate) fn new(record: ZoneRecord, client: &'a TccClient) -> Result<Self> {
        let device_id = record
            .device_id()
            .ok_or(Error::MissingField("DeviceID"))?;
        Ok(Self { device_id, record, client })
    }

    /// The record backing this view, as of the last refresh.
    pub fn record(&self) -> &ZoneRecord {
        &self.record
    }

    /// Re-fetch the full zone list and replace this view's record by device id.
    pub async fn refresh_zone_info(&mut self) -> Result<()> {
        for record in self.client.get_zones_info().await? {
            if record.device_id() == Some(self.device_id) {
                debug!(device_id = self.device_id, "refreshed zone info");
                self.record = record;
                return Ok(());
            }
        }
        Err(Error::ZoneNotFound(self.device_id))
    }

    /// The display name from the held record (no refresh, names are stable).
    pub fn name(&self) -> Result<&str> {
        self.record.name().ok_or(Error::MissingField("Name"))
    }

    fn with_unit(&self, raw: impl Display) -> Result<String> {
        let units = self
            .record
            .display_units()
            .ok_or(Error::MissingField("DispUnits"))?;
        Ok(format!("{raw}°{units}"))
    }

    pub async fn get_system_mode(&mut self) -> Result<SystemMode> {
        self.refresh_zone_info().await?;
        let raw = self
            .record
            .system_switch_position()
            .ok_or(Error::MissingField("SystemSwitchPosition"))?;
        SystemMode::from_portal(raw)
            .ok_or_else(|| Error::Unexpected(format!("unknown system switch position: {raw}")))
    }

    /// True when the equipment output status is nonzero, which typically
    /// means the system is actively heating or cooling.
    pub async fn is_equipment_output_on(&mut self) -> Result<bool> {
        self.refresh_zone_info().await?;
        let status = self
            .record
            .equipment_output_status()
            .ok_or(Error::MissingField("EquipmentOutputStatus"))?;
        Ok(status != 0)
    }

    pub async fn is_calling_for_heat(&mut self) -> Result<bool> {
        let mode = self.get_system_mode().await?;
        let heating = matches!(mode, SystemMode::Heat | SystemMode::AutoHeat | SystemMode::EmHeat);
        Ok(heating && self.is_equipment_output_on().await?)
    }

    pub async fn is_calling_for_cool(&mut self) -> Result<bool> {
        let mode = self.get_system_mode().await?;
        let cooling = matches!(mode, SystemMode::Cool | SystemMode::AutoCool);
        Ok(cooling && self.is_equipment_output_on().await?)
    }

    pub async fn get_current_temperature_raw(&mut self) -> Result<i64> {
        self.refresh_zone_info().await?;
        if !self.record.display_temp_available() {
            return Err(Error::TemperatureUnavailable(self.device_id));
        }
        self.record.display_temp().ok_or(Error::MissingField("DispTemp"))
    }

    pub async fn get_current_temperature(&mut self) -> Result<String> {
        let raw = self.get_current_temperature_raw().await?;
        self.with_unit(raw)
    }

    pub async fn get_fan_mode(&mut self) -> Result<FanMode> {
        self.refresh_zone_info().await?;
        let raw = self.record.fan_mode().ok_or(Error::MissingField("fanMode"))?;
        FanMode::from_portal(raw)
            .ok_or_else(|| Error::Unexpected(format!("unknown fan mode: {raw}")))
    }

    pub async fn is_fan_running(&mut self) -> Result<bool> {
        self.refresh_zone_info().await?;
        self.record
            .fan_is_running()
            .ok_or(Error::MissingField("fanIsRunning"))
    }

    pub async fn get_heat_setpoint_raw(&mut self) -> Result<i64> {
        self.refresh_zone_info().await?;
        self.record
            .heat_setpoint()
            .ok_or(Error::MissingField("HeatSetpoint"))
    }

    pub async fn get_cool_setpoint_raw(&mut self) -> Result<i64> {
        self.refresh_zone_info().await?;
        self.record
            .cool_setpoint()
            .ok_or(Error::MissingField("CoolSetpoint"))
    }

    pub async fn get_heat_setpoint(&mut self) -> Result<String> {
        let raw = self.get_heat_setpoint_raw().await?;
        self.with_unit(raw)
    }

    pub async fn get_cool_setpoint(&mut self) -> Result<String> {
        let raw = self.get_cool_setpoint_raw().await?;
        self.with_unit(raw)
    }

    /// The scraped outdoor temperature; `None` when the portal does not
    /// expose it for this device.
    pub async fn get_outdoor_temperature_raw(&mut self) -> Result<Option<i64>> {
        self.refresh_zone_info().await?;
        Ok(self.record.outdoor_temperature())
    }

    pub async fn get_outdoor_temperature(&mut self) -> Result<String> {
        let raw = self
            .get_outdoor_temperature_raw()
            .await?
            .ok_or(Error::MissingField("OutdoorTemperature"))?;
        self.with_unit(raw)
    }

    pub async fn get_outdoor_humidity_raw(&mut self) -> Result<Option<i64>> {
        self.refresh_zone_info().await?;
        Ok(self.record.outdoor_humidity())
    }

    pub async fn get_outdoor_humidity(&mut self) -> Result<String> {
        let raw = self
            .get_outdoor_humidity_raw()
            .await?
            .ok_or(Error::MissingField("OutdoorHumidity"))?;
        Ok(format!("{raw}%"))
    }

    pub async fn get_indoor_temperature_raw(&mut self) -> Result<i64> {
        self.refresh_zone_info().await?;
        self.record
            .indoor_temperature()
            .ok_or(Error::MissingField("DispTemperature"))
    }

    pub async fn get_indoor_temperature(&mut self) -> Result<String> {
        let raw = self.get_indoor_temperature_raw().await?;
        self.with_unit(raw)
    }

    pub async fn get_indoor_humidity_raw(&mut self) -> Result<i64> {
        self.refresh_zone_info().await?;
        self.record
            .indoor_humidity()
            .ok_or(Error::MissingField("IndoorHumidity"))
    }

    pub async fn get_indoor_humidity(&mut self) -> Result<String> {
        let raw = self.get_indoor_humidity_raw().await?;
        Ok(format!("{raw}%"))
    }

    /// Low-level passthrough to the client's raw control submission.
    pub async fn submit_control_changes(&self, updates: Map<String, Value>) -> Result<()> {
        self.client
            .submit_raw_control_changes(self.device_id, updates)
            .await
    }

    /// Set a permanent heat setpoint; also switches the system to Heat.
    pub async fn set_permanent_heat_setpoint(&self, temp: i64) -> Result<()> {
        info!(temp, "setting heat on with a permanent target temp");
        self.submit_control_changes(updates([
            ("HeatSetpoint", Value::from(temp)),
            ("StatusHeat", Value::from(2)),
            ("StatusCool", Value::from(2)),
            ("SystemSwitch", Value::from(SystemMode::Heat.as_portal())),
        ]))
        .await
    }

    /// Set a permanent cool setpoint; also switches the system to Cool.
    pub async fn set_permanent_cool_setpoint(&self, temp: i64) -> Result<()> {
        info!(temp, "setting cool on with a permanent target temp");
        self.submit_control_changes(updates([
            ("CoolSetpoint", Value::from(temp)),
            ("StatusHeat", Value::from(2)),
            ("StatusCool", Value::from(2)),
            ("SystemSwitch", Value::from(SystemMode::Cool.as_portal())),
        ]))
        .await
    }

    /// Set a temporary heat setpoint, optionally until `end` (rounded to the
    /// nearest quarter hour); with no end the thermostat picks one.
    pub async fn set_temp_heat_setpoint(&self, temp: i64, end: Option<HoldEnd>) -> Result<()> {
        let next_period = control::hold_end_slot(end)?;
        info!(temp, "setting temp heat on with a target temp");
        self.submit_control_changes(updates([
            ("HeatSetpoint", Value::from(temp)),
            ("StatusHeat", Value::from(1)),
            ("StatusCool", Value::from(1)),
            ("SystemSwitch", Value::from(SystemMode::Heat.as_portal())),
            ("HeatNextPeriod", next_period.map_or(Value::Null, Value::from)),
        ]))
        .await
    }

    /// Set a temporary cool setpoint, optionally until `end` (rounded to the
    /// nearest quarter hour); with no end the thermostat picks one.
    pub async fn set_temp_cool_setpoint(&self, temp: i64, end: Option<HoldEnd>) -> Result<()> {
        let next_period = control::hold_end_slot(end)?;
        info!(temp, "setting temp cool on with a target temp");
        self.submit_control_changes(updates([
            ("CoolSetpoint", Value::from(temp)),
            ("StatusHeat", Value::from(1)),
            ("StatusCool", Value::from(1)),
            ("SystemSwitch", Value::from(SystemMode::Cool.as_portal())),
            ("CoolNextPeriod", next_period.map_or(Value::Null, Value::from)),
        ]))
        .await
    }

    /// End the current hold, normally resuming the programmed schedule.
    pub async fn end_hold(&self) -> Result<()> {
        info!("ending hold");
        self.submit_control_changes(updates([
            ("StatusHeat", Value::from(0)),
            ("StatusCool", Value::from(0)),
        ]))
        .await
    }

    pub async fn turn_system_off(&self) -> Result<()> {
        info!("turning system off");
        self.submit_control_changes(updates([(
            "SystemSwitch",
            Value::from(SystemMode::Off.as_portal()),
        )]))
        .await
    }

    pub async fn turn_fan_on(&self) -> Result<()> {
        info!("turning fan on");
        self.submit_control_changes(updates([("FanMode", Value::from(FanMode::On.as_portal()))]))
            .await
    }

    pub async fn turn_fan_auto(&self) -> Result<()> {
        info!("turning fan to auto");
        self.submit_control_changes(updates([(
            "FanMode",
            Value::from(FanMode::Auto.as_portal()),
        )]))
        .await
    }

    pub async fn turn_fan_circulate(&self) -> Result<()> {
        info!("turning fan to circulate");
        self.submit_control_changes(updates([(
            "FanMode",
            Value::from(FanMode::Circulate.as_portal()),
        )]))
        .await
    }
}

fn updates<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
