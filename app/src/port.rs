#![allow(async_fn_in_trait)]

use std::fmt::Display;

use anyhow::Result;

use crate::climate::config::RoomId;
use crate::climate::decision::AcMode;
use crate::climate::power::BatteryReading;
use crate::climate::schedule::Period;
use crate::climate::weather::WeatherReport;
use crate::core::unit::{DegreeCelsius, Watt};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcState {
    pub mode: AcMode,
    pub setpoint: Option<DegreeCelsius>,
}

/// Live readings. `Ok(None)` means the entity is unavailable or reports garbage.
pub trait SensorSource {
    async fn room_temperature(&self, room: &RoomId) -> Result<Option<DegreeCelsius>>;
    async fn window_open(&self, room: &RoomId) -> Result<Option<bool>>;
    async fn room_presence(&self, room: &RoomId) -> Result<Option<bool>>;
    /// True if any building-wide presence sensor reports presence
    async fn home_presence(&self) -> Result<Option<bool>>;
    async fn external_target(&self, room: &RoomId, period: Period) -> Result<Option<DegreeCelsius>>;
    async fn solar_export(&self) -> Result<Option<Watt>>;
    async fn battery(&self) -> Result<Option<BatteryReading>>;
    async fn hot_water_temperature(&self) -> Result<Option<DegreeCelsius>>;
    async fn weather(&self) -> Result<WeatherReport>;
    async fn ac_state(&self, room: &RoomId) -> Result<Option<AcState>>;
    async fn floor_heating_state(&self, room: &RoomId) -> Result<Option<bool>>;
}

pub trait ActuatorSink {
    async fn set_ac(&self, room: &RoomId, mode: AcMode, setpoint: Option<DegreeCelsius>)
    -> Result<CommandExecutionResult>;
    async fn set_floor_heating(&self, room: &RoomId, on: bool) -> Result<CommandExecutionResult>;
    async fn set_water_heater_temperature(&self, temperature: DegreeCelsius) -> Result<CommandExecutionResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandExecutionResult {
    Triggered,
    Skipped,
}

/// Folds a failed read into an unavailable one.
pub fn reading<T>(result: Result<Option<T>>, what: impl Display) -> Option<T> {
    match result {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            tracing::warn!("{} is unavailable", what);
            None
        }
        Err(e) => {
            tracing::warn!("Error reading {}: {:?}", what, e);
            None
        }
    }
}
