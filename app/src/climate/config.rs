use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::time::Time;
use crate::core::unit::{DegreeCelsius, KiloWattHours, Percent, Watt};

#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::AsRef,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Immutable configuration of the climate controller, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    /// Seconds between periodic re-evaluations, at least 1
    #[serde(deserialize_with = "non_zero_secs")]
    pub update_interval: u64,
    /// Seconds after startup before the first evaluation of all rooms
    pub initial_check_delay: u64,
    pub day_start_time: Time,
    pub night_start_time: Time,
    /// Change of solar export that triggers re-evaluation of all rooms
    pub solar_threshold_change: Watt,
    pub decision: DecisionConfig,
    pub power: PowerConfig,
    pub heater: HeaterConfig,
    pub presence: PresenceConfig,
    pub schedule: ScheduleConfig,
    pub weather: WeatherConfig,
    pub rooms: BTreeMap<RoomId, RoomConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub temp_tolerance: DegreeCelsius,
    pub ac_min_temp: DegreeCelsius,
    pub ac_max_temp: DegreeCelsius,
    /// Minimum hot-water temperature for floor heating to be usable
    pub heater_min_temp: DegreeCelsius,
    pub solar_excess_threshold: Watt,
    pub eco_mode_when_away: bool,
    pub eco_temp_heating: DegreeCelsius,
    pub eco_temp_cooling: DegreeCelsius,
}

/// Which sign of the solar reading means "exporting to the grid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarSign {
    #[default]
    ExportNegative,
    ExportPositive,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeatSource {
    /// Tankless water heater, hot water is available without warm-up
    #[default]
    OnDemand,
    /// Storage tank that must be above a minimum temperature before use
    Buffered { min_temperature: DegreeCelsius },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub min_solar_excess: Watt,
    pub min_battery_percent: Percent,
    pub battery_max_capacity: KiloWattHours,
    pub solar_sign: SolarSign,
    pub heat_source: HeatSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaterConfig {
    pub min_heater_temp: DegreeCelsius,
    pub max_heater_temp: DegreeCelsius,
    pub default_heater_temp: DegreeCelsius,
    pub min_outdoor_temp: DegreeCelsius,
    pub max_outdoor_temp: DegreeCelsius,
    /// Minimum difference to the last sent setpoint before a new one is sent
    pub adjust_threshold: DegreeCelsius,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Minutes, 0 disables debouncing
    pub room_presence_timeout: u64,
    /// Minutes, 0 disables debouncing
    pub home_presence_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub default_target_temp_day: DegreeCelsius,
    pub default_target_temp_night: DegreeCelsius,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub forecast_hours: usize,
    /// Minutes before a forecast is refreshed ahead of an evaluation
    pub max_forecast_age: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub floor_heating_available: bool,
    pub ac_heating_available: bool,
    pub ac_cooling_available: bool,
    pub floor_heating_cost: f64,
    pub ac_heating_cost: f64,
    pub temp_tolerance: Option<DegreeCelsius>,
    pub presence_required: bool,
    pub away_temp: Option<DegreeCelsius>,
    pub target_temp_day: Option<DegreeCelsius>,
    pub target_temp_night: Option<DegreeCelsius>,
}

fn non_zero_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match u64::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("interval must be at least 1 second")),
        secs => Ok(secs),
    }
}

impl ClimateConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn initial_check_delay(&self) -> Duration {
        Duration::from_secs(self.initial_check_delay)
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&RoomConfig> {
        self.rooms.get(room_id)
    }

    pub fn room_ids(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.keys()
    }
}

impl PresenceConfig {
    pub fn room_timeout(&self) -> Duration {
        Duration::from_secs(self.room_presence_timeout * 60)
    }

    pub fn home_timeout(&self) -> Duration {
        Duration::from_secs(self.home_presence_timeout * 60)
    }
}

impl WeatherConfig {
    pub fn max_forecast_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_forecast_age as i64)
    }
}

impl RoomConfig {
    pub fn has_ac(&self) -> bool {
        self.ac_heating_available || self.ac_cooling_available
    }
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            update_interval: 300,
            initial_check_delay: 15,
            day_start_time: Time::at(7, 0, 0).unwrap(),
            night_start_time: Time::at(22, 0, 0).unwrap(),
            solar_threshold_change: Watt(300.0),
            decision: DecisionConfig::default(),
            power: PowerConfig::default(),
            heater: HeaterConfig::default(),
            presence: PresenceConfig::default(),
            schedule: ScheduleConfig::default(),
            weather: WeatherConfig::default(),
            rooms: BTreeMap::new(),
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            temp_tolerance: DegreeCelsius(0.5),
            ac_min_temp: DegreeCelsius(16.0),
            ac_max_temp: DegreeCelsius(30.0),
            heater_min_temp: DegreeCelsius(35.0),
            solar_excess_threshold: Watt(500.0),
            eco_mode_when_away: true,
            eco_temp_heating: DegreeCelsius(16.0),
            eco_temp_cooling: DegreeCelsius(26.0),
        }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            min_solar_excess: Watt(300.0),
            min_battery_percent: Percent(20.0),
            battery_max_capacity: KiloWattHours(10.0),
            solar_sign: SolarSign::default(),
            heat_source: HeatSource::default(),
        }
    }
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            min_heater_temp: DegreeCelsius(35.0),
            max_heater_temp: DegreeCelsius(55.0),
            default_heater_temp: DegreeCelsius(45.0),
            min_outdoor_temp: DegreeCelsius(-10.0),
            max_outdoor_temp: DegreeCelsius(20.0),
            adjust_threshold: DegreeCelsius(1.0),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            room_presence_timeout: 15,
            home_presence_timeout: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_target_temp_day: DegreeCelsius(21.0),
            default_target_temp_night: DegreeCelsius(18.0),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_hours: 12,
            max_forecast_age: 30,
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            floor_heating_available: true,
            ac_heating_available: true,
            ac_cooling_available: true,
            floor_heating_cost: 1.0,
            ac_heating_cost: 1.5,
            temp_tolerance: None,
            presence_required: false,
            away_temp: None,
            target_temp_day: None,
            target_temp_night: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_section_missing() {
        let config: ClimateConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.update_interval(), Duration::from_secs(300));
        assert_eq!(config.decision.temp_tolerance, DegreeCelsius(0.5));
        assert_eq!(config.power.solar_sign, SolarSign::ExportNegative);
        assert_eq!(config.power.heat_source, HeatSource::OnDemand);
        assert_eq!(config.presence.room_timeout(), Duration::from_secs(15 * 60));
        assert!(config.rooms.is_empty());
    }

    #[test]
    fn test_zero_update_interval_is_rejected() {
        let result = serde_json::from_str::<ClimateConfig>(r#"{ "update_interval": 0 }"#);

        assert!(result.is_err());
    }

    #[test]
    fn test_room_overrides_keep_remaining_defaults() {
        let config: ClimateConfig = serde_json::from_str(
            r#"{
                "day_start_time": "06:30:00",
                "power": { "solar_sign": "export_positive", "heat_source": { "type": "buffered", "min_temperature": 40.0 } },
                "rooms": {
                    "bedroom": { "ac_heating_available": false, "away_temp": 17.0 }
                }
            }"#,
        )
        .unwrap();

        let bedroom = config.room(&RoomId::from("bedroom")).unwrap();
        assert!(!bedroom.ac_heating_available);
        assert!(bedroom.floor_heating_available);
        assert_eq!(bedroom.away_temp, Some(DegreeCelsius(17.0)));
        assert_eq!(bedroom.ac_heating_cost, 1.5);

        assert_eq!(config.day_start_time, Time::at(6, 30, 0).unwrap());
        assert_eq!(config.power.solar_sign, SolarSign::ExportPositive);
        assert_eq!(
            config.power.heat_source,
            HeatSource::Buffered {
                min_temperature: DegreeCelsius(40.0)
            }
        );
    }

    #[test]
    fn test_invalid_time_is_rejected() {
        let result = serde_json::from_str::<ClimateConfig>(r#"{ "night_start_time": "26:00:00" }"#);

        assert!(result.is_err());
    }
}
