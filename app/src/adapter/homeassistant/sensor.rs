use anyhow::Result;

use super::config::{BatteryUnit, EntityConfig, RoomEntity};
use super::{HaHttpClient, StateChangedEvent, StateValue};
use crate::climate::config::RoomId;
use crate::climate::decision::AcMode;
use crate::climate::power::BatteryReading;
use crate::climate::schedule::Period;
use crate::climate::weather::WeatherReport;
use crate::core::unit::{DegreeCelsius, KiloWattHours, Percent, Watt};
use crate::port::{AcState, SensorSource};

pub struct HaSensorSource {
    client: HaHttpClient,
    entities: EntityConfig,
}

impl HaSensorSource {
    pub fn new(client: HaHttpClient, entities: EntityConfig) -> Self {
        Self { client, entities }
    }

    async fn state(&self, entity_id: Option<&str>) -> Result<Option<StateChangedEvent>> {
        match entity_id {
            Some(entity_id) => self.client.get_state(entity_id).await,
            None => Ok(None),
        }
    }

    async fn number(&self, entity_id: Option<&str>) -> Result<Option<f64>> {
        Ok(self.state(entity_id).await?.and_then(|s| s.state.as_number()))
    }

    async fn on_off(&self, entity_id: Option<&str>) -> Result<Option<bool>> {
        Ok(self.state(entity_id).await?.and_then(|s| s.state.as_on_off()))
    }

    async fn room_number(&self, room: &RoomId, entity: RoomEntity) -> Result<Option<f64>> {
        self.number(self.entities.room_entity(room, entity).as_deref()).await
    }

    async fn room_on_off(&self, room: &RoomId, entity: RoomEntity) -> Result<Option<bool>> {
        self.on_off(self.entities.room_entity(room, entity).as_deref()).await
    }
}

impl SensorSource for HaSensorSource {
    async fn room_temperature(&self, room: &RoomId) -> Result<Option<DegreeCelsius>> {
        Ok(self.room_number(room, RoomEntity::Temperature).await?.map(DegreeCelsius))
    }

    async fn window_open(&self, room: &RoomId) -> Result<Option<bool>> {
        self.room_on_off(room, RoomEntity::Window).await
    }

    async fn room_presence(&self, room: &RoomId) -> Result<Option<bool>> {
        self.room_on_off(room, RoomEntity::Presence).await
    }

    async fn home_presence(&self) -> Result<Option<bool>> {
        let mut readings = vec![];
        for entity_id in &self.entities.global_presence {
            readings.push(self.on_off(Some(entity_id)).await?);
        }

        Ok(any_present(&readings))
    }

    async fn external_target(&self, room: &RoomId, period: Period) -> Result<Option<DegreeCelsius>> {
        let entity = match period {
            Period::Day => RoomEntity::TargetTempDay,
            Period::Night => RoomEntity::TargetTempNight,
        };

        Ok(self.room_number(room, entity).await?.map(DegreeCelsius))
    }

    async fn solar_export(&self) -> Result<Option<Watt>> {
        Ok(self.number(self.entities.solar_export.as_deref()).await?.map(Watt))
    }

    async fn battery(&self) -> Result<Option<BatteryReading>> {
        let value = self.number(self.entities.battery.as_deref()).await?;
        Ok(value.map(|v| to_battery_reading(v, self.entities.battery_unit)))
    }

    async fn hot_water_temperature(&self) -> Result<Option<DegreeCelsius>> {
        Ok(self
            .number(self.entities.central_heater_temp.as_deref())
            .await?
            .map(DegreeCelsius))
    }

    async fn weather(&self) -> Result<WeatherReport> {
        let outside_temp = self.number(self.entities.outside_temp.as_deref()).await?;
        let outside_humidity = self.number(self.entities.outside_humidity.as_deref()).await?;
        let forecast = self.state(self.entities.weather_forecast.as_deref()).await?;

        Ok(to_weather_report(outside_temp, outside_humidity, forecast.as_ref()))
    }

    async fn ac_state(&self, room: &RoomId) -> Result<Option<AcState>> {
        let state = self
            .state(self.entities.room_entity(room, RoomEntity::Ac).as_deref())
            .await?;

        Ok(state.as_ref().and_then(to_ac_state))
    }

    async fn floor_heating_state(&self, room: &RoomId) -> Result<Option<bool>> {
        self.room_on_off(room, RoomEntity::FloorHeating).await
    }
}

fn any_present(readings: &[Option<bool>]) -> Option<bool> {
    if readings.contains(&Some(true)) {
        Some(true)
    } else if readings.contains(&Some(false)) {
        Some(false)
    } else {
        None
    }
}

pub(super) fn to_battery_reading(value: f64, unit: BatteryUnit) -> BatteryReading {
    match unit {
        BatteryUnit::Percent => BatteryReading::StateOfCharge(Percent(value)),
        BatteryUnit::KiloWattHours => BatteryReading::StoredEnergy(KiloWattHours(value)),
    }
}

fn to_ac_state(event: &StateChangedEvent) -> Option<AcState> {
    let mode = match &event.state {
        StateValue::Available(mode) => match mode.as_str() {
            "off" => AcMode::Off,
            "heat" => AcMode::Heat,
            "cool" => AcMode::Cool,
            "fan_only" => AcMode::FanOnly,
            _ => return None,
        },
        StateValue::Unavailable => return None,
    };

    Some(AcState {
        mode,
        setpoint: event.attribute_number("temperature").map(DegreeCelsius),
    })
}

//dedicated sensors win over the attributes of the weather entity
fn to_weather_report(
    outside_temp: Option<f64>,
    outside_humidity: Option<f64>,
    forecast: Option<&StateChangedEvent>,
) -> WeatherReport {
    let hourly_forecast = forecast
        .and_then(|f| f.attributes.get("forecast"))
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("temperature").and_then(|t| t.as_f64()))
                .map(DegreeCelsius)
                .collect::<Vec<_>>()
        });

    WeatherReport {
        outdoor_temperature: outside_temp
            .or_else(|| forecast.and_then(|f| f.attribute_number("temperature")))
            .map(DegreeCelsius),
        outdoor_humidity: outside_humidity
            .or_else(|| forecast.and_then(|f| f.attribute_number("humidity")))
            .map(Percent),
        hourly_forecast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::v;

    fn event(json: &str) -> StateChangedEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_ac_state_from_climate_entity() {
        let state = to_ac_state(&event(
            r#"{"entity_id": "climate.office_ac", "state": "heat", "attributes": {"temperature": 21.5, "current_temperature": 19.0}}"#,
        ));

        assert_eq!(
            state,
            Some(AcState {
                mode: AcMode::Heat,
                setpoint: Some(v!(21.5 C)),
            })
        );
    }

    #[test]
    fn test_unsupported_ac_mode_is_unknown() {
        let state = to_ac_state(&event(
            r#"{"entity_id": "climate.office_ac", "state": "dry", "attributes": {}}"#,
        ));

        assert_eq!(state, None);
    }

    #[test]
    fn test_weather_report_prefers_sensors() {
        let forecast = event(
            r#"{
                "entity_id": "weather.forecast",
                "state": "sunny",
                "attributes": {
                    "temperature": 12.0,
                    "humidity": 55,
                    "forecast": [{"temperature": 13.0}, {"temperature": 15.5, "condition": "sunny"}]
                }
            }"#,
        );

        let report = to_weather_report(Some(11.0), None, Some(&forecast));

        assert_eq!(report.outdoor_temperature, Some(v!(11 C)));
        assert_eq!(report.outdoor_humidity, Some(v!(55 %)));
        assert_eq!(report.hourly_forecast, Some(vec![v!(13 C), v!(15.5 C)]));
    }

    #[test]
    fn test_weather_report_without_forecast_entity() {
        let report = to_weather_report(None, None, None);

        assert_eq!(report, WeatherReport::default());
    }

    #[test]
    fn test_any_global_presence() {
        assert_eq!(any_present(&[Some(false), Some(true)]), Some(true));
        assert_eq!(any_present(&[Some(false), None]), Some(false));
        assert_eq!(any_present(&[None]), None);
        assert_eq!(any_present(&[]), None);
    }

    #[test]
    fn test_battery_unit() {
        assert_eq!(
            to_battery_reading(4.2, BatteryUnit::KiloWattHours),
            BatteryReading::StoredEnergy(KiloWattHours(4.2))
        );
        assert_eq!(
            to_battery_reading(80.0, BatteryUnit::Percent),
            BatteryReading::StateOfCharge(v!(80 %))
        );
    }
}
