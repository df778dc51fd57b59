use std::collections::HashMap;

use serde::Deserialize;

use crate::climate::config::RoomId;

use super::HaChannel;

const ROOM_PLACEHOLDER: &str = "{room_id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomEntity {
    Temperature,
    Window,
    Presence,
    Ac,
    FloorHeating,
    TargetTempDay,
    TargetTempNight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryUnit {
    /// State of charge in percent
    #[default]
    Percent,
    /// Stored energy in kWh
    #[serde(rename = "kwh")]
    KiloWattHours,
}

/// Entity ids with `{room_id}` placeholder. An empty template disables the entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntityTemplates {
    pub temperature: String,
    pub window: String,
    pub presence: String,
    pub ac: String,
    pub floor_heating: String,
    pub target_temp_day: String,
    pub target_temp_night: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoomEntities {
    pub temperature: Option<String>,
    pub window: Option<String>,
    pub presence: Option<String>,
    pub ac: Option<String>,
    pub floor_heating: Option<String>,
    pub target_temp_day: Option<String>,
    pub target_temp_night: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    pub templates: EntityTemplates,
    pub rooms: HashMap<RoomId, RoomEntities>,
    pub central_heater_temp: Option<String>,
    pub central_heater_control: Option<String>,
    pub solar_export: Option<String>,
    pub battery: Option<String>,
    pub battery_unit: BatteryUnit,
    pub outside_temp: Option<String>,
    pub outside_humidity: Option<String>,
    pub weather_forecast: Option<String>,
    pub global_presence: Vec<String>,
}

impl EntityConfig {
    pub fn room_entity(&self, room: &RoomId, entity: RoomEntity) -> Option<String> {
        let overridden = self.rooms.get(room).and_then(|overrides| match entity {
            RoomEntity::Temperature => overrides.temperature.clone(),
            RoomEntity::Window => overrides.window.clone(),
            RoomEntity::Presence => overrides.presence.clone(),
            RoomEntity::Ac => overrides.ac.clone(),
            RoomEntity::FloorHeating => overrides.floor_heating.clone(),
            RoomEntity::TargetTempDay => overrides.target_temp_day.clone(),
            RoomEntity::TargetTempNight => overrides.target_temp_night.clone(),
        });

        let entity_id = overridden.unwrap_or_else(|| {
            let template = match entity {
                RoomEntity::Temperature => &self.templates.temperature,
                RoomEntity::Window => &self.templates.window,
                RoomEntity::Presence => &self.templates.presence,
                RoomEntity::Ac => &self.templates.ac,
                RoomEntity::FloorHeating => &self.templates.floor_heating,
                RoomEntity::TargetTempDay => &self.templates.target_temp_day,
                RoomEntity::TargetTempNight => &self.templates.target_temp_night,
            };
            template.replace(ROOM_PLACEHOLDER, room.as_str())
        });

        if entity_id.is_empty() { None } else { Some(entity_id) }
    }

    /// Reverse index from entity id to what a state change of it means.
    pub(super) fn channels<'a>(&self, rooms: impl Iterator<Item = &'a RoomId>) -> HashMap<String, Vec<HaChannel>> {
        let mut channels: HashMap<String, Vec<HaChannel>> = HashMap::new();
        let mut add = |entity_id: Option<String>, channel: HaChannel| {
            if let Some(entity_id) = entity_id {
                channels.entry(entity_id).or_default().push(channel);
            }
        };

        for room in rooms {
            add(
                self.room_entity(room, RoomEntity::Temperature),
                HaChannel::RoomTemperature(room.clone()),
            );
            add(self.room_entity(room, RoomEntity::Window), HaChannel::Window(room.clone()));
            add(
                self.room_entity(room, RoomEntity::Presence),
                HaChannel::RoomPresence(room.clone()),
            );
        }

        for entity_id in &self.global_presence {
            add(Some(entity_id.clone()), HaChannel::HomePresence);
        }

        add(self.solar_export.clone(), HaChannel::SolarExport);
        add(self.battery.clone(), HaChannel::Battery);
        add(self.central_heater_temp.clone(), HaChannel::HotWaterTemperature);

        channels
    }
}

impl Default for EntityTemplates {
    fn default() -> Self {
        Self {
            temperature: "sensor.{room_id}_thermohygrometer_temperature".to_string(),
            window: "binary_sensor.{room_id}_window".to_string(),
            presence: "binary_sensor.{room_id}_presence".to_string(),
            ac: "climate.{room_id}_ac".to_string(),
            floor_heating: "switch.{room_id}_floor_heating".to_string(),
            target_temp_day: "input_number.{room_id}_target_temp_day".to_string(),
            target_temp_night: "input_number.{room_id}_target_temp_night".to_string(),
        }
    }
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            templates: EntityTemplates::default(),
            rooms: HashMap::new(),
            central_heater_temp: Some("sensor.central_heater_temperature".to_string()),
            central_heater_control: None,
            solar_export: Some("sensor.solar_power_excess".to_string()),
            battery: Some("sensor.battery_capacity".to_string()),
            battery_unit: BatteryUnit::default(),
            outside_temp: Some("sensor.outside_temperature".to_string()),
            outside_humidity: Some("sensor.outside_humidity".to_string()),
            weather_forecast: Some("weather.forecast".to_string()),
            global_presence: vec![],
        }
    }
}
