mod client;
mod config;
mod incoming;
mod outgoing;
mod sensor;

use std::collections::HashMap;

use anyhow::Context;
use client::HaHttpClient;
use infrastructure::Mqtt;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::climate::config::{ClimateConfig, RoomId};
use crate::climate::event::ClimateEvent;

pub use config::EntityConfig;
pub use incoming::HaEventListener;
pub use outgoing::HaActuatorSink;
pub use sensor::HaSensorSource;

#[derive(Debug, Deserialize, Clone)]
pub struct HomeAssistant {
    pub topic_event: String,
    pub url: String,
    pub token: String,
    #[serde(default)]
    pub entities: EntityConfig,
}

impl HomeAssistant {
    pub fn new_sensor_source(&self) -> anyhow::Result<HaSensorSource> {
        let client = HaHttpClient::new(&self.url, &self.token).context("Error creating HA HTTP client")?;
        Ok(HaSensorSource::new(client, self.entities.clone()))
    }

    pub fn new_actuator_sink(&self) -> anyhow::Result<HaActuatorSink> {
        let client = HaHttpClient::new(&self.url, &self.token).context("Error creating HA HTTP client")?;
        Ok(HaActuatorSink::new(client, self.entities.clone()))
    }

    pub async fn new_event_listener(
        &self,
        mqtt: &mut Mqtt,
        config: &ClimateConfig,
        tx: mpsc::Sender<ClimateEvent>,
    ) -> anyhow::Result<HaEventListener> {
        let subscription = mqtt
            .subscribe(self.topic_event.clone())
            .await
            .context("Error subscribing to HA event topic")?;

        let channels = self.entities.channels(config.room_ids());
        tracing::info!("Listening to state changes of {} HA entities", channels.len());

        Ok(HaEventListener::new(subscription, channels, self.entities.battery_unit, tx))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HaChannel {
    RoomTemperature(RoomId),
    Window(RoomId),
    RoomPresence(RoomId),
    HomePresence,
    SolarExport,
    Battery,
    HotWaterTemperature,
}

#[derive(Deserialize, Debug, Clone)]
struct StateChangedEvent {
    pub entity_id: String,
    pub state: StateValue,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
enum StateValue {
    Available(String),
    Unavailable,
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "unavailable" | "unknown" => Ok(StateValue::Unavailable),
            _ => Ok(StateValue::Available(value)),
        }
    }
}

impl StateValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            StateValue::Available(value) => value.parse::<f64>().ok().filter(|v| v.is_finite()),
            StateValue::Unavailable => None,
        }
    }

    //binary sensors report on/off, device trackers home/not_home
    fn as_on_off(&self) -> Option<bool> {
        match self {
            StateValue::Available(value) => match value.as_str() {
                "on" | "home" => Some(true),
                "off" | "not_home" => Some(false),
                _ => None,
            },
            StateValue::Unavailable => None,
        }
    }
}

impl StateChangedEvent {
    fn attribute_number(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(|v| v.as_f64())
    }
}
