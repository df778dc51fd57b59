use std::collections::HashMap;

use infrastructure::MqttSubscription;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::config::BatteryUnit;
use super::sensor::to_battery_reading;
use super::{HaChannel, StateChangedEvent};
use crate::climate::event::ClimateEvent;
use crate::core::unit::{DegreeCelsius, Watt};

/// Turns HA `state_changed` events into climate events.
pub struct HaEventListener {
    subscription: MqttSubscription,
    channels: HashMap<String, Vec<HaChannel>>,
    battery_unit: BatteryUnit,
    tx: mpsc::Sender<ClimateEvent>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "event_type", content = "event_data")]
enum HaEvent {
    #[serde(rename = "state_changed")]
    StateChanged {
        entity_id: String,
        old_state: Option<StateChangedEvent>,
        new_state: Option<StateChangedEvent>,
    },

    #[serde(untagged)]
    Unknown(serde_json::Value),
}

impl HaEventListener {
    pub(super) fn new(
        subscription: MqttSubscription,
        channels: HashMap<String, Vec<HaChannel>>,
        battery_unit: BatteryUnit,
        tx: mpsc::Sender<ClimateEvent>,
    ) -> Self {
        Self {
            subscription,
            channels,
            battery_unit,
            tx,
        }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.subscription.recv().await {
            let event = match serde_json::from_str::<HaEvent>(&msg.payload) {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("Error parsing MQTT message: {}", e);
                    continue;
                }
            };

            for climate_event in to_climate_events(&self.channels, self.battery_unit, &event) {
                tracing::debug!("Received {:?}", climate_event);

                if self.tx.send(climate_event).await.is_err() {
                    tracing::warn!("Climate runner stopped, closing HA event listener");
                    return;
                }
            }
        }

        tracing::error!("HA event subscription closed");
    }
}

fn to_climate_events(
    channels: &HashMap<String, Vec<HaChannel>>,
    battery_unit: BatteryUnit,
    event: &HaEvent,
) -> Vec<ClimateEvent> {
    let HaEvent::StateChanged {
        entity_id,
        old_state,
        new_state,
    } = event
    else {
        tracing::trace!("Received unsupported event: {:?}", event);
        return vec![];
    };

    let Some(channels) = channels.get(entity_id) else {
        return vec![];
    };

    let old_state = old_state.as_ref();
    let new_state = new_state.as_ref();

    if let (Some(old), Some(new)) = (old_state, new_state) {
        if old.state == new.state {
            tracing::trace!("Ignoring attribute-only change of {}", entity_id);
            return vec![];
        }
    }

    let number = |state: Option<&StateChangedEvent>| state.and_then(|s| s.state.as_number());
    let on_off = new_state.and_then(|s| s.state.as_on_off());

    channels
        .iter()
        .map(|channel| match channel {
            HaChannel::RoomTemperature(room) => ClimateEvent::RoomTemperatureChanged {
                room: room.clone(),
                temperature: number(new_state).map(DegreeCelsius),
            },
            HaChannel::Window(room) => ClimateEvent::WindowChanged {
                room: room.clone(),
                open: on_off,
            },
            HaChannel::RoomPresence(room) => ClimateEvent::RoomPresenceChanged {
                room: room.clone(),
                present: on_off,
            },
            HaChannel::HomePresence => ClimateEvent::HomePresenceChanged { present: on_off },
            HaChannel::SolarExport => ClimateEvent::SolarExportChanged {
                previous: number(old_state).map(Watt),
                current: number(new_state).map(Watt),
            },
            HaChannel::Battery => ClimateEvent::BatteryChanged(
                number(new_state).map(|v| to_battery_reading(v, battery_unit)),
            ),
            HaChannel::HotWaterTemperature => {
                ClimateEvent::HotWaterTemperatureChanged(number(new_state).map(DegreeCelsius))
            }
        })
        .collect()
}
