use serde_json::{Value, json};

use super::HaHttpClient;
use super::config::{EntityConfig, RoomEntity};
use crate::climate::config::RoomId;
use crate::climate::decision::AcMode;
use crate::core::unit::DegreeCelsius;
use crate::port::{ActuatorSink, CommandExecutionResult};

pub struct HaActuatorSink {
    client: HaHttpClient,
    entities: EntityConfig,
}

#[derive(Debug, Clone, PartialEq)]
struct ServiceCall {
    domain: &'static str,
    service: &'static str,
    data: Value,
}

impl HaActuatorSink {
    pub fn new(client: HaHttpClient, entities: EntityConfig) -> Self {
        Self { client, entities }
    }

    async fn execute(&self, call: Option<ServiceCall>) -> anyhow::Result<CommandExecutionResult> {
        match call {
            Some(call) => {
                self.client.call_service(call.domain, call.service, call.data).await?;
                Ok(CommandExecutionResult::Triggered)
            }
            None => Ok(CommandExecutionResult::Skipped),
        }
    }
}

impl ActuatorSink for HaActuatorSink {
    #[tracing::instrument(name = "set_ac HA", ret, skip(self))]
    async fn set_ac(
        &self,
        room: &RoomId,
        mode: AcMode,
        setpoint: Option<DegreeCelsius>,
    ) -> anyhow::Result<CommandExecutionResult> {
        let call = self
            .entities
            .room_entity(room, RoomEntity::Ac)
            .map(|entity_id| ac_service_call(&entity_id, mode, setpoint));

        self.execute(call).await
    }

    #[tracing::instrument(name = "set_floor_heating HA", ret, skip(self))]
    async fn set_floor_heating(&self, room: &RoomId, on: bool) -> anyhow::Result<CommandExecutionResult> {
        let call = self
            .entities
            .room_entity(room, RoomEntity::FloorHeating)
            .map(|entity_id| switch_service_call(&entity_id, on));

        self.execute(call).await
    }

    #[tracing::instrument(name = "set_water_heater_temperature HA", ret, skip(self))]
    async fn set_water_heater_temperature(&self, temperature: DegreeCelsius) -> anyhow::Result<CommandExecutionResult> {
        let call = self.entities.central_heater_control.as_ref().map(|entity_id| ServiceCall {
            domain: "climate",
            service: "set_temperature",
            data: json!({
                "entity_id": entity_id,
                "temperature": temperature.0,
            }),
        });

        self.execute(call).await
    }
}

fn ac_service_call(entity_id: &str, mode: AcMode, setpoint: Option<DegreeCelsius>) -> ServiceCall {
    match (mode, setpoint) {
        (AcMode::Heat | AcMode::Cool, Some(setpoint)) => ServiceCall {
            domain: "climate",
            service: "set_temperature",
            data: json!({
                "entity_id": entity_id,
                "hvac_mode": mode.to_string(),
                "temperature": setpoint.0,
            }),
        },
        _ => ServiceCall {
            domain: "climate",
            service: "set_hvac_mode",
            data: json!({
                "entity_id": entity_id,
                "hvac_mode": mode.to_string(),
            }),
        },
    }
}

fn switch_service_call(entity_id: &str, on: bool) -> ServiceCall {
    ServiceCall {
        domain: "switch",
        service: if on { "turn_on" } else { "turn_off" },
        data: json!({
            "entity_id": entity_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::v;

    #[test]
    fn test_heat_sets_mode_and_temperature_at_once() {
        let call = ac_service_call("climate.office_ac", AcMode::Heat, Some(v!(22.5 C)));

        assert_eq!(call.service, "set_temperature");
        assert_eq!(
            call.data,
            json!({
                "entity_id": "climate.office_ac",
                "hvac_mode": "heat",
                "temperature": 22.5,
            })
        );
    }

    #[test]
    fn test_off_sets_mode_only() {
        let call = ac_service_call("climate.office_ac", AcMode::Off, None);

        assert_eq!(call.service, "set_hvac_mode");
        assert_eq!(
            call.data,
            json!({
                "entity_id": "climate.office_ac",
                "hvac_mode": "off",
            })
        );
    }

    #[test]
    fn test_fan_only_ignores_setpoint() {
        let call = ac_service_call("climate.office_ac", AcMode::FanOnly, Some(v!(24 C)));

        assert_eq!(call.service, "set_hvac_mode");
        assert_eq!(call.data["hvac_mode"], "fan_only");
    }

    #[test]
    fn test_floor_heating_switch() {
        assert_eq!(switch_service_call("switch.office_floor_heating", true).service, "turn_on");
        assert_eq!(switch_service_call("switch.office_floor_heating", false).service, "turn_off");
    }
}
