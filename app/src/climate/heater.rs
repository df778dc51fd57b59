use std::sync::Arc;

use serde::Serialize;

use super::config::ClimateConfig;
use crate::core::unit::DegreeCelsius;
use crate::port::{ActuatorSink, CommandExecutionResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaterStatus {
    pub target_temperature: Option<DegreeCelsius>,
    pub min_temperature: DegreeCelsius,
    pub max_temperature: DegreeCelsius,
}

/// Keeps the central hot-water setpoint on the heating curve without chattering.
pub struct HeaterController {
    config: Arc<ClimateConfig>,
    target: Option<DegreeCelsius>,
}

impl HeaterController {
    pub fn new(config: Arc<ClimateConfig>) -> Self {
        Self { config, target: None }
    }

    pub fn target(&self) -> Option<DegreeCelsius> {
        self.target
    }

    /// Setpoint to send, if it moved far enough from the last one sent.
    pub fn plan(&self, optimal: DegreeCelsius) -> Option<DegreeCelsius> {
        let heater = &self.config.heater;
        let setpoint = optimal
            .clamp(heater.min_heater_temp, heater.max_heater_temp)
            .round_to_tenth();

        match self.target {
            Some(target) if (setpoint - target).abs() < heater.adjust_threshold => None,
            _ => Some(setpoint),
        }
    }

    pub async fn update(&mut self, actuators: &impl ActuatorSink, optimal: DegreeCelsius) -> Option<DegreeCelsius> {
        let setpoint = self.plan(optimal)?;

        match actuators.set_water_heater_temperature(setpoint).await {
            Ok(CommandExecutionResult::Triggered) => {
                tracing::info!("Set water heater to {}", setpoint);
                self.target = Some(setpoint);
                Some(setpoint)
            }
            Ok(CommandExecutionResult::Skipped) => {
                tracing::debug!("No water heater control configured");
                None
            }
            Err(e) => {
                tracing::error!("Error setting water heater to {}: {:?}", setpoint, e);
                None
            }
        }
    }

    pub fn status(&self) -> HeaterStatus {
        HeaterStatus {
            target_temperature: self.target,
            min_temperature: self.config.heater.min_heater_temp,
            max_temperature: self.config.heater.max_heater_temp,
        }
    }
}
