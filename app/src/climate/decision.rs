use std::sync::Arc;

use serde::Serialize;

use super::config::{ClimateConfig, RoomConfig, RoomId};
use super::power::EnergySupply;
use super::weather::WeatherTrend;
use crate::core::unit::DegreeCelsius;

//need below which floor heating alone catches up
const FLOOR_ONLY_MAX_NEED: DegreeCelsius = DegreeCelsius(1.5);
//need above which AC boosts floor heating regardless of power
const BOOST_NEED: DegreeCelsius = DegreeCelsius(3.0);
const AC_HEAT_OFFSET: DegreeCelsius = DegreeCelsius(0.5);
const AC_COOL_OFFSET: DegreeCelsius = DegreeCelsius(0.5);
const AC_AGGRESSIVE_COOL_OFFSET: DegreeCelsius = DegreeCelsius(1.0);
const AGGRESSIVE_COOLING_FACTOR: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ClimateAction {
    #[display("no_action")]
    NoAction,
    #[display("heat_with_ac")]
    HeatWithAc,
    #[display("cool_with_ac")]
    CoolWithAc,
    #[display("heat_with_floor")]
    HeatWithFloor,
    #[display("heat_with_ac_and_floor")]
    HeatWithAcAndFloor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum AcMode {
    #[display("off")]
    Off,
    #[display("heat")]
    Heat,
    #[display("cool")]
    Cool,
    #[display("fan_only")]
    FanOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub action: ClimateAction,
    pub ac_mode: AcMode,
    pub ac_setpoint: Option<DegreeCelsius>,
    pub floor_heating: bool,
    /// Target after eco override
    pub target_temperature: DegreeCelsius,
    pub reason: String,
}

/// Everything known about a room at the moment of a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub current_temperature: DegreeCelsius,
    pub target_temperature: DegreeCelsius,
    pub window_open: bool,
    pub room_occupied: bool,
    pub home_occupied: bool,
    pub room: RoomConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EcoOverride {
    Heating(DegreeCelsius),
    Cooling(DegreeCelsius),
}

impl EcoOverride {
    fn target(&self) -> DegreeCelsius {
        match self {
            EcoOverride::Heating(t) | EcoOverride::Cooling(t) => *t,
        }
    }
}

pub struct ClimateDecisionEngine {
    config: Arc<ClimateConfig>,
}

impl ClimateDecisionEngine {
    pub fn new(config: Arc<ClimateConfig>) -> Self {
        Self { config }
    }

    pub fn decide(&self, snapshot: &RoomSnapshot, supply: &EnergySupply, trend: WeatherTrend) -> Decision {
        let nominal = snapshot.target_temperature;

        if snapshot.window_open {
            return Decision::no_action(nominal, "Window open, climate control paused".to_string());
        }

        let current = snapshot.current_temperature;
        let tolerance = snapshot.room.temp_tolerance.unwrap_or(self.config.decision.temp_tolerance);
        let eco = self.eco_override(snapshot);
        let target = eco.map(|e| e.target()).unwrap_or(nominal);
        let delta = current - target;

        //eco only relaxes in the direction already needed
        let heating_allowed = !matches!(eco, Some(EcoOverride::Cooling(_)));
        let cooling_allowed = !matches!(eco, Some(EcoOverride::Heating(_)));

        let decision = if delta < -tolerance && heating_allowed {
            self.heat(&snapshot.room, target, target - current, supply, trend)
        } else if delta > tolerance && cooling_allowed {
            self.cool(&snapshot.room, target, supply)
        } else {
            Decision::no_action(target, format!("Within tolerance of target {} (current {})", target, current))
        };

        match eco {
            Some(eco) => decision.with_reason_prefix(&format!(
                "Eco mode while away, target {} instead of {}",
                eco.target(),
                nominal
            )),
            None => decision,
        }
    }

    fn eco_override(&self, snapshot: &RoomSnapshot) -> Option<EcoOverride> {
        let config = &self.config.decision;
        if snapshot.home_occupied || !config.eco_mode_when_away {
            return None;
        }

        let nominal = snapshot.target_temperature;
        if snapshot.current_temperature < nominal {
            Some(EcoOverride::Heating(nominal.min(config.eco_temp_heating)))
        } else if snapshot.current_temperature > nominal {
            Some(EcoOverride::Cooling(nominal.max(config.eco_temp_cooling)))
        } else {
            None
        }
    }

    fn heat(
        &self,
        room: &RoomConfig,
        target: DegreeCelsius,
        need: DegreeCelsius,
        supply: &EnergySupply,
        trend: WeatherTrend,
    ) -> Decision {
        let config = &self.config.decision;
        let setpoint = (target + AC_HEAT_OFFSET).clamp(config.ac_min_temp, config.ac_max_temp);
        let floor_usable = room.floor_heating_available
            && supply.heater_ready
            && supply
                .hot_water_temperature
                .is_some_and(|temp| temp >= config.heater_min_temp);

        if floor_usable {
            if need < FLOOR_ONLY_MAX_NEED {
                return Decision::heat_with_floor(target, format!("Small heating need of {}, floor heating", need));
            }

            if !room.ac_heating_available {
                return Decision::heat_with_floor(target, format!("Heating need of {}, only floor heating", need));
            }

            if supply.usable_watts > config.solar_excess_threshold {
                return Decision::heat_with_ac_and_floor(
                    target,
                    setpoint,
                    format!("Renewable power of {} available, heating with AC and floor", supply.usable_watts),
                );
            }

            if need > BOOST_NEED {
                return Decision::heat_with_ac_and_floor(
                    target,
                    setpoint,
                    format!("Large heating need of {}, heating with AC and floor", need),
                );
            }

            if trend == WeatherTrend::Dropping {
                return Decision::heat_with_floor(
                    target,
                    "Outdoor temperature dropping, preheating with floor".to_string(),
                );
            }

            return if room.floor_heating_cost <= room.ac_heating_cost {
                Decision::heat_with_floor(target, "Floor heating is the cheaper option".to_string())
            } else {
                Decision::heat_with_ac(target, setpoint, "AC heating is the cheaper option".to_string())
            };
        }

        if room.ac_heating_available {
            return Decision::heat_with_ac(
                target,
                setpoint,
                format!("Heating need of {}, floor heating not usable", need),
            );
        }

        Decision::no_action(target, "No heating option available".to_string())
    }

    fn cool(&self, room: &RoomConfig, target: DegreeCelsius, supply: &EnergySupply) -> Decision {
        let config = &self.config.decision;

        if !room.ac_cooling_available {
            return Decision::no_action(target, "No cooling option available".to_string());
        }

        if supply.usable_watts > config.solar_excess_threshold * AGGRESSIVE_COOLING_FACTOR {
            let setpoint = (target - AC_AGGRESSIVE_COOL_OFFSET).clamp(config.ac_min_temp, config.ac_max_temp);
            return Decision::cool_with_ac(
                target,
                setpoint,
                format!("Cooling aggressively with {} renewable power", supply.usable_watts),
            );
        }

        let setpoint = (target - AC_COOL_OFFSET).clamp(config.ac_min_temp, config.ac_max_temp);
        Decision::cool_with_ac(target, setpoint, "Cooling with AC".to_string())
    }
}

impl Decision {
    pub fn no_action(target: DegreeCelsius, reason: String) -> Self {
        Self {
            action: ClimateAction::NoAction,
            ac_mode: AcMode::Off,
            ac_setpoint: None,
            floor_heating: false,
            target_temperature: target,
            reason,
        }
    }

    pub fn heat_with_floor(target: DegreeCelsius, reason: String) -> Self {
        Self {
            action: ClimateAction::HeatWithFloor,
            floor_heating: true,
            ..Self::no_action(target, reason)
        }
    }

    pub fn heat_with_ac(target: DegreeCelsius, setpoint: DegreeCelsius, reason: String) -> Self {
        Self {
            action: ClimateAction::HeatWithAc,
            ac_mode: AcMode::Heat,
            ac_setpoint: Some(setpoint),
            ..Self::no_action(target, reason)
        }
    }

    pub fn heat_with_ac_and_floor(target: DegreeCelsius, setpoint: DegreeCelsius, reason: String) -> Self {
        Self {
            action: ClimateAction::HeatWithAcAndFloor,
            ac_mode: AcMode::Heat,
            ac_setpoint: Some(setpoint),
            floor_heating: true,
            ..Self::no_action(target, reason)
        }
    }

    pub fn cool_with_ac(target: DegreeCelsius, setpoint: DegreeCelsius, reason: String) -> Self {
        Self {
            action: ClimateAction::CoolWithAc,
            ac_mode: AcMode::Cool,
            ac_setpoint: Some(setpoint),
            ..Self::no_action(target, reason)
        }
    }

    fn with_reason_prefix(self, prefix: &str) -> Self {
        Self {
            reason: format!("{}: {}", prefix, self.reason),
            ..self
        }
    }
}
