use std::sync::Arc;

use serde::Serialize;

use super::config::{ClimateConfig, HeatSource, HeaterConfig, PowerConfig, SolarSign};
use crate::core::unit::{DegreeCelsius, KiloWattHours, Percent, Watt};

const BATTERY_FULL_SCALE: Watt = Watt(1000.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryReading {
    StateOfCharge(Percent),
    StoredEnergy(KiloWattHours),
}

/// Last known readings of the energy side of the building. A missing reading never resets a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerState {
    pub solar_export: Watt,
    pub battery_soc: Percent,
    pub hot_water_temperature: Option<DegreeCelsius>,
}

/// What the decision engine needs to know about available energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySupply {
    pub usable_watts: Watt,
    pub hot_water_temperature: Option<DegreeCelsius>,
    pub heater_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerStatus {
    pub solar_export: Watt,
    pub battery_soc: Percent,
    pub usable_battery_kwh: KiloWattHours,
    pub hot_water_temperature: Option<DegreeCelsius>,
    pub usable_watts: Watt,
    pub heater_ready: bool,
}

pub struct PowerModel {
    config: Arc<ClimateConfig>,
    state: PowerState,
}

impl PowerConfig {
    /// Solar reading normalised so that grid export is positive.
    pub fn export_of(&self, solar_reading: Watt) -> Watt {
        match self.solar_sign {
            SolarSign::ExportNegative => -solar_reading,
            SolarSign::ExportPositive => solar_reading,
        }
    }

    /// Power that can be spent on climate control without drawing from the grid. Never negative.
    pub fn usable_renewable_watts(&self, solar_reading: Watt, battery_soc: Percent) -> Watt {
        let export = self.export_of(solar_reading);

        if export > self.min_solar_excess {
            return export;
        }

        if battery_soc > self.min_battery_percent {
            let scale = Percent(100.0) - self.min_battery_percent;
            let battery_watts = BATTERY_FULL_SCALE * ((battery_soc - self.min_battery_percent).0 / scale.0);
            return battery_watts.max(export).max(Watt(0.0));
        }

        export.max(Watt(0.0))
    }

    pub fn battery_soc(&self, reading: BatteryReading) -> Percent {
        match reading {
            BatteryReading::StateOfCharge(soc) => soc.clamp(),
            BatteryReading::StoredEnergy(kwh) => kwh.share_of(self.battery_max_capacity).clamp(),
        }
    }

    pub fn usable_battery_energy(&self, battery_soc: Percent) -> KiloWattHours {
        let above_reserve = (battery_soc - self.min_battery_percent).0.max(0.0);
        self.battery_max_capacity * Percent(above_reserve)
    }

    pub fn is_heater_ready(&self, hot_water_temperature: Option<DegreeCelsius>) -> bool {
        match self.heat_source {
            HeatSource::OnDemand => true,
            HeatSource::Buffered { min_temperature } => {
                hot_water_temperature.is_some_and(|temp| temp >= min_temperature)
            }
        }
    }
}

impl HeaterConfig {
    /// Heating curve: the colder it is outside, the hotter the water.
    pub fn optimal_setpoint(&self, outdoor_temperature: Option<DegreeCelsius>) -> DegreeCelsius {
        let Some(outdoor) = outdoor_temperature else {
            return self.default_heater_temp;
        };

        let outdoor_range = self.max_outdoor_temp - self.min_outdoor_temp;
        if outdoor_range.0.abs() < f64::EPSILON {
            return ((self.min_heater_temp + self.max_heater_temp) * 0.5).round_to_tenth();
        }

        let clamped = outdoor.clamp(self.min_outdoor_temp, self.max_outdoor_temp);
        let cold_fraction = (self.max_outdoor_temp - clamped) / outdoor_range;
        let setpoint = self.min_heater_temp + (self.max_heater_temp - self.min_heater_temp) * cold_fraction;

        setpoint.round_to_tenth()
    }
}

impl PowerModel {
    pub fn new(config: Arc<ClimateConfig>) -> Self {
        Self {
            config,
            state: PowerState::default(),
        }
    }

    pub fn state(&self) -> &PowerState {
        &self.state
    }

    pub fn update_solar_export(&mut self, solar_reading: Watt) {
        self.state.solar_export = solar_reading;
    }

    pub fn update_battery(&mut self, reading: BatteryReading) {
        self.state.battery_soc = self.config.power.battery_soc(reading);
    }

    pub fn update_hot_water_temperature(&mut self, temperature: DegreeCelsius) {
        self.state.hot_water_temperature = Some(temperature);
    }

    pub fn usable_renewable_watts(&self) -> Watt {
        self.config
            .power
            .usable_renewable_watts(self.state.solar_export, self.state.battery_soc)
    }

    pub fn usable_battery_energy(&self) -> KiloWattHours {
        self.config.power.usable_battery_energy(self.state.battery_soc)
    }

    pub fn optimal_heater_setpoint(&self, outdoor_temperature: Option<DegreeCelsius>) -> DegreeCelsius {
        self.config.heater.optimal_setpoint(outdoor_temperature)
    }

    pub fn is_heater_ready(&self) -> bool {
        self.config.power.is_heater_ready(self.state.hot_water_temperature)
    }

    pub fn supply(&self) -> EnergySupply {
        EnergySupply {
            usable_watts: self.usable_renewable_watts(),
            hot_water_temperature: self.state.hot_water_temperature,
            heater_ready: self.is_heater_ready(),
        }
    }

    pub fn status(&self) -> PowerStatus {
        PowerStatus {
            solar_export: self.state.solar_export,
            battery_soc: self.state.battery_soc,
            usable_battery_kwh: self.usable_battery_energy(),
            hot_water_temperature: self.state.hot_water_temperature,
            usable_watts: self.usable_renewable_watts(),
            heater_ready: self.is_heater_ready(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::v;
    use proptest::prelude::*;

    fn power_config() -> PowerConfig {
        PowerConfig::default()
    }

    #[test]
    fn test_solar_export_beyond_minimum_is_used_directly() {
        let usable = power_config().usable_renewable_watts(v!(-1200 W), v!(10 %));

        assert_eq!(usable, v!(1200 W));
    }

    #[test]
    fn test_battery_scales_linearly_above_reserve() {
        //20% reserve, 60% is halfway to full
        let usable = power_config().usable_renewable_watts(v!(-100 W), v!(60 %));

        assert_eq!(usable, v!(500 W));
    }

    #[test]
    fn test_small_export_wins_over_low_battery_contribution() {
        let usable = power_config().usable_renewable_watts(v!(-250 W), v!(30 %));

        assert_eq!(usable, v!(250 W));
    }

    #[test]
    fn test_grid_import_is_never_available() {
        let usable = power_config().usable_renewable_watts(v!(800 W), v!(15 %));

        assert_eq!(usable, v!(0 W));
    }

    #[test]
    fn test_positive_sign_convention() {
        let config = PowerConfig {
            solar_sign: SolarSign::ExportPositive,
            ..PowerConfig::default()
        };

        assert_eq!(config.usable_renewable_watts(v!(900 W), v!(0 %)), v!(900 W));
        assert_eq!(config.usable_renewable_watts(v!(-900 W), v!(0 %)), v!(0 W));
    }

    #[test]
    fn test_stored_energy_converted_to_percent() {
        let config = power_config();

        assert_eq!(config.battery_soc(BatteryReading::StoredEnergy(KiloWattHours(2.5))), v!(25 %));
        assert_eq!(config.battery_soc(BatteryReading::StoredEnergy(KiloWattHours(12.0))), v!(100 %));
    }

    #[test]
    fn test_usable_battery_energy_above_reserve() {
        let config = power_config();

        assert_eq!(config.usable_battery_energy(v!(70 %)), KiloWattHours(5.0));
        assert_eq!(config.usable_battery_energy(v!(10 %)), KiloWattHours(0.0));
    }

    #[test]
    fn test_heater_setpoint_at_range_ends() {
        let heater = HeaterConfig::default();

        assert_eq!(heater.optimal_setpoint(Some(v!(-10 C))), v!(55 C));
        assert_eq!(heater.optimal_setpoint(Some(v!(20 C))), v!(35 C));
    }

    #[test]
    fn test_heater_setpoint_interpolates_and_clamps() {
        let heater = HeaterConfig::default();

        assert_eq!(heater.optimal_setpoint(Some(v!(5 C))), v!(45 C));
        assert_eq!(heater.optimal_setpoint(Some(v!(0 C))), DegreeCelsius(48.3));
        assert_eq!(heater.optimal_setpoint(Some(v!(-25 C))), v!(55 C));
        assert_eq!(heater.optimal_setpoint(Some(v!(31 C))), v!(35 C));
    }

    #[test]
    fn test_heater_setpoint_without_outdoor_temperature() {
        assert_eq!(HeaterConfig::default().optimal_setpoint(None), v!(45 C));
    }

    #[test]
    fn test_heater_setpoint_degenerate_outdoor_range() {
        let heater = HeaterConfig {
            min_outdoor_temp: v!(10 C),
            max_outdoor_temp: v!(10 C),
            ..HeaterConfig::default()
        };

        assert_eq!(heater.optimal_setpoint(Some(v!(3 C))), v!(45 C));
    }

    #[test]
    fn test_buffered_heat_source_needs_minimum_temperature() {
        let config = PowerConfig {
            heat_source: HeatSource::Buffered {
                min_temperature: v!(40 C),
            },
            ..PowerConfig::default()
        };

        assert!(!config.is_heater_ready(None));
        assert!(!config.is_heater_ready(Some(v!(38 C))));
        assert!(config.is_heater_ready(Some(v!(40 C))));
        assert!(PowerConfig::default().is_heater_ready(None));
    }

    #[test]
    fn test_model_keeps_readings_and_reports_status() {
        let mut model = PowerModel::new(Arc::new(ClimateConfig::default()));
        model.update_solar_export(v!(-200 W));
        model.update_battery(BatteryReading::StateOfCharge(v!(80 %)));
        model.update_hot_water_temperature(v!(42 C));

        let status = model.status();

        assert_eq!(status.usable_watts, v!(750 W));
        assert_eq!(status.usable_battery_kwh, KiloWattHours(6.0));
        assert_eq!(status.hot_water_temperature, Some(v!(42 C)));
        assert!(status.heater_ready);
    }

    proptest! {
        #[test]
        fn usable_watts_never_negative(solar in -5000.0..5000.0f64, soc in 0.0..100.0f64) {
            let usable = power_config().usable_renewable_watts(Watt(solar), Percent(soc));

            prop_assert!(usable.0 >= 0.0);
        }

        #[test]
        fn usable_watts_non_decreasing_in_battery(solar in -5000.0..5000.0f64, soc in 20.0..100.0f64, increase in 0.0..50.0f64) {
            let config = power_config();
            let lower = config.usable_renewable_watts(Watt(solar), Percent(soc));
            let higher = config.usable_renewable_watts(Watt(solar), Percent((soc + increase).min(100.0)));

            prop_assert!(higher.0 >= lower.0);
        }
    }
}
