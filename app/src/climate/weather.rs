use std::sync::Arc;

use serde::Serialize;

use super::config::ClimateConfig;
use crate::core::time::LocalDateTime;
use crate::core::unit::{DegreeCelsius, Percent};

const TREND_THRESHOLD: DegreeCelsius = DegreeCelsius(1.0);
const HEATING_FAVORABLE_BELOW: DegreeCelsius = DegreeCelsius(10.0);
const COOLING_FAVORABLE_ABOVE: DegreeCelsius = DegreeCelsius(25.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum WeatherTrend {
    #[display("rising")]
    Rising,
    #[display("steady")]
    Steady,
    #[display("dropping")]
    Dropping,
}

impl WeatherTrend {
    pub fn classify(current: Option<DegreeCelsius>, forecast: Option<DegreeCelsius>) -> Self {
        match (current, forecast) {
            (Some(current), Some(forecast)) if forecast > current + TREND_THRESHOLD => WeatherTrend::Rising,
            (Some(current), Some(forecast)) if forecast < current - TREND_THRESHOLD => WeatherTrend::Dropping,
            _ => WeatherTrend::Steady,
        }
    }
}

/// One fetch of outdoor conditions. Absent values keep what was known before.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherReport {
    pub outdoor_temperature: Option<DegreeCelsius>,
    pub outdoor_humidity: Option<Percent>,
    pub hourly_forecast: Option<Vec<DegreeCelsius>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherStatus {
    pub outdoor_temperature: Option<DegreeCelsius>,
    pub outdoor_humidity: Option<Percent>,
    pub forecast_hours: usize,
    pub trend: WeatherTrend,
    pub heating_favorable: bool,
    pub cooling_favorable: bool,
    pub last_update: Option<LocalDateTime>,
}

pub struct WeatherState {
    config: Arc<ClimateConfig>,
    outdoor_temperature: Option<DegreeCelsius>,
    outdoor_humidity: Option<Percent>,
    forecast: Vec<DegreeCelsius>,
    last_update: Option<LocalDateTime>,
}

impl WeatherState {
    pub fn new(config: Arc<ClimateConfig>) -> Self {
        Self {
            config,
            outdoor_temperature: None,
            outdoor_humidity: None,
            forecast: vec![],
            last_update: None,
        }
    }

    pub fn update(&mut self, report: WeatherReport, now: LocalDateTime) {
        if report.outdoor_temperature.is_some() {
            self.outdoor_temperature = report.outdoor_temperature;
        }

        if report.outdoor_humidity.is_some() {
            self.outdoor_humidity = report.outdoor_humidity;
        }

        if let Some(mut forecast) = report.hourly_forecast {
            forecast.truncate(self.config.weather.forecast_hours);
            self.forecast = forecast;
        }

        self.last_update = Some(now);
    }

    pub fn needs_refresh(&self, now: LocalDateTime) -> bool {
        match self.last_update {
            Some(last_update) => now - last_update > self.config.weather.max_forecast_age(),
            None => true,
        }
    }

    pub fn outdoor_temperature(&self) -> Option<DegreeCelsius> {
        self.outdoor_temperature
    }

    /// Difference between the end of the forecast window and now.
    pub fn temperature_change(&self) -> Option<DegreeCelsius> {
        let current = self.outdoor_temperature?;
        let last = self.forecast.last()?;
        Some(*last - current)
    }

    pub fn trend(&self) -> WeatherTrend {
        WeatherTrend::classify(self.outdoor_temperature, self.forecast.last().copied())
    }

    pub fn is_heating_favorable(&self) -> bool {
        self.temperature_change().is_some_and(|change| change < -TREND_THRESHOLD)
            || self.outdoor_temperature.is_some_and(|t| t < HEATING_FAVORABLE_BELOW)
    }

    pub fn is_cooling_favorable(&self) -> bool {
        self.temperature_change().is_some_and(|change| change > TREND_THRESHOLD)
            || self.outdoor_temperature.is_some_and(|t| t > COOLING_FAVORABLE_ABOVE)
    }

    pub fn status(&self) -> WeatherStatus {
        WeatherStatus {
            outdoor_temperature: self.outdoor_temperature,
            outdoor_humidity: self.outdoor_humidity,
            forecast_hours: self.forecast.len(),
            trend: self.trend(),
            heating_favorable: self.is_heating_favorable(),
            cooling_favorable: self.is_cooling_favorable(),
            last_update: self.last_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::v;

    fn at(hour: u32, minute: u32) -> LocalDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn weather() -> WeatherState {
        WeatherState::new(Arc::new(ClimateConfig::default()))
    }

    #[test]
    fn test_classify() {
        assert_eq!(WeatherTrend::classify(Some(v!(10 C)), Some(v!(12 C))), WeatherTrend::Rising);
        assert_eq!(WeatherTrend::classify(Some(v!(10 C)), Some(v!(8 C))), WeatherTrend::Dropping);
        assert_eq!(WeatherTrend::classify(Some(v!(10 C)), Some(v!(11 C))), WeatherTrend::Steady);
        assert_eq!(WeatherTrend::classify(Some(v!(10 C)), Some(v!(9 C))), WeatherTrend::Steady);
    }

    #[test]
    fn test_classify_missing_data_is_steady() {
        assert_eq!(WeatherTrend::classify(None, Some(v!(20 C))), WeatherTrend::Steady);
        assert_eq!(WeatherTrend::classify(Some(v!(20 C)), None), WeatherTrend::Steady);
    }

    #[test]
    fn test_trend_uses_end_of_forecast_window() {
        let mut weather = WeatherState::new(Arc::new(ClimateConfig {
            weather: crate::climate::config::WeatherConfig {
                forecast_hours: 3,
                ..Default::default()
            },
            ..ClimateConfig::default()
        }));

        weather.update(
            WeatherReport {
                outdoor_temperature: Some(v!(10 C)),
                outdoor_humidity: None,
                hourly_forecast: Some(vec![v!(10 C), v!(9 C), v!(8 C), v!(20 C)]),
            },
            at(8, 0),
        );

        assert_eq!(weather.trend(), WeatherTrend::Dropping);
        assert!(weather.is_heating_favorable());
        assert!(!weather.is_cooling_favorable());
    }

    #[test]
    fn test_missing_values_keep_previous() {
        let mut weather = weather();
        weather.update(
            WeatherReport {
                outdoor_temperature: Some(v!(12 C)),
                outdoor_humidity: Some(v!(60 %)),
                hourly_forecast: Some(vec![v!(15 C)]),
            },
            at(8, 0),
        );

        weather.update(WeatherReport::default(), at(9, 0));

        assert_eq!(weather.outdoor_temperature(), Some(v!(12 C)));
        assert_eq!(weather.trend(), WeatherTrend::Rising);
    }

    #[test]
    fn test_needs_refresh_after_max_age() {
        let mut weather = weather();
        assert!(weather.needs_refresh(at(8, 0)));

        weather.update(WeatherReport::default(), at(8, 0));

        assert!(!weather.needs_refresh(at(8, 30)));
        assert!(weather.needs_refresh(at(8, 31)));
    }

    #[test]
    fn test_hot_outside_is_cooling_favorable() {
        let mut weather = weather();
        weather.update(
            WeatherReport {
                outdoor_temperature: Some(v!(28 C)),
                ..Default::default()
            },
            at(14, 0),
        );

        assert!(weather.is_cooling_favorable());
        assert!(!weather.is_heating_favorable());
        assert_eq!(weather.trend(), WeatherTrend::Steady);
    }
}
