use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use super::config::{ClimateConfig, RoomConfig};
use crate::core::time::{LocalDateTime, Time};
use crate::core::unit::DegreeCelsius;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[display("day")]
    Day,
    #[display("night")]
    Night,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Invalid period {value}, expected day or night")]
pub struct InvalidPeriod {
    pub value: String,
}

impl FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Period::Day),
            "night" => Ok(Period::Night),
            _ => Err(InvalidPeriod { value: s.to_string() }),
        }
    }
}

/// Where the target temperature of a room comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetSource {
    Away(DegreeCelsius),
    Period(Period),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleInfo {
    pub period: Period,
    pub day_start: Time,
    pub night_start: Time,
}

pub struct ScheduleResolver {
    config: Arc<ClimateConfig>,
    period: Period,
}

impl ScheduleResolver {
    pub fn new(config: Arc<ClimateConfig>, period: Period) -> Self {
        Self { config, period }
    }

    /// Period in effect at the given wall-clock time.
    pub fn from_clock(config: Arc<ClimateConfig>, now: LocalDateTime) -> Self {
        let period = period_at(&config, now);
        Self::new(config, period)
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn apply(&mut self, period: Period) {
        if self.period != period {
            tracing::info!("Switching schedule period from {} to {}", self.period, period);
        }
        self.period = period;
    }

    /// Accepts only "day" and "night". Anything else is logged and leaves the period unchanged.
    pub fn set_period(&mut self, period: &str) -> Result<Period, InvalidPeriod> {
        match period.parse::<Period>() {
            Ok(period) => {
                self.apply(period);
                Ok(period)
            }
            Err(e) => {
                tracing::warn!("Rejecting schedule change: {}", e);
                Err(e)
            }
        }
    }

    pub fn target_source(&self, room: &RoomConfig, room_occupied: bool) -> TargetSource {
        if room.presence_required && !room_occupied {
            return match room.away_temp {
                Some(away) => TargetSource::Away(away),
                None => TargetSource::Period(Period::Night),
            };
        }

        TargetSource::Period(self.period)
    }

    /// The external target entity is only consulted when the room has no fixed value for the period.
    pub fn needs_external_target(&self, room: &RoomConfig, period: Period) -> bool {
        fixed_target(room, period).is_none()
    }

    pub fn period_temperature(
        &self,
        room: &RoomConfig,
        period: Period,
        external: Option<DegreeCelsius>,
    ) -> DegreeCelsius {
        fixed_target(room, period)
            .or(external)
            .unwrap_or_else(|| self.default_target(period))
    }

    pub fn target_temperature(
        &self,
        room: &RoomConfig,
        room_occupied: bool,
        external: Option<DegreeCelsius>,
    ) -> DegreeCelsius {
        match self.target_source(room, room_occupied) {
            TargetSource::Away(temperature) => temperature,
            TargetSource::Period(period) => self.period_temperature(room, period, external),
        }
    }

    /// Next day/night boundary strictly after `now` and the period it starts.
    pub fn next_transition(&self, now: LocalDateTime) -> (LocalDateTime, Period) {
        let next_day = self.config.day_start_time.next_after(now);
        let next_night = self.config.night_start_time.next_after(now);

        if next_day <= next_night {
            (next_day, Period::Day)
        } else {
            (next_night, Period::Night)
        }
    }

    pub fn info(&self) -> ScheduleInfo {
        ScheduleInfo {
            period: self.period,
            day_start: self.config.day_start_time,
            night_start: self.config.night_start_time,
        }
    }

    fn default_target(&self, period: Period) -> DegreeCelsius {
        match period {
            Period::Day => self.config.schedule.default_target_temp_day,
            Period::Night => self.config.schedule.default_target_temp_night,
        }
    }
}

fn fixed_target(room: &RoomConfig, period: Period) -> Option<DegreeCelsius> {
    match period {
        Period::Day => room.target_temp_day,
        Period::Night => room.target_temp_night,
    }
}

pub fn period_at(config: &ClimateConfig, now: LocalDateTime) -> Period {
    let day_start = config.day_start_time.on(now);
    let night_start = config.night_start_time.on(now);

    if day_start <= now && now < night_start {
        Period::Day
    } else {
        Period::Night
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

    fn resolver(period: Period) -> ScheduleResolver {
        ScheduleResolver::new(Arc::new(ClimateConfig::default()), period)
    }

    #[test]
    fn test_set_period_rejects_unknown_value() {
        let mut resolver = resolver(Period::Day);

        let result = resolver.set_period("evening");

        assert_eq!(
            result,
            Err(InvalidPeriod {
                value: "evening".to_string()
            })
        );
        assert_eq!(resolver.period(), Period::Day);
    }

    #[test]
    fn test_set_period_accepts_night() {
        let mut resolver = resolver(Period::Day);

        assert_eq!(resolver.set_period("night"), Ok(Period::Night));
        assert_eq!(resolver.period(), Period::Night);
    }

    #[test]
    fn test_defaults_without_room_or_external_target() {
        let room = RoomConfig::default();

        assert_eq!(resolver(Period::Day).target_temperature(&room, true, None), v!(21 C));
        assert_eq!(resolver(Period::Night).target_temperature(&room, true, None), v!(18 C));
    }

    #[test]
    fn test_room_value_wins_over_external_entity() {
        let room = RoomConfig {
            target_temp_day: Some(v!(22 C)),
            ..RoomConfig::default()
        };
        let resolver = resolver(Period::Day);

        assert_eq!(resolver.target_temperature(&room, true, Some(v!(19 C))), v!(22 C));
        assert!(!resolver.needs_external_target(&room, Period::Day));
        assert!(resolver.needs_external_target(&room, Period::Night));
    }

    #[test]
    fn test_external_entity_wins_over_default() {
        let room = RoomConfig::default();

        assert_eq!(
            resolver(Period::Day).target_temperature(&room, true, Some(v!(20.5 C))),
            v!(20.5 C)
        );
    }

    #[test]
    fn test_unoccupied_room_with_presence_required_uses_away_temperature() {
        let room = RoomConfig {
            presence_required: true,
            away_temp: Some(v!(17 C)),
            ..RoomConfig::default()
        };

        assert_eq!(resolver(Period::Day).target_temperature(&room, false, None), v!(17 C));
        assert_eq!(resolver(Period::Day).target_temperature(&room, true, None), v!(21 C));
    }

    #[test]
    fn test_unoccupied_room_without_away_temperature_falls_back_to_night() {
        let room = RoomConfig {
            presence_required: true,
            target_temp_night: Some(v!(17.5 C)),
            ..RoomConfig::default()
        };
        let resolver = resolver(Period::Day);

        assert_eq!(resolver.target_source(&room, false), TargetSource::Period(Period::Night));
        assert_eq!(resolver.target_temperature(&room, false, None), v!(17.5 C));
    }

    #[test]
    fn test_presence_not_required_ignores_occupancy() {
        let room = RoomConfig {
            away_temp: Some(v!(15 C)),
            ..RoomConfig::default()
        };

        assert_eq!(resolver(Period::Day).target_temperature(&room, false, None), v!(21 C));
    }

    #[test]
    fn test_period_from_clock() {
        let config = ClimateConfig::default();

        assert_eq!(period_at(&config, at(6, 59)), Period::Night);
        assert_eq!(period_at(&config, at(7, 0)), Period::Day);
        assert_eq!(period_at(&config, at(21, 59)), Period::Day);
        assert_eq!(period_at(&config, at(22, 0)), Period::Night);
    }

    #[test]
    fn test_next_transition() {
        let resolver = resolver(Period::Day);

        assert_eq!(resolver.next_transition(at(12, 0)), (at(22, 0), Period::Night));
        assert_eq!(resolver.next_transition(at(3, 0)), (at(7, 0), Period::Day));
        assert_eq!(
            resolver.next_transition(at(22, 0)),
            (at(7, 0) + chrono::Duration::days(1), Period::Day)
        );
    }
}
