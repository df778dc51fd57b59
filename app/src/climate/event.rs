use super::config::RoomId;
use super::power::BatteryReading;
use crate::core::unit::{DegreeCelsius, Watt};

/// State changes relevant for climate control. `None` values are unavailable readings.
#[derive(Debug, Clone, PartialEq)]
pub enum ClimateEvent {
    RoomTemperatureChanged {
        room: RoomId,
        temperature: Option<DegreeCelsius>,
    },
    WindowChanged {
        room: RoomId,
        open: Option<bool>,
    },
    RoomPresenceChanged {
        room: RoomId,
        present: Option<bool>,
    },
    HomePresenceChanged {
        present: Option<bool>,
    },
    SolarExportChanged {
        previous: Option<Watt>,
        current: Option<Watt>,
    },
    BatteryChanged(Option<BatteryReading>),
    HotWaterTemperatureChanged(Option<DegreeCelsius>),
    /// Manual day/night switch, validated by the schedule
    PeriodRequested(String),
}
