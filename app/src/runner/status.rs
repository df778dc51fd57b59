use std::collections::BTreeMap;

use serde::Serialize;

use crate::climate::config::RoomId;
use crate::climate::decision::Decision;
use crate::climate::heater::HeaterStatus;
use crate::climate::power::PowerStatus;
use crate::climate::schedule::ScheduleInfo;
use crate::climate::weather::WeatherStatus;

/// Snapshot of the controller state, published after every handled event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateStatus {
    pub schedule: ScheduleInfo,
    pub home_occupied: bool,
    pub occupied_rooms: Vec<RoomId>,
    pub power: PowerStatus,
    pub heater: HeaterStatus,
    pub weather: WeatherStatus,
    pub decisions: BTreeMap<RoomId, Decision>,
}
