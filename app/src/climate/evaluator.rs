use super::config::{ClimateConfig, RoomConfig, RoomId};
use super::decision::{ClimateDecisionEngine, Decision, RoomSnapshot};
use super::power::EnergySupply;
use super::presence::PresenceView;
use super::schedule::{ScheduleResolver, TargetSource};
use super::weather::WeatherTrend;
use crate::port::{ActuatorSink, AcState, CommandExecutionResult, SensorSource, reading};

/// Evaluates rooms against one consistent view of energy and weather.
pub struct RoomEvaluator<'a, S, A, P> {
    pub config: &'a ClimateConfig,
    pub engine: &'a ClimateDecisionEngine,
    pub schedule: &'a ScheduleResolver,
    pub presence: &'a P,
    pub sensors: &'a S,
    pub actuators: &'a A,
    pub supply: EnergySupply,
    pub trend: WeatherTrend,
}

impl<S, A, P> RoomEvaluator<'_, S, A, P>
where
    S: SensorSource,
    A: ActuatorSink,
    P: PresenceView,
{
    /// Decides and actuates. `None` if the room cannot be evaluated right now.
    pub async fn evaluate(&self, room_id: &RoomId) -> Option<Decision> {
        let Some(room) = self.config.room(room_id) else {
            tracing::warn!("Ignoring evaluation of unknown room {}", room_id);
            return None;
        };

        let snapshot = self.snapshot(room_id, room).await?;
        let decision = self.engine.decide(&snapshot, &self.supply, self.trend);

        tracing::info!(
            room = %room_id,
            action = %decision.action,
            "Climate decision for {}: {} ({})",
            room_id,
            decision.action,
            decision.reason
        );

        self.apply(room_id, room, &decision).await;

        Some(decision)
    }

    async fn snapshot(&self, room_id: &RoomId, room: &RoomConfig) -> Option<RoomSnapshot> {
        let current_temperature = reading(
            self.sensors.room_temperature(room_id).await,
            format!("temperature of {}", room_id),
        )?;

        let window_open = match self.sensors.window_open(room_id).await {
            Ok(open) => open.unwrap_or(false),
            Err(e) => {
                tracing::warn!("Error reading window of {}, assuming closed: {:?}", room_id, e);
                false
            }
        };

        let room_occupied = self.presence.is_room_occupied(room_id);

        let target_temperature = match self.schedule.target_source(room, room_occupied) {
            TargetSource::Away(temperature) => temperature,
            TargetSource::Period(period) => {
                let external = if self.schedule.needs_external_target(room, period) {
                    self.sensors
                        .external_target(room_id, period)
                        .await
                        .unwrap_or_else(|e| {
                            tracing::debug!("No external {} target for {}: {:?}", period, room_id, e);
                            None
                        })
                } else {
                    None
                };

                self.schedule.period_temperature(room, period, external)
            }
        };

        Some(RoomSnapshot {
            room_id: room_id.clone(),
            current_temperature,
            target_temperature,
            window_open,
            room_occupied,
            home_occupied: self.presence.is_home_occupied(),
            room: room.clone(),
        })
    }

    async fn apply(&self, room_id: &RoomId, room: &RoomConfig, decision: &Decision) {
        if room.has_ac() {
            self.apply_ac(room_id, decision).await;
        }

        if room.floor_heating_available {
            self.apply_floor_heating(room_id, decision.floor_heating).await;
        }
    }

    async fn apply_ac(&self, room_id: &RoomId, decision: &Decision) {
        let observed = self.sensors.ac_state(room_id).await.ok().flatten();

        if observed.is_some_and(|state| ac_matches(&state, decision)) {
            tracing::debug!("AC of {} already in mode {}", room_id, decision.ac_mode);
            return;
        }

        match self
            .actuators
            .set_ac(room_id, decision.ac_mode, decision.ac_setpoint)
            .await
        {
            Ok(CommandExecutionResult::Triggered) => match decision.ac_setpoint {
                Some(setpoint) => tracing::info!("Set AC of {} to {} at {}", room_id, decision.ac_mode, setpoint),
                None => tracing::info!("Set AC of {} to {}", room_id, decision.ac_mode),
            },
            Ok(CommandExecutionResult::Skipped) => tracing::debug!("No AC configured for {}", room_id),
            Err(e) => tracing::error!("Error setting AC of {}: {:?}", room_id, e),
        }
    }

    async fn apply_floor_heating(&self, room_id: &RoomId, on: bool) {
        let observed = self.sensors.floor_heating_state(room_id).await.ok().flatten();

        if observed == Some(on) {
            return;
        }

        match self.actuators.set_floor_heating(room_id, on).await {
            Ok(CommandExecutionResult::Triggered) => {
                tracing::info!("Turned floor heating of {} {}", room_id, if on { "on" } else { "off" })
            }
            Ok(CommandExecutionResult::Skipped) => tracing::debug!("No floor heating configured for {}", room_id),
            Err(e) => tracing::error!("Error switching floor heating of {}: {:?}", room_id, e),
        }
    }
}

fn ac_matches(state: &AcState, decision: &Decision) -> bool {
    if state.mode != decision.ac_mode {
        return false;
    }

    match decision.ac_setpoint {
        Some(setpoint) => state.setpoint.is_some_and(|observed| observed.approx_eq(&setpoint)),
        None => true,
    }
}
