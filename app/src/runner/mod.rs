mod status;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use infrastructure::meter;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::climate::config::{ClimateConfig, RoomId};
use crate::climate::decision::{ClimateDecisionEngine, Decision};
use crate::climate::evaluator::RoomEvaluator;
use crate::climate::event::ClimateEvent;
use crate::climate::heater::HeaterController;
use crate::climate::power::PowerModel;
use crate::climate::presence::{PresenceKey, PresenceTracker, PresenceView, TimeoutOutcome};
use crate::climate::schedule::{Period, ScheduleResolver};
use crate::climate::weather::WeatherState;
use crate::core::time;
use crate::core::timer::{DelayQueueTimers, FiredTimer};
use crate::core::unit::Watt;
use crate::port::{ActuatorSink, SensorSource, reading};

pub use status::ClimateStatus;

type Presence = PresenceTracker<DelayQueueTimers<PresenceKey>>;

/// Owns all controller state. Events, timers and schedules are handled one at a time.
pub struct ClimateRunner<S, A> {
    config: Arc<ClimateConfig>,
    sensors: S,
    actuators: A,
    engine: ClimateDecisionEngine,
    schedule: ScheduleResolver,
    presence: Presence,
    power: PowerModel,
    weather: WeatherState,
    heater: HeaterController,
    last_decisions: BTreeMap<RoomId, Decision>,
    event_tx: mpsc::Sender<ClimateEvent>,
    event_rx: mpsc::Receiver<ClimateEvent>,
    status_tx: watch::Sender<ClimateStatus>,
}

impl<S, A> ClimateRunner<S, A>
where
    S: SensorSource,
    A: ActuatorSink,
{
    pub fn new(config: Arc<ClimateConfig>, sensors: S, actuators: A) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);

        let schedule = ScheduleResolver::from_clock(config.clone(), time::now());
        let presence = PresenceTracker::new(&config.presence, DelayQueueTimers::new());
        let power = PowerModel::new(config.clone());
        let weather = WeatherState::new(config.clone());
        let heater = HeaterController::new(config.clone());
        let last_decisions = BTreeMap::new();

        let (status_tx, _) = watch::channel(collect_status(
            &schedule,
            &presence,
            &power,
            &heater,
            &weather,
            &last_decisions,
        ));

        Self {
            engine: ClimateDecisionEngine::new(config.clone()),
            config,
            sensors,
            actuators,
            schedule,
            presence,
            power,
            weather,
            heater,
            last_decisions,
            event_tx,
            event_rx,
            status_tx,
        }
    }

    pub fn event_sender(&self) -> mpsc::Sender<ClimateEvent> {
        self.event_tx.clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ClimateStatus> {
        self.status_tx.subscribe()
    }

    pub async fn run(mut self) {
        self.bootstrap().await;

        let update_interval = self.config.update_interval();
        let mut periodic = tokio::time::interval_at(Instant::now() + update_interval, update_interval);
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let initial_check = tokio::time::sleep(self.config.initial_check_delay());
        tokio::pin!(initial_check);
        let mut initial_check_pending = true;

        loop {
            let now = time::now();
            let (boundary, next_period) = self.schedule.next_transition(now);
            let until_boundary = (boundary - now).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                Some(event) = self.event_rx.recv() => self.handle_event(event).await,

                fired = self.presence.timers_mut().next_fired() => self.handle_presence_timeout(fired).await,

                _ = periodic.tick() => self.periodic_update().await,

                () = tokio::time::sleep(until_boundary) => self.switch_period(next_period).await,

                () = &mut initial_check, if initial_check_pending => {
                    initial_check_pending = false;
                    tracing::info!("Running initial climate check");
                    self.evaluate_all_rooms().await;
                }
            }

            self.publish_status();
        }
    }

    /// Initial presence, power and weather from the sensors.
    pub async fn bootstrap(&mut self) {
        tracing::info!("Bootstrapping climate state for {} rooms", self.config.rooms.len());

        let config = self.config.clone();
        for room in config.room_ids() {
            let present = reading(self.sensors.room_presence(room).await, format!("presence of {}", room));
            self.presence.init_room(room.clone(), present.unwrap_or(false));
        }

        let home_present = reading(self.sensors.home_presence().await, "home presence").unwrap_or(false);
        self.presence
            .init_home(home_present || !self.presence.occupied_rooms().is_empty());

        self.refresh_power().await;
        self.refresh_weather().await;
        self.publish_status();

        tracing::info!(
            "Climate state bootstrapped: period {}, home occupied {}, usable power {}",
            self.schedule.period(),
            self.presence.is_home_occupied(),
            self.power.usable_renewable_watts()
        );
    }

    pub async fn handle_event(&mut self, event: ClimateEvent) {
        match event {
            ClimateEvent::RoomTemperatureChanged { room, temperature } => match temperature {
                Some(temperature) => {
                    tracing::debug!("Temperature of {} changed to {}", room, temperature);
                    self.evaluate_room(&room).await;
                }
                None => tracing::warn!("Temperature of {} is unavailable", room),
            },

            ClimateEvent::WindowChanged { room, open } => {
                tracing::info!("Window of {} is {}", room, if open == Some(true) { "open" } else { "closed" });
                self.evaluate_room(&room).await;
            }

            ClimateEvent::RoomPresenceChanged { room, present } => {
                let Some(present) = present else {
                    tracing::warn!("Presence of {} is unavailable", room);
                    return;
                };
                self.room_presence_changed(&room, present).await;
            }

            ClimateEvent::HomePresenceChanged { present } => self.home_presence_changed(present).await,

            ClimateEvent::SolarExportChanged { previous, current } => {
                let Some(current) = current else {
                    tracing::warn!("Solar export is unavailable");
                    return;
                };

                self.power.update_solar_export(current);
                self.record_usable_power();

                if self.is_significant_solar_change(previous, current) {
                    tracing::info!(
                        "Solar export changed significantly to {}, usable power now {}",
                        current,
                        self.power.usable_renewable_watts()
                    );
                    self.evaluate_all_rooms().await;
                }
            }

            ClimateEvent::BatteryChanged(battery) => match battery {
                Some(battery) => {
                    self.power.update_battery(battery);
                    self.record_usable_power();
                }
                None => tracing::warn!("Battery reading is unavailable"),
            },

            ClimateEvent::HotWaterTemperatureChanged(temperature) => {
                let Some(temperature) = temperature else {
                    tracing::warn!("Hot water temperature is unavailable");
                    return;
                };

                let was_ready = self.floor_heating_ready();
                self.power.update_hot_water_temperature(temperature);

                if was_ready != self.floor_heating_ready() {
                    tracing::info!("Floor heating readiness changed at hot water temperature {}", temperature);
                    self.evaluate_all_rooms().await;
                }
            }

            ClimateEvent::PeriodRequested(period) => {
                if let Ok(period) = self.schedule.set_period(&period) {
                    tracing::info!("Period manually set to {}", period);
                    self.evaluate_all_rooms().await;
                }
            }
        }
    }

    async fn room_presence_changed(&mut self, room: &RoomId, present: bool) {
        if self.config.room(room).is_none() {
            tracing::debug!("Ignoring presence of unknown room {}", room);
            return;
        }

        let update = self.presence.report_room_presence(room, present);
        tracing::info!(
            "Room {} is now {}, {} presence timers pending",
            room,
            if present { "occupied" } else { "empty" },
            self.presence.timers_mut().pending()
        );

        if update.home.is_transition() {
            self.evaluate_all_rooms().await;
        } else if update.room.is_transition() {
            self.evaluate_room(room).await;
        }
    }

    async fn home_presence_changed(&mut self, present: Option<bool>) {
        //one global sensor going off does not mean everybody left
        let present = match present {
            Some(true) => true,
            _ => match reading(self.sensors.home_presence().await, "home presence") {
                Some(present) => present,
                None => return,
            },
        };

        tracing::info!("Global presence changed to {}", if present { "present" } else { "away" });

        if self.presence.report_home_presence(present).is_transition() {
            self.evaluate_all_rooms().await;
        }
    }

    pub async fn handle_presence_timeout(&mut self, fired: FiredTimer<PresenceKey>) {
        if !self.presence.is_current(&fired) {
            tracing::debug!("Ignoring stale presence timeout of {}", fired.key);
            return;
        }

        //double-check the live sensor, it may have flipped back without an event.
        //An unreadable sensor keeps the last reported absence.
        let live = match &fired.key {
            PresenceKey::Room(room) => reading(self.sensors.room_presence(room).await, format!("presence of {}", room)),
            PresenceKey::Home => reading(self.sensors.home_presence().await, "home presence"),
        };
        let still_absent = live != Some(true);

        match self.presence.timeout_elapsed(&fired, still_absent) {
            TimeoutOutcome::Stale => {}
            TimeoutOutcome::StillPresent => {
                tracing::info!("Presence timeout of {} elapsed, but still present", fired.key)
            }
            TimeoutOutcome::BecameUnoccupied => {
                tracing::info!("Presence timeout of {}: marking as unoccupied", fired.key);

                match &fired.key {
                    PresenceKey::Room(room) => self.evaluate_room(room).await,
                    PresenceKey::Home => self.evaluate_all_rooms().await,
                }
            }
        }
    }

    pub async fn periodic_update(&mut self) {
        tracing::debug!("Running periodic climate update");

        self.refresh_weather().await;
        self.refresh_power().await;

        let optimal = self.power.optimal_heater_setpoint(self.weather.outdoor_temperature());
        if let Some(setpoint) = self.heater.update(&self.actuators, optimal).await {
            meter::set("climate_heater_setpoint", setpoint.0, &[]);
        }

        self.evaluate_all_rooms().await;
    }

    pub async fn switch_period(&mut self, period: Period) {
        self.schedule.apply(period);
        self.evaluate_all_rooms().await;
    }

    pub async fn evaluate_room(&mut self, room: &RoomId) {
        let decision = self.evaluator().evaluate(room).await;
        self.record_decision(room, decision);
    }

    pub async fn evaluate_all_rooms(&mut self) {
        if self.weather.needs_refresh(time::now()) {
            self.refresh_weather().await;
        }

        let config = self.config.clone();
        let mut decisions = vec![];
        {
            let evaluator = self.evaluator();
            for room in config.room_ids() {
                decisions.push((room, evaluator.evaluate(room).await));
            }
        }

        for (room, decision) in decisions {
            self.record_decision(room, decision);
        }
    }

    fn evaluator(&self) -> RoomEvaluator<'_, S, A, Presence> {
        RoomEvaluator {
            config: &self.config,
            engine: &self.engine,
            schedule: &self.schedule,
            presence: &self.presence,
            sensors: &self.sensors,
            actuators: &self.actuators,
            supply: self.power.supply(),
            trend: self.weather.trend(),
        }
    }

    //keeps the previous decision of a room that could not be evaluated
    fn record_decision(&mut self, room: &RoomId, decision: Option<Decision>) {
        if let Some(decision) = decision {
            meter::increment(
                "climate_decision",
                &[("room", room.as_str()), ("action", &decision.action.to_string())],
            );
            self.last_decisions.insert(room.clone(), decision);
        }
    }

    async fn refresh_power(&mut self) {
        if let Some(solar) = reading(self.sensors.solar_export().await, "solar export") {
            self.power.update_solar_export(solar);
        }

        if let Some(battery) = reading(self.sensors.battery().await, "battery") {
            self.power.update_battery(battery);
        }

        if let Some(temperature) = reading(self.sensors.hot_water_temperature().await, "hot water temperature") {
            self.power.update_hot_water_temperature(temperature);
        }

        self.record_usable_power();
    }

    async fn refresh_weather(&mut self) {
        match self.sensors.weather().await {
            Ok(report) => {
                self.weather.update(report, time::now());
                tracing::debug!("Weather refreshed, trend {}", self.weather.trend());
            }
            Err(e) => tracing::warn!("Error refreshing weather: {:?}", e),
        }
    }

    fn is_significant_solar_change(&self, previous: Option<Watt>, current: Watt) -> bool {
        match previous {
            Some(previous) => (current - previous).abs() > self.config.solar_threshold_change,
            None => true,
        }
    }

    fn record_usable_power(&self) {
        meter::set("climate_usable_renewable_watts", self.power.usable_renewable_watts().0, &[]);
    }

    fn floor_heating_ready(&self) -> bool {
        let supply = self.power.supply();
        supply.heater_ready
            && supply
                .hot_water_temperature
                .is_some_and(|temp| temp >= self.config.decision.heater_min_temp)
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(collect_status(
            &self.schedule,
            &self.presence,
            &self.power,
            &self.heater,
            &self.weather,
            &self.last_decisions,
        ));
    }
}

fn collect_status(
    schedule: &ScheduleResolver,
    presence: &Presence,
    power: &PowerModel,
    heater: &HeaterController,
    weather: &WeatherState,
    decisions: &BTreeMap<RoomId, Decision>,
) -> ClimateStatus {
    ClimateStatus {
        schedule: schedule.info(),
        home_occupied: presence.is_home_occupied(),
        occupied_rooms: presence.occupied_rooms(),
        power: power.status(),
        heater: heater.status(),
        weather: weather.status(),
        decisions: decisions.clone(),
    }
}
