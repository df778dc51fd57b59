use std::collections::BTreeMap;
use std::time::Duration;

use super::config::{PresenceConfig, RoomId};
use crate::core::timer::{FiredTimer, TimerHandle, Timers};

/// Timer keys of the presence debounce windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PresenceKey {
    #[display("room {}", _0)]
    Room(RoomId),
    #[display("home")]
    Home,
}

/// Pending-unoccupied still counts as occupied until the timeout is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Occupied,
    Unoccupied,
    PendingUnoccupied(TimerHandle),
}

impl Occupancy {
    pub fn is_occupied(&self) -> bool {
        !matches!(self, Occupancy::Unoccupied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    Unchanged,
    BecameOccupied,
    BecameUnoccupied,
    PendingUnoccupied,
}

impl PresenceChange {
    /// Occupancy as seen by the rest of the system flipped.
    pub fn is_transition(&self) -> bool {
        matches!(self, PresenceChange::BecameOccupied | PresenceChange::BecameUnoccupied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomPresenceUpdate {
    pub room: PresenceChange,
    pub home: PresenceChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// Timer was cancelled or superseded after it fired
    Stale,
    /// Sensor reports presence again, occupancy is kept
    StillPresent,
    BecameUnoccupied,
}

/// Read access to occupancy, used by room evaluation.
pub trait PresenceView {
    fn is_room_occupied(&self, room: &RoomId) -> bool;
    fn is_home_occupied(&self) -> bool;
}

pub struct PresenceTracker<T: Timers<PresenceKey>> {
    rooms: BTreeMap<RoomId, Occupancy>,
    home: Occupancy,
    room_timeout: Duration,
    home_timeout: Duration,
    timers: T,
}

impl<T: Timers<PresenceKey>> PresenceTracker<T> {
    pub fn new(config: &PresenceConfig, timers: T) -> Self {
        Self {
            rooms: BTreeMap::new(),
            home: Occupancy::Unoccupied,
            room_timeout: config.room_timeout(),
            home_timeout: config.home_timeout(),
            timers,
        }
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    /// Startup state from the sensors, no debouncing.
    pub fn init_room(&mut self, room: RoomId, present: bool) {
        let occupancy = if present { Occupancy::Occupied } else { Occupancy::Unoccupied };
        if let Some(Occupancy::PendingUnoccupied(handle)) = self.rooms.insert(room, occupancy) {
            self.timers.cancel(handle);
        }
    }

    pub fn init_home(&mut self, present: bool) {
        let occupancy = if present { Occupancy::Occupied } else { Occupancy::Unoccupied };
        if let Occupancy::PendingUnoccupied(handle) = std::mem::replace(&mut self.home, occupancy) {
            self.timers.cancel(handle);
        }
    }

    pub fn report_room_presence(&mut self, room: &RoomId, present: bool) -> RoomPresenceUpdate {
        let timeout = self.room_timeout;
        let key = PresenceKey::Room(room.clone());
        let current = self.rooms.get(room).copied().unwrap_or(Occupancy::Unoccupied);

        let (next, room_change) = transition(&mut self.timers, key, current, present, timeout);
        self.rooms.insert(room.clone(), next);

        let home_change = if present {
            self.report_home_presence(true)
        } else {
            PresenceChange::Unchanged
        };

        RoomPresenceUpdate {
            room: room_change,
            home: home_change,
        }
    }

    pub fn report_home_presence(&mut self, present: bool) -> PresenceChange {
        let (next, change) = transition(&mut self.timers, PresenceKey::Home, self.home, present, self.home_timeout);
        self.home = next;
        change
    }

    /// Whether a fired timer still belongs to a pending debounce window.
    pub fn is_current(&self, fired: &FiredTimer<PresenceKey>) -> bool {
        let occupancy = match &fired.key {
            PresenceKey::Room(room) => self.rooms.get(room).copied(),
            PresenceKey::Home => Some(self.home),
        };

        occupancy == Some(Occupancy::PendingUnoccupied(fired.handle))
    }

    /// Completes a debounce window. `still_absent` is the live sensor state at fire time.
    pub fn timeout_elapsed(&mut self, fired: &FiredTimer<PresenceKey>, still_absent: bool) -> TimeoutOutcome {
        if !self.is_current(fired) {
            return TimeoutOutcome::Stale;
        }

        let next = if still_absent {
            Occupancy::Unoccupied
        } else {
            Occupancy::Occupied
        };

        match &fired.key {
            PresenceKey::Room(room) => {
                self.rooms.insert(room.clone(), next);
            }
            PresenceKey::Home => self.home = next,
        }

        if still_absent {
            TimeoutOutcome::BecameUnoccupied
        } else {
            TimeoutOutcome::StillPresent
        }
    }

    pub fn occupancy(&self, room: &RoomId) -> Occupancy {
        self.rooms.get(room).copied().unwrap_or(Occupancy::Unoccupied)
    }

    pub fn occupied_rooms(&self) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|(_, occupancy)| occupancy.is_occupied())
            .map(|(room, _)| room.clone())
            .collect()
    }
}

impl<T: Timers<PresenceKey>> PresenceView for PresenceTracker<T> {
    fn is_room_occupied(&self, room: &RoomId) -> bool {
        self.occupancy(room).is_occupied()
    }

    fn is_home_occupied(&self) -> bool {
        self.home.is_occupied()
    }
}

//cancel always happens before a new timer is armed for the same key
fn transition<T: Timers<PresenceKey>>(
    timers: &mut T,
    key: PresenceKey,
    current: Occupancy,
    present: bool,
    timeout: Duration,
) -> (Occupancy, PresenceChange) {
    if let Occupancy::PendingUnoccupied(handle) = current {
        timers.cancel(handle);
    }

    match (current, present) {
        (Occupancy::Occupied, true) | (Occupancy::PendingUnoccupied(_), true) => {
            (Occupancy::Occupied, PresenceChange::Unchanged)
        }
        (Occupancy::Unoccupied, true) => (Occupancy::Occupied, PresenceChange::BecameOccupied),
        (Occupancy::Unoccupied, false) => (Occupancy::Unoccupied, PresenceChange::Unchanged),
        (_, false) if timeout.is_zero() => (Occupancy::Unoccupied, PresenceChange::BecameUnoccupied),
        (_, false) => {
            tracing::debug!("Presence of {} lost, confirming in {}s", key, timeout.as_secs());
            let handle = timers.arm(key, timeout);
            (Occupancy::PendingUnoccupied(handle), PresenceChange::PendingUnoccupied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timer::fake::FakeTimers;

    fn tracker(room_minutes: u64, home_minutes: u64) -> PresenceTracker<FakeTimers<PresenceKey>> {
        PresenceTracker::new(
            &PresenceConfig {
                room_presence_timeout: room_minutes,
                home_presence_timeout: home_minutes,
            },
            FakeTimers::new(),
        )
    }

    fn kitchen() -> RoomId {
        RoomId::from("kitchen")
    }

    #[test]
    fn test_present_room_sets_home_occupied() {
        let mut tracker = tracker(15, 30);

        let update = tracker.report_room_presence(&kitchen(), true);

        assert_eq!(update.room, PresenceChange::BecameOccupied);
        assert_eq!(update.home, PresenceChange::BecameOccupied);
        assert!(tracker.is_room_occupied(&kitchen()));
        assert!(tracker.is_home_occupied());
    }

    #[test]
    fn test_absent_room_is_debounced() {
        let mut tracker = tracker(15, 30);
        tracker.init_room(kitchen(), true);

        let update = tracker.report_room_presence(&kitchen(), false);

        assert_eq!(update.room, PresenceChange::PendingUnoccupied);
        assert!(tracker.is_room_occupied(&kitchen()));
        let armed = &tracker.timers_mut().armed;
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].0, PresenceKey::Room(kitchen()));
        assert_eq!(armed[0].1, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_zero_timeout_transitions_immediately() {
        let mut tracker = tracker(0, 0);
        tracker.init_room(kitchen(), true);
        tracker.init_home(true);

        let update = tracker.report_room_presence(&kitchen(), false);
        let home = tracker.report_home_presence(false);

        assert_eq!(update.room, PresenceChange::BecameUnoccupied);
        assert_eq!(home, PresenceChange::BecameUnoccupied);
        assert!(!tracker.is_room_occupied(&kitchen()));
        assert!(!tracker.is_home_occupied());
        assert!(tracker.timers_mut().armed.is_empty());
    }

    #[test]
    fn test_presence_cancels_pending_timeout() {
        let mut tracker = tracker(15, 30);
        tracker.init_room(kitchen(), true);
        tracker.report_room_presence(&kitchen(), false);
        let pending = tracker.timers_mut().last_armed(&PresenceKey::Room(kitchen())).unwrap();

        let update = tracker.report_room_presence(&kitchen(), true);

        assert_eq!(update.room, PresenceChange::Unchanged);
        assert_eq!(tracker.occupancy(&kitchen()), Occupancy::Occupied);
        assert!(tracker.timers_mut().cancelled.contains(&pending));
        assert!(tracker.is_home_occupied());
    }

    #[test]
    fn test_repeated_absence_rearms_timer() {
        let mut tracker = tracker(15, 30);
        tracker.init_room(kitchen(), true);
        tracker.report_room_presence(&kitchen(), false);
        let first = tracker.timers_mut().last_armed(&PresenceKey::Room(kitchen())).unwrap();

        tracker.report_room_presence(&kitchen(), false);
        let second = tracker.timers_mut().last_armed(&PresenceKey::Room(kitchen())).unwrap();

        assert_ne!(first, second);
        assert!(tracker.timers_mut().cancelled.contains(&first));
        assert_eq!(tracker.timers_mut().active().len(), 1);
        assert_eq!(tracker.occupancy(&kitchen()), Occupancy::PendingUnoccupied(second));
    }

    #[test]
    fn test_confirmed_timeout_marks_room_unoccupied() {
        let mut tracker = tracker(15, 30);
        tracker.init_room(kitchen(), true);
        tracker.report_room_presence(&kitchen(), false);
        let fired = tracker.timers_mut().fired(&PresenceKey::Room(kitchen())).unwrap();

        let outcome = tracker.timeout_elapsed(&fired, true);

        assert_eq!(outcome, TimeoutOutcome::BecameUnoccupied);
        assert!(!tracker.is_room_occupied(&kitchen()));
    }

    #[test]
    fn test_timeout_with_sensor_back_on_keeps_occupancy() {
        let mut tracker = tracker(15, 30);
        tracker.init_room(kitchen(), true);
        tracker.report_room_presence(&kitchen(), false);
        let fired = tracker.timers_mut().fired(&PresenceKey::Room(kitchen())).unwrap();

        let outcome = tracker.timeout_elapsed(&fired, false);

        assert_eq!(outcome, TimeoutOutcome::StillPresent);
        assert_eq!(tracker.occupancy(&kitchen()), Occupancy::Occupied);
    }

    #[test]
    fn test_superseded_timer_is_stale() {
        let mut tracker = tracker(15, 30);
        tracker.init_room(kitchen(), true);
        tracker.report_room_presence(&kitchen(), false);
        let fired = tracker.timers_mut().fired(&PresenceKey::Room(kitchen())).unwrap();
        tracker.report_room_presence(&kitchen(), true);

        assert!(!tracker.is_current(&fired));
        assert_eq!(tracker.timeout_elapsed(&fired, true), TimeoutOutcome::Stale);
        assert!(tracker.is_room_occupied(&kitchen()));
    }

    #[test]
    fn test_home_timeout() {
        let mut tracker = tracker(15, 30);
        tracker.init_home(true);

        assert_eq!(tracker.report_home_presence(false), PresenceChange::PendingUnoccupied);
        assert!(tracker.is_home_occupied());

        let fired = tracker.timers_mut().fired(&PresenceKey::Home).unwrap();
        assert_eq!(tracker.timers_mut().armed[0].1, Duration::from_secs(30 * 60));
        assert_eq!(tracker.timeout_elapsed(&fired, true), TimeoutOutcome::BecameUnoccupied);
        assert!(!tracker.is_home_occupied());
    }

    #[test]
    fn test_occupied_rooms() {
        let mut tracker = tracker(15, 30);
        tracker.init_room(RoomId::from("office"), true);
        tracker.init_room(RoomId::from("bedroom"), false);
        tracker.init_room(kitchen(), true);
        tracker.report_room_presence(&kitchen(), false);

        assert_eq!(tracker.occupied_rooms(), vec![kitchen(), RoomId::from("office")]);
    }
}
