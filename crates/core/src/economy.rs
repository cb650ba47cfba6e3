//! Shared economy: depletable counters and the countdown clock.
//!
//! The economy is read by the agent's decision policy every tick and written
//! by external prop/power events. Both counters saturate at zero and at
//! their configured starting value; boundary crossings surface as one-shot
//! [`EconomyEvent`]s consumed by the orchestrator, never retried.

use std::fmt;

use crate::config::EncounterConfig;

/// One-shot boundary events raised by economy mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EconomyEvent {
    /// The prop counter reached zero: the run is lost.
    PropsDepleted,
    /// The countdown clock reached zero: the run is won.
    TimeExpired,
    /// The power counter crossed the on/off boundary.
    PowerChanged { online: bool },
}

/// Observer notified on every power on/off edge.
///
/// Any number of visual collaborators (lamps, chargers) can register here;
/// there is no process-wide event bus.
pub trait PowerObserver {
    fn power_changed(&mut self, online: bool);
}

/// Depletable counters plus the countdown clock.
pub struct EconomyState {
    props: u32,
    props_cap: u32,
    power: u32,
    power_cap: u32,
    clock: f32,
    clock_expired: bool,
    observers: Vec<Box<dyn PowerObserver>>,
}

impl EconomyState {
    pub fn new(config: &EncounterConfig) -> Self {
        Self {
            props: config.starting_props,
            props_cap: config.starting_props,
            power: config.starting_power,
            power_cap: config.starting_power,
            clock: config.starting_clock,
            clock_expired: false,
            observers: Vec::new(),
        }
    }

    pub fn props(&self) -> u32 {
        self.props
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// True while every power source is broken (blackout policy active,
    /// clock frozen).
    pub fn is_power_out(&self) -> bool {
        self.power == 0
    }

    pub fn subscribe_power(&mut self, observer: Box<dyn PowerObserver>) {
        self.observers.push(observer);
    }

    fn notify_power(&mut self, online: bool) {
        for observer in &mut self.observers {
            observer.power_changed(online);
        }
    }

    /// Decrements the prop counter, saturating at zero.
    ///
    /// Raises [`EconomyEvent::PropsDepleted`] exactly on the 1 -> 0 edge; a
    /// further decrement while already at zero is a no-op and does not
    /// re-fire the event.
    pub fn decrement_props(&mut self) -> Option<EconomyEvent> {
        if self.props == 0 {
            return None;
        }
        self.props -= 1;
        (self.props == 0).then_some(EconomyEvent::PropsDepleted)
    }

    /// Increments the prop counter, saturating at the configured cap.
    pub fn increment_props(&mut self) {
        self.props = (self.props + 1).min(self.props_cap);
    }

    /// Takes a power source offline; the 1 -> 0 edge freezes the clock and
    /// notifies subscribers.
    pub fn decrement_power(&mut self) -> Option<EconomyEvent> {
        if self.power == 0 {
            return None;
        }
        self.power -= 1;
        if self.power == 0 {
            self.notify_power(false);
            Some(EconomyEvent::PowerChanged { online: false })
        } else {
            None
        }
    }

    /// Brings a power source back online; the 0 -> 1 edge unfreezes the
    /// clock and notifies subscribers.
    pub fn increment_power(&mut self) -> Option<EconomyEvent> {
        if self.power == self.power_cap {
            return None;
        }
        self.power += 1;
        if self.power == 1 {
            self.notify_power(true);
            Some(EconomyEvent::PowerChanged { online: true })
        } else {
            None
        }
    }

    /// Advances the countdown clock unless it is frozen by a blackout or has
    /// already expired. Raises [`EconomyEvent::TimeExpired`] exactly once.
    pub fn tick_clock(&mut self, dt: f32) -> Option<EconomyEvent> {
        if self.clock_expired || self.is_power_out() {
            return None;
        }
        self.clock = (self.clock - dt).max(0.0);
        if self.clock == 0.0 {
            self.clock_expired = true;
            return Some(EconomyEvent::TimeExpired);
        }
        None
    }
}

impl fmt::Debug for EconomyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EconomyState")
            .field("props", &self.props)
            .field("power", &self.power)
            .field("clock", &self.clock)
            .field("observers", &self.observers.len())
            .finish()
    }
}
