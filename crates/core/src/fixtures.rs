//! Repairable fixtures and the charge weapon.
//!
//! Fixtures are the agent's break targets and the player's repair targets:
//! props feed the prop counter, power sources feed the power counter. Their
//! only behavior is `intact <-> broken` toggling with a fixed-duration,
//! hold-to-repair action, expressed as an explicit per-entity timer advanced
//! by the same tick that drives the agent (no suspended control flow).

use std::fmt;

use arrayvec::ArrayVec;

use crate::config::EncounterConfig;
use crate::rooms::RoomId;

/// Identifier for a fixture in the encounter layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixtureId(pub u16);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fixture#{}", self.0)
    }
}

/// Which economy counter a fixture feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum FixtureKind {
    Prop,
    PowerSource,
}

/// Repair progress: `Idle -> Repairing { elapsed } -> Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepairPhase {
    #[default]
    Idle,
    Repairing {
        elapsed: f32,
    },
}

/// One breakable, repairable fixture.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixture {
    pub id: FixtureId,
    pub kind: FixtureKind,
    pub room: RoomId,
    broken: bool,
    repair: RepairPhase,
}

impl Fixture {
    pub fn new(id: FixtureId, kind: FixtureKind, room: RoomId) -> Self {
        Self {
            id,
            kind,
            room,
            broken: false,
            repair: RepairPhase::Idle,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn repair_phase(&self) -> RepairPhase {
        self.repair
    }

    /// Whether the agent, standing in `agent_room`, may break this fixture.
    pub fn can_break(&self, agent_room: RoomId) -> bool {
        !self.broken && self.room == agent_room
    }

    /// Breaks the fixture. Breaking an already-broken fixture is a no-op.
    pub fn break_down(&mut self) -> bool {
        if self.broken {
            return false;
        }
        self.broken = true;
        self.repair = RepairPhase::Idle;
        true
    }

    /// Advances the repair timer while the player holds the repair input.
    /// Releasing the hold abandons progress. Returns true on the tick the
    /// repair completes.
    pub fn tick_repair(&mut self, dt: f32, holding: bool, duration: f32) -> bool {
        if !self.broken || !holding {
            self.repair = RepairPhase::Idle;
            return false;
        }
        let elapsed = match self.repair {
            RepairPhase::Idle => dt,
            RepairPhase::Repairing { elapsed } => elapsed + dt,
        };
        if elapsed >= duration {
            self.broken = false;
            self.repair = RepairPhase::Idle;
            true
        } else {
            self.repair = RepairPhase::Repairing { elapsed };
            false
        }
    }
}

/// Errors raised while building the fixture table.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FixtureError {
    #[error("fixture table exceeds the capacity of {max}")]
    TooManyFixtures { max: usize },
}

/// All fixtures in the encounter, loaded once at setup.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixtureTable {
    fixtures: ArrayVec<Fixture, { EncounterConfig::MAX_FIXTURES }>,
}

impl FixtureTable {
    pub fn new(fixtures: impl IntoIterator<Item = Fixture>) -> Result<Self, FixtureError> {
        let mut table = ArrayVec::new();
        for fixture in fixtures {
            if table.try_push(fixture).is_err() {
                return Err(FixtureError::TooManyFixtures {
                    max: EncounterConfig::MAX_FIXTURES,
                });
            }
        }
        Ok(Self { fixtures: table })
    }

    pub fn get(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    pub fn get_mut(&mut self, id: FixtureId) -> Option<&mut Fixture> {
        self.fixtures.iter_mut().find(|f| f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Fixture> {
        self.fixtures.iter_mut()
    }

    /// Ids of intact fixtures of one kind inside a room, in table order.
    pub fn breakable_in(&self, room: RoomId, kind: FixtureKind) -> Vec<FixtureId> {
        self.fixtures
            .iter()
            .filter(|f| f.kind == kind && f.can_break(room))
            .map(|f| f.id)
            .collect()
    }

    /// Whether any power source is currently broken (escalation predicate).
    pub fn any_power_broken(&self) -> bool {
        self.fixtures
            .iter()
            .any(|f| f.kind == FixtureKind::PowerSource && f.broken)
    }
}

/// Boolean charge query plus drain, consumed only at escalation entry/exit.
pub trait ChargeSource {
    fn is_fully_charged(&self) -> bool;

    /// Empties the resource so it cannot be reused immediately.
    fn drain(&mut self);
}

/// Hold-to-charge weapon resource, the reference [`ChargeSource`].
///
/// Charging only progresses while a charger collaborator has granted
/// permission; permission is revoked externally when the player leaves the
/// charger or the power goes out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponCharge {
    charge: f32,
    max: f32,
    rate: f32,
    allowed: bool,
    charging: bool,
    fully_charged: bool,
}

impl WeaponCharge {
    pub fn new(config: &EncounterConfig) -> Self {
        Self {
            charge: 0.0,
            max: config.charge_max,
            rate: config.charge_rate,
            allowed: false,
            charging: false,
            fully_charged: false,
        }
    }

    pub fn charge(&self) -> f32 {
        self.charge
    }

    /// Grants or revokes charging permission. Revoking stops any active
    /// charging immediately.
    pub fn set_allow_charging(&mut self, allow: bool) {
        self.allowed = allow;
        if !allow {
            self.charging = false;
        }
    }

    /// Edge-triggered start of a charge attempt.
    pub fn begin_charging(&mut self) {
        if self.allowed {
            self.charging = true;
            self.fully_charged = false;
        }
    }

    /// Advances the charge while the input is held. Returns true on the
    /// tick the weapon becomes fully charged.
    pub fn tick(&mut self, dt: f32, holding: bool) -> bool {
        if !self.charging || !holding {
            return false;
        }
        self.charge += self.rate * dt;
        if self.charge >= self.max {
            self.charge = self.max;
            self.fully_charged = true;
            self.charging = false;
            return true;
        }
        false
    }
}

impl ChargeSource for WeaponCharge {
    fn is_fully_charged(&self) -> bool {
        self.fully_charged
    }

    fn drain(&mut self) {
        self.charge = 0.0;
        self.fully_charged = false;
        self.charging = false;
    }
}
