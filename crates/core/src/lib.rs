//! Deterministic core of a stealth-pursuit encounter.
//!
//! The crate models one run of a cat-and-mouse loop: an antagonist agent
//! patrols a set of rooms, breaking fixtures that feed a shared economy,
//! while the player repairs, hides, and survives a countdown clock. The
//! critical moment is a room transition contested by the agent, arbitrated
//! into an immediate pass, a timed skill challenge, or an instant loss.
//!
//! Everything here is pure simulation: no I/O, no wall clock, no engine
//! types. The embedder drives it with `tick(dt)` calls and player inputs,
//! and renders from the drained event log. Randomness flows through a
//! stateless [`rng::RngOracle`] keyed by the run seed, so identical seeds
//! and inputs replay identical runs.

pub mod agent;
pub mod arbiter;
pub mod config;
pub mod detection;
pub mod economy;
pub mod encounter;
pub mod events;
pub mod fixtures;
pub mod rng;
pub mod rooms;
pub mod session;

pub use agent::{Agent, AgentHealth, AgentState};
pub use arbiter::{TransitionRuling, rule_transition};
pub use config::EncounterConfig;
pub use detection::DetectionSignal;
pub use economy::{EconomyEvent, EconomyState, PowerObserver};
pub use encounter::{Encounter, EncounterError, OutcomeHandler, RunPhase, TickInput};
pub use events::{EncounterEvent, RunOutcome};
pub use fixtures::{
    ChargeSource, Fixture, FixtureError, FixtureId, FixtureKind, FixtureTable, WeaponCharge,
};
pub use rng::{PcgRng, RngOracle, compute_seed};
pub use rooms::{Position, Room, RoomError, RoomId, RoomTable};
pub use session::{
    ChallengeSession, ChallengeVariant, EscalationGate, FailureReason, PromptKey, SessionOutcome,
};
