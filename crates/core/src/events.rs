//! Observable events emitted by the encounter.
//!
//! Every externally meaningful state change lands here as one flat event.
//! The orchestrator appends to an internal log during a tick; the embedder
//! drains it afterwards for presentation (audio cues, HUD, replay capture).

use crate::fixtures::{FixtureId, FixtureKind};
use crate::rooms::RoomId;
use crate::session::{ChallengeVariant, SessionOutcome};

/// How a finished run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum RunOutcome {
    Victory,
    Defeat,
}

/// One observable state change.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncounterEvent {
    /// The agent selected a room to visit.
    RoomPicked { room: RoomId },
    /// The agent advanced to a stage waypoint.
    StageAdvanced { room: RoomId, stage: usize },
    /// The agent reached the final stage and the hold countdown started.
    FinalStageReached { room: RoomId },
    /// The agent was captured and moved to the holding area.
    AgentCaught,
    /// The agent's respawn delay elapsed; the patrol cycle restarted.
    AgentRespawned,
    /// An ambient cue should play.
    AmbientCue,
    /// The agent broke a fixture.
    FixtureBroken { id: FixtureId, kind: FixtureKind },
    /// The player finished repairing a fixture.
    FixtureRepaired { id: FixtureId, kind: FixtureKind },
    /// The power counter crossed the on/off boundary.
    PowerChanged { online: bool },
    /// The prop counter reached zero.
    PropsDepleted,
    /// The countdown clock reached zero.
    TimeExpired,
    /// A challenge session opened, pausing the agent.
    ChallengeOpened,
    /// A standard challenge round completed (total rounds done).
    ChallengeRoundCompleted { rounds: u8 },
    /// The session swapped to the escalated variant.
    ChallengeEscalated,
    /// The session yielded its terminal outcome.
    ChallengeResolved {
        variant: ChallengeVariant,
        outcome: SessionOutcome,
    },
    /// The player's room change was committed.
    PlayerMoved { from: RoomId, to: RoomId },
    /// The agent took damage from an escalated success.
    AgentDamaged { remaining: u32 },
    /// The run ended. Emitted exactly once.
    RunEnded { outcome: RunOutcome, cause: String },
}
