//! Transition arbiter for player room changes.
//!
//! A single pure rule decides what happens when the player tries to move
//! between rooms while the agent is active. The orchestrator calls it at the
//! moment of the move attempt; nothing here holds state.

use crate::agent::{Agent, AgentState};
use crate::rooms::RoomId;

/// The arbiter's ruling on one move attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TransitionRuling {
    /// The move proceeds immediately.
    Allow,
    /// The move is gated behind a challenge session.
    Challenge,
    /// The move is a walk into the agent's final-stage ambush: instant loss.
    Defeat,
}

/// Rules on a move from the player's current room.
///
/// The dangerous case is the agent actively traversing the player's own
/// room: leaving then means running into it, which opens a challenge when
/// one is available and is otherwise an instant defeat. The final-stage
/// countdown is deliberately NOT gated: slipping away during the hold is the
/// intended counterplay.
pub fn rule_transition(
    agent: &Agent,
    player_room: RoomId,
    challenge_available: bool,
) -> TransitionRuling {
    let contested = agent.state() == AgentState::MovingThroughStages
        && agent.is_moving_through_stages()
        && agent.current_room() == Some(player_room);
    if !contested {
        return TransitionRuling::Allow;
    }
    if challenge_available {
        TransitionRuling::Challenge
    } else {
        TransitionRuling::Defeat
    }
}
