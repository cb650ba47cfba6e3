//! The antagonist agent: traversal and escalation state machine.
//!
//! The agent runs a patrol/escalation cycle with no terminal state:
//!
//! ```text
//! ChoosingRoom -> MovingThroughStages -> FinalStageCountdown -+-> ChoosingRoom
//!      |  ^                                                   |
//!      v  |                                            (hold expired:
//! BreakingBox                                           defeat signal)
//!
//! Caught -> Respawning -> ChoosingRoom   (entered via capture, any time)
//! ```
//!
//! The agent owns its timers exclusively and mutates nothing else: every
//! side effect (breaking a fixture, signaling defeat) is returned as an
//! [`AgentSignal`] for the orchestrator to apply, so this module stays a
//! pure function of its inputs and the run seed.

use tracing::{debug, warn};

use crate::config::EncounterConfig;
use crate::fixtures::{FixtureId, FixtureKind, FixtureTable};
use crate::rng::{RngOracle, compute_seed};
use crate::rooms::{Position, RoomId, RoomTable};

// Seed contexts for the agent's independent rolls.
const CTX_ROOM_PICK: u32 = 1;
const CTX_TARGET_KIND: u32 = 2;
const CTX_TARGET_INDEX: u32 = 3;
const CTX_AMBIENT: u32 = 4;

/// Behavior states of the agent.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AgentState {
    ChoosingRoom,
    MovingThroughStages,
    FinalStageCountdown,
    BreakingBox,
    Caught,
    Respawning,
}

/// Side effects requested by one agent tick, applied by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgentSignal {
    /// A room was selected (also emitted on re-rolls that go nowhere).
    RoomPicked { room: RoomId },
    /// The agent was placed at a stage waypoint.
    StageAdvanced { room: RoomId, stage: usize },
    /// The agent reached the final stage and began the hold countdown.
    FinalStageReached { room: RoomId },
    /// The agent wants this fixture broken.
    BreakFixture { id: FixtureId, kind: FixtureKind },
    /// The final-stage hold elapsed uninterrupted: the run is lost.
    HoldExpired,
    /// The respawn delay elapsed; the patrol cycle restarts.
    Respawned,
    /// An ambient cue should play (audio stays external).
    AmbientCue,
    /// Missing room content forced an abort back to `ChoosingRoom`.
    Aborted,
}

/// Read-only context for one agent tick.
pub struct AgentCtx<'a> {
    pub config: &'a EncounterConfig,
    pub rooms: &'a RoomTable,
    pub fixtures: &'a FixtureTable,
    pub player_room: RoomId,
    /// Blackout policy: with the power out the agent's only goal is the
    /// player, and it never breaks fixtures.
    pub power_out: bool,
    pub rng: &'a dyn RngOracle,
}

/// The agent state machine. Exactly one instance per encounter.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    state: AgentState,
    state_timer: f32,
    current_room: Option<RoomId>,
    stage_index: usize,
    position: Position,
    paused: bool,
    moving_through_stages: bool,
    holding_position: Position,
    run_seed: u64,
    nonce: u64,
}

impl Agent {
    pub fn new(run_seed: u64, holding_position: Position) -> Self {
        Self {
            state: AgentState::ChoosingRoom,
            state_timer: 0.0,
            current_room: None,
            stage_index: 0,
            position: holding_position,
            paused: false,
            moving_through_stages: false,
            holding_position,
            run_seed,
            nonce: 0,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.current_room
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Forcibly relocates the agent (external displacement). A displaced
    /// agent aborts its final-stage countdown on the next tick.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_moving_through_stages(&self) -> bool {
        self.moving_through_stages
    }

    /// Suspends the agent while a challenge session runs. Idempotent; also
    /// clears the moving flag so other systems stop treating the agent as
    /// actively closing in.
    pub fn pause_for_challenge(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.moving_through_stages = false;
        debug!("agent paused for challenge");
    }

    /// Clears the pause after a failed challenge. The state machine resumes
    /// exactly where its internal timers left off; nothing is replayed.
    pub fn resume_after_failure(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        debug!("agent resumed after challenge failure");
    }

    /// Unconditional capture: clears any pause, relocates the agent to the
    /// holding position, and force-transitions through `Caught` into
    /// `Respawning` with no dwell, discarding any in-progress state timer.
    pub fn send_to_caught_area(&mut self) {
        self.paused = false;
        self.moving_through_stages = false;
        self.state = AgentState::Caught;
        self.position = self.holding_position;
        self.state = AgentState::Respawning;
        self.state_timer = 0.0;
        debug!("agent sent to the caught area");
    }

    /// Advances the state machine by `dt`. While paused this is a complete
    /// no-op: no timer advancement, no transitions, no signals.
    pub fn tick(&mut self, dt: f32, ctx: &AgentCtx<'_>) -> Vec<AgentSignal> {
        let mut signals = Vec::new();
        if self.paused {
            return signals;
        }

        self.state_timer += dt;
        match self.state {
            AgentState::ChoosingRoom => self.update_choosing_room(ctx, &mut signals),
            AgentState::MovingThroughStages => self.update_moving(ctx, &mut signals),
            AgentState::FinalStageCountdown => self.update_final_countdown(ctx, &mut signals),
            AgentState::BreakingBox => {
                // Pacing dwell only.
                if self.state_timer >= ctx.config.stage_interval {
                    self.change_state(AgentState::ChoosingRoom, ctx, &mut signals);
                }
            }
            // Capture is handled entirely on entry; no resting tick exists.
            AgentState::Caught => {}
            AgentState::Respawning => {
                if self.state_timer >= ctx.config.respawn_delay {
                    signals.push(AgentSignal::Respawned);
                    self.change_state(AgentState::ChoosingRoom, ctx, &mut signals);
                }
            }
        }
        signals
    }

    fn next_seed(&mut self, context: u32) -> u64 {
        let seed = compute_seed(self.run_seed, self.nonce, context);
        self.nonce += 1;
        seed
    }

    fn change_state(
        &mut self,
        next: AgentState,
        ctx: &AgentCtx<'_>,
        signals: &mut Vec<AgentSignal>,
    ) {
        if self.state == AgentState::MovingThroughStages {
            self.moving_through_stages = false;
        }
        self.state = next;
        self.state_timer = 0.0;

        if next == AgentState::MovingThroughStages {
            self.enter_moving(ctx, signals);
        }
    }

    fn enter_moving(&mut self, ctx: &AgentCtx<'_>, signals: &mut Vec<AgentSignal>) {
        let Some(room_id) = self.current_room else {
            self.abort_to_choosing(ctx, signals, "no room selected");
            return;
        };
        let Some(room) = ctx.rooms.get(room_id) else {
            self.abort_to_choosing(ctx, signals, "selected room missing from table");
            return;
        };
        self.moving_through_stages = true;
        self.stage_index = 0;
        self.position = room.stages()[0];
        signals.push(AgentSignal::StageAdvanced {
            room: room_id,
            stage: 0,
        });
    }

    fn abort_to_choosing(
        &mut self,
        ctx: &AgentCtx<'_>,
        signals: &mut Vec<AgentSignal>,
        why: &str,
    ) {
        warn!(state = %self.state, why, "agent aborting to room choice");
        signals.push(AgentSignal::Aborted);
        self.change_state(AgentState::ChoosingRoom, ctx, signals);
    }

    fn update_choosing_room(&mut self, ctx: &AgentCtx<'_>, signals: &mut Vec<AgentSignal>) {
        if self.state_timer < ctx.config.stage_interval {
            return;
        }

        let index = ctx
            .rng
            .range(self.next_seed(CTX_ROOM_PICK), 0, (ctx.rooms.len() - 1) as u32)
            as usize;
        let Some(room) = ctx.rooms.by_index(index) else {
            // RoomTable guarantees non-emptiness; treat as missing content.
            self.abort_to_choosing(ctx, signals, "room index out of range");
            return;
        };
        let room_id = room.id;
        self.current_room = Some(room_id);
        signals.push(AgentSignal::RoomPicked { room: room_id });

        if ctx.power_out {
            // Blackout mode: only the player's room is worth entering.
            if room_id == ctx.player_room {
                self.change_state(AgentState::MovingThroughStages, ctx, signals);
            } else {
                self.state_timer = 0.0;
            }
            return;
        }

        if room_id == ctx.player_room {
            self.change_state(AgentState::MovingThroughStages, ctx, signals);
            return;
        }

        if let Some((id, kind)) = self.pick_break_target(ctx, room_id) {
            signals.push(AgentSignal::BreakFixture { id, kind });
            self.change_state(AgentState::BreakingBox, ctx, signals);
        } else {
            // Nothing to break here; re-roll after another dwell.
            self.state_timer = 0.0;
        }

        if ctx
            .rng
            .chance(self.next_seed(CTX_AMBIENT), ctx.config.ambient_cue_chance)
        {
            signals.push(AgentSignal::AmbientCue);
        }
    }

    /// Picks one intact break target in the room: equal probability between
    /// kinds when both are present, otherwise whichever kind exists.
    fn pick_break_target(
        &mut self,
        ctx: &AgentCtx<'_>,
        room: RoomId,
    ) -> Option<(FixtureId, FixtureKind)> {
        let props = ctx.fixtures.breakable_in(room, FixtureKind::Prop);
        let powers = ctx.fixtures.breakable_in(room, FixtureKind::PowerSource);

        let kind = if props.is_empty() && powers.is_empty() {
            return None;
        } else if powers.is_empty() {
            FixtureKind::Prop
        } else if props.is_empty() {
            FixtureKind::PowerSource
        } else if ctx.rng.chance(self.next_seed(CTX_TARGET_KIND), 0.5) {
            FixtureKind::Prop
        } else {
            FixtureKind::PowerSource
        };

        let pool = match kind {
            FixtureKind::Prop => &props,
            FixtureKind::PowerSource => &powers,
        };
        let index =
            ctx.rng
                .range(self.next_seed(CTX_TARGET_INDEX), 0, (pool.len() - 1) as u32) as usize;
        Some((pool[index], kind))
    }

    fn update_moving(&mut self, ctx: &AgentCtx<'_>, signals: &mut Vec<AgentSignal>) {
        let Some(room_id) = self.current_room else {
            self.abort_to_choosing(ctx, signals, "no room selected");
            return;
        };
        let Some(room) = ctx.rooms.get(room_id) else {
            self.abort_to_choosing(ctx, signals, "selected room missing from table");
            return;
        };

        if self.stage_index >= room.final_stage_index() {
            signals.push(AgentSignal::FinalStageReached { room: room_id });
            self.change_state(AgentState::FinalStageCountdown, ctx, signals);
            return;
        }

        if self.state_timer >= ctx.config.stage_interval {
            self.stage_index += 1;
            // In range: stage_index <= final_stage_index here.
            self.position = room.stages()[self.stage_index];
            self.state_timer = 0.0;
            signals.push(AgentSignal::StageAdvanced {
                room: room_id,
                stage: self.stage_index,
            });
        }
    }

    fn update_final_countdown(&mut self, ctx: &AgentCtx<'_>, signals: &mut Vec<AgentSignal>) {
        let Some(room) = self.current_room.and_then(|id| ctx.rooms.get(id)) else {
            self.abort_to_choosing(ctx, signals, "selected room missing from table");
            return;
        };

        if self.position != room.final_stage() {
            // Forcibly moved or frozen: the countdown stops.
            self.abort_to_choosing(ctx, signals, "agent displaced from final stage");
            return;
        }

        if self.state_timer >= ctx.config.final_stage_hold {
            signals.push(AgentSignal::HoldExpired);
            self.change_state(AgentState::ChoosingRoom, ctx, signals);
        }
    }
}

/// The agent's defeat counter. Reaching zero ends the run in victory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentHealth {
    current: u32,
    max: u32,
}

impl AgentHealth {
    pub fn new(max: u32) -> Self {
        let max = max.max(1);
        Self { current: max, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_defeated(&self) -> bool {
        self.current == 0
    }

    /// Clamped damage; returns the remaining health.
    pub fn damage(&mut self, amount: u32) -> u32 {
        self.current = self.current.saturating_sub(amount);
        self.current
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = (self.current + amount).min(self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixture;
    use crate::rng::PcgRng;
    use crate::rooms::Room;

    const DWELL: f32 = 5.0;

    fn single_room_table(id: RoomId, stages: usize) -> RoomTable {
        let positions = (0..stages).map(|i| Position::new(i as f32, 0.0, 0.0));
        RoomTable::new(vec![Room::new(id, "room", positions).unwrap()]).unwrap()
    }

    fn holding() -> Position {
        Position::new(-100.0, 0.0, 0.0)
    }

    /// Every roll returns the minimum of its range; `chance` always passes.
    struct MinRng;

    impl RngOracle for MinRng {
        fn next_u32(&self, _seed: u64) -> u32 {
            0
        }
    }

    /// Every roll returns the maximum of its range; `chance` always fails.
    struct MaxRng;

    impl RngOracle for MaxRng {
        fn next_u32(&self, _seed: u64) -> u32 {
            u32::MAX
        }
    }

    struct Setup {
        rooms: RoomTable,
        fixtures: FixtureTable,
        config: EncounterConfig,
        player_room: RoomId,
        power_out: bool,
        rng: Box<dyn RngOracle>,
    }

    impl Setup {
        fn new(rooms: RoomTable) -> Self {
            Self {
                rooms,
                fixtures: FixtureTable::default(),
                config: EncounterConfig::default(),
                player_room: RoomId(0),
                power_out: false,
                rng: Box::new(PcgRng),
            }
        }

        fn ctx(&self) -> AgentCtx<'_> {
            AgentCtx {
                config: &self.config,
                rooms: &self.rooms,
                fixtures: &self.fixtures,
                player_room: self.player_room,
                power_out: self.power_out,
                rng: self.rng.as_ref(),
            }
        }
    }

    #[test]
    fn picks_player_room_and_starts_moving() {
        // One room, player inside it: the first roll is forced.
        let setup = Setup::new(single_room_table(RoomId(0), 3));
        let mut agent = Agent::new(1, holding());

        let signals = agent.tick(DWELL, &setup.ctx());
        assert!(signals.contains(&AgentSignal::RoomPicked { room: RoomId(0) }));
        assert_eq!(agent.state(), AgentState::MovingThroughStages);
        assert!(agent.is_moving_through_stages());
        assert_eq!(agent.stage_index(), 0);
    }

    #[test]
    fn advances_one_stage_per_dwell_then_counts_down() {
        let setup = Setup::new(single_room_table(RoomId(0), 3));
        let mut agent = Agent::new(1, holding());
        agent.tick(DWELL, &setup.ctx()); // enter moving at stage 0

        agent.tick(DWELL, &setup.ctx());
        assert_eq!(agent.stage_index(), 1);
        agent.tick(DWELL, &setup.ctx());
        assert_eq!(agent.stage_index(), 2);

        let signals = agent.tick(0.1, &setup.ctx());
        assert!(signals.contains(&AgentSignal::FinalStageReached { room: RoomId(0) }));
        assert_eq!(agent.state(), AgentState::FinalStageCountdown);
    }

    #[test]
    fn hold_expiry_signals_defeat_and_restarts_patrol() {
        let setup = Setup::new(single_room_table(RoomId(0), 1));
        let mut agent = Agent::new(1, holding());
        agent.tick(DWELL, &setup.ctx()); // moving, already at final stage
        agent.tick(0.1, &setup.ctx()); // final countdown begins

        let signals = agent.tick(7.0, &setup.ctx());
        assert!(signals.contains(&AgentSignal::HoldExpired));
        assert_eq!(agent.state(), AgentState::ChoosingRoom);
    }

    #[test]
    fn displaced_agent_aborts_final_countdown() {
        let setup = Setup::new(single_room_table(RoomId(0), 1));
        let mut agent = Agent::new(1, holding());
        agent.tick(DWELL, &setup.ctx());
        agent.tick(0.1, &setup.ctx());
        assert_eq!(agent.state(), AgentState::FinalStageCountdown);

        agent.set_position(Position::new(50.0, 0.0, 0.0));
        let signals = agent.tick(0.1, &setup.ctx());
        assert!(signals.contains(&AgentSignal::Aborted));
        assert_eq!(agent.state(), AgentState::ChoosingRoom);
    }

    #[test]
    fn breaks_fixture_when_player_elsewhere() {
        let mut setup = Setup::new(single_room_table(RoomId(0), 2));
        setup.player_room = RoomId(9);
        setup.fixtures = FixtureTable::new([Fixture::new(
            FixtureId(0),
            FixtureKind::Prop,
            RoomId(0),
        )])
        .unwrap();
        let mut agent = Agent::new(1, holding());

        let signals = agent.tick(DWELL, &setup.ctx());
        assert!(signals.contains(&AgentSignal::BreakFixture {
            id: FixtureId(0),
            kind: FixtureKind::Prop,
        }));
        assert_eq!(agent.state(), AgentState::BreakingBox);

        // Break dwell, then back to choosing.
        let _ = agent.tick(DWELL, &setup.ctx());
        assert_eq!(agent.state(), AgentState::ChoosingRoom);
    }

    #[test]
    fn break_target_coin_flip_covers_both_kinds() {
        // Both a breakable prop and an intact power source in the room: the
        // kind roll decides. Min and max oracles pin both arms.
        let both_kinds = || {
            FixtureTable::new([
                Fixture::new(FixtureId(0), FixtureKind::Prop, RoomId(0)),
                Fixture::new(FixtureId(1), FixtureKind::PowerSource, RoomId(0)),
            ])
            .unwrap()
        };

        let mut setup = Setup::new(single_room_table(RoomId(0), 2));
        setup.player_room = RoomId(9);
        setup.fixtures = both_kinds();
        setup.rng = Box::new(MinRng);
        let mut agent = Agent::new(1, holding());
        let signals = agent.tick(DWELL, &setup.ctx());
        assert!(signals.contains(&AgentSignal::BreakFixture {
            id: FixtureId(0),
            kind: FixtureKind::Prop,
        }));

        setup.rng = Box::new(MaxRng);
        let mut agent = Agent::new(1, holding());
        let signals = agent.tick(DWELL, &setup.ctx());
        assert!(signals.contains(&AgentSignal::BreakFixture {
            id: FixtureId(1),
            kind: FixtureKind::PowerSource,
        }));
        assert_eq!(agent.state(), AgentState::BreakingBox);
    }

    #[test]
    fn blackout_mode_never_breaks_fixtures() {
        let mut setup = Setup::new(single_room_table(RoomId(0), 2));
        setup.player_room = RoomId(9);
        setup.power_out = true;
        setup.fixtures = FixtureTable::new([Fixture::new(
            FixtureId(0),
            FixtureKind::Prop,
            RoomId(0),
        )])
        .unwrap();
        let mut agent = Agent::new(1, holding());

        for _ in 0..20 {
            let signals = agent.tick(DWELL, &setup.ctx());
            assert!(
                !signals
                    .iter()
                    .any(|s| matches!(s, AgentSignal::BreakFixture { .. }))
            );
            assert_eq!(agent.state(), AgentState::ChoosingRoom);
        }
    }

    #[test]
    fn empty_room_re_rolls_after_dwell() {
        let mut setup = Setup::new(single_room_table(RoomId(0), 2));
        setup.player_room = RoomId(9);
        let mut agent = Agent::new(1, holding());

        let signals = agent.tick(DWELL, &setup.ctx());
        assert!(signals.contains(&AgentSignal::RoomPicked { room: RoomId(0) }));
        assert_eq!(agent.state(), AgentState::ChoosingRoom);

        // Another dwell, another pick.
        let signals = agent.tick(DWELL, &setup.ctx());
        assert!(signals.contains(&AgentSignal::RoomPicked { room: RoomId(0) }));
    }

    #[test]
    fn paused_tick_is_a_complete_noop() {
        let setup = Setup::new(single_room_table(RoomId(0), 3));
        let mut agent = Agent::new(1, holding());
        agent.tick(DWELL, &setup.ctx());
        let before = agent.clone();

        agent.pause_for_challenge();
        // Idempotent.
        agent.pause_for_challenge();
        for _ in 0..100 {
            let signals = agent.tick(DWELL, &setup.ctx());
            assert!(signals.is_empty());
        }
        assert_eq!(agent.state(), before.state());
        assert_eq!(agent.stage_index(), before.stage_index());
        assert_eq!(agent.current_room(), before.current_room());

        // Resume continues where the timers left off, with the moving flag
        // cleared by the pause.
        agent.resume_after_failure();
        assert!(!agent.is_paused());
        assert!(!agent.is_moving_through_stages());
    }

    #[test]
    fn capture_overrides_pause_and_respawns() {
        let setup = Setup::new(single_room_table(RoomId(0), 3));
        let mut agent = Agent::new(1, holding());
        agent.tick(DWELL, &setup.ctx());
        agent.pause_for_challenge();

        agent.send_to_caught_area();
        assert!(!agent.is_paused());
        assert_eq!(agent.state(), AgentState::Respawning);
        assert_eq!(agent.position(), holding());

        let signals = agent.tick(10.0, &setup.ctx());
        assert!(signals.contains(&AgentSignal::Respawned));
        assert_eq!(agent.state(), AgentState::ChoosingRoom);
    }

    #[test]
    fn health_clamps_and_reports_defeat() {
        let mut health = AgentHealth::new(3);
        assert_eq!(health.damage(1), 2);
        assert_eq!(health.damage(5), 0);
        assert!(health.is_defeated());
        health.heal(10);
        assert_eq!(health.current(), 3);
    }
}
