//! Encounter orchestrator: owns every subsystem and the tick order.
//!
//! One `Encounter` is one run. Each tick advances the subsystems in a fixed
//! order so cross-system effects land deterministically:
//!
//! 1. fixtures (repairs) and the economy clock
//! 2. detection (suspended while a session is open)
//! 3. the agent state machine, then its requested side effects
//! 4. the challenge session, then its resolution
//!
//! The embedder provides two collaborators at construction: an
//! [`OutcomeHandler`] that receives the terminal win/loss callback, and a
//! [`ChargeSource`] queried at escalation checks and drained on escalated
//! success. Everything else the embedder learns by draining the event log.

use tracing::{debug, info};

use crate::agent::{Agent, AgentCtx, AgentHealth, AgentSignal};
use crate::arbiter::{TransitionRuling, rule_transition};
use crate::config::EncounterConfig;
use crate::detection::DetectionSignal;
use crate::economy::{EconomyEvent, EconomyState};
use crate::events::{EncounterEvent, RunOutcome};
use crate::fixtures::{ChargeSource, FixtureId, FixtureKind, FixtureTable};
use crate::rng::{PcgRng, RngOracle, compute_seed};
use crate::rooms::{Position, RoomError, RoomId, RoomTable};
use crate::session::{
    ChallengeSession, EscalationGate, FailureReason, PromptKey, SessionInput, SessionOutcome,
};

/// Seed context for per-session seeds.
const CTX_SESSION: u32 = 16;

/// Terminal callback surface. Called at most once per run, on the tick the
/// run ends.
pub trait OutcomeHandler {
    fn game_over(&mut self, cause: &str);
    fn victory(&mut self, cause: &str);
}

/// Whether the run is still live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Active,
    Ended(RunOutcome),
}

/// Player inputs sampled once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickInput {
    /// Whether the sensor sees the agent this tick.
    pub agent_visible: bool,
    /// Prompt symbol pressed this tick, routed to an open standard session.
    pub prompt_pressed: Option<PromptKey>,
    /// Spam key pressed this tick, routed to an open escalated session.
    pub spam_pressed: bool,
    /// Fixture the player is holding the repair input on, if any.
    pub repair_hold: Option<FixtureId>,
}

/// Errors surfaced by encounter commands.
#[derive(Debug, thiserror::Error)]
pub enum EncounterError {
    #[error("a challenge session is already in progress")]
    ChallengeInProgress,

    #[error("the run has already ended")]
    RunEnded,

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// One full encounter run.
pub struct Encounter<F: OutcomeHandler, C: ChargeSource> {
    config: EncounterConfig,
    rooms: RoomTable,
    fixtures: FixtureTable,
    economy: EconomyState,
    detection: DetectionSignal,
    agent: Agent,
    health: AgentHealth,
    session: Option<ChallengeSession>,
    pending_move: Option<RoomId>,
    player_room: RoomId,
    phase: RunPhase,
    events: Vec<EncounterEvent>,
    handler: F,
    charge: C,
    rng: Box<dyn RngOracle>,
    run_seed: u64,
    sessions_opened: u64,
}

impl<F: OutcomeHandler, C: ChargeSource> Encounter<F, C> {
    /// Builds a run with the default deterministic oracle.
    pub fn new(
        config: EncounterConfig,
        rooms: RoomTable,
        fixtures: FixtureTable,
        player_room: RoomId,
        holding_position: Position,
        run_seed: u64,
        handler: F,
        charge: C,
    ) -> Result<Self, EncounterError> {
        Self::with_rng(
            config,
            rooms,
            fixtures,
            player_room,
            holding_position,
            run_seed,
            handler,
            charge,
            Box::new(PcgRng),
        )
    }

    /// Builds a run with a caller-supplied oracle.
    #[allow(clippy::too_many_arguments)]
    pub fn with_rng(
        config: EncounterConfig,
        rooms: RoomTable,
        fixtures: FixtureTable,
        player_room: RoomId,
        holding_position: Position,
        run_seed: u64,
        handler: F,
        charge: C,
        rng: Box<dyn RngOracle>,
    ) -> Result<Self, EncounterError> {
        rooms.require(player_room)?;
        let economy = EconomyState::new(&config);
        let health = AgentHealth::new(config.agent_max_health);
        Ok(Self {
            agent: Agent::new(run_seed, holding_position),
            config,
            rooms,
            fixtures,
            economy,
            detection: DetectionSignal::new(),
            health,
            session: None,
            pending_move: None,
            player_room,
            phase: RunPhase::Active,
            events: Vec::new(),
            handler,
            charge,
            rng,
            run_seed,
            sessions_opened: 0,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == RunPhase::Active
    }

    pub fn player_room(&self) -> RoomId {
        self.player_room
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_health(&self) -> AgentHealth {
        self.health
    }

    pub fn economy(&self) -> &EconomyState {
        &self.economy
    }

    /// Registers a power on/off edge subscriber (lamps, chargers).
    pub fn subscribe_power(&mut self, observer: Box<dyn crate::economy::PowerObserver>) {
        self.economy.subscribe_power(observer);
    }

    pub fn fixtures(&self) -> &FixtureTable {
        &self.fixtures
    }

    pub fn detection(&self) -> DetectionSignal {
        self.detection
    }

    pub fn session(&self) -> Option<&ChallengeSession> {
        self.session.as_ref()
    }

    pub fn charge(&self) -> &C {
        &self.charge
    }

    /// The charge collaborator stays embedder-driven (charger placement and
    /// permissions live outside the encounter); this is its mutation handle.
    pub fn charge_mut(&mut self) -> &mut C {
        &mut self.charge
    }

    pub fn handler(&self) -> &F {
        &self.handler
    }

    /// Removes and returns everything logged since the last drain.
    pub fn drain_events(&mut self) -> Vec<EncounterEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances the whole encounter by `dt`.
    pub fn tick(&mut self, dt: f32, input: TickInput) {
        if !self.is_active() {
            return;
        }
        self.tick_fixtures(dt, input.repair_hold);
        if !self.is_active() {
            return;
        }
        self.tick_clock(dt);
        if !self.is_active() {
            return;
        }
        self.tick_detection(dt, input.agent_visible);
        self.tick_agent(dt);
        if !self.is_active() {
            return;
        }
        self.tick_session(dt, input);
    }

    /// Attempts a player move to `target`, consulting the transition arbiter.
    ///
    /// `Allow` commits the move immediately. `Challenge` defers it: the move
    /// commits only if the opened session succeeds. `Defeat` ends the run.
    pub fn attempt_move(&mut self, target: RoomId) -> Result<TransitionRuling, EncounterError> {
        if !self.is_active() {
            return Err(EncounterError::RunEnded);
        }
        if self.session.is_some() {
            return Err(EncounterError::ChallengeInProgress);
        }
        self.rooms.require(target)?;

        let ruling = rule_transition(&self.agent, self.player_room, self.config.challenge_available);
        match ruling {
            TransitionRuling::Allow => self.commit_move(target),
            TransitionRuling::Challenge => self.open_session(target),
            TransitionRuling::Defeat => {
                self.end_run(RunOutcome::Defeat, "ran into the agent with no way out");
            }
        }
        Ok(ruling)
    }

    /// Forces a capture: the agent is sent to the holding area and any open
    /// session is cancelled. Cancellation yields the session's failure
    /// outcome but never the game-over callback; the threat is already gone.
    pub fn capture_agent(&mut self) {
        if !self.is_active() {
            return;
        }
        if let Some(mut session) = self.session.take() {
            let variant = session.variant();
            if let Some(outcome) = session.cancel() {
                self.events
                    .push(EncounterEvent::ChallengeResolved { variant, outcome });
            }
            self.pending_move = None;
        }
        self.detection.reset();
        self.agent.send_to_caught_area();
        self.events.push(EncounterEvent::AgentCaught);
    }

    fn commit_move(&mut self, target: RoomId) {
        let from = self.player_room;
        self.player_room = target;
        self.events
            .push(EncounterEvent::PlayerMoved { from, to: target });
    }

    fn open_session(&mut self, target: RoomId) {
        let seed = compute_seed(self.run_seed, self.sessions_opened, CTX_SESSION);
        self.sessions_opened += 1;
        self.agent.pause_for_challenge();
        self.session = Some(ChallengeSession::standard(
            &self.config,
            self.rng.as_ref(),
            seed,
        ));
        self.pending_move = Some(target);
        self.events.push(EncounterEvent::ChallengeOpened);
        debug!(target_room = %target, "challenge session opened");
    }

    fn tick_fixtures(&mut self, dt: f32, repair_hold: Option<FixtureId>) {
        let (prop_duration, power_duration) = (
            self.config.prop_repair_duration,
            self.config.power_repair_duration,
        );
        let mut repaired = Vec::new();
        for fixture in self.fixtures.iter_mut() {
            let holding = repair_hold == Some(fixture.id);
            let duration = match fixture.kind {
                FixtureKind::Prop => prop_duration,
                FixtureKind::PowerSource => power_duration,
            };
            if fixture.tick_repair(dt, holding, duration) {
                repaired.push((fixture.id, fixture.kind));
            }
        }
        for (id, kind) in repaired {
            self.events.push(EncounterEvent::FixtureRepaired { id, kind });
            match kind {
                FixtureKind::Prop => self.economy.increment_props(),
                FixtureKind::PowerSource => {
                    if let Some(event) = self.economy.increment_power() {
                        self.apply_economy_event(event);
                    }
                }
            }
        }
    }

    fn tick_clock(&mut self, dt: f32) {
        if let Some(event) = self.economy.tick_clock(dt) {
            self.apply_economy_event(event);
        }
    }

    fn apply_economy_event(&mut self, event: EconomyEvent) {
        match event {
            EconomyEvent::PropsDepleted => {
                self.events.push(EncounterEvent::PropsDepleted);
                self.end_run(RunOutcome::Defeat, "every prop is destroyed");
            }
            EconomyEvent::TimeExpired => {
                self.events.push(EncounterEvent::TimeExpired);
                self.end_run(RunOutcome::Victory, "survived until the clock ran out");
            }
            EconomyEvent::PowerChanged { online } => {
                self.events.push(EncounterEvent::PowerChanged { online });
            }
        }
    }

    fn tick_detection(&mut self, dt: f32, agent_visible: bool) {
        // Detection is suspended, not merely ignored, while a session runs:
        // neither the momentary boolean nor the accumulator moves.
        if self.session.is_some() || self.agent.is_paused() {
            return;
        }
        self.detection.set_visible(agent_visible);
        self.detection.accumulate(dt);
        if self.detection.has_exceeded(self.config.spotted_timeout) {
            self.capture_agent();
        }
    }

    fn tick_agent(&mut self, dt: f32) {
        let signals = {
            let ctx = AgentCtx {
                config: &self.config,
                rooms: &self.rooms,
                fixtures: &self.fixtures,
                player_room: self.player_room,
                power_out: self.economy.is_power_out(),
                rng: self.rng.as_ref(),
            };
            self.agent.tick(dt, &ctx)
        };
        for signal in signals {
            self.apply_agent_signal(signal);
            if !self.is_active() {
                return;
            }
        }
    }

    fn apply_agent_signal(&mut self, signal: AgentSignal) {
        match signal {
            AgentSignal::RoomPicked { room } => {
                self.events.push(EncounterEvent::RoomPicked { room });
            }
            AgentSignal::StageAdvanced { room, stage } => {
                self.events
                    .push(EncounterEvent::StageAdvanced { room, stage });
            }
            AgentSignal::FinalStageReached { room } => {
                self.events.push(EncounterEvent::FinalStageReached { room });
            }
            AgentSignal::BreakFixture { id, kind } => self.break_fixture(id, kind),
            AgentSignal::HoldExpired => {
                self.end_run(RunOutcome::Defeat, "the agent finished its ambush unopposed");
            }
            AgentSignal::Respawned => {
                self.events.push(EncounterEvent::AgentRespawned);
            }
            AgentSignal::AmbientCue => {
                self.events.push(EncounterEvent::AmbientCue);
            }
            AgentSignal::Aborted => {}
        }
    }

    fn break_fixture(&mut self, id: FixtureId, kind: FixtureKind) {
        let Some(fixture) = self.fixtures.get_mut(id) else {
            return;
        };
        if !fixture.break_down() {
            return;
        }
        self.events.push(EncounterEvent::FixtureBroken { id, kind });
        let event = match kind {
            FixtureKind::Prop => self.economy.decrement_props(),
            FixtureKind::PowerSource => self.economy.decrement_power(),
        };
        if let Some(event) = event {
            self.apply_economy_event(event);
        }
    }

    fn tick_session(&mut self, dt: f32, input: TickInput) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let gate = EscalationGate {
            power_broken: self.fixtures.any_power_broken(),
            charge_ready: self.charge.is_fully_charged(),
        };
        let report = session.tick(
            dt,
            SessionInput {
                prompt_pressed: input.prompt_pressed,
                spam_pressed: input.spam_pressed,
            },
            gate,
            self.rng.as_ref(),
        );
        let variant = session.variant();

        if let Some(rounds) = report.round_completed {
            self.events
                .push(EncounterEvent::ChallengeRoundCompleted { rounds });
        }
        if report.escalated_now {
            self.events.push(EncounterEvent::ChallengeEscalated);
        }
        let Some(outcome) = report.outcome else {
            return;
        };

        self.session = None;
        let pending = self.pending_move.take();
        self.events
            .push(EncounterEvent::ChallengeResolved { variant, outcome });

        match outcome {
            SessionOutcome::Success { escalated } => {
                if let Some(target) = pending {
                    self.commit_move(target);
                }
                self.detection.reset();
                self.agent.send_to_caught_area();
                self.events.push(EncounterEvent::AgentCaught);
                if escalated {
                    self.charge.drain();
                    let remaining = self.health.damage(1);
                    self.events.push(EncounterEvent::AgentDamaged { remaining });
                    if self.health.is_defeated() {
                        self.end_run(RunOutcome::Victory, "the agent was destroyed");
                    }
                }
            }
            SessionOutcome::Failure {
                reason: FailureReason::Cancelled,
            } => {
                // Cancellation rides along with a capture; the capture path
                // already handled the agent and no game-over fires.
            }
            SessionOutcome::Failure { .. } => {
                self.agent.resume_after_failure();
                self.end_run(RunOutcome::Defeat, "failed the challenge");
            }
        }
    }

    fn end_run(&mut self, outcome: RunOutcome, cause: &str) {
        if !self.is_active() {
            return;
        }
        self.phase = RunPhase::Ended(outcome);
        self.events.push(EncounterEvent::RunEnded {
            outcome,
            cause: cause.to_string(),
        });
        info!(%outcome, cause, "run ended");
        match outcome {
            RunOutcome::Victory => self.handler.victory(cause),
            RunOutcome::Defeat => self.handler.game_over(cause),
        }
    }
}
