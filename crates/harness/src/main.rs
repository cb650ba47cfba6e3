//! Headless encounter harness.
//!
//! Runs one complete encounter on a fixed boat layout with a scripted
//! player, logging every event as it happens. Useful for eyeballing pacing
//! changes and for replaying a seed that produced an interesting run:
//!
//! ```bash
//! RUST_LOG=debug cargo run -p prowler-harness -- --seed 7 --duration 240
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use prowler_core::encounter::{Encounter, OutcomeHandler, TickInput};
use prowler_core::{
    ChargeSource, EncounterConfig, EncounterEvent, Fixture, FixtureId, FixtureKind, FixtureTable,
    Position, Room, RoomId, RoomTable, RunOutcome, TransitionRuling, WeaponCharge,
};

#[derive(Debug, Parser)]
#[command(name = "prowler", about = "Headless encounter simulation harness")]
struct Args {
    /// Run seed; identical seeds replay identical runs.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Wall-clock cap on the simulation, in simulated seconds.
    #[arg(long, default_value_t = 240.0)]
    duration: f32,

    /// Simulation step size in seconds.
    #[arg(long, default_value_t = 0.1)]
    dt: f32,
}

/// Records the terminal callback for the end-of-run report.
#[derive(Default)]
struct Report {
    outcome: Option<(RunOutcome, String)>,
}

impl OutcomeHandler for Report {
    fn game_over(&mut self, cause: &str) {
        self.outcome = Some((RunOutcome::Defeat, cause.to_string()));
    }

    fn victory(&mut self, cause: &str) {
        self.outcome = Some((RunOutcome::Victory, cause.to_string()));
    }
}

const DECK: RoomId = RoomId(0);
const HELM: RoomId = RoomId(1);
const GENERATOR: RoomId = RoomId(2);
const HOLD: RoomId = RoomId(3);

fn boat_layout() -> Result<RoomTable> {
    let waypoints = |x: f32, count: usize| {
        (0..count).map(move |i| Position::new(x, 0.0, i as f32 * 2.0))
    };
    let rooms = vec![
        Room::new(DECK, "deck", waypoints(0.0, 3))?,
        Room::new(HELM, "helm", waypoints(10.0, 2))?,
        Room::new(GENERATOR, "generator room", waypoints(20.0, 2))?,
        Room::new(HOLD, "cargo hold", waypoints(30.0, 4))?,
    ];
    Ok(RoomTable::new(rooms)?)
}

fn boat_fixtures() -> Result<FixtureTable> {
    Ok(FixtureTable::new([
        Fixture::new(FixtureId(0), FixtureKind::Prop, DECK),
        Fixture::new(FixtureId(1), FixtureKind::Prop, DECK),
        Fixture::new(FixtureId(2), FixtureKind::Prop, HELM),
        Fixture::new(FixtureId(3), FixtureKind::Prop, HOLD),
        Fixture::new(FixtureId(4), FixtureKind::Prop, HOLD),
        Fixture::new(FixtureId(5), FixtureKind::PowerSource, GENERATOR),
    ])?)
}

/// Scripted player: repairs whatever is broken, keeps the weapon topped up,
/// shines the light on an approaching agent, and takes the challenge when
/// the weapon is ready for an escalated counterattack.
struct Pilot {
    incidents: u32,
    under_approach: bool,
}

impl Pilot {
    fn new() -> Self {
        Self {
            incidents: 0,
            under_approach: false,
        }
    }

    fn decide(&mut self, enc: &Encounter<Report, WeaponCharge>) -> (TickInput, Option<RoomId>) {
        let mut input = TickInput::default();

        if let Some(session) = enc.session() {
            // Full effort on whichever variant is running.
            input.prompt_pressed = session.prompt();
            input.spam_pressed = true;
            return (input, None);
        }

        let player_room = enc.player_room();
        let agent_incoming = enc.agent().is_moving_through_stages()
            && enc.agent().current_room() == Some(player_room);
        if agent_incoming && !self.under_approach {
            self.incidents += 1;
        }
        self.under_approach = agent_incoming;
        if agent_incoming {
            // With a charged weapon the confrontation is worth taking;
            // otherwise keep the light on it until it is hauled away.
            if enc.charge().is_fully_charged() {
                let escape = if player_room == HOLD { DECK } else { HOLD };
                return (input, Some(escape));
            }
            input.agent_visible = true;
            return (input, None);
        }

        // Quiet moment: fix the most urgent broken fixture, power first.
        let broken = enc
            .fixtures()
            .iter()
            .filter(|f| f.is_broken())
            .max_by_key(|f| f.kind == FixtureKind::PowerSource)
            .map(|f| f.id);
        input.repair_hold = broken;
        (input, None)
    }
}

fn log_event(event: &EncounterEvent) {
    match event {
        EncounterEvent::RunEnded { outcome, cause } => {
            tracing::info!(%outcome, cause, "run ended");
        }
        EncounterEvent::StageAdvanced { .. } | EncounterEvent::AmbientCue => {
            tracing::debug!(?event, "event");
        }
        _ => tracing::info!(?event, "event"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = EncounterConfig::default();
    let weapon = WeaponCharge::new(&config);

    let mut enc = Encounter::new(
        config,
        boat_layout()?,
        boat_fixtures()?,
        DECK,
        Position::new(-50.0, 0.0, 0.0),
        args.seed,
        Report::default(),
        weapon,
    )
    .context("encounter setup")?;

    tracing::info!(seed = args.seed, duration = args.duration, "run starting");

    let mut pilot = Pilot::new();
    let mut elapsed = 0.0f32;
    while enc.is_active() && elapsed < args.duration {
        let (input, escape) = pilot.decide(&enc);

        // The charger lives in the generator room and only works on grid
        // power; the scripted player tops the weapon up whenever it can.
        let power_online = !enc.economy().is_power_out();
        let weapon = enc.charge_mut();
        weapon.set_allow_charging(power_online);
        if power_online && !weapon.is_fully_charged() {
            weapon.begin_charging();
        }
        weapon.tick(args.dt, true);

        if let Some(target) = escape {
            match enc.attempt_move(target)? {
                TransitionRuling::Allow => tracing::debug!(%target, "moved rooms"),
                TransitionRuling::Challenge => tracing::info!(%target, "challenge opened"),
                TransitionRuling::Defeat => {}
            }
        }

        enc.tick(args.dt, input);
        for event in enc.drain_events() {
            log_event(&event);
        }
        elapsed += args.dt;
    }

    match &enc.handler().outcome {
        Some((outcome, cause)) => {
            tracing::info!(%outcome, cause, elapsed, incidents = pilot.incidents, "final report");
        }
        None => {
            tracing::info!(
                elapsed,
                incidents = pilot.incidents,
                clock_remaining = enc.economy().clock(),
                "duration cap reached with the run still live"
            );
        }
    }
    Ok(())
}
