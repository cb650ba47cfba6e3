/// Encounter configuration constants and tunable parameters.
///
/// All durations are in seconds of simulated time; the whole core advances
/// via one `tick(dt)` call per frame.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncounterConfig {
    // ===== agent pacing =====
    /// Interval between room picks, stage advances, and the break dwell.
    pub stage_interval: f32,
    /// How long the agent holds the final stage before the run is lost.
    pub final_stage_hold: f32,
    /// Sustained visibility required before the agent is captured.
    pub spotted_timeout: f32,
    /// Delay between capture and the agent re-entering its patrol cycle.
    pub respawn_delay: f32,
    /// Chance of an ambient cue after a room pick that misses the player.
    pub ambient_cue_chance: f32,

    // ===== challenge session =====
    /// Whether a challenge mechanism is wired up at all. When false, moving
    /// through the agent's room while it is closing in is an immediate loss.
    pub challenge_available: bool,
    /// Progress required to complete one standard round.
    pub mash_max: f32,
    /// Continuous progress decay per second (standard variant).
    pub mash_decay_rate: f32,
    /// Progress granted per correctly matched prompt press.
    pub mash_boost: f32,
    /// Standard rounds required for overall success.
    pub rounds_required: u8,
    /// Per-round deadline for the standard variant.
    pub round_deadline: f32,
    /// Qualifying presses required by the escalated variant.
    pub spam_target: u32,
    /// Single overall deadline for the escalated variant.
    pub spam_deadline: f32,

    // ===== economy =====
    /// Initial (and maximum) count of intact props.
    pub starting_props: u32,
    /// Initial (and maximum) count of online power sources.
    pub starting_power: u32,
    /// Countdown clock; reaching zero ends the run in victory.
    pub starting_clock: f32,

    // ===== fixtures =====
    /// Hold duration to repair a broken prop.
    pub prop_repair_duration: f32,
    /// Hold duration to bring a power source back online.
    pub power_repair_duration: f32,
    /// Charge gained per second while the charge weapon is being charged.
    pub charge_rate: f32,
    /// Charge level at which the weapon counts as fully charged.
    pub charge_max: f32,

    // ===== agent durability =====
    /// Hits the agent takes before the run ends in victory.
    pub agent_max_health: u32,
}

impl EncounterConfig {
    // ===== compile-time constants used as type parameters =====
    pub const MAX_ROOMS: usize = 16;
    pub const MAX_STAGES_PER_ROOM: usize = 8;
    pub const MAX_FIXTURES: usize = 32;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_STAGE_INTERVAL: f32 = 5.0;
    pub const DEFAULT_FINAL_STAGE_HOLD: f32 = 7.0;
    pub const DEFAULT_SPOTTED_TIMEOUT: f32 = 3.0;
    pub const DEFAULT_RESPAWN_DELAY: f32 = 10.0;
    pub const DEFAULT_ROUND_DEADLINE: f32 = 7.0;
    pub const DEFAULT_SPAM_DEADLINE: f32 = 5.0;
    pub const DEFAULT_SPAM_TARGET: u32 = 20;
    pub const DEFAULT_ROUNDS_REQUIRED: u8 = 3;
    pub const DEFAULT_STARTING_CLOCK: f32 = 180.0;

    pub fn new() -> Self {
        Self {
            stage_interval: Self::DEFAULT_STAGE_INTERVAL,
            final_stage_hold: Self::DEFAULT_FINAL_STAGE_HOLD,
            spotted_timeout: Self::DEFAULT_SPOTTED_TIMEOUT,
            respawn_delay: Self::DEFAULT_RESPAWN_DELAY,
            ambient_cue_chance: 0.5,
            challenge_available: true,
            mash_max: 100.0,
            mash_decay_rate: 25.0,
            mash_boost: 10.0,
            rounds_required: Self::DEFAULT_ROUNDS_REQUIRED,
            round_deadline: Self::DEFAULT_ROUND_DEADLINE,
            spam_target: Self::DEFAULT_SPAM_TARGET,
            spam_deadline: Self::DEFAULT_SPAM_DEADLINE,
            starting_props: 5,
            starting_power: 1,
            starting_clock: Self::DEFAULT_STARTING_CLOCK,
            prop_repair_duration: 5.0,
            power_repair_duration: 10.0,
            charge_rate: 10.0,
            charge_max: 100.0,
            agent_max_health: 3,
        }
    }
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self::new()
    }
}
