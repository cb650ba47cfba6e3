//! Skill-challenge session (QTE) arbitrating the critical transition.
//!
//! A session is a short-lived object owned by the orchestrator: it is
//! created when the arbiter opens a challenge, ticked alongside the paused
//! agent, and destroyed as soon as it yields its single terminal outcome.
//! Two variants exist:
//!
//! - **Standard mash**: decaying progress refilled by correctly matched
//!   prompt presses, one deadline per round, a configured number of rounds.
//! - **Escalated spam**: a raw repetition counter against a single overall
//!   deadline, entered in place of plain success when the escalation gate
//!   holds at final-round completion.
//!
//! Exactly one outcome is produced per session lifetime, never both and
//! never zero; a forced cancellation counts as the failure outcome.

use crate::config::EncounterConfig;
use crate::rng::{RngOracle, compute_seed};

/// Seed context for prompt re-rolls.
const CTX_PROMPT: u32 = 0;

/// Prompt symbol alphabet for the standard variant.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PromptKey {
    R,
    F,
    G,
}

impl PromptKey {
    const ALPHABET: [PromptKey; 3] = [PromptKey::R, PromptKey::F, PromptKey::G];
}

/// Which flavor of challenge is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ChallengeVariant {
    Standard,
    Escalated,
}

/// Why a session failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum FailureReason {
    /// A standard round's deadline expired before the round completed.
    RoundDeadline,
    /// The escalated deadline expired before the target count was reached.
    SpamDeadline,
    /// The session was cancelled externally (e.g. capture mid-challenge).
    Cancelled,
}

/// Terminal result of a session. `escalated` marks success that came through
/// the escalated variant, which carries extra side effects (charge drain,
/// agent damage) applied by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionOutcome {
    Success { escalated: bool },
    Failure { reason: FailureReason },
}

/// Compound condition checked only at final-round completion of the
/// standard variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EscalationGate {
    /// Some power source is currently broken.
    pub power_broken: bool,
    /// The charge-based resource is fully charged.
    pub charge_ready: bool,
}

impl EscalationGate {
    pub fn holds(&self) -> bool {
        self.power_broken && self.charge_ready
    }
}

/// Edge-triggered inputs fed into one session tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionInput {
    /// Which prompt symbol was pressed this tick, if any (standard variant).
    pub prompt_pressed: Option<PromptKey>,
    /// Whether the spam key was pressed this tick (escalated variant).
    pub spam_pressed: bool,
}

/// What one session tick produced, for event reporting and resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionTick {
    /// Set when a standard round completed this tick (total rounds done).
    pub round_completed: Option<u8>,
    /// Set when the session swapped to the escalated variant this tick.
    pub escalated_now: bool,
    /// The terminal outcome, if the session resolved this tick.
    pub outcome: Option<SessionOutcome>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Standard {
        progress: f32,
        prompt: PromptKey,
        deadline: f32,
        rounds_done: u8,
    },
    Escalated {
        count: u32,
        deadline: f32,
    },
}

/// A single timed skill challenge.
#[derive(Clone, Debug, PartialEq)]
pub struct ChallengeSession {
    phase: Phase,
    resolved: bool,
    run_seed: u64,
    rolls: u64,
    mash_max: f32,
    mash_decay_rate: f32,
    mash_boost: f32,
    rounds_required: u8,
    round_deadline: f32,
    spam_target: u32,
    spam_deadline: f32,
}

impl ChallengeSession {
    /// Opens a standard-variant session and rolls the first prompt.
    pub fn standard(config: &EncounterConfig, rng: &dyn RngOracle, run_seed: u64) -> Self {
        let mut session = Self {
            phase: Phase::Standard {
                progress: 0.0,
                prompt: PromptKey::R,
                deadline: config.round_deadline,
                rounds_done: 0,
            },
            resolved: false,
            run_seed,
            rolls: 0,
            mash_max: config.mash_max,
            mash_decay_rate: config.mash_decay_rate,
            mash_boost: config.mash_boost,
            rounds_required: config.rounds_required,
            round_deadline: config.round_deadline,
            spam_target: config.spam_target,
            spam_deadline: config.spam_deadline,
        };
        let first = session.roll_prompt(rng);
        if let Phase::Standard { prompt, .. } = &mut session.phase {
            *prompt = first;
        }
        session
    }

    pub fn variant(&self) -> ChallengeVariant {
        match self.phase {
            Phase::Standard { .. } => ChallengeVariant::Standard,
            Phase::Escalated { .. } => ChallengeVariant::Escalated,
        }
    }

    /// Current prompt symbol; `None` while escalated (the spam key carries
    /// no symbol payload).
    pub fn prompt(&self) -> Option<PromptKey> {
        match self.phase {
            Phase::Standard { prompt, .. } => Some(prompt),
            Phase::Escalated { .. } => None,
        }
    }

    /// Standard progress in [0, max], or the raw spam count while escalated.
    pub fn progress(&self) -> f32 {
        match self.phase {
            Phase::Standard { progress, .. } => progress,
            Phase::Escalated { count, .. } => count as f32,
        }
    }

    pub fn rounds_completed(&self) -> u8 {
        match self.phase {
            Phase::Standard { rounds_done, .. } => rounds_done,
            Phase::Escalated { .. } => self.rounds_required,
        }
    }

    pub fn deadline_remaining(&self) -> f32 {
        match self.phase {
            Phase::Standard { deadline, .. } | Phase::Escalated { deadline, .. } => deadline,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Advances deadlines and decay, applies this tick's inputs, and checks
    /// round/target completion. Once resolved, further ticks are no-ops.
    pub fn tick(
        &mut self,
        dt: f32,
        input: SessionInput,
        gate: EscalationGate,
        rng: &dyn RngOracle,
    ) -> SessionTick {
        let mut report = SessionTick::default();
        if self.resolved {
            return report;
        }

        match &mut self.phase {
            Phase::Escalated { count, deadline } => {
                *deadline -= dt;
                if *deadline <= 0.0 {
                    self.resolved = true;
                    report.outcome = Some(SessionOutcome::Failure {
                        reason: FailureReason::SpamDeadline,
                    });
                    return report;
                }
                if input.spam_pressed {
                    *count += 1;
                    // Success fires on the Nth press, not at the deadline.
                    if *count >= self.spam_target {
                        self.resolved = true;
                        report.outcome = Some(SessionOutcome::Success { escalated: true });
                    }
                }
            }
            Phase::Standard {
                progress,
                prompt,
                deadline,
                rounds_done,
            } => {
                *deadline -= dt;
                if *deadline <= 0.0 {
                    self.resolved = true;
                    report.outcome = Some(SessionOutcome::Failure {
                        reason: FailureReason::RoundDeadline,
                    });
                    return report;
                }

                *progress = (*progress - self.mash_decay_rate * dt).max(0.0);
                if input.prompt_pressed == Some(*prompt) {
                    *progress = (*progress + self.mash_boost).min(self.mash_max);
                }

                if *progress >= self.mash_max {
                    *rounds_done += 1;
                    report.round_completed = Some(*rounds_done);

                    if *rounds_done >= self.rounds_required {
                        if gate.holds() {
                            // Swap in place to the escalated variant rather
                            // than ending the session.
                            self.phase = Phase::Escalated {
                                count: 0,
                                deadline: self.spam_deadline,
                            };
                            report.escalated_now = true;
                        } else {
                            self.resolved = true;
                            report.outcome = Some(SessionOutcome::Success { escalated: false });
                        }
                    } else {
                        // Round count persists; only progress, deadline, and
                        // the prompt reset for the next round.
                        *progress = 0.0;
                        *deadline = self.round_deadline;
                        let next = self.roll_prompt(rng);
                        if let Phase::Standard { prompt, .. } = &mut self.phase {
                            *prompt = next;
                        }
                    }
                }
            }
        }

        report
    }

    /// Forced external cancellation (e.g. the agent was captured while the
    /// session was open). Yields the failure outcome unless the session had
    /// already resolved.
    pub fn cancel(&mut self) -> Option<SessionOutcome> {
        if self.resolved {
            return None;
        }
        self.resolved = true;
        Some(SessionOutcome::Failure {
            reason: FailureReason::Cancelled,
        })
    }

    fn roll_prompt(&mut self, rng: &dyn RngOracle) -> PromptKey {
        let seed = compute_seed(self.run_seed, self.rolls, CTX_PROMPT);
        self.rolls += 1;
        let index = rng.range(seed, 0, (PromptKey::ALPHABET.len() - 1) as u32);
        PromptKey::ALPHABET[index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::PcgRng;

    const DT: f32 = 0.1;

    fn session() -> ChallengeSession {
        ChallengeSession::standard(&EncounterConfig::default(), &PcgRng, 42)
    }

    fn press(session: &mut ChallengeSession, gate: EscalationGate) -> SessionTick {
        let input = SessionInput {
            prompt_pressed: session.prompt(),
            spam_pressed: false,
        };
        session.tick(DT, input, gate, &PcgRng)
    }

    /// Drives one round to completion with correct presses every tick.
    fn complete_round(session: &mut ChallengeSession, gate: EscalationGate) -> SessionTick {
        for _ in 0..200 {
            let report = press(session, gate);
            if report.round_completed.is_some() || report.outcome.is_some() {
                return report;
            }
        }
        panic!("round did not complete");
    }

    #[test]
    fn progress_stays_clamped() {
        let mut s = session();
        for _ in 0..50 {
            let report = press(&mut s, EscalationGate::default());
            assert!(s.progress() >= 0.0 && s.progress() <= 100.0);
            if report.outcome.is_some() {
                break;
            }
        }
    }

    #[test]
    fn no_inputs_fails_at_deadline_with_zero_progress() {
        let mut s = session();
        let mut elapsed = 0.0;
        loop {
            let report = s.tick(DT, SessionInput::default(), EscalationGate::default(), &PcgRng);
            elapsed += DT;
            if let Some(outcome) = report.outcome {
                assert_eq!(
                    outcome,
                    SessionOutcome::Failure {
                        reason: FailureReason::RoundDeadline
                    }
                );
                break;
            }
            assert_eq!(s.progress(), 0.0);
        }
        assert!((elapsed - 7.0).abs() < 2.0 * DT);
    }

    #[test]
    fn three_rounds_without_gate_is_plain_success() {
        let mut s = session();
        for round in 1..3 {
            let report = complete_round(&mut s, EscalationGate::default());
            assert_eq!(report.round_completed, Some(round));
            assert_eq!(report.outcome, None);
            assert_eq!(s.progress(), 0.0);
        }
        let report = complete_round(&mut s, EscalationGate::default());
        assert_eq!(report.round_completed, Some(3));
        assert_eq!(
            report.outcome,
            Some(SessionOutcome::Success { escalated: false })
        );
    }

    #[test]
    fn escalates_only_when_both_predicates_hold() {
        for (power_broken, charge_ready) in [(true, false), (false, true), (false, false)] {
            let gate = EscalationGate {
                power_broken,
                charge_ready,
            };
            let mut s = session();
            let mut last = SessionTick::default();
            for _ in 0..3 {
                last = complete_round(&mut s, gate);
            }
            assert_eq!(
                last.outcome,
                Some(SessionOutcome::Success { escalated: false })
            );
            assert!(!last.escalated_now);
        }

        let gate = EscalationGate {
            power_broken: true,
            charge_ready: true,
        };
        let mut s = session();
        let mut last = SessionTick::default();
        for _ in 0..3 {
            last = complete_round(&mut s, gate);
        }
        assert!(last.escalated_now);
        assert_eq!(last.outcome, None);
        assert_eq!(s.variant(), ChallengeVariant::Escalated);
        assert_eq!(s.progress(), 0.0);
    }

    #[test]
    fn escalated_succeeds_on_final_press_not_deadline() {
        let gate = EscalationGate {
            power_broken: true,
            charge_ready: true,
        };
        let mut s = session();
        for _ in 0..3 {
            complete_round(&mut s, gate);
        }

        // 20 qualifying presses well inside the 5s deadline.
        let input = SessionInput {
            prompt_pressed: None,
            spam_pressed: true,
        };
        let mut outcome = None;
        for presses in 1..=20 {
            let report = s.tick(DT, input, gate, &PcgRng);
            outcome = report.outcome;
            if presses < 20 {
                assert_eq!(outcome, None);
            }
        }
        assert_eq!(outcome, Some(SessionOutcome::Success { escalated: true }));
    }

    #[test]
    fn escalated_deadline_fails() {
        let gate = EscalationGate {
            power_broken: true,
            charge_ready: true,
        };
        let mut s = session();
        for _ in 0..3 {
            complete_round(&mut s, gate);
        }
        let report = s.tick(5.1, SessionInput::default(), gate, &PcgRng);
        assert_eq!(
            report.outcome,
            Some(SessionOutcome::Failure {
                reason: FailureReason::SpamDeadline
            })
        );
    }

    #[test]
    fn exactly_one_terminal_outcome() {
        let mut s = session();
        let report = s.tick(7.5, SessionInput::default(), EscalationGate::default(), &PcgRng);
        assert!(report.outcome.is_some());
        // Resolved sessions tick as no-ops and cannot be cancelled again.
        let report = s.tick(7.5, SessionInput::default(), EscalationGate::default(), &PcgRng);
        assert_eq!(report.outcome, None);
        assert_eq!(s.cancel(), None);
    }

    #[test]
    fn cancel_yields_the_failure_outcome() {
        let mut s = session();
        assert_eq!(
            s.cancel(),
            Some(SessionOutcome::Failure {
                reason: FailureReason::Cancelled
            })
        );
        assert!(s.is_resolved());
    }

    #[test]
    fn wrong_prompt_press_adds_nothing() {
        let mut s = session();
        let wrong = PromptKey::ALPHABET
            .iter()
            .copied()
            .find(|k| Some(*k) != s.prompt())
            .unwrap();
        s.tick(
            DT,
            SessionInput {
                prompt_pressed: Some(wrong),
                spam_pressed: false,
            },
            EscalationGate::default(),
            &PcgRng,
        );
        assert_eq!(s.progress(), 0.0);
    }
}
