//! Seeded simulator for the sequence-memory engine
//!
//! Runs simulated players through complete sessions without timers and
//! checks the engine's invariants after every step:
//! - Sequence length is `level + base_length`, colors within the palette
//! - Errors never exceed the cap; score only grows before the result
//! - Final scores follow the clear/exhaust formulas
//! - Confirmed scores stay within 0..=100

use crate::engine::{confirmation_score, termination_score, InputOutcome, Phase, SequenceTest};
use crate::error::TestError;
use crate::sequence::{Color, RandomSequence, SequenceGenerator};
use nc_core::TestRules;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Sessions to play
    pub sessions: u64,
    /// Probability that a simulated player presses a wrong pad
    pub slip_probability: f64,
    /// Probability that a player cancels at the start of a recall
    pub cancel_probability: f64,
    /// Rules applied to every session
    pub rules: TestRules,
    /// Stop on first violation
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            sessions: 1_000,
            slip_probability: 0.05,
            cancel_probability: 0.0,
            rules: TestRules::default(),
            stop_on_first_violation: true,
        }
    }
}

/// Invariant checked by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCheck {
    /// Sequence length follows the level
    SequenceLengthMatchesLevel,
    /// Every colour is within the configured palette
    SequenceWithinPalette,
    /// Mistakes never pass the cap
    ErrorsWithinCap,
    /// Clearing a level adds exactly the level points
    ScoreMonotonicBeforeResult,
    /// Final score matches the ending's formula
    FinalScoreFormula,
    /// Confirmed score is at most 100 and follows the confirmation formula
    ConfirmedScoreInRange,
    /// The engine accepted a legal step
    EngineAcceptedValidStep,
}

/// A violation detected during simulation
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// Index of the session within the run
    pub session: u64,
    /// Check that failed
    pub check: InvariantCheck,
    /// What was observed
    pub details: String,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Sessions played
    pub sessions: u64,
    /// Sessions that cleared every level
    pub completed: u64,
    /// Sessions ended by the error cap
    pub exhausted: u64,
    /// Sessions the player cancelled
    pub cancelled: u64,
    /// Colour inputs submitted
    pub inputs: u64,
    /// Inputs that did not match the sequence
    pub mistakes: u64,
    /// Levels completed per finished session
    pub levels_completed: BTreeMap<u32, u64>,
    #[serde(skip)]
    confirmed_total: u64,
}

impl SessionStats {
    /// Mean confirmed score over sessions that reached a result
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_confirmed_score(&self) -> f64 {
        let finished = self.completed + self.exhausted;
        if finished == 0 {
            0.0
        } else {
            self.confirmed_total as f64 / finished as f64
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    /// Aggregated outcomes
    pub stats: SessionStats,
    /// Every invariant violation, in order found
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Check if no invariant was violated
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Machine-readable report
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "seed": self.config.seed,
            "slip_probability": self.config.slip_probability,
            "rules": self.config.rules,
            "passed": self.passed(),
            "mean_confirmed_score": self.stats.mean_confirmed_score(),
            "stats": self.stats,
            "violations": self.violations,
        })
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let stats = &self.stats;

        report.push_str("=== Sequence Memory Simulator Report ===\n\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Slip probability: {:.3}", self.config.slip_probability);
        let _ = writeln!(report, "Sessions: {}", stats.sessions);
        let _ = writeln!(report, "Completed: {}", stats.completed);
        let _ = writeln!(report, "Exhausted: {}", stats.exhausted);
        let _ = writeln!(report, "Cancelled: {}", stats.cancelled);
        let _ = writeln!(report, "Inputs: {}", stats.inputs);
        let _ = writeln!(report, "Mistakes: {}", stats.mistakes);
        let _ = writeln!(report, "Mean confirmed score: {:.1}", stats.mean_confirmed_score());

        if !stats.levels_completed.is_empty() {
            report.push_str("\n=== Levels completed ===\n");
            for (levels, count) in &stats.levels_completed {
                let _ = writeln!(report, "{levels:>2}: {count}");
            }
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. session {} {:?}: {}", i + 1, v.session, v.check, v.details);
            }
        }

        let _ = write!(
            report,
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run the simulator
#[must_use]
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = SessionStats::default();
    let mut violations = Vec::new();

    for session in 0..config.sessions {
        let generator = RandomSequence::seeded(rng.gen());
        let mut test = SequenceTest::new(config.rules, generator);
        let found = play_session(session, &mut test, &config, &mut rng, &mut stats);
        stats.sessions += 1;

        if !found.is_empty() {
            violations.extend(found);
            if config.stop_on_first_violation {
                break;
            }
        }
    }

    SimulatorReport {
        config,
        stats,
        violations,
    }
}

fn play_session<G: SequenceGenerator>(
    session: u64,
    test: &mut SequenceTest<G>,
    config: &SimulatorConfig,
    rng: &mut StdRng,
    stats: &mut SessionStats,
) -> Vec<Violation> {
    let mut checker = Checker {
        session,
        rules: config.rules,
        violations: Vec::new(),
    };
    let rules = config.rules;

    let started = test.start().map(<[Color]>::to_vec);
    let Some(mut sequence) = checker.accepted(started) else {
        return checker.violations;
    };

    loop {
        checker.check_sequence(test.level(), &sequence);
        if checker.accepted(test.finish_playback()).is_none() {
            break;
        }

        if rng.gen_bool(config.cancel_probability.clamp(0.0, 1.0)) {
            if checker.accepted(test.cancel()).is_some() {
                stats.cancelled += 1;
            }
            break;
        }

        let level_before = test.level();
        let score_before = test.score();
        let mut outcome = None;
        for &expected in &sequence {
            let color = if rng.gen_bool(config.slip_probability.clamp(0.0, 1.0)) {
                slip(expected, rng)
            } else {
                expected
            };
            stats.inputs += 1;
            let Some(result) = checker.accepted(test.input(color)) else {
                return checker.violations;
            };
            checker.check_errors(test.errors());
            if !matches!(result, InputOutcome::Correct { .. }) {
                outcome = Some(result);
                break;
            }
        }

        match outcome {
            Some(InputOutcome::LevelCleared { score, .. }) => {
                checker.check_monotonic(score_before, score);
            }
            Some(InputOutcome::Mistake { .. }) => {
                stats.mistakes += 1;
            }
            Some(InputOutcome::Finished { score }) => {
                let expected = score_before + rules.points_per_level;
                checker.check_final(score, expected, "clear");
                finish(test, &mut checker, stats, true);
                break;
            }
            Some(InputOutcome::Terminated { score }) => {
                stats.mistakes += 1;
                let expected = termination_score(level_before, score_before);
                checker.check_final(score, expected, "exhaust");
                finish(test, &mut checker, stats, false);
                break;
            }
            Some(InputOutcome::Correct { .. }) | None => {
                checker.record(
                    InvariantCheck::EngineAcceptedValidStep,
                    "attempt ended without an outcome".into(),
                );
                break;
            }
        }

        let next = test.begin_attempt().map(<[Color]>::to_vec);
        match checker.accepted(next) {
            Some(next) => sequence = next,
            None => break,
        }
    }

    checker.violations
}

fn finish<G: SequenceGenerator>(
    test: &mut SequenceTest<G>,
    checker: &mut Checker,
    stats: &mut SessionStats,
    completed: bool,
) {
    if test.phase() != Phase::Result {
        checker.record(
            InvariantCheck::EngineAcceptedValidStep,
            format!("expected result phase, found {}", test.phase()),
        );
        return;
    }
    let levels = test.level() - 1;
    let raw = test.score();
    let Some(confirmed) = checker.accepted(test.confirm()) else {
        return;
    };
    if confirmed > 100 || confirmed != confirmation_score(raw, checker.rules.max_level) {
        checker.record(
            InvariantCheck::ConfirmedScoreInRange,
            format!("confirmed {confirmed} from raw {raw}"),
        );
    }

    if completed {
        stats.completed += 1;
    } else {
        stats.exhausted += 1;
    }
    stats.confirmed_total += u64::from(confirmed);
    *stats.levels_completed.entry(levels).or_insert(0) += 1;
}

fn slip(expected: Color, rng: &mut StdRng) -> Color {
    let offset = rng.gen_range(1..4u8);
    Color::from_index((expected.index() + offset) % 4).unwrap_or(Color::Red)
}

struct Checker {
    session: u64,
    rules: TestRules,
    violations: Vec<Violation>,
}

impl Checker {
    fn record(&mut self, check: InvariantCheck, details: String) {
        self.violations.push(Violation {
            session: self.session,
            check,
            details,
        });
    }

    fn accepted<T>(&mut self, result: Result<T, TestError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(InvariantCheck::EngineAcceptedValidStep, err.to_string());
                None
            }
        }
    }

    fn check_sequence(&mut self, level: u32, sequence: &[Color]) {
        let expected = self.rules.sequence_length(level);
        if sequence.len() != expected {
            self.record(
                InvariantCheck::SequenceLengthMatchesLevel,
                format!("level {level}: length {} != {expected}", sequence.len()),
            );
        }
        if let Some(bad) = sequence.iter().find(|c| c.index() >= self.rules.colors) {
            self.record(InvariantCheck::SequenceWithinPalette, format!("color {bad} outside palette"));
        }
    }

    fn check_errors(&mut self, errors: u32) {
        if errors > self.rules.max_errors {
            self.record(
                InvariantCheck::ErrorsWithinCap,
                format!("{errors} errors exceeds cap {}", self.rules.max_errors),
            );
        }
    }

    fn check_monotonic(&mut self, before: u32, after: u32) {
        if after != before + self.rules.points_per_level {
            self.record(
                InvariantCheck::ScoreMonotonicBeforeResult,
                format!("score moved {before} -> {after}"),
            );
        }
    }

    fn check_final(&mut self, actual: u32, expected: u32, ending: &str) {
        if actual != expected {
            self.record(
                InvariantCheck::FinalScoreFormula,
                format!("{ending} score {actual}, expected {expected}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_players_always_complete() {
        let report = run_simulator(SimulatorConfig {
            sessions: 50,
            slip_probability: 0.0,
            ..Default::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.completed, 50);
        assert_eq!(report.stats.levels_completed.get(&7), Some(&50));
        assert!((report.stats.mean_confirmed_score() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clumsy_players_exhaust() {
        let report = run_simulator(SimulatorConfig {
            sessions: 50,
            slip_probability: 1.0,
            ..Default::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.exhausted, 50);
        assert_eq!(report.stats.levels_completed.get(&0), Some(&50));
    }

    #[test]
    fn cancelling_players_are_counted() {
        let report = run_simulator(SimulatorConfig {
            sessions: 20,
            cancel_probability: 1.0,
            ..Default::default()
        });
        assert!(report.passed());
        assert_eq!(report.stats.cancelled, 20);
        assert_eq!(report.stats.completed + report.stats.exhausted, 0);
    }

    #[test]
    fn json_report_mirrors_stats() {
        let report = run_simulator(SimulatorConfig {
            sessions: 10,
            slip_probability: 1.0,
            ..Default::default()
        });
        let json = report.to_json();
        assert_eq!(json["passed"], true);
        assert_eq!(json["stats"]["exhausted"], 10);
        assert_eq!(json["rules"]["max_level"], 7);
        assert!(json["stats"].get("confirmed_total").is_none());
        assert_eq!(json["violations"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn same_seed_same_report() {
        let config = SimulatorConfig {
            sessions: 200,
            slip_probability: 0.1,
            ..Default::default()
        };
        let a = run_simulator(config.clone());
        let b = run_simulator(config);
        assert_eq!(a.generate_text(), b.generate_text());
    }

    #[test]
    fn report_text_has_verdict() {
        let report = run_simulator(SimulatorConfig {
            sessions: 5,
            ..Default::default()
        });
        let text = report.generate_text();
        assert!(text.contains("Sessions: 5"));
        assert!(text.ends_with("=== Result: PASS ===\n"));
    }
}
