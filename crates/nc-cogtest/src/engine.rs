//! Sequence-memory test state machine
//!
//! The engine is synchronous and owns no timers. It exposes the transitions
//! of a test session; the [`driver`](crate::driver) decides when the timed
//! ones (end of playback, next attempt) happen.
//!
//! Phases move forward only, except the recall → memorize loop:
//!
//! ```text
//! intro ──start──▶ memorize ──finish_playback──▶ recall ──▶ result
//!                      ▲                            │
//!                      └──────── begin_attempt ─────┘
//! ```

use crate::error::TestError;
use crate::sequence::{Color, RandomSequence, SequenceGenerator};
use nc_core::TestRules;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use ulid::Ulid;

/// Sortable identifier of one test session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new identifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Screen phase of a test session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Instructions shown, waiting for start
    Intro,
    /// Sequence playing back; no input
    Memorize,
    /// Player reproduces the sequence
    Recall,
    /// Final score shown
    Result,
}

impl Phase {
    /// Phases reachable in one step
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [Phase] {
        match self {
            Phase::Intro => &[Phase::Memorize],
            Phase::Memorize => &[Phase::Recall],
            Phase::Recall => &[Phase::Memorize, Phase::Result],
            Phase::Result => &[],
        }
    }

    /// Check a single transition against the table
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, to: Phase) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Cancellation is refused only during playback
    #[inline]
    #[must_use]
    pub fn can_cancel(self) -> bool {
        !matches!(self, Phase::Memorize)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Intro => "intro",
            Phase::Memorize => "memorize",
            Phase::Recall => "recall",
            Phase::Result => "result",
        };
        f.write_str(name)
    }
}

/// Validate a phase change
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), TestError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(TestError::IllegalTransition { from, to })
    }
}

/// Score recorded when the error cap is reached at `level`
///
/// `round((level - 1) * 20 + (score / level) * 10)`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn termination_score(level: u32, score: u32) -> u32 {
    let level = f64::from(level.max(1));
    let raw = (level - 1.0) * 20.0 + (f64::from(score) / level) * 10.0;
    raw.round() as u32
}

/// Score handed to the caller on confirmation, capped at 100
///
/// `min(100, round(score / levels))`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn confirmation_score(score: u32, levels: u32) -> u32 {
    let scaled = (f64::from(score) / f64::from(levels.max(1))).round() as u32;
    scaled.min(100)
}

/// Result of one recall input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputOutcome {
    /// Matched, sequence not yet complete
    Correct { matched: usize, remaining: usize },
    /// Sequence complete; next level follows after a delay
    LevelCleared { level: u32, score: u32 },
    /// Final level cleared; session is over
    Finished { score: u32 },
    /// Wrong color; same level is retried after a delay
    Mistake { errors: u32, attempts_left: u32 },
    /// Error cap reached; session is over
    Terminated { score: u32 },
}

impl InputOutcome {
    /// Check if a new attempt must be started next
    #[inline]
    #[must_use]
    pub fn awaits_next_attempt(&self) -> bool {
        matches!(self, Self::LevelCleared { .. } | Self::Mistake { .. })
    }

    /// Check if the session reached its result
    #[inline]
    #[must_use]
    pub fn ends_test(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Terminated { .. })
    }
}

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    /// Every level cleared
    AllLevelsCleared,
    /// Error cap reached
    ErrorsExhausted,
}

/// Figures shown on the result screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    /// How the session ended
    pub ending: Ending,
    /// Raw final score as computed by the ending
    pub final_score: u32,
    /// Score confirmation would report (0..=100)
    pub confirmed_score: u32,
    /// Levels cleared before the ending
    pub levels_completed: u32,
    /// Mistakes made
    pub errors: u32,
}

/// Observable state of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSnapshot {
    /// Session id
    pub id: SessionId,
    /// Current phase
    pub phase: Phase,
    /// Level being played, from 1
    pub level: u32,
    /// Accumulated score
    pub score: u32,
    /// Mistakes so far
    pub errors: u32,
    /// Mistakes that end the session
    pub max_errors: u32,
    /// Colours entered in the current attempt
    pub entered: usize,
    /// Length of the sequence to repeat
    pub sequence_len: usize,
    /// A mistake was made and the next attempt is not yet shown
    pub awaiting_attempt: bool,
    /// Confirmed, cancelled or closed
    pub closed: bool,
}

/// One sequence-memory test session
#[derive(Debug)]
pub struct SequenceTest<G = RandomSequence> {
    id: SessionId,
    rules: TestRules,
    generator: G,
    phase: Phase,
    level: u32,
    sequence: Vec<Color>,
    entered: Vec<Color>,
    score: u32,
    errors: u32,
    awaiting_attempt: bool,
    closed: bool,
}

impl SequenceTest<RandomSequence> {
    /// Session with production rules and a seeded generator
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(TestRules::default(), RandomSequence::seeded(seed))
    }
}

impl<G: SequenceGenerator> SequenceTest<G> {
    /// Create session in the intro phase
    #[must_use]
    pub fn new(rules: TestRules, generator: G) -> Self {
        Self {
            id: SessionId::new(),
            rules,
            generator,
            phase: Phase::Intro,
            level: 1,
            sequence: Vec::new(),
            entered: Vec::new(),
            score: 0,
            errors: 0,
            awaiting_attempt: false,
            closed: false,
        }
    }

    /// Session id
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Rules the session runs under
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &TestRules {
        &self.rules
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Level being played, from 1
    #[inline]
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Accumulated score
    #[inline]
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Mistakes so far
    #[inline]
    #[must_use]
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Sequence of the current attempt
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> &[Color] {
        &self.sequence
    }

    /// Inputs of the current attempt
    #[inline]
    #[must_use]
    pub fn entered(&self) -> &[Color] {
        &self.entered
    }

    /// Check if the attempt is over and a new one is due
    #[inline]
    #[must_use]
    pub fn is_awaiting_attempt(&self) -> bool {
        self.awaiting_attempt
    }

    /// Check if the session was confirmed or cancelled
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current observable state
    #[must_use]
    pub fn snapshot(&self) -> TestSnapshot {
        TestSnapshot {
            id: self.id,
            phase: self.phase,
            level: self.level,
            score: self.score,
            errors: self.errors,
            max_errors: self.rules.max_errors,
            entered: self.entered.len(),
            sequence_len: self.sequence.len(),
            awaiting_attempt: self.awaiting_attempt,
            closed: self.closed,
        }
    }

    /// Result-screen figures, once the session reached its result
    #[must_use]
    pub fn summary(&self) -> Option<TestSummary> {
        if self.phase != Phase::Result {
            return None;
        }
        let ending = if self.errors >= self.rules.max_errors {
            Ending::ErrorsExhausted
        } else {
            Ending::AllLevelsCleared
        };
        Some(TestSummary {
            ending,
            final_score: self.score,
            confirmed_score: confirmation_score(self.score, self.rules.max_level),
            levels_completed: self.level - 1,
            errors: self.errors,
        })
    }

    /// Leave the intro and play the first sequence
    pub fn start(&mut self) -> Result<&[Color], TestError> {
        self.ensure_open()?;
        if self.phase != Phase::Intro {
            return Err(self.out_of_phase("start"));
        }
        self.deal();
        self.transition(Phase::Memorize)?;
        info!(session = %self.id, "test started");
        Ok(&self.sequence)
    }

    /// Playback and settle delay are over; accept input
    pub fn finish_playback(&mut self) -> Result<(), TestError> {
        self.ensure_open()?;
        if self.phase != Phase::Memorize {
            return Err(self.out_of_phase("finish_playback"));
        }
        self.transition(Phase::Recall)
    }

    /// Check one color against the sequence
    ///
    /// The input is compared at position `entered.len() - 1`; the first
    /// mismatch ends the attempt.
    pub fn input(&mut self, color: Color) -> Result<InputOutcome, TestError> {
        self.ensure_open()?;
        if self.phase != Phase::Recall {
            return Err(self.out_of_phase("input"));
        }
        if self.awaiting_attempt {
            return Err(TestError::AttemptPending);
        }

        let position = self.entered.len();
        self.entered.push(color);

        if self.sequence.get(position) != Some(&color) {
            self.errors += 1;
            debug!(session = %self.id, level = self.level, position, errors = self.errors, "mismatch");

            if self.errors >= self.rules.max_errors {
                self.score = termination_score(self.level, self.score);
                self.transition(Phase::Result)?;
                info!(session = %self.id, level = self.level, score = self.score, "test terminated");
                return Ok(InputOutcome::Terminated { score: self.score });
            }

            self.awaiting_attempt = true;
            return Ok(InputOutcome::Mistake {
                errors: self.errors,
                attempts_left: self.rules.max_errors - self.errors,
            });
        }

        if self.entered.len() < self.sequence.len() {
            return Ok(InputOutcome::Correct {
                matched: self.entered.len(),
                remaining: self.sequence.len() - self.entered.len(),
            });
        }

        let cleared = self.level;
        self.score += self.rules.points_per_level;
        self.level += 1;
        info!(session = %self.id, level = cleared, score = self.score, "level cleared");

        if cleared >= self.rules.max_level {
            self.transition(Phase::Result)?;
            return Ok(InputOutcome::Finished { score: self.score });
        }

        self.awaiting_attempt = true;
        Ok(InputOutcome::LevelCleared {
            level: cleared,
            score: self.score,
        })
    }

    /// Deal a new sequence for the current level and replay it
    pub fn begin_attempt(&mut self) -> Result<&[Color], TestError> {
        self.ensure_open()?;
        if self.phase != Phase::Recall || !self.awaiting_attempt {
            return Err(self.out_of_phase("begin_attempt"));
        }
        self.awaiting_attempt = false;
        self.deal();
        self.transition(Phase::Memorize)?;
        Ok(&self.sequence)
    }

    /// Close the session and return the score to report
    pub fn confirm(&mut self) -> Result<u32, TestError> {
        self.ensure_open()?;
        if self.phase != Phase::Result {
            return Err(self.out_of_phase("confirm"));
        }
        let score = confirmation_score(self.score, self.rules.max_level);
        self.closed = true;
        info!(session = %self.id, score, "result confirmed");
        Ok(score)
    }

    /// Abandon the session
    pub fn cancel(&mut self) -> Result<(), TestError> {
        self.ensure_open()?;
        if !self.phase.can_cancel() {
            return Err(TestError::CancelDuringPlayback);
        }
        self.closed = true;
        info!(session = %self.id, phase = %self.phase, "test cancelled");
        Ok(())
    }

    fn deal(&mut self) {
        let len = self.rules.sequence_length(self.level);
        self.sequence = self.generator.generate(len, self.rules.colors);
        self.entered.clear();
        debug!(session = %self.id, level = self.level, len, "sequence dealt");
    }

    fn transition(&mut self, to: Phase) -> Result<(), TestError> {
        validate_transition(self.phase, to)?;
        self.phase = to;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), TestError> {
        if self.closed {
            Err(TestError::Closed)
        } else {
            Ok(())
        }
    }

    fn out_of_phase(&self, operation: &'static str) -> TestError {
        TestError::InvalidPhase {
            operation,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::ScriptedSequence;
    use pretty_assertions::assert_eq;

    fn scripted() -> SequenceTest<ScriptedSequence> {
        SequenceTest::new(TestRules::default(), ScriptedSequence::default())
    }

    fn wrong(expected: Color) -> Color {
        Color::from_index((expected.index() + 1) % 4).unwrap_or(Color::Red)
    }

    fn clear_level<G: SequenceGenerator>(test: &mut SequenceTest<G>) -> InputOutcome {
        let sequence = test.sequence().to_vec();
        let mut last = None;
        for color in sequence {
            last = Some(test.input(color).unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn transition_table() {
        assert!(Phase::Intro.can_transition_to(Phase::Memorize));
        assert!(Phase::Recall.can_transition_to(Phase::Memorize));
        assert!(!Phase::Memorize.can_transition_to(Phase::Intro));
        assert!(Phase::Result.allowed_transitions().is_empty());
        assert_eq!(
            validate_transition(Phase::Result, Phase::Recall),
            Err(TestError::IllegalTransition {
                from: Phase::Result,
                to: Phase::Recall
            })
        );
    }

    #[test]
    fn scoring_formulas() {
        assert_eq!(termination_score(3, 200), 707);
        assert_eq!(termination_score(1, 0), 0);
        assert_eq!(confirmation_score(707, 7), 100);
        assert_eq!(confirmation_score(700, 7), 100);
        assert_eq!(confirmation_score(200, 7), 29);
    }

    #[test]
    fn start_plays_level_one() {
        let mut test = scripted();
        assert_eq!(test.start().unwrap().len(), 3);
        assert_eq!(test.phase(), Phase::Memorize);
        assert!(matches!(test.start(), Err(TestError::InvalidPhase { .. })));
    }

    #[test]
    fn input_rejected_outside_recall() {
        let mut test = scripted();
        assert!(matches!(test.input(Color::Red), Err(TestError::InvalidPhase { .. })));
        test.start().unwrap();
        assert!(matches!(test.input(Color::Red), Err(TestError::InvalidPhase { .. })));
    }

    #[test]
    fn clearing_level_advances() {
        let mut test = scripted();
        test.start().unwrap();
        test.finish_playback().unwrap();

        let outcome = clear_level(&mut test);
        assert_eq!(outcome, InputOutcome::LevelCleared { level: 1, score: 100 });
        assert_eq!(test.level(), 2);
        assert!(test.is_awaiting_attempt());
        assert_eq!(test.input(Color::Red), Err(TestError::AttemptPending));

        assert_eq!(test.begin_attempt().unwrap().len(), 4);
        assert_eq!(test.phase(), Phase::Memorize);
        assert!(test.entered().is_empty());
    }

    #[test]
    fn mistake_retries_same_level() {
        let mut test = scripted();
        test.start().unwrap();
        test.finish_playback().unwrap();

        let first = test.sequence()[0];
        let outcome = test.input(wrong(first)).unwrap();
        assert_eq!(outcome, InputOutcome::Mistake { errors: 1, attempts_left: 2 });
        assert_eq!(test.level(), 1);
        assert_eq!(test.score(), 0);

        assert_eq!(test.begin_attempt().unwrap().len(), 3);
    }

    #[test]
    fn cancel_refused_during_playback() {
        let mut test = scripted();
        test.start().unwrap();
        assert_eq!(test.cancel(), Err(TestError::CancelDuringPlayback));
        test.finish_playback().unwrap();
        test.cancel().unwrap();
        assert!(test.is_closed());
        assert_eq!(test.input(Color::Red), Err(TestError::Closed));
    }

    #[test]
    fn cancel_in_intro() {
        let mut test = scripted();
        test.cancel().unwrap();
        assert_eq!(test.start().map(<[Color]>::len), Err(TestError::Closed));
    }

    #[test]
    fn summary_after_exhaustion() {
        let mut test = scripted();
        test.start().unwrap();
        test.finish_playback().unwrap();
        clear_level(&mut test);
        test.begin_attempt().unwrap();
        test.finish_playback().unwrap();
        for _ in 0..3 {
            let first = test.sequence()[0];
            let outcome = test.input(wrong(first)).unwrap();
            if outcome.awaits_next_attempt() {
                test.begin_attempt().unwrap();
                test.finish_playback().unwrap();
            }
        }

        assert_eq!(test.phase(), Phase::Result);
        let summary = test.summary().unwrap();
        assert_eq!(
            summary,
            TestSummary {
                ending: Ending::ErrorsExhausted,
                final_score: termination_score(2, 100),
                confirmed_score: confirmation_score(termination_score(2, 100), 7),
                levels_completed: 1,
                errors: 3,
            }
        );
    }

    #[test]
    fn snapshot_tracks_progress() {
        let mut test = scripted();
        test.start().unwrap();
        test.finish_playback().unwrap();
        let first = test.sequence()[0];
        test.input(first).unwrap();

        let snap = test.snapshot();
        assert_eq!(snap.phase, Phase::Recall);
        assert_eq!(snap.entered, 1);
        assert_eq!(snap.sequence_len, 3);
        assert_eq!(snap.max_errors, 3);
    }
}
