//! Behavioral properties of the sequence-memory engine

use nc_cogtest::{
    confirmation_score, termination_score, Color, InputOutcome, Phase, RandomSequence, ScriptedSequence,
    SequenceGenerator, SequenceTest, TestError,
};
use nc_core::TestRules;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn other_than(color: Color) -> Color {
    Color::from_index((color.index() + 1) % 4).unwrap()
}

/// Advance from intro or a pending attempt into recall
fn to_recall<G: SequenceGenerator>(test: &mut SequenceTest<G>) {
    match test.phase() {
        Phase::Intro => {
            test.start().unwrap();
        }
        Phase::Recall if test.is_awaiting_attempt() => {
            test.begin_attempt().unwrap();
        }
        other => panic!("cannot reach recall from {other}"),
    }
    test.finish_playback().unwrap();
}

fn play_sequence<G: SequenceGenerator>(test: &mut SequenceTest<G>) -> InputOutcome {
    let sequence = test.sequence().to_vec();
    let mut outcome = None;
    for color in sequence {
        outcome = Some(test.input(color).unwrap());
    }
    outcome.unwrap()
}

#[test]
fn sequences_have_level_plus_two_elements() {
    let mut test = SequenceTest::seeded(11);
    for level in 1..=7 {
        to_recall(&mut test);
        assert_eq!(test.level(), level);
        assert_eq!(test.sequence().len(), level as usize + 2);
        assert!(test.sequence().iter().all(|c| c.index() < 4));
        play_sequence(&mut test);
    }
    assert_eq!(test.phase(), Phase::Result);
}

#[test]
fn echoing_the_sequence_clears_the_level() {
    let mut test = SequenceTest::seeded(3);
    to_recall(&mut test);
    let sequence = test.sequence().to_vec();

    for (i, &color) in sequence.iter().enumerate().take(sequence.len() - 1) {
        assert_eq!(
            test.input(color).unwrap(),
            InputOutcome::Correct {
                matched: i + 1,
                remaining: sequence.len() - i - 1
            }
        );
    }
    let last = *sequence.last().unwrap();
    assert_eq!(
        test.input(last).unwrap(),
        InputOutcome::LevelCleared { level: 1, score: 100 }
    );
    assert_eq!(test.level(), 2);
    assert_eq!(test.score(), 100);
    assert_eq!(test.errors(), 0);
}

#[test]
fn wrong_first_input_costs_one_error_and_replays_same_length() {
    let mut test = SequenceTest::seeded(5);
    to_recall(&mut test);
    play_sequence(&mut test);
    to_recall(&mut test);

    let first = test.sequence()[0];
    let outcome = test.input(other_than(first)).unwrap();
    assert_eq!(outcome, InputOutcome::Mistake { errors: 1, attempts_left: 2 });
    assert_eq!(test.level(), 2);
    assert_eq!(test.score(), 100);

    let replay = test.begin_attempt().unwrap().to_vec();
    assert_eq!(replay.len(), 4);
    assert!(test.entered().is_empty());
}

#[test]
fn later_mismatch_ends_the_attempt_immediately() {
    let mut test = SequenceTest::new(
        TestRules::default(),
        ScriptedSequence::new([vec![Color::Red, Color::Blue, Color::Green]]),
    );
    to_recall(&mut test);
    test.input(Color::Red).unwrap();
    let outcome = test.input(Color::Red).unwrap();
    assert!(matches!(outcome, InputOutcome::Mistake { errors: 1, .. }));
    assert_eq!(test.input(Color::Green), Err(TestError::AttemptPending));
}

#[test]
fn exhausting_errors_at_level_three_scores_707() {
    let mut test = SequenceTest::seeded(9);
    to_recall(&mut test);
    play_sequence(&mut test);
    to_recall(&mut test);
    play_sequence(&mut test);
    assert_eq!((test.level(), test.score()), (3, 200));

    let mut last = None;
    for _ in 0..3 {
        to_recall(&mut test);
        let first = test.sequence()[0];
        last = Some(test.input(other_than(first)).unwrap());
    }

    assert_eq!(last, Some(InputOutcome::Terminated { score: 707 }));
    assert_eq!(test.phase(), Phase::Result);
    assert_eq!(test.score(), termination_score(3, 200));
    assert_eq!(test.confirm().unwrap(), 100);
}

#[test]
fn clearing_level_seven_finishes_with_raw_score() {
    let mut test = SequenceTest::seeded(21);
    let mut outcome = None;
    for _ in 1..=7 {
        to_recall(&mut test);
        outcome = Some(play_sequence(&mut test));
    }
    assert_eq!(outcome, Some(InputOutcome::Finished { score: 700 }));
    assert_eq!(test.phase(), Phase::Result);
    assert_eq!(test.confirm().unwrap(), confirmation_score(700, 7));
    assert_eq!(test.confirm(), Err(TestError::Closed));
}

#[test]
fn finishing_with_errors_keeps_cleared_points() {
    let mut test = SequenceTest::seeded(4);
    to_recall(&mut test);
    let first = test.sequence()[0];
    test.input(other_than(first)).unwrap();
    for _ in 1..=7 {
        to_recall(&mut test);
        play_sequence(&mut test);
    }
    assert_eq!(test.phase(), Phase::Result);
    assert_eq!(test.errors(), 1);
    assert_eq!(test.score(), 700);
    assert_eq!(test.summary().unwrap().levels_completed, 7);
}

#[test]
fn custom_rules_change_the_cap() {
    let rules = TestRules {
        max_level: 2,
        max_errors: 1,
        ..TestRules::default()
    };
    let mut test = SequenceTest::new(rules, RandomSequence::seeded(1));
    to_recall(&mut test);
    let first = test.sequence()[0];
    assert_eq!(
        test.input(other_than(first)).unwrap(),
        InputOutcome::Terminated {
            score: termination_score(1, 0)
        }
    );
}

fn wrong_attempts() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..40)
}

proptest! {
    #[test]
    fn errors_never_exceed_cap_and_score_stays_bounded(seed in any::<u64>(), plan in wrong_attempts()) {
        let mut test = SequenceTest::seeded(seed);
        for fail in plan {
            if test.phase() == Phase::Result {
                break;
            }
            to_recall(&mut test);
            if fail {
                let first = test.sequence()[0];
                test.input(other_than(first)).unwrap();
            } else {
                play_sequence(&mut test);
            }
            prop_assert!(test.errors() <= 3);
            prop_assert!(test.level() <= 8);
        }
        if test.phase() == Phase::Result {
            let confirmed = test.confirm().unwrap();
            prop_assert!(confirmed <= 100);
        }
    }

    #[test]
    fn termination_formula_matches_definition(level in 1u32..=7, cleared in 0u32..7) {
        let score = cleared.min(level - 1) * 100;
        let expected = ((f64::from(level) - 1.0) * 20.0 + (f64::from(score) / f64::from(level)) * 10.0).round();
        prop_assert_eq!(f64::from(termination_score(level, score)), expected);
    }

    #[test]
    fn confirmation_is_capped(score in 0u32..10_000) {
        let confirmed = confirmation_score(score, 7);
        prop_assert!(confirmed <= 100);
        if score <= 696 {
            prop_assert_eq!(f64::from(confirmed), (f64::from(score) / 7.0).round());
        }
    }
}
