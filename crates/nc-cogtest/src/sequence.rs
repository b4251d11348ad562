//! Color symbols and sequence generation
//!
//! Sequences are drawn uniformly from the first `colors` symbols. The
//! generator is a trait so tests and the simulator can inject a seeded or
//! scripted source.

use crate::error::TestError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// One of the four pads of the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Color {
    /// Every color, by index
    pub const ALL: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];

    /// Pad index (0..=3)
    #[inline]
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Color::Red => 0,
            Color::Blue => 1,
            Color::Green => 2,
            Color::Yellow => 3,
        }
    }

    /// Color for a pad index
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Single-letter key used by the terminal front end
    #[must_use]
    pub fn key(self) -> char {
        match self {
            Color::Red => 'r',
            Color::Blue => 'b',
            Color::Green => 'g',
            Color::Yellow => 'y',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

impl FromStr for Color {
    type Err = TestError;

    /// Accepts a pad index, a key letter or a color name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let color = match s.as_str() {
            "0" | "r" | "red" => Color::Red,
            "1" | "b" | "blue" => Color::Blue,
            "2" | "g" | "green" => Color::Green,
            "3" | "y" | "yellow" => Color::Yellow,
            _ => return Err(TestError::UnknownColor(s)),
        };
        Ok(color)
    }
}

/// Source of test sequences
pub trait SequenceGenerator: Send {
    /// Produce `len` colors drawn from the first `colors` pads
    fn generate(&mut self, len: usize, colors: u8) -> Vec<Color>;
}

/// Uniform random sequences
#[derive(Debug, Clone)]
pub struct RandomSequence {
    rng: StdRng,
}

impl RandomSequence {
    /// Reproducible generator
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl SequenceGenerator for RandomSequence {
    fn generate(&mut self, len: usize, colors: u8) -> Vec<Color> {
        let colors = colors.clamp(1, 4);
        (0..len)
            .map(|_| Color::ALL[usize::from(self.rng.gen_range(0..colors))])
            .collect()
    }
}

/// Replays scripted sequences, falling back to a fixed pattern when exhausted
///
/// Each scripted entry is cut or cycled to the requested length.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSequence {
    script: VecDeque<Vec<Color>>,
}

impl ScriptedSequence {
    /// Create from scripted attempts
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Vec<Color>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Scripted attempts not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SequenceGenerator for ScriptedSequence {
    fn generate(&mut self, len: usize, colors: u8) -> Vec<Color> {
        let colors = usize::from(colors.clamp(1, 4));
        match self.script.pop_front() {
            Some(pattern) if !pattern.is_empty() => pattern.iter().copied().cycle().take(len).collect(),
            _ => (0..len).map(|i| Color::ALL[i % colors]).collect(),
        }
    }
}
