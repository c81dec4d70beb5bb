/// Core sequencer logic - instrument rows, grid state and the transport loop
/// The grid is a fixed rows x steps matrix; toggling never resizes it
use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};

pub mod layout;
pub mod playback;
pub mod tempo;
pub mod transport;
pub mod trigger;

/// One drum lane of the grid. Rows are laid out in `Instrument::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    Kick,
    Snare,
    HighHat,
}

impl Instrument {
    pub const COUNT: usize = 3;
    pub const ALL: [Instrument; Self::COUNT] =
        [Instrument::Kick, Instrument::Snare, Instrument::HighHat];

    pub fn from_row(row: usize) -> Option<Self> {
        Self::ALL.get(row).copied()
    }

    pub fn row(self) -> usize {
        match self {
            Instrument::Kick => 0,
            Instrument::Snare => 1,
            Instrument::HighHat => 2,
        }
    }

    /// Stable identifier, also used as the row's visual tag.
    pub fn id(self) -> &'static str {
        match self {
            Instrument::Kick => "kick",
            Instrument::Snare => "snare",
            Instrument::HighHat => "high-hat",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Instrument::Kick => "Kick",
            Instrument::Snare => "Snare",
            Instrument::HighHat => "High-hat",
        }
    }

    /// Sample path relative to the sample directory.
    pub fn default_sample(self) -> &'static str {
        match self {
            Instrument::Kick => "kick/kick_1.wav",
            Instrument::Snare => "snare/snare_1.wav",
            Instrument::HighHat => "high-hat/high-hat_1.wav",
        }
    }

    /// General MIDI percussion key
    pub fn gm_note(self) -> u8 {
        match self {
            Instrument::Kick => 36,
            Instrument::Snare => 38,
            Instrument::HighHat => 42,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Vec<bool>>,
    rows: usize,
    steps: usize,
}

impl Grid {
    pub fn new(rows: usize, steps: usize) -> Self {
        Self {
            cells: vec![vec![false; steps]; rows],
            rows,
            steps,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_active(&self, row: usize, step: usize) -> Result<bool> {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(step))
            .copied()
            .ok_or_else(|| self.out_of_range(row, step))
    }

    /// Flips the cell and returns its new state.
    pub fn toggle(&mut self, row: usize, step: usize) -> Result<bool> {
        let err = self.out_of_range(row, step);
        let cell = self
            .cells
            .get_mut(row)
            .and_then(|cells| cells.get_mut(step))
            .ok_or(err)?;
        *cell = !*cell;
        Ok(*cell)
    }

    fn out_of_range(&self, row: usize, step: usize) -> Error {
        Error::OutOfRange {
            row,
            step,
            rows: self.rows,
            steps: self.steps,
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(Instrument::COUNT, layout::MAX_STEPS_PER_ROW)
    }
}
