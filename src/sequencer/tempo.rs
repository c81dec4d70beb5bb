/// Tempo control and the step interval law
use std::time::Duration;

use tracing::debug;

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 240;
pub const DEFAULT_BPM: u32 = 120;

/// How long a step stays highlighted after it fires.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(150);

const NANOS_PER_MINUTE: u64 = 60_000_000_000;

/// Delay between one tick and the next at `bpm`.
///
/// The highlight hold is taken out of the beat length, and anything at or
/// below zero means "fire immediately". `bpm` is not clamped here so callers
/// outside the tempo range still get a defined interval.
pub fn step_interval(bpm: u32) -> Duration {
    let beat = Duration::from_nanos(NANOS_PER_MINUTE / u64::from(bpm.max(1)));
    beat.saturating_sub(HIGHLIGHT_DURATION)
}

pub fn clamp_bpm(requested: i64) -> u32 {
    requested.clamp(i64::from(MIN_BPM), i64::from(MAX_BPM)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoController {
    bpm: u32,
}

impl TempoController {
    pub fn new(bpm: i64) -> Self {
        Self { bpm: clamp_bpm(bpm) }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Stores the requested tempo clamped into range and returns what was stored.
    pub fn set_tempo(&mut self, requested: i64) -> u32 {
        let bpm = clamp_bpm(requested);
        if bpm != self.bpm {
            debug!(requested, bpm, "tempo changed");
        }
        self.bpm = bpm;
        bpm
    }

    pub fn interval(&self) -> Duration {
        step_interval(self.bpm)
    }
}

impl Default for TempoController {
    fn default() -> Self {
        Self { bpm: DEFAULT_BPM }
    }
}
