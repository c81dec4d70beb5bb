/// Transport state - play/stop, the step index and the tempo
/// Only the transport's own operations write this state
use std::time::Duration;

use tracing::info;

use super::tempo::TempoController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportState {
    pub is_playing: bool,
    pub current_step: usize,
    pub tempo_bpm: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Transport {
    is_playing: bool,
    current_step: usize,
    tempo: TempoController,
}

impl Transport {
    pub fn new(tempo: TempoController) -> Self {
        Self {
            tempo,
            ..Self::default()
        }
    }

    pub fn state(&self) -> TransportState {
        TransportState {
            is_playing: self.is_playing,
            current_step: self.current_step,
            tempo_bpm: self.tempo.bpm(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn bpm(&self) -> u32 {
        self.tempo.bpm()
    }

    /// Returns false if already playing.
    pub fn start(&mut self) -> bool {
        if self.is_playing {
            return false;
        }
        self.is_playing = true;
        info!(step = self.current_step, bpm = self.tempo.bpm(), "transport started");
        true
    }

    /// Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.is_playing {
            return false;
        }
        self.is_playing = false;
        self.current_step = 0;
        info!("transport stopped");
        true
    }

    /// Moves to the next step, wrapping at `steps_per_row`, and returns the step
    /// that was current before the move.
    pub fn advance(&mut self, steps_per_row: usize) -> usize {
        let step = self.current_step;
        self.current_step = (step + 1) % steps_per_row.max(1);
        step
    }

    pub fn set_tempo(&mut self, requested: i64) -> u32 {
        self.tempo.set_tempo(requested)
    }

    /// Delay before the next tick at the current tempo.
    pub fn interval(&self) -> Duration {
        self.tempo.interval()
    }

    pub fn button_label(&self) -> &'static str {
        if self.is_playing {
            "Stop"
        } else {
            "Play"
        }
    }
}

/// Keys that toggle the transport: the space character and its legacy name.
pub struct TransportKey;

impl TransportKey {
    pub fn matches(key: &str) -> bool {
        key == " " || key == "Spacebar"
    }
}
