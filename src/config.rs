/// Startup configuration - tempo, grid width, sample paths and MIDI port
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::sequencer::layout::MAX_STEPS_PER_ROW;
use crate::sequencer::tempo::{clamp_bpm, DEFAULT_BPM};
use crate::sequencer::Instrument;

/// Read from an optional TOML file; every key has a default.
///
/// ```toml
/// tempo_bpm = 96
/// sample_dir = "audio"
/// midi_port = "IAC"
///
/// [samples]
/// kick = "kick/kick_2.wav"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tempo_bpm: i64,
    /// Columns in the grid, at most one full row.
    pub steps: usize,
    pub sample_dir: PathBuf,
    /// Per-instrument overrides, relative to `sample_dir`.
    pub samples: HashMap<Instrument, PathBuf>,
    pub midi_port: Option<String>,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tempo_bpm: i64::from(DEFAULT_BPM),
            steps: MAX_STEPS_PER_ROW,
            sample_dir: PathBuf::from("audio"),
            samples: HashMap::new(),
            midi_port: None,
            window_width: 900.0,
            window_height: 360.0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.tempo_bpm = i64::from(clamp_bpm(config.tempo_bpm));
        config.steps = config.steps.clamp(1, MAX_STEPS_PER_ROW);
        Ok(config)
    }

    pub fn sample_path(&self, instrument: Instrument) -> PathBuf {
        let relative = self
            .samples
            .get(&instrument)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(instrument.default_sample()));
        self.sample_dir.join(relative)
    }

    /// Every instrument with the file its sample is loaded from.
    pub fn sample_requests(&self) -> Vec<(Instrument, PathBuf)> {
        Instrument::ALL
            .iter()
            .map(|&instrument| (instrument, self.sample_path(instrument)))
            .collect()
    }
}
