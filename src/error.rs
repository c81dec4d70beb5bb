/// Error type shared by the sequencer core and its audio/MIDI collaborators
use thiserror::Error;

use crate::sequencer::Instrument;

#[derive(Error, Debug)]
pub enum Error {
    /// A grid read or toggle addressed a cell outside the grid.
    #[error("cell ({row}, {step}) is outside the {rows}x{steps} grid")]
    OutOfRange {
        row: usize,
        step: usize,
        rows: usize,
        steps: usize,
    },

    /// The instrument's sample has not finished loading.
    #[error("sample for {0} is not loaded yet")]
    AssetNotReady(Instrument),

    /// An audio or MIDI sink rejected a trigger.
    #[error("playback failed: {0}")]
    Playback(String),

    #[error("audio device: {0}")]
    AudioDevice(String),

    #[error("MIDI: {0}")]
    Midi(String),

    #[error("WAV: {0}")]
    Wav(#[from] hound::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
