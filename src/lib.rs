/// drumgrid - a step-sequencer drum machine core
///
/// This library provides the pieces of a fixed-grid drum machine:
/// - Grid of instrument rows by steps, toggled at any time
/// - Transport with a tempo-derived step loop on a single-threaded virtual clock
/// - Step triggers that fan out to observers (audio, MIDI, renderers)
/// - Sample loading and an overlapping-voice audio output
pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types
pub use audio::{AudioOutput, SampleBank, SampleBuffer, SampleLoader, StereoFrame};
pub use config::Config;
pub use error::{Error, Result};
pub use midi::MidiOutputDevice;
pub use sequencer::layout::{steps_per_row, LayoutMode};
pub use sequencer::playback::PlaybackEngine;
pub use sequencer::tempo::{step_interval, TempoController, HIGHLIGHT_DURATION};
pub use sequencer::transport::{Transport, TransportKey, TransportState};
pub use sequencer::trigger::{PlaybackEvent, PlaybackObserver, StepTrigger};
pub use sequencer::{Grid, Instrument};
