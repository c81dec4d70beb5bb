/// Step trigger - turns one step of the grid into audio triggers and highlights
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Grid, Instrument};
use crate::audio::{SampleBank, SampleBuffer};
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// The transport fired this step.
    StepAdvanced(usize),
    HighlightOn { row: usize, step: usize },
    HighlightOff { row: usize, step: usize },
    /// Start a new, independent voice of `sample`.
    Trigger {
        instrument: Instrument,
        step: usize,
        sample: Arc<SampleBuffer>,
    },
}

/// Anything that reacts to playback: the audio engine, a MIDI port, a renderer.
///
/// Errors are logged and dropped by the caller; they never reach the transport.
pub trait PlaybackObserver {
    fn on_event(&mut self, event: &PlaybackEvent) -> Result<()>;
}

#[derive(Default)]
pub struct StepTrigger {
    observers: Vec<Box<dyn PlaybackObserver>>,
    pending: Vec<PlaybackEvent>,
}

impl StepTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    /// Highlights `step` on every row and triggers the sample of every active
    /// row whose sample is loaded. Returns the rows that were highlighted; the
    /// caller owes each of them a `HighlightOff`.
    pub fn fire_step(&mut self, step: usize, grid: &Grid, bank: &SampleBank) -> Vec<usize> {
        let mut highlighted = Vec::with_capacity(grid.rows());

        for row in 0..grid.rows() {
            let active = match grid.is_active(row, step) {
                Ok(active) => active,
                Err(e) => {
                    warn!(row, step, error = %e, "step outside grid");
                    continue;
                }
            };

            self.emit(PlaybackEvent::HighlightOn { row, step });
            highlighted.push(row);

            if !active {
                continue;
            }
            let Some(instrument) = Instrument::from_row(row) else {
                continue;
            };
            match bank.get(instrument) {
                Ok(sample) => self.emit(PlaybackEvent::Trigger {
                    instrument,
                    step,
                    sample,
                }),
                Err(e) => debug!(row, step, error = %e, "skipping audio"),
            }
        }

        highlighted
    }

    /// Hands `event` to every observer, then queues it for `drain`.
    pub fn emit(&mut self, event: PlaybackEvent) {
        for observer in &mut self.observers {
            if let Err(e) = observer.on_event(&event) {
                warn!(?event, error = %e, "playback observer failed");
            }
        }
        self.pending.push(event);
    }

    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending)
    }
}
