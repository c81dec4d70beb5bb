/// MIDI drum output using midir
/// Sends General MIDI percussion notes for each trigger; no clock or sync messages
use std::sync::Arc;

use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::info;

use crate::error::{Error, Result};
use crate::sequencer::trigger::{PlaybackEvent, PlaybackObserver};
use crate::sequencer::Instrument;

const CLIENT_NAME: &str = "drumgrid MIDI Output";
const PERCUSSION_CHANNEL: u8 = 9;
const VELOCITY: u8 = 100;

pub fn note_on(note: u8, velocity: u8) -> [u8; 3] {
    [0x90 | PERCUSSION_CHANNEL, note & 0x7F, velocity & 0x7F]
}

pub fn note_off(note: u8) -> [u8; 3] {
    [0x80 | PERCUSSION_CHANNEL, note & 0x7F, 0]
}

/// Cloning shares the connection, so the UI can connect a port while the
/// engine holds this as an observer.
#[derive(Clone, Default)]
pub struct MidiOutputDevice {
    connection: Arc<Mutex<Option<MidiOutputConnection>>>,
    sounding: Arc<Mutex<[bool; Instrument::COUNT]>>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&self, port_index: usize) -> Result<()> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| Error::Midi(format!("failed to create MIDI output: {e}")))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| Error::Midi(format!("no MIDI port {port_index}")))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "drumgrid")
            .map_err(|e| Error::Midi(format!("failed to connect: {e}")))?;

        info!(port = %name, "MIDI output connected");
        *self.connection.lock() = Some(connection);
        Ok(())
    }

    /// Connects to the first port whose name contains `name`.
    pub fn connect_by_name(&self, name: &str) -> Result<()> {
        let index = Self::available_ports()
            .iter()
            .position(|p| p.contains(name))
            .ok_or_else(|| Error::Midi(format!("no MIDI port matching {name:?}")))?;
        self.connect(index)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    pub fn disconnect(&self) {
        *self.connection.lock() = None;
    }

    fn send(&self, message: &[u8]) -> Result<()> {
        if let Some(conn) = self.connection.lock().as_mut() {
            conn.send(message)
                .map_err(|e| Error::Playback(format!("MIDI send failed: {e}")))?;
        }
        Ok(())
    }
}

impl PlaybackObserver for MidiOutputDevice {
    fn on_event(&mut self, event: &PlaybackEvent) -> Result<()> {
        match event {
            PlaybackEvent::Trigger { instrument, .. } => {
                self.sounding.lock()[instrument.row()] = true;
                self.send(&note_on(instrument.gm_note(), VELOCITY))
            }
            PlaybackEvent::HighlightOff { row, .. } => {
                let Some(instrument) = Instrument::from_row(*row) else {
                    return Ok(());
                };
                let was_sounding = std::mem::take(&mut self.sounding.lock()[*row]);
                if was_sounding {
                    self.send(&note_off(instrument.gm_note()))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}
