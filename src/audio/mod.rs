/// Audio output using cpal
/// Every trigger starts its own voice, so retriggers overlap instead of cutting off
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::sequencer::trigger::{PlaybackEvent, PlaybackObserver};

pub mod sample_bank;

pub use sample_bank::{SampleBank, SampleBuffer, SampleLoader, StereoFrame};

const COMMAND_CAPACITY: usize = 256;

enum AudioCommand {
    Play(Arc<SampleBuffer>),
}

struct Voice {
    sample: Arc<SampleBuffer>,
    pos: usize,
}

/// Sums all sounding voices into interleaved output.
#[derive(Default)]
struct Mixer {
    voices: Vec<Voice>,
}

impl Mixer {
    fn with_capacity(voices: usize) -> Self {
        Self {
            voices: Vec::with_capacity(voices),
        }
    }

    fn play(&mut self, sample: Arc<SampleBuffer>) {
        self.voices.push(Voice { sample, pos: 0 });
    }

    fn render(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for out in data.chunks_mut(channels) {
            let mut mix = StereoFrame::default();
            for voice in &mut self.voices {
                if let Some(frame) = voice.sample.frames().get(voice.pos) {
                    mix.left += frame.left;
                    mix.right += frame.right;
                    voice.pos += 1;
                }
            }

            let left = mix.left.clamp(-1.0, 1.0);
            let right = mix.right.clamp(-1.0, 1.0);
            match out {
                [mono] => *mono = (left + right) * 0.5,
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.fill(0.0);
                }
                [] => {}
            }
        }
        self.voices.retain(|v| v.pos < v.sample.len());
    }

    fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

pub struct AudioOutput {
    _stream: cpal::Stream,
    tx: Sender<AudioCommand>,
    sample_rate: u32,
}

impl AudioOutput {
    /// Opens the default output device.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioDevice("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::AudioDevice(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels());
        let (tx, rx) = bounded(COMMAND_CAPACITY);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream(&device, &config.into(), rx, channels)?,
            other => {
                return Err(Error::AudioDevice(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        };
        stream
            .play()
            .map_err(|e| Error::AudioDevice(e.to_string()))?;

        info!(sample_rate, channels, "audio output ready");
        Ok(Self {
            _stream: stream,
            tx,
            sample_rate,
        })
    }

    fn build_stream(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        rx: Receiver<AudioCommand>,
        channels: usize,
    ) -> Result<cpal::Stream> {
        let mut mixer = Mixer::with_capacity(64);

        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    while let Ok(AudioCommand::Play(sample)) = rx.try_recv() {
                        mixer.play(sample);
                    }
                    mixer.render(data, channels);
                },
                |err| warn!(error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| Error::AudioDevice(e.to_string()))
    }

    /// Rate that loaded samples should be resampled to.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn play(&self, sample: Arc<SampleBuffer>) -> Result<()> {
        self.tx
            .try_send(AudioCommand::Play(sample))
            .map_err(|e| match e {
                TrySendError::Full(_) => Error::Playback("audio command queue full".into()),
                TrySendError::Disconnected(_) => Error::Playback("audio stream closed".into()),
            })
    }
}

impl PlaybackObserver for AudioOutput {
    fn on_event(&mut self, event: &PlaybackEvent) -> Result<()> {
        match event {
            PlaybackEvent::Trigger { sample, .. } => self.play(Arc::clone(sample)),
            _ => Ok(()),
        }
    }
}
