/// Decoded drum samples, keyed by instrument
/// Samples are decoded on background threads during startup and handed back
/// over a channel. Once an instrument's sample is in the bank it is never
/// replaced; lookups for instruments still loading report `AssetNotReady`.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sequencer::Instrument;

/// One stereo frame of audio
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

#[derive(Clone)]
pub struct SampleBuffer {
    frames: Vec<StereoFrame>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn from_frames(frames: Vec<StereoFrame>, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate,
        }
    }

    /// Decodes a WAV file and resamples it to `target_rate`.
    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        let channels = usize::from(spec.channels.max(1));
        let frames: Vec<StereoFrame> = samples
            .chunks_exact(channels)
            .map(|c| StereoFrame {
                left: c[0],
                right: c.get(1).copied().unwrap_or(c[0]),
            })
            .collect();

        let frames = resample_linear(&frames, spec.sample_rate, target_rate);
        debug!(path = %path.display(), frames = frames.len(), "decoded sample");
        Ok(Self {
            frames,
            sample_rate: target_rate,
        })
    }

    pub fn frames(&self) -> &[StereoFrame] {
        &self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("frames", &self.frames.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames[frames.len() - 1];

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            if idx + 1 >= frames.len() {
                return last;
            }
            let frac = (src_pos - idx as f64) as f32;
            let (a, b) = (frames[idx], frames[idx + 1]);
            StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            }
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct SampleBank {
    entries: HashMap<Instrument, Arc<SampleBuffer>>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the instrument's sample. Returns false, keeping the existing
    /// entry, if the instrument already has one.
    pub fn insert(&mut self, instrument: Instrument, buffer: SampleBuffer) -> bool {
        if self.entries.contains_key(&instrument) {
            warn!(%instrument, "sample already loaded, keeping the first one");
            return false;
        }
        self.entries.insert(instrument, Arc::new(buffer));
        true
    }

    pub fn get(&self, instrument: Instrument) -> Result<Arc<SampleBuffer>> {
        self.entries
            .get(&instrument)
            .cloned()
            .ok_or(Error::AssetNotReady(instrument))
    }

    pub fn is_ready(&self, instrument: Instrument) -> bool {
        self.entries.contains_key(&instrument)
    }
}

type LoadResult = (Instrument, Result<SampleBuffer>);

/// Decodes samples on background threads and hands them to a `SampleBank`.
pub struct SampleLoader {
    rx: Receiver<LoadResult>,
    pending: usize,
}

impl SampleLoader {
    pub fn spawn(requests: Vec<(Instrument, PathBuf)>, target_rate: u32) -> Self {
        let (tx, rx) = unbounded();
        let pending = requests.len();

        for (instrument, path) in requests {
            let tx = tx.clone();
            thread::spawn(move || {
                let result = SampleBuffer::load_wav(&path, target_rate);
                let _ = tx.send((instrument, result));
            });
        }

        Self { rx, pending }
    }

    /// Moves every finished load into `bank`. Returns how many were added.
    pub fn drain_into(&mut self, bank: &mut SampleBank) -> usize {
        let mut added = 0;
        while let Ok((instrument, result)) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            match result {
                Ok(buffer) => {
                    if bank.insert(instrument, buffer) {
                        info!(%instrument, "sample ready");
                        added += 1;
                    }
                }
                Err(e) => warn!(%instrument, error = %e, "sample failed to load"),
            }
        }
        added
    }

    pub fn is_finished(&self) -> bool {
        self.pending == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::{Duration, Instant};

    fn frame(v: f32) -> StereoFrame {
        StereoFrame { left: v, right: -v }
    }

    fn write_mono_wav(path: &Path, rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_entry_is_not_ready() {
        let bank = SampleBank::new();
        assert!(matches!(
            bank.get(Instrument::Snare),
            Err(Error::AssetNotReady(Instrument::Snare))
        ));
        assert!(!bank.is_ready(Instrument::Snare));
    }

    #[test]
    fn test_first_insert_wins() {
        let mut bank = SampleBank::new();
        assert!(bank.insert(Instrument::Kick, SampleBuffer::from_frames(vec![frame(0.5)], 44100)));
        assert!(!bank.insert(Instrument::Kick, SampleBuffer::from_frames(vec![], 44100)));
        assert_eq!(bank.get(Instrument::Kick).unwrap().len(), 1);
    }

    #[test]
    fn test_resample_doubles_length() {
        let frames = vec![frame(0.0), frame(1.0), frame(0.0)];
        let out = resample_linear(&frames, 22050, 44100);
        assert_eq!(out.len(), 6);
        assert_relative_eq!(out[1].left, 0.5);
        assert_relative_eq!(out[2].left, 1.0);
        assert_relative_eq!(out[5].right, 0.0);
    }

    #[test]
    fn test_resample_same_rate_is_copy() {
        let frames = vec![frame(0.25), frame(0.75)];
        assert_eq!(resample_linear(&frames, 48000, 48000), frames);
    }

    #[test]
    fn test_load_mono_wav_duplicates_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        write_mono_wav(&path, 44100, &[0, 16384, -16384]);

        let buffer = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.sample_rate(), 44100);
        assert_relative_eq!(buffer.frames()[1].left, 0.5);
        assert_relative_eq!(buffer.frames()[1].right, 0.5);
        assert_relative_eq!(buffer.frames()[2].left, -0.5);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = SampleBuffer::load_wav(&dir.path().join("nope.wav"), 44100);
        assert!(matches!(result, Err(Error::Wav(_))));
    }

    #[test]
    fn test_loader_fills_bank_and_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let kick = dir.path().join("kick.wav");
        write_mono_wav(&kick, 44100, &[100; 64]);

        let mut loader = SampleLoader::spawn(
            vec![
                (Instrument::Kick, kick),
                (Instrument::Snare, dir.path().join("missing.wav")),
            ],
            44100,
        );
        let mut bank = SampleBank::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !loader.is_finished() && Instant::now() < deadline {
            loader.drain_into(&mut bank);
            thread::sleep(Duration::from_millis(1));
        }

        assert!(loader.is_finished());
        assert!(bank.is_ready(Instrument::Kick));
        assert!(!bank.is_ready(Instrument::Snare));
        assert_eq!(bank.get(Instrument::Kick).unwrap().len(), 64);
    }
}
