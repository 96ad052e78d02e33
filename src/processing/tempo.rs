//! Tempo adjustment
//!
//! Decodes the input and stretches it to `1 / speed_factor` of its duration.
//! The result is always stereo; mono sources are duplicated into both channels.

use std::path::Path;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1};
use crate::audio::{load_audio, AudioConverter, AudioData, AudioFormat, WavAudio};
use crate::config::{StretchMode, TempoConfig};
use crate::error::{ReverbError, Result};

/// Playback speed multiplier. Below 1.0 slows down, above 1.0 speeds up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedFactor(f64);

impl SpeedFactor {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ReverbError::config(format!("Speed factor must be a positive number, got {}", value)));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_unity(self) -> bool {
        (self.0 - 1.0).abs() < f64::EPSILON
    }

    /// Frame count after stretching `frames` input frames.
    pub fn stretched_len(self, frames: usize) -> usize {
        (frames as f64 / self.0).round() as usize
    }
}

impl Default for SpeedFactor {
    fn default() -> Self {
        Self(1.0)
    }
}

/// Output of the tempo stage.
#[derive(Debug, Clone)]
pub struct TempoAdjusted {
    pub audio: WavAudio,
    /// Duration of the decoded source before stretching, in seconds.
    pub source_duration: f64,
}

/// Decode `input` and stretch it according to `config`.
pub fn adjust_tempo(input: &Path, config: &TempoConfig) -> Result<TempoAdjusted> {
    let source = load_audio(input)?;
    info!(
        "Loaded {}: {:.2}s, {} Hz, {} ch, {}",
        input.display(), source.duration(), source.sample_rate(), source.channels(), source.format().name()
    );

    let speed = SpeedFactor::new(config.speed_factor)?;
    let audio = stretch(&source, speed, config.mode, config.frame_ms)?;

    Ok(TempoAdjusted {
        audio,
        source_duration: source.duration(),
    })
}

/// Time-stretch already decoded audio. Output is stereo Float32.
pub fn stretch(audio: &WavAudio, speed: SpeedFactor, mode: StretchMode, frame_ms: u32) -> Result<WavAudio> {
    let stereo = audio.data().to_stereo();
    let frames = stereo.nrows();

    let stretched = if speed.is_unity() {
        stereo
    } else {
        let new_length = speed.stretched_len(frames).max(1);
        debug!("Stretching {} -> {} frames ({:?}, speed {})", frames, new_length, mode, speed.value());

        match mode {
            StretchMode::Resample => {
                AudioConverter::resample_data(&AudioData::Stereo(stereo), new_length, 1.0 / speed.value())?
                    .to_stereo()
            }
            StretchMode::Overlap => {
                let frame_len = frame_length(audio.sample_rate(), frame_ms);
                let channels = [stereo.column(0), stereo.column(1)];
                let positions = analysis_positions(&channels, speed.value(), frame_len, new_length);

                let mut out = Array2::zeros((new_length, 2));
                for (ch, channel) in channels.iter().enumerate() {
                    let stretched = overlap_add(channel.view(), &positions, frame_len, new_length);
                    out.column_mut(ch).assign(&stretched);
                }
                out
            }
        }
    };

    WavAudio::new_stereo(audio.sample_rate(), stretched, AudioFormat::Float32)
}

/// Even frame length in samples, at least 2.
fn frame_length(sample_rate: u32, frame_ms: u32) -> usize {
    let samples = sample_rate as usize * frame_ms as usize / 1000;
    (samples / 2).max(1) * 2
}

/// Hann window shifted by half a sample so no coefficient is zero.
/// Sums to 1.0 at 50% overlap.
fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * (i as f64 + 0.5) / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Input start of every analysis frame (WSOLA).
///
/// Frame `k` is laid down at `k * hop` in the output and nominally read from
/// `k * hop * speed`, with `hop = frame_len / 2`. Within `hop / 2` of that
/// point the start is moved to where the input best matches the natural
/// continuation of the previous frame, so overlapping frames add in phase.
/// All channels share the same positions.
fn analysis_positions(channels: &[ArrayView1<f32>], speed: f64, frame_len: usize, out_len: usize) -> Vec<usize> {
    let hop_out = (frame_len / 2).max(1);
    let hop_in = hop_out as f64 * speed;
    let tolerance = hop_out / 2;
    let input_len = channels.first().map_or(0, |c| c.len());
    let last_start = input_len.saturating_sub(frame_len);

    let frames = out_len.div_ceil(hop_out);
    let mut positions: Vec<usize> = Vec::with_capacity(frames);
    for frame in 0..frames {
        let nominal = (frame as f64 * hop_in).round() as usize;
        let start = match positions.last() {
            Some(&prev) if tolerance > 0 => {
                let lo = nominal.saturating_sub(tolerance);
                let hi = (nominal + tolerance).min(last_start.max(nominal));
                best_match(channels, prev + hop_out, nominal, lo..=hi, hop_out)
            }
            _ => nominal,
        };
        positions.push(start);
    }
    positions
}

/// Candidate start in `range` whose first `len` samples correlate best with
/// the `len` samples at `target`. `nominal` wins ties.
fn best_match(
    channels: &[ArrayView1<f32>],
    target: usize,
    nominal: usize,
    range: std::ops::RangeInclusive<usize>,
    len: usize,
) -> usize {
    let mut best = nominal;
    let mut best_score = similarity(channels, target, nominal, len);
    for candidate in range {
        let score = similarity(channels, target, candidate, len);
        if score > best_score + 1e-5 {
            best = candidate;
            best_score = score;
        }
    }
    best
}

/// Normalized cross-correlation of two `len`-sample stretches, summed over
/// channels. Samples past the end count as silence.
fn similarity(channels: &[ArrayView1<f32>], a: usize, b: usize, len: usize) -> f32 {
    let mut dot = 0.0f32;
    let mut energy_a = 0.0f32;
    let mut energy_b = 0.0f32;
    for channel in channels {
        for k in 0..len {
            let x = channel.get(a + k).copied().unwrap_or(0.0);
            let y = channel.get(b + k).copied().unwrap_or(0.0);
            dot += x * y;
            energy_a += x * x;
            energy_b += y * y;
        }
    }

    let norm = (energy_a * energy_b).sqrt();
    if norm > 1e-12 { dot / norm } else { 0.0 }
}

/// Overlap-add of one channel.
///
/// Frame `k` of `frame_len` samples is read at `positions[k]` and laid down
/// at `k * frame_len / 2`. The output is divided by the accumulated window
/// weight, so overlapping frames keep unit gain.
fn overlap_add(input: ArrayView1<f32>, positions: &[usize], frame_len: usize, out_len: usize) -> Array1<f32> {
    let hop_out = (frame_len / 2).max(1);
    let window = hann_window(frame_len);

    let mut output = Array1::<f32>::zeros(out_len);
    let mut weight = Array1::<f32>::zeros(out_len);

    for (frame, &in_start) in positions.iter().enumerate() {
        let out_start = frame * hop_out;
        if out_start >= out_len {
            break;
        }

        for (k, &w) in window.iter().enumerate() {
            let o = out_start + k;
            if o >= out_len {
                break;
            }
            let x = input.get(in_start + k).copied().unwrap_or(0.0);
            output[o] += x * w;
            weight[o] += w;
        }
    }

    output.zip_mut_with(&weight, |o, &w| {
        if w > 1e-6 {
            *o /= w;
        }
    });
    output
}
