//! Normalization and 16-bit WAV export

use std::path::Path;
use log::{info, warn};
use ndarray::Array1;
use crate::audio::{AudioFormat, WavAudio};
use crate::error::{ReverbError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub frames: usize,
    pub sample_rate: u32,
    /// Peak absolute value before normalization.
    pub source_peak: f32,
    /// Gain applied during normalization.
    pub gain: f32,
}

/// Scale `signal` in place so its peak equals `peak_level`.
/// Returns `(source_peak, gain)`. A silent signal is left untouched with gain 1.0.
pub fn normalize_peak(signal: &mut Array1<f32>, peak_level: f32) -> Result<(f32, f32)> {
    let peak = signal.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));

    if !peak.is_finite() || signal.iter().any(|x| !x.is_finite()) {
        return Err(ReverbError::processing("Signal contains non-finite samples"));
    }

    if peak == 0.0 {
        warn!("Signal is silent, writing zeros without normalization");
        return Ok((0.0, 1.0));
    }

    let gain = peak_level / peak;
    signal.mapv_inplace(|x| x * gain);
    Ok((peak, gain))
}

/// Normalize `signal` to `peak_level` of full scale and write it as mono 16-bit PCM.
pub fn save_to_file(mut signal: Array1<f32>, sample_rate: u32, path: &Path, peak_level: f32) -> Result<ExportSummary> {
    if signal.is_empty() {
        return Err(ReverbError::processing("Nothing to export: signal is empty"));
    }

    let (source_peak, gain) = normalize_peak(&mut signal, peak_level)?;
    let frames = signal.len();

    let audio = WavAudio::new_mono(sample_rate, signal, AudioFormat::Int16);
    audio.save_to_file(path)?;
    info!("Wrote {} frames at {} Hz to {}", frames, sample_rate, path.display());

    Ok(ExportSummary {
        frames,
        sample_rate,
        source_peak,
        gain,
    })
}
