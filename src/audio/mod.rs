//! Audio Module
//!
//! Provides audio file reading, writing, decoding, and sample rate conversion.
//! WAV goes through hound; every other container goes through symphonia.

pub mod wav;
pub mod converter;
pub mod decoder;

use std::path::Path;
use log::debug;
use crate::error::Result;

pub use wav::{WavAudio, AudioFormat, AudioHeader, AudioData, f32_to_i16};
pub use converter::AudioConverter;

/// Load any supported audio file as normalized f32 samples.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<WavAudio> {
    let path = path.as_ref();

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"));

    let mut loaded = None;
    if is_wav && path.is_file() {
        match WavAudio::from_file(path) {
            Ok(audio) => loaded = Some(audio),
            Err(e) => debug!("hound could not read {}: {}, falling back to symphonia", path.display(), e),
        }
    }

    let audio = match loaded {
        Some(audio) => audio,
        None => decoder::decode_file(path)?,
    };
    audio.validate()?;

    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReverbError;
    use ndarray::Array1;
    use tempfile::TempDir;

    #[test]
    fn test_load_wav() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.WAV");
        WavAudio::new_mono(8000, Array1::from(vec![0.5; 100]), AudioFormat::Int16)
            .save_to_file(&path)
            .unwrap();

        let audio = load_audio(&path).unwrap();
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.total_frames(), 100);
        assert_eq!(audio.format(), AudioFormat::Int16);
    }

    #[test]
    fn test_load_rejects_non_finite_samples() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.wav");
        WavAudio::new_mono(8000, Array1::from(vec![0.25, f32::NAN, -0.25]), AudioFormat::Float32)
            .save_to_file(&path)
            .unwrap();

        let result = load_audio(&path);
        assert!(matches!(result, Err(ReverbError::Audio { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_audio("/nonexistent/impulse.wav");
        assert!(matches!(result, Err(ReverbError::Decode { .. })));
    }
}
