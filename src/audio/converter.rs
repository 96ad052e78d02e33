//! Audio Format Converter - sample rate conversion

use ndarray::{Array1, Array2, ArrayView1};
use crate::audio::{AudioData, WavAudio};
use crate::error::{ReverbError, Result};

pub struct AudioConverter;

impl AudioConverter {
    /// Convert sample rate using linear interpolation
    pub fn convert_sample_rate(audio: &WavAudio, target_sample_rate: u32) -> Result<WavAudio> {
        if target_sample_rate == 0 {
            return Err(ReverbError::audio("Target sample rate cannot be 0"));
        }
        if audio.sample_rate() == target_sample_rate {
            return Ok(audio.clone());
        }

        let ratio = target_sample_rate as f64 / audio.sample_rate() as f64;
        let new_length = ((audio.data().len() as f64 * ratio) as usize).max(1);

        let new_data = Self::resample_data(audio.data(), new_length, ratio)?;

        let mut new_audio = audio.clone();
        new_audio.header.sample_rate = target_sample_rate;
        new_audio.header.total_frames = new_length as u32;
        new_audio.header.duration = new_length as f64 / target_sample_rate as f64;
        new_audio.data = new_data;
        Ok(new_audio)
    }

    /// Re-sample every channel onto a grid of `new_length` frames.
    /// `ratio` is output frames per input frame.
    pub fn resample_data(data: &AudioData, new_length: usize, ratio: f64) -> Result<AudioData> {
        Ok(match data {
            AudioData::Mono(data) => {
                AudioData::Mono(Self::resample_mono(data.view(), new_length, ratio)?)
            }
            AudioData::Stereo(data) => {
                let new_left = Self::resample_mono(data.column(0), new_length, ratio)?;
                let new_right = Self::resample_mono(data.column(1), new_length, ratio)?;
                let mut stereo = Array2::zeros((new_length, 2));
                stereo.column_mut(0).assign(&new_left);
                stereo.column_mut(1).assign(&new_right);
                AudioData::Stereo(stereo)
            }
        })
    }

    pub fn resample_mono(data: ArrayView1<f32>, new_length: usize, ratio: f64) -> Result<Array1<f32>> {
        if data.is_empty() {
            return Err(ReverbError::audio("Input data is empty"));
        }
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(ReverbError::audio(format!("Invalid resampling ratio: {}", ratio)));
        }

        let old_length = data.len();
        let mut new_data = Array1::zeros(new_length);

        for i in 0..new_length {
            let old_pos = i as f64 / ratio;
            let old_index = old_pos.floor() as usize;
            let fraction = old_pos - old_index as f64;

            new_data[i] = if old_index >= old_length - 1 {
                data[old_length - 1]
            } else {
                data[old_index] + (data[old_index + 1] - data[old_index]) * fraction as f32
            };
        }

        Ok(new_data)
    }
}
