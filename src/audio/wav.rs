//! WAV audio file processing

use std::path::Path;
use std::fs::File;
use std::io::BufReader;
use hound::{WavReader, WavWriter, SampleFormat};
use ndarray::{Array1, Array2};
use log::warn;
use crate::error::{ReverbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Int8,
    Int16,
    Int24,
    Int32,
    Float32,
}

impl AudioFormat {
    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Int8 => "int8",
            AudioFormat::Int16 => "int16",
            AudioFormat::Int24 => "int24",
            AudioFormat::Int32 => "int32",
            AudioFormat::Float32 => "float32",
        }
    }

    pub fn bytes_per_sample(&self) -> u16 {
        match self {
            AudioFormat::Int8 => 1,
            AudioFormat::Int16 => 2,
            AudioFormat::Int24 => 3,
            AudioFormat::Int32 | AudioFormat::Float32 => 4,
        }
    }

    pub fn to_sample_format(self) -> SampleFormat {
        match self {
            AudioFormat::Float32 => SampleFormat::Float,
            _ => SampleFormat::Int,
        }
    }

    /// Largest positive integer value for integer formats.
    fn int_full_scale(self) -> f32 {
        match self {
            AudioFormat::Int8 => i8::MAX as f32,
            AudioFormat::Int16 => i16::MAX as f32,
            AudioFormat::Int24 => 8_388_607.0,
            AudioFormat::Int32 => i32::MAX as f32,
            AudioFormat::Float32 => 1.0,
        }
    }

    fn from_spec(spec: &hound::WavSpec) -> Result<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 8) => Ok(AudioFormat::Int8),
            (SampleFormat::Int, 16) => Ok(AudioFormat::Int16),
            (SampleFormat::Int, 24) => Ok(AudioFormat::Int24),
            (SampleFormat::Int, 32) => Ok(AudioFormat::Int32),
            (SampleFormat::Float, 32) => Ok(AudioFormat::Float32),
            (format, bits) => Err(ReverbError::audio(
                format!("Unsupported WAV format: {} bits, {:?}", bits, format)
            )),
        }
    }
}

/// Quantize a float sample to 16-bit PCM, truncating toward zero.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[derive(Debug, Clone)]
pub struct AudioHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    /// Frames per channel.
    pub total_frames: u32,
    pub bits_per_sample: u16,
    pub duration: f64,
}

impl AudioHeader {
    pub fn new(sample_rate: u32, channels: u16, format: AudioFormat, total_frames: u32) -> Self {
        let bits_per_sample = format.bytes_per_sample() * 8;
        let duration = if sample_rate > 0 {
            total_frames as f64 / sample_rate as f64
        } else {
            0.0
        };

        Self {
            sample_rate,
            channels,
            format,
            total_frames,
            bits_per_sample,
            duration,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ReverbError::audio("Sample rate cannot be 0"));
        }

        if self.channels == 0 || self.channels > 2 {
            return Err(ReverbError::audio("Channel count must be 1 or 2"));
        }

        if self.total_frames == 0 {
            return Err(ReverbError::audio("Total frames cannot be 0"));
        }

        Ok(())
    }

    pub fn to_wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: self.format.to_sample_format(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WavAudio {
    pub header: AudioHeader,
    pub data: AudioData,
}

/// Sample storage, normalized to [-1.0, 1.0]. Stereo is frames x 2.
#[derive(Debug, Clone)]
pub enum AudioData {
    Mono(Array1<f32>),
    Stereo(Array2<f32>),
}

impl AudioData {
    /// Number of frames.
    pub fn len(&self) -> usize {
        match self {
            AudioData::Mono(data) => data.len(),
            AudioData::Stereo(data) => data.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channels(&self) -> u16 {
        match self {
            AudioData::Mono(_) => 1,
            AudioData::Stereo(_) => 2,
        }
    }

    /// Down-mix to one channel by averaging left and right.
    pub fn to_mono(&self) -> Array1<f32> {
        match self {
            AudioData::Mono(data) => data.clone(),
            AudioData::Stereo(data) => {
                (&data.column(0) + &data.column(1)) * 0.5
            }
        }
    }

    /// Duplicate a mono channel into both sides.
    pub fn to_stereo(&self) -> Array2<f32> {
        match self {
            AudioData::Mono(data) => {
                let len = data.len();
                let mut stereo = Array2::zeros((len, 2));
                stereo.column_mut(0).assign(data);
                stereo.column_mut(1).assign(data);
                stereo
            }
            AudioData::Stereo(data) => data.clone(),
        }
    }

    /// All samples, channels interleaved frame by frame.
    pub fn iter_samples(&self) -> Box<dyn Iterator<Item = f32> + '_> {
        match self {
            AudioData::Mono(data) => Box::new(data.iter().copied()),
            AudioData::Stereo(data) => Box::new(data.iter().copied()),
        }
    }

    /// Flat 16-bit buffer, channels interleaved frame by frame.
    #[cfg(test)]
    pub(crate) fn to_interleaved_i16(&self) -> Vec<i16> {
        self.iter_samples().map(f32_to_i16).collect()
    }

    pub(crate) fn from_interleaved(samples: Vec<f32>, channels: u16) -> Result<Self> {
        match channels {
            1 => Ok(AudioData::Mono(Array1::from(samples))),
            2 => {
                let frames = samples.len() / 2;
                let mut stereo = Array2::zeros((frames, 2));
                for (i, chunk) in samples.chunks_exact(2).enumerate() {
                    stereo[[i, 0]] = chunk[0];
                    stereo[[i, 1]] = chunk[1];
                }
                Ok(AudioData::Stereo(stereo))
            }
            n => Err(ReverbError::audio(
                format!("Only mono or stereo audio supported, got {} channels", n)
            )),
        }
    }
}

impl WavAudio {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| ReverbError::Audio {
                message: format!("Cannot open audio file {}: {}", path.display(), e)
            })?;

        let mut reader = WavReader::new(BufReader::new(file))
            .map_err(|e| ReverbError::Audio {
                message: format!("Cannot create WAV reader: {}", e)
            })?;

        let spec = reader.spec();

        if spec.sample_rate == 0 {
            return Err(ReverbError::audio("Invalid sample rate"));
        }

        if spec.channels == 0 || spec.channels > 2 {
            return Err(ReverbError::audio("Only mono or stereo audio supported"));
        }

        let format = AudioFormat::from_spec(&spec)?;
        let samples = Self::read_samples(&mut reader, format)?;
        let data = AudioData::from_interleaved(samples, spec.channels)?;

        let audio = WavAudio {
            header: AudioHeader::new(spec.sample_rate, spec.channels, format, data.len() as u32),
            data,
        };
        audio.header.validate()?;

        Ok(audio)
    }

    fn read_samples(reader: &mut WavReader<BufReader<File>>, format: AudioFormat) -> Result<Vec<f32>> {
        match format {
            AudioFormat::Float32 => reader.samples::<f32>()
                .map(|sample| sample.map_err(|e| ReverbError::Audio {
                    message: format!("Failed to read sample: {}", e)
                }))
                .collect(),
            _ => {
                let scale = format.int_full_scale();
                reader.samples::<i32>()
                    .map(|sample| sample
                        .map(|s| s as f32 / scale)
                        .map_err(|e| ReverbError::Audio {
                            message: format!("Failed to read sample: {}", e)
                        }))
                    .collect()
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ReverbError::Audio {
                        message: format!("Cannot create output directory: {}", e)
                    })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| ReverbError::Audio {
                message: format!("Cannot create output file {}: {}", path.display(), e)
            })?;

        let spec = self.header.to_wav_spec();
        let mut writer = WavWriter::new(std::io::BufWriter::new(file), spec)
            .map_err(|e| ReverbError::Audio {
                message: format!("Cannot create WAV writer: {}", e)
            })?;

        let format = self.header.format;
        for sample in self.data.iter_samples() {
            let clamped = sample.clamp(-1.0, 1.0);
            let written = match format {
                AudioFormat::Float32 => writer.write_sample(clamped),
                AudioFormat::Int8 => writer.write_sample((clamped * format.int_full_scale()) as i8),
                AudioFormat::Int16 => writer.write_sample(f32_to_i16(clamped)),
                AudioFormat::Int24 | AudioFormat::Int32 => {
                    writer.write_sample((clamped as f64 * format.int_full_scale() as f64) as i32)
                }
            };
            written.map_err(|e| ReverbError::Audio {
                message: format!("Failed to write sample: {}", e)
            })?;
        }

        writer.finalize()
            .map_err(|e| ReverbError::Audio {
                message: format!("Failed to finalize WAV writing: {}", e)
            })?;

        Ok(())
    }

    pub fn new_mono(sample_rate: u32, data: Array1<f32>, format: AudioFormat) -> Self {
        let total_frames = data.len() as u32;
        let header = AudioHeader::new(sample_rate, 1, format, total_frames);

        WavAudio {
            header,
            data: AudioData::Mono(data),
        }
    }

    pub fn new_stereo(sample_rate: u32, data: Array2<f32>, format: AudioFormat) -> Result<Self> {
        if data.ncols() != 2 {
            return Err(ReverbError::audio("Stereo data must have 2 columns"));
        }

        let total_frames = data.nrows() as u32;
        let header = AudioHeader::new(sample_rate, 2, format, total_frames);

        Ok(WavAudio {
            header,
            data: AudioData::Stereo(data),
        })
    }

    pub fn data(&self) -> &AudioData {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.header.channels
    }

    pub fn total_frames(&self) -> u32 {
        self.header.total_frames
    }

    pub fn duration(&self) -> f64 {
        self.header.duration
    }

    pub fn format(&self) -> AudioFormat {
        self.header.format
    }

    pub fn validate(&self) -> Result<()> {
        self.header.validate()?;

        if self.data.len() as u32 != self.header.total_frames {
            return Err(ReverbError::audio(
                format!("Data length mismatch: header shows {} frames, actual {} frames",
                       self.header.total_frames, self.data.len())
            ));
        }

        if self.data.channels() != self.header.channels {
            return Err(ReverbError::audio(
                format!("Channel count mismatch: header shows {} channels, actual {} channels",
                       self.header.channels, self.data.channels())
            ));
        }

        let (non_finite, out_of_range) = self.data.iter_samples().fold((0usize, 0usize), |(nf, oor), s| {
            if !s.is_finite() {
                (nf + 1, oor)
            } else if !(-1.0..=1.0).contains(&s) {
                (nf, oor + 1)
            } else {
                (nf, oor)
            }
        });

        if non_finite > 0 {
            return Err(ReverbError::audio(
                format!("Audio data contains {} non-finite samples", non_finite)
            ));
        }
        if out_of_range > 0 {
            warn!("{} samples out of range [-1.0, 1.0], they will be clipped on write", out_of_range);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_audio_format() {
        assert_eq!(AudioFormat::Int16.name(), "int16");
        assert_eq!(AudioFormat::Int16.bytes_per_sample(), 2);
        assert_eq!(AudioFormat::Int24.bytes_per_sample(), 3);
        assert_eq!(AudioFormat::Float32.name(), "float32");
        assert_eq!(AudioFormat::Float32.bytes_per_sample(), 4);
        assert_eq!(AudioFormat::Float32.to_sample_format(), SampleFormat::Float);
        assert_eq!(AudioFormat::Int8.to_sample_format(), SampleFormat::Int);
    }

    #[test]
    fn test_f32_to_i16_truncates() {
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.0), -32767);
        assert_eq!(f32_to_i16(2.0), 32767);
        assert_eq!(f32_to_i16(0.9), 29490);
        assert_eq!(f32_to_i16(-0.9), -29490);
        assert_eq!(f32_to_i16(0.0), 0);
    }

    #[test]
    fn test_audio_header_creation() {
        let header = AudioHeader::new(16000, 1, AudioFormat::Float32, 1000);
        assert_eq!(header.sample_rate, 16000);
        assert_eq!(header.channels, 1);
        assert_eq!(header.format, AudioFormat::Float32);
        assert_eq!(header.total_frames, 1000);
        assert_eq!(header.bits_per_sample, 32);
        assert!((header.duration - 0.0625).abs() < f64::EPSILON);
    }

    #[test]
    fn test_audio_header_validation() {
        let header = AudioHeader::new(16000, 1, AudioFormat::Float32, 1000);
        assert!(header.validate().is_ok());

        let invalid_header = AudioHeader::new(0, 1, AudioFormat::Float32, 1000);
        assert!(invalid_header.validate().is_err());

        let invalid_header = AudioHeader::new(16000, 3, AudioFormat::Float32, 1000);
        assert!(invalid_header.validate().is_err());

        let invalid_header = AudioHeader::new(16000, 1, AudioFormat::Float32, 0);
        assert!(invalid_header.validate().is_err());
    }

    #[test]
    fn test_audio_data_operations() {
        let mono = AudioData::Mono(Array1::from(vec![0.1, 0.2, 0.3, 0.4]));
        assert_eq!(mono.len(), 4);
        assert_eq!(mono.channels(), 1);
        assert!(!mono.is_empty());

        let stereo_from_mono = mono.to_stereo();
        assert_eq!(stereo_from_mono.nrows(), 4);
        assert_eq!(stereo_from_mono.ncols(), 2);
        assert_eq!(stereo_from_mono[[2, 0]], stereo_from_mono[[2, 1]]);

        let stereo = AudioData::Stereo(Array2::from(vec![[0.1, 0.3], [0.5, -0.5]]));
        assert_eq!(stereo.len(), 2);
        assert_eq!(stereo.channels(), 2);

        let mono_from_stereo = stereo.to_mono();
        assert_eq!(mono_from_stereo.len(), 2);
        assert!((mono_from_stereo[0] - 0.2).abs() < 1e-6);
        assert!(mono_from_stereo[1].abs() < 1e-6);
    }

    #[test]
    fn test_interleaved_i16() {
        let stereo = AudioData::Stereo(Array2::from(vec![[1.0, -1.0], [0.5, 0.0]]));
        assert_eq!(stereo.to_interleaved_i16(), vec![32767, -32767, 16383, 0]);
    }

    #[test]
    fn test_wav_audio_creation() {
        let data = Array1::from(vec![0.1, 0.2, 0.3, 0.4]);
        let audio = WavAudio::new_mono(16000, data, AudioFormat::Float32);

        assert_eq!(audio.sample_rate(), 16000);
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.total_frames(), 4);
        assert_eq!(audio.format(), AudioFormat::Float32);
        assert!(audio.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let data = Array1::from(vec![0.1, f32::NAN]);
        let audio = WavAudio::new_mono(16000, data, AudioFormat::Float32);
        assert!(audio.validate().is_err());
    }

    #[test]
    fn test_invalid_stereo_creation() {
        let data = Array2::from(vec![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]);
        let result = WavAudio::new_stereo(16000, data, AudioFormat::Float32);
        assert!(result.is_err());
    }

    #[test]
    fn test_wav_roundtrip() {
        let data = Array1::from(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        let original_audio = WavAudio::new_mono(16000, data, AudioFormat::Float32);

        let temp_file = NamedTempFile::new().unwrap();
        original_audio.save_to_file(temp_file.path()).unwrap();
        let loaded_audio = WavAudio::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded_audio.sample_rate(), original_audio.sample_rate());
        assert_eq!(loaded_audio.channels(), original_audio.channels());
        assert_eq!(loaded_audio.total_frames(), original_audio.total_frames());

        match (loaded_audio.data(), original_audio.data()) {
            (AudioData::Mono(loaded_data), AudioData::Mono(original_data)) => {
                for (loaded, original) in loaded_data.iter().zip(original_data.iter()) {
                    assert!((loaded - original).abs() < 1e-6);
                }
            }
            _ => panic!("Audio data format mismatch"),
        }
    }

    #[test]
    fn test_stereo_int16_roundtrip_counts_frames() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("stereo.wav");

        let data = Array2::from(vec![[0.25, -0.25], [0.5, -0.5], [0.0, 1.0]]);
        let audio = WavAudio::new_stereo(22050, data, AudioFormat::Int16).unwrap();
        audio.save_to_file(&path).unwrap();

        let loaded = WavAudio::from_file(&path).unwrap();
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.total_frames(), 3);
        assert_eq!(loaded.format(), AudioFormat::Int16);
        match loaded.data() {
            AudioData::Stereo(d) => {
                assert!((d[[1, 1]] + 0.5).abs() < 1e-3);
                assert!((d[[2, 1]] - 1.0).abs() < 1e-6);
            }
            _ => panic!("Expected stereo data"),
        }
    }

    #[test]
    fn test_int24_read() {
        let temp_file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(temp_file.path(), spec).unwrap();
        writer.write_sample(8_388_607i32).unwrap();
        writer.write_sample(-4_194_304i32).unwrap();
        writer.finalize().unwrap();

        let loaded = WavAudio::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.format(), AudioFormat::Int24);
        let mono = loaded.data().to_mono();
        assert!((mono[0] - 1.0).abs() < 1e-6);
        assert!((mono[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_missing_file() {
        let result = WavAudio::from_file("/nonexistent/input.wav");
        assert!(matches!(result, Err(ReverbError::Audio { .. })));
    }
}
