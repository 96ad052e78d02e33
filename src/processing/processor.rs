//! Reverb processing pipeline: tempo -> convolution -> export

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use log::info;
use crate::config::Config;
use crate::error::{ReverbError, Result};
use crate::processing::{export, reverb, tempo};

#[derive(Debug)]
pub struct ReverbProcessor {
    config: Config,
}

impl ReverbProcessor {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the pipeline on the paths from the configuration.
    pub fn process(&self) -> Result<ProcessingResult> {
        self.process_file(&self.config.input_path, &self.config.ir_path, &self.config.output_path)
    }

    pub fn process_file(&self, input_path: &Path, ir_path: &Path, output_path: &Path) -> Result<ProcessingResult> {
        let start_time = Instant::now();

        if !input_path.exists() {
            return Err(ReverbError::config(format!(
                "Input file does not exist: {}", input_path.display()
            )));
        }
        if !ir_path.exists() {
            return Err(ReverbError::config(format!(
                "Impulse response file does not exist: {}", ir_path.display()
            )));
        }

        info!("Adjusting tempo (speed {})", self.config.speed_factor());
        let adjusted = tempo::adjust_tempo(input_path, &self.config.tempo)?;
        let input_duration = adjusted.source_duration;
        let stretched = adjusted.audio;
        let sample_rate = stretched.sample_rate();
        let stretched_frames = stretched.total_frames() as usize;
        let stretched_duration = stretched.duration();

        info!("Applying reverb from {}", ir_path.display());
        let reverbed = reverb::add_conv_reverb(stretched.data(), sample_rate, ir_path)?;
        drop(stretched);
        let ir_frames = reverbed.len() + 1 - stretched_frames;

        info!("Exporting to {}", output_path.display());
        let summary = export::save_to_file(reverbed, sample_rate, output_path, self.config.peak_level())?;

        let processing_time = start_time.elapsed();
        let performance_metrics = PerformanceMetrics::new(
            input_duration,
            stretched_duration,
            processing_time,
            ir_frames,
            summary,
        );

        Ok(ProcessingResult {
            input_path: input_path.to_path_buf(),
            ir_path: ir_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            processing_time,
            performance_metrics,
        })
    }

    pub fn print_status(&self) {
        println!("=== Processor Status ===");
        println!("Speed factor: {}", self.config.speed_factor());
        println!("Stretch mode: {:?}", self.config.stretch_mode());
        println!("Frame length: {} ms", self.config.tempo.frame_ms);
        println!("Peak level: {:.0}%", self.config.peak_level() * 100.0);
        println!("========================");
    }
}

#[derive(Debug)]
pub struct ProcessingResult {
    pub input_path: PathBuf,
    pub ir_path: PathBuf,
    pub output_path: PathBuf,
    pub processing_time: Duration,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub input_duration_seconds: f64,
    pub stretched_duration_seconds: f64,
    pub output_duration_seconds: f64,
    pub processing_time_seconds: f64,
    pub real_time_factor: f64,
    pub sample_rate: u32,
    pub ir_frames: usize,
    pub output_frames: usize,
    pub source_peak: f32,
}

impl PerformanceMetrics {
    fn new(
        input_duration: f64,
        stretched_duration: f64,
        processing_time: Duration,
        ir_frames: usize,
        summary: export::ExportSummary,
    ) -> Self {
        let rtf = if input_duration > 0.0 {
            processing_time.as_secs_f64() / input_duration
        } else {
            0.0
        };

        Self {
            input_duration_seconds: input_duration,
            stretched_duration_seconds: stretched_duration,
            output_duration_seconds: summary.frames as f64 / summary.sample_rate as f64,
            processing_time_seconds: processing_time.as_secs_f64(),
            real_time_factor: rtf,
            sample_rate: summary.sample_rate,
            ir_frames,
            output_frames: summary.frames,
            source_peak: summary.source_peak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, WavAudio};
    use crate::config::StretchMode;
    use ndarray::Array1;
    use tempfile::TempDir;

    fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
        let input = dir.join("dry.wav");
        let ir = dir.join("ir.wav");

        let tone = Array1::from_iter((0..8000).map(|i| {
            (2.0 * std::f32::consts::PI * 400.0 * i as f32 / 8000.0).sin() * 0.3
        }));
        WavAudio::new_mono(8000, tone, AudioFormat::Int16).save_to_file(&input).unwrap();

        let decay = Array1::from_iter((0..800).map(|i| (-(i as f32) / 100.0).exp()));
        WavAudio::new_mono(8000, decay, AudioFormat::Int16).save_to_file(&ir).unwrap();

        (input, ir)
    }

    fn test_config(dir: &Path, speed: f64) -> Config {
        let (input, ir) = write_fixtures(dir);
        let mut config = Config::default();
        config.input_path = input;
        config.ir_path = ir;
        config.output_path = dir.join("out").join("wet.wav");
        config.tempo.speed_factor = speed;
        config
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = Config::default();
        config.tempo.speed_factor = 0.0;
        assert!(ReverbProcessor::new(config).is_err());
    }

    #[test]
    fn test_full_pipeline() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), 0.5);
        let processor = ReverbProcessor::new(config.clone()).unwrap();

        let result = processor.process().unwrap();
        let metrics = &result.performance_metrics;
        assert_eq!(metrics.sample_rate, 8000);
        assert_eq!(metrics.ir_frames, 800);
        assert_eq!(metrics.output_frames, 16000 + 800 - 1);
        assert!((metrics.stretched_duration_seconds - 2.0).abs() < 1e-6);
        assert!((metrics.input_duration_seconds - 1.0).abs() < 1e-6);
        assert!(metrics.source_peak > 0.0);

        let output = WavAudio::from_file(&config.output_path).unwrap();
        assert_eq!(output.channels(), 1);
        assert_eq!(output.sample_rate(), 8000);
        assert_eq!(output.total_frames() as usize, metrics.output_frames);
    }

    #[test]
    fn test_resample_mode_pipeline() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path(), 2.0);
        config.tempo.mode = StretchMode::Resample;
        let processor = ReverbProcessor::new(config).unwrap();

        let result = processor.process().unwrap();
        assert_eq!(result.performance_metrics.output_frames, 4000 + 800 - 1);
    }

    #[test]
    fn test_input_duration_is_not_rounded() {
        let temp_dir = TempDir::new().unwrap();
        // 8000 frames at speed 0.7 stretch to 11429 frames; scaling that back
        // by the speed would report 1.0000375 s instead of 1.0 s.
        let config = test_config(temp_dir.path(), 0.7);
        let processor = ReverbProcessor::new(config).unwrap();

        let result = processor.process().unwrap();
        let metrics = &result.performance_metrics;
        assert_eq!(metrics.input_duration_seconds, 1.0);
        assert!((metrics.stretched_duration_seconds - 11429.0 / 8000.0).abs() < 1e-9);
        assert_eq!(metrics.output_frames, 11429 + 800 - 1);
    }

    #[test]
    fn test_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), 1.0);
        let processor = ReverbProcessor::new(config.clone()).unwrap();

        let result = processor.process_file(Path::new("/nonexistent/dry.wav"), &config.ir_path, &config.output_path);
        assert!(matches!(result, Err(ReverbError::Config { .. })));

        let result = processor.process_file(&config.input_path, Path::new("/nonexistent/ir.wav"), &config.output_path);
        assert!(matches!(result, Err(ReverbError::Config { .. })));
    }
}
