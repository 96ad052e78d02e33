//! Configuration management for the reverb pipeline

use crate::error::{ReverbError, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SPEED_FACTOR: f64 = 1.0;
pub const DEFAULT_FRAME_MS: u32 = 50;
pub const DEFAULT_PEAK_LEVEL: f32 = 0.9;
pub const MAX_SPEED_FACTOR: f64 = 16.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub ir_path: PathBuf,
    pub tempo: TempoConfig,
    pub export: ExportConfig,
    pub processing: ProcessingConfig,
}

/// How the tempo change is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StretchMode {
    /// Windowed overlap-add; duration changes, pitch stays.
    #[default]
    Overlap,
    /// Varispeed; duration and pitch change together.
    Resample,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub speed_factor: f64,
    pub mode: StretchMode,
    pub frame_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Fraction of full scale the output peak is normalized to.
    pub peak_level: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("input.wav"),
            output_path: PathBuf::from("output.wav"),
            ir_path: PathBuf::from("impulse.wav"),
            tempo: TempoConfig::default(),
            export: ExportConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            speed_factor: DEFAULT_SPEED_FACTOR,
            mode: StretchMode::default(),
            frame_ms: DEFAULT_FRAME_MS,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            peak_level: DEFAULT_PEAK_LEVEL,
        }
    }
}

impl Config {
    pub fn speed_factor(&self) -> f64 {
        self.tempo.speed_factor
    }

    pub fn stretch_mode(&self) -> StretchMode {
        self.tempo.mode
    }

    pub fn peak_level(&self) -> f32 {
        self.export.peak_level
    }

    pub fn verbose(&self) -> bool {
        self.processing.verbose
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "convreverb", about = "Add convolution reverb and change the tempo of an audio file", version, author)]
pub struct Args {
    #[arg(value_name = "INPUT", help = "Input audio file (WAV, MP3, FLAC, OGG, ...)")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT", help = "Where to save the output WAV file")]
    pub output: PathBuf,

    #[arg(value_name = "IR", help = "Impulse response audio file")]
    pub ir: PathBuf,

    #[arg(short = 's', long = "speed", help = "Speed factor, lower values slow down the audio [default: 1.0]")]
    pub speed: Option<f64>,

    #[arg(short = 'm', long = "mode", value_enum, help = "Time-stretch mode [default: overlap]")]
    pub mode: Option<StretchMode>,

    #[arg(long = "frame-ms", help = "Overlap-add frame length in milliseconds [default: 50]")]
    pub frame_ms: Option<u32>,

    #[arg(short = 'p', long = "peak", help = "Output peak level as a fraction of full scale [default: 0.9]")]
    pub peak: Option<f32>,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        config.input_path = args.input;
        config.output_path = args.output;
        config.ir_path = args.ir;
        if let Some(speed) = args.speed {
            config.tempo.speed_factor = speed;
        }
        if let Some(mode) = args.mode {
            config.tempo.mode = mode;
        }
        if let Some(frame_ms) = args.frame_ms {
            config.tempo.frame_ms = frame_ms;
        }
        if let Some(peak) = args.peak {
            config.export.peak_level = peak;
        }
        config.processing.verbose |= args.verbose;

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReverbError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ReverbError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        let speed = self.tempo.speed_factor;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ReverbError::config(format!("Speed factor must be a positive number, got {}", speed)));
        }
        if speed > MAX_SPEED_FACTOR {
            return Err(ReverbError::config(format!("Speed factor cannot exceed {}", MAX_SPEED_FACTOR)));
        }

        if !(5..=500).contains(&self.tempo.frame_ms) {
            return Err(ReverbError::config("Frame length must be in range [5, 500] ms"));
        }

        let peak = self.export.peak_level;
        if !(peak > 0.0 && peak <= 1.0) {
            return Err(ReverbError::config("Peak level must be in range (0.0, 1.0]"));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReverbError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReverbError::config(format!("Failed to write config file: {}", e)))
    }
}
