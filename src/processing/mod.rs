//! Audio Processing Pipeline
//!
//! Three stages run in order: tempo adjustment, convolution reverb, export.

pub mod tempo;
pub mod reverb;
pub mod export;
pub mod processor;

pub use tempo::{adjust_tempo, SpeedFactor};
pub use reverb::{add_conv_reverb, convolve};
pub use export::ExportSummary;
pub use processor::{ReverbProcessor, ProcessingResult, PerformanceMetrics};
