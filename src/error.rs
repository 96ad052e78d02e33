//! Error Types

use thiserror::Error;

/// Main error type
#[derive(Debug, Clone, Error)]
pub enum ReverbError {
    #[error("Audio error: {message}")]
    Audio { message: String },
    #[error("Decode error: {message}")]
    Decode { message: String },
    #[error("Config error: {message}")]
    Config { message: String },
    #[error("IO error: {message}")]
    Io { message: String },
    #[error("Processing error: {message}")]
    Processing { message: String },
}

impl ReverbError {
    pub fn audio<S: Into<String>>(msg: S) -> Self { Self::Audio { message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { Self::Decode { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }
    pub fn processing<S: Into<String>>(msg: S) -> Self { Self::Processing { message: msg.into() } }
}

pub type Result<T> = std::result::Result<T, ReverbError>;

impl From<std::io::Error> for ReverbError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<hound::Error> for ReverbError {
    fn from(err: hound::Error) -> Self { Self::audio(format!("WAV: {}", err)) }
}

impl From<symphonia::core::errors::Error> for ReverbError {
    fn from(err: symphonia::core::errors::Error) -> Self { Self::decode(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ReverbError::audio("test");
        assert!(e.to_string().contains("Audio"));

        let e = ReverbError::processing("empty kernel");
        assert_eq!(e.to_string(), "Processing error: empty kernel");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.wav");
        let e: ReverbError = io.into();
        assert!(matches!(e, ReverbError::Io { .. }));
        assert!(e.to_string().contains("missing.wav"));
    }
}
