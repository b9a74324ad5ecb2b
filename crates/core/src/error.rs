/// Result alias that carries the custom [`BeatTimelineError`] type.
pub type Result<T> = std::result::Result<T, BeatTimelineError>;

/// Common error type for the core crate.
///
/// Only the outer surfaces (decoding, configuration, shared state) fail. Frame
/// analysis, envelope reduction and timeline transitions degrade instead.
#[derive(Debug, thiserror::Error)]
pub enum BeatTimelineError {
    /// Free-form failure that has no dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The container or codec could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    /// The spectral transform rejected its buffers.
    #[error("fft failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// A configuration value is outside its supported range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Configuration or report JSON could not be (de)serialised.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl BeatTimelineError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}

impl From<&str> for BeatTimelineError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BeatTimelineError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
