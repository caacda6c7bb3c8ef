/// Result alias that carries the custom [`ExtractorError`] type.
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Errors raised by the feature extraction backends.
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    /// A parameter is outside the range the backend can work with.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The signal cannot fill a single analysis window.
    #[error("signal of {len} samples is shorter than the {window}-sample window")]
    SignalTooShort { len: usize, window: usize },
    /// The FFT backend rejected a buffer.
    #[error("fft failure: {0}")]
    Fft(String),
}

impl ExtractorError {
    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

impl From<realfft::FftError> for ExtractorError {
    fn from(value: realfft::FftError) -> Self {
        Self::Fft(value.to_string())
    }
}
