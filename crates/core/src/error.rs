/// Result alias that carries the custom [`BenchError`] type.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Common error type for the harness. Every variant is terminal for the
/// workflow that raised it; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The harness was assembled with an unusable catalog, calibration or
    /// adapter. Raised before any measurement starts.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
    /// A library's compute call failed while it was being measured or
    /// previewed.
    #[error("library `{library}` failed on parameter set {parameter_set}: {source}")]
    AdapterInvocation {
        library: String,
        parameter_set: String,
        #[source]
        source: anyhow::Error,
    },
    /// An audio or frame source could not be reached or decoded.
    #[error("audio source `{locator}` unavailable: {reason}")]
    SourceUnavailable { locator: String, reason: String },
    /// Timings did not line up with the parameter catalog.
    #[error("report error: {0}")]
    Report(String),
    #[error("{0}")]
    Message(String),
}

impl BenchError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn configuration<T: Into<String>>(reason: T) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn source_unavailable(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }
}
