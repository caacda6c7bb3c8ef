use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BenchError, Result};

/// Recording used by the comparison workflow.
pub const DEMO_AUDIO_URL: &str = "https://raw.githubusercontent.com/MycroftAI/mycroft-core/\
9ae13be1d46eea4f90db2b9377953101ce2139f9/test/unittests/client/data/record.wav";

/// Top-level configuration for the comparison workflow.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub calibration: Calibration,
    pub preview: PreviewConfig,
    pub live: LiveConfig,
}

/// Filterbank and cepstral settings shared by every registered library.
///
/// Adapters receive this from the registry and must map it onto their own
/// argument names without altering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub sample_rate: u32,
    pub coefficient_count: usize,
    pub filter_count: usize,
    pub low_freq: f32,
    pub high_freq: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            coefficient_count: 13,
            filter_count: 20,
            low_freq: 0.0,
            high_freq: 8_000.0,
        }
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(BenchError::configuration("sample rate must be positive"));
        }
        if self.coefficient_count == 0 || self.filter_count == 0 {
            return Err(BenchError::configuration(
                "coefficient and filter counts must be positive",
            ));
        }
        if self.coefficient_count > self.filter_count {
            return Err(BenchError::configuration(format!(
                "{} coefficients cannot be derived from {} filters",
                self.coefficient_count, self.filter_count
            )));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if self.low_freq < 0.0 || self.low_freq >= self.high_freq || self.high_freq > nyquist {
            return Err(BenchError::configuration(format!(
                "frequency range {}..{} Hz must be increasing and stay below {nyquist} Hz",
                self.low_freq, self.high_freq
            )));
        }
        Ok(())
    }

    /// Converts a duration in seconds to whole samples at this rate.
    pub fn samples_for(&self, seconds: f32) -> usize {
        (seconds * self.sample_rate as f32).round() as usize
    }
}

/// Fixed call shape used when previewing each library's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub hop_duration: f32,
    pub fft_size: usize,
    /// Interval between `has_open_windows` checks for sinks without a
    /// blocking wait.
    #[serde(with = "millis")]
    pub poll_interval: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            hop_duration: 0.01,
            fft_size: 512,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Settings for the live Mel-spectrogram pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    pub sample_rate: u32,
    /// New samples per frame.
    pub stride: usize,
    /// Number of strides shown at once.
    pub width: usize,
    pub fft_size: usize,
    pub filter_count: usize,
    pub label: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            stride: 500,
            width: 60,
            fft_size: 512,
            filter_count: 20,
            label: "Mel spectrogram".to_string(),
        }
    }
}

impl LiveConfig {
    /// Samples held by each frame handed to the transform.
    pub fn frame_len(&self) -> usize {
        self.stride * (self.width + 1)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
