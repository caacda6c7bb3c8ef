//! Feature extraction backends compared by the `mfcc-bench` harness.
//!
//! Each backend speaks its own argument vocabulary and output orientation on
//! purpose, so the harness has to adapt to them:
//!
//! - [`framed`]: sample-based `(window, stride)` chops, frame-major output.
//! - [`stft`]: centred Hann STFT with keyword-style requests, feature-major
//!   output.
//! - [`timed`]: seconds-based framing with a padded tail, frame-major output.

pub mod error;
pub mod filterbank;
pub mod framed;
pub mod spectrum;
pub mod stft;
pub mod timed;

pub use error::{ExtractorError, Result};
pub use filterbank::{DctBasis, MelFilterbank};
pub use spectrum::PowerSpectrum;
