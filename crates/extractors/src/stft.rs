//! Centered short-time Fourier analysis with a Hann window.
//!
//! The signal is zero padded by `n_fft / 2` on both sides so frame `t` is
//! centred on sample `t * hop_length`. Outputs are feature-major:
//! `(n_mels, frames)` and `(n_mfcc, frames)`.

use std::f32::consts::PI;

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::{
    filterbank::{DctBasis, MelFilterbank, LOG_FLOOR},
    ExtractorError, Result,
};

/// Dynamic range kept by [`power_to_db`] below the loudest cell.
pub const TOP_DB: f32 = 80.0;

/// Keyword-style request for [`mfcc`] and [`melspectrogram`].
#[derive(Debug, Clone, PartialEq)]
pub struct MfccRequest {
    pub sr: u32,
    pub hop_length: usize,
    pub n_fft: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    pub fmin: f32,
    /// Upper filterbank edge; `None` means `sr / 2`.
    pub fmax: Option<f32>,
}

impl MfccRequest {
    pub fn new(sr: u32) -> Self {
        Self {
            sr,
            hop_length: 512,
            n_fft: 2048,
            n_mels: 128,
            n_mfcc: 20,
            fmin: 0.0,
            fmax: None,
        }
    }
}

/// Power Mel spectrogram, `(n_mels, frames)`.
pub fn melspectrogram(y: &[f32], request: &MfccRequest) -> Result<Array2<f32>> {
    if request.hop_length == 0 {
        return Err(ExtractorError::invalid("hop_length must be non-zero"));
    }
    if request.n_fft < 2 {
        return Err(ExtractorError::invalid("n_fft must be at least 2"));
    }

    let fmax = request.fmax.unwrap_or(request.sr as f32 / 2.0);
    let bank = MelFilterbank::new(request.n_mels, request.n_fft, request.sr, request.fmin, fmax)?;
    let powers = stft_power(y, request.n_fft, request.hop_length);
    Ok(bank.apply_frames(&powers).reversed_axes())
}

/// Cepstral coefficients from the dB-scaled Mel spectrogram, `(n_mfcc, frames)`.
pub fn mfcc(y: &[f32], request: &MfccRequest) -> Result<Array2<f32>> {
    let dct = DctBasis::new(request.n_mels, request.n_mfcc)?;
    let mel = melspectrogram(y, request)?;
    let db = power_to_db(&mel);
    Ok(dct.apply_frames(&db.reversed_axes()).reversed_axes())
}

/// `10 * log10(S)` clipped to [`TOP_DB`] below the peak.
pub fn power_to_db(power: &Array2<f32>) -> Array2<f32> {
    let mut db = power.mapv(|p| 10.0 * p.max(LOG_FLOOR).log10());
    let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    db.mapv_inplace(|v| v.max(floor));
    db
}

/// `(frames, n_fft / 2 + 1)` power spectra of the padded, windowed signal.
fn stft_power(y: &[f32], n_fft: usize, hop_length: usize) -> Array2<f32> {
    let pad = n_fft / 2;
    let mut padded = vec![0.0_f32; y.len() + 2 * pad];
    padded[pad..pad + y.len()].copy_from_slice(y);

    let frames = if padded.len() < n_fft {
        1
    } else {
        1 + (padded.len() - n_fft) / hop_length
    };
    padded.resize(padded.len().max(n_fft), 0.0);

    let window: Vec<f32> = (0..n_fft)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n_fft as f32).cos())
        .collect();

    let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
    let mut buffer = vec![Complex::new(0.0_f32, 0.0); n_fft];
    let mut scratch = vec![Complex::new(0.0_f32, 0.0); fft.get_inplace_scratch_len()];
    let bins = n_fft / 2 + 1;

    let mut powers = Array2::zeros((frames, bins));
    for (t, mut row) in powers.outer_iter_mut().enumerate() {
        let start = t * hop_length;
        for ((slot, sample), w) in buffer.iter_mut().zip(&padded[start..start + n_fft]).zip(&window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (cell, bin) in row.iter_mut().zip(&buffer[..bins]) {
            *cell = bin.norm_sqr();
        }
    }
    powers
}
