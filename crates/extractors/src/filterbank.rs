//! Mel filterbank and DCT-II basis shared by every backend.

use std::f32::consts::PI;

use ndarray::{Array1, Array2, ArrayView1};

use crate::{ExtractorError, Result};

/// Floor applied before taking logarithms of filter energies.
pub const LOG_FLOOR: f32 = 1e-10;

#[inline]
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

#[inline]
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Natural log clamped away from zero.
#[inline]
pub fn safe_ln(value: f32) -> f32 {
    value.max(LOG_FLOOR).ln()
}

/// Triangular Mel-spaced filters laid over the bins of a real FFT.
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    /// `num_filters` rows of `fft_size / 2 + 1` weights.
    weights: Array2<f32>,
}

impl MelFilterbank {
    pub fn new(
        num_filters: usize,
        fft_size: usize,
        sample_rate: u32,
        low_freq: f32,
        high_freq: f32,
    ) -> Result<Self> {
        if num_filters == 0 {
            return Err(ExtractorError::invalid("filterbank needs at least one filter"));
        }
        if fft_size < 2 {
            return Err(ExtractorError::invalid("fft size must be at least 2"));
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !(0.0..high_freq).contains(&low_freq) || high_freq > nyquist {
            return Err(ExtractorError::invalid(format!(
                "frequency range {low_freq}..{high_freq} Hz does not fit below nyquist {nyquist} Hz"
            )));
        }

        let num_bins = fft_size / 2 + 1;
        let bin_hz = sample_rate as f32 / fft_size as f32;
        let mel_low = hz_to_mel(low_freq);
        let mel_high = hz_to_mel(high_freq);
        let edges: Vec<f32> = (0..num_filters + 2)
            .map(|i| mel_to_hz(mel_low + (mel_high - mel_low) * i as f32 / (num_filters + 1) as f32))
            .collect();

        let mut weights = Array2::zeros((num_filters, num_bins));
        for (filter, mut row) in weights.outer_iter_mut().enumerate() {
            let (left, center, right) = (edges[filter], edges[filter + 1], edges[filter + 2]);
            for (bin, weight) in row.iter_mut().enumerate() {
                let freq = bin as f32 * bin_hz;
                *weight = if freq < left || freq > right {
                    0.0
                } else if freq <= center {
                    if center - left <= f32::EPSILON {
                        1.0
                    } else {
                        (freq - left) / (center - left)
                    }
                } else if right - center <= f32::EPSILON {
                    1.0
                } else {
                    (right - freq) / (right - center)
                };
            }
        }

        Ok(Self { weights })
    }

    pub fn num_filters(&self) -> usize {
        self.weights.nrows()
    }

    pub fn num_bins(&self) -> usize {
        self.weights.ncols()
    }

    /// Filter energies for one power spectrum.
    pub fn apply(&self, power: ArrayView1<'_, f32>) -> Array1<f32> {
        self.weights.dot(&power)
    }

    /// Filter energies for a `(frames, bins)` power matrix.
    pub fn apply_frames(&self, powers: &Array2<f32>) -> Array2<f32> {
        powers.dot(&self.weights.t())
    }
}

/// Orthonormal DCT-II truncated to the leading coefficients.
#[derive(Debug, Clone)]
pub struct DctBasis {
    /// `num_coeffs` rows of `num_inputs` cosines.
    basis: Array2<f32>,
}

impl DctBasis {
    pub fn new(num_inputs: usize, num_coeffs: usize) -> Result<Self> {
        if num_coeffs == 0 || num_coeffs > num_inputs {
            return Err(ExtractorError::invalid(format!(
                "cannot keep {num_coeffs} cepstral coefficients from {num_inputs} filters"
            )));
        }

        let n = num_inputs as f32;
        let basis = Array2::from_shape_fn((num_coeffs, num_inputs), |(k, i)| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            scale * (PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n)).cos()
        });

        Ok(Self { basis })
    }

    pub fn num_coeffs(&self) -> usize {
        self.basis.nrows()
    }

    /// Transforms each row of `(frames, inputs)` into `(frames, coeffs)`.
    pub fn apply_frames(&self, rows: &Array2<f32>) -> Array2<f32> {
        rows.dot(&self.basis.t())
    }
}

/// Number of whole windows that fit in `len` samples.
pub fn whole_frames(len: usize, window: usize, stride: usize) -> usize {
    if len < window || stride == 0 {
        0
    } else {
        (len - window) / stride + 1
    }
}
