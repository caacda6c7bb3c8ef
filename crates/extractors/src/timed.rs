//! Cepstral features configured in seconds rather than samples.
//!
//! The tail of the signal is zero padded so that every sample lands in at
//! least one frame. Output is `(frames, num_cepstral)`.

use ndarray::Array2;

use crate::{
    filterbank::{safe_ln, DctBasis, MelFilterbank},
    spectrum::PowerSpectrum,
    ExtractorError, Result,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CepstralConfig {
    pub sampling_frequency: u32,
    /// Window length in seconds.
    pub frame_length: f32,
    /// Hop between windows in seconds.
    pub frame_stride: f32,
    pub num_cepstral: usize,
    pub num_filters: usize,
    pub fft_length: usize,
    pub low_frequency: f32,
    /// `None` means half the sampling frequency.
    pub high_frequency: Option<f32>,
    /// Replace the first coefficient with the log frame energy.
    pub dc_elimination: bool,
}

impl CepstralConfig {
    pub fn frame_samples(&self) -> usize {
        (self.frame_length * self.sampling_frequency as f32).round() as usize
    }

    pub fn stride_samples(&self) -> usize {
        (self.frame_stride * self.sampling_frequency as f32).round() as usize
    }
}

/// Splits `signal` into `length`-sample frames every `stride` samples,
/// zero padding the last one. Every frame starts inside the signal, so a
/// stride longer than the frame skips the samples in between.
pub fn stack_frames(signal: &[f32], length: usize, stride: usize) -> Result<Array2<f32>> {
    if length == 0 || stride == 0 {
        return Err(ExtractorError::invalid("frame length and stride must round to at least one sample"));
    }

    let count = if signal.len() <= length {
        1
    } else {
        let covering = 1 + (signal.len() - length).div_ceil(stride);
        covering.min((signal.len() - 1) / stride + 1)
    };

    let mut frames = Array2::zeros((count, length));
    for (i, mut row) in frames.outer_iter_mut().enumerate() {
        let start = i * stride;
        let end = (start + length).min(signal.len());
        for (cell, sample) in row.iter_mut().zip(&signal[start..end]) {
            *cell = *sample;
        }
    }
    Ok(frames)
}

pub fn mfcc(signal: &[f32], config: &CepstralConfig) -> Result<Array2<f32>> {
    let frames = stack_frames(signal, config.frame_samples(), config.stride_samples())?;
    let high = config
        .high_frequency
        .unwrap_or(config.sampling_frequency as f32 / 2.0);
    let bank = MelFilterbank::new(
        config.num_filters,
        config.fft_length,
        config.sampling_frequency,
        config.low_frequency,
        high,
    )?;
    let dct = DctBasis::new(config.num_filters, config.num_cepstral)?;

    let length = frames.ncols();
    let samples = frames
        .as_slice()
        .ok_or_else(|| ExtractorError::invalid("stacked frames are not contiguous"))?;
    let powers = PowerSpectrum::new(config.fft_length).frames(samples.chunks(length), frames.nrows())?;

    let energies = bank.apply_frames(&powers).mapv(safe_ln);
    let mut cepstra = dct.apply_frames(&energies);
    if config.dc_elimination {
        for (mut row, power) in cepstra.outer_iter_mut().zip(powers.outer_iter()) {
            row[0] = safe_ln(power.sum());
        }
    }
    Ok(cepstra)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CepstralConfig {
        CepstralConfig {
            sampling_frequency: 16_000,
            frame_length: 0.01,
            frame_stride: 0.01,
            num_cepstral: 13,
            num_filters: 20,
            fft_length: 512,
            low_frequency: 0.0,
            high_frequency: Some(8_000.0),
            dc_elimination: true,
        }
    }

    #[test]
    fn pads_the_final_frame() {
        let frames = stack_frames(&[1.0; 10], 4, 4).unwrap();
        assert_eq!(frames.dim(), (3, 4));
        assert_eq!(frames.row(2).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn stride_longer_than_frame_starts_every_frame_in_bounds() {
        let frames = stack_frames(&[1.0; 11], 2, 4).unwrap();
        assert_eq!(frames.dim(), (3, 2));
        assert_eq!(frames.row(2).to_vec(), vec![1.0, 1.0]);

        let cfg = CepstralConfig { frame_stride: 0.025, ..config() };
        let out = mfcc(&[0.0; 1_000], &cfg).unwrap();
        assert_eq!(out.dim(), (3, 13));
    }

    #[test]
    fn short_signal_yields_one_frame() {
        let frames = stack_frames(&[1.0; 3], 4, 2).unwrap();
        assert_eq!(frames.dim(), (1, 4));
    }

    #[test]
    fn mfcc_shape_follows_seconds() {
        let signal: Vec<f32> = (0..16_050).map(|i| (i as f32 * 0.02).sin()).collect();
        let out = mfcc(&signal, &config()).unwrap();
        assert_eq!(out.dim(), (101, 13));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn dc_elimination_swaps_in_log_energy() {
        let signal = vec![0.0_f32; 320];
        let kept = mfcc(&signal, &CepstralConfig { dc_elimination: false, ..config() }).unwrap();
        let swapped = mfcc(&signal, &config()).unwrap();
        assert!((swapped[[0, 0]] - safe_ln(0.0)).abs() < 1e-3);
        assert!((kept[[0, 0]] - swapped[[0, 0]]).abs() > 1.0);
    }

    #[test]
    fn sub_sample_stride_is_rejected() {
        let cfg = CepstralConfig { frame_stride: 0.00001, ..config() };
        assert!(mfcc(&[0.0; 100], &cfg).is_err());
    }
}
