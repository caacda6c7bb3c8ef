//! Frame-major features over fixed `(window, stride)` sample chops.
//!
//! Only whole windows are analysed; trailing samples that cannot fill a window
//! are ignored. Outputs are `(frames, features)`.

use ndarray::Array2;

use crate::{
    filterbank::{safe_ln, whole_frames, DctBasis, MelFilterbank},
    spectrum::PowerSpectrum,
    ExtractorError, Result,
};

/// Arguments for [`mel_spec`].
#[derive(Debug, Clone, PartialEq)]
pub struct MelParams {
    pub sample_rate: u32,
    /// `(window, stride)` in samples.
    pub window_stride: (usize, usize),
    pub fft_size: usize,
    pub num_filt: usize,
    /// Filterbank edges in Hz; `None` spans `0..nyquist`.
    pub freq_range: Option<(f32, f32)>,
}

/// Arguments for [`mfcc_spec`].
#[derive(Debug, Clone, PartialEq)]
pub struct MfccParams {
    pub mel: MelParams,
    pub num_coeffs: usize,
}

/// Chops `audio` into whole windows and returns their power spectra.
pub fn power_spec(audio: &[f32], window_stride: (usize, usize), fft_size: usize) -> Result<Array2<f32>> {
    let (window, stride) = window_stride;
    if window == 0 || stride == 0 {
        return Err(ExtractorError::invalid("window and stride must be non-zero"));
    }
    if fft_size < 2 {
        return Err(ExtractorError::invalid("fft size must be at least 2"));
    }

    let count = whole_frames(audio.len(), window, stride);
    if count == 0 {
        return Err(ExtractorError::SignalTooShort {
            len: audio.len(),
            window,
        });
    }

    let chops = (0..count).map(|i| &audio[i * stride..i * stride + window]);
    PowerSpectrum::new(fft_size).frames(chops, count)
}

/// Log Mel energies, `(frames, num_filt)`.
pub fn mel_spec(audio: &[f32], params: &MelParams) -> Result<Array2<f32>> {
    let powers = power_spec(audio, params.window_stride, params.fft_size)?;
    let bank = filterbank(params)?;
    Ok(bank.apply_frames(&powers).mapv(safe_ln))
}

/// Cepstral coefficients, `(frames, num_coeffs)`.
///
/// Coefficient 0 is replaced by the log of the total frame power.
pub fn mfcc_spec(audio: &[f32], params: &MfccParams) -> Result<Array2<f32>> {
    let powers = power_spec(audio, params.mel.window_stride, params.mel.fft_size)?;
    let bank = filterbank(&params.mel)?;
    let dct = DctBasis::new(bank.num_filters(), params.num_coeffs)?;

    let mels = bank.apply_frames(&powers).mapv(safe_ln);
    let mut mfccs = dct.apply_frames(&mels);
    for (mut row, power) in mfccs.outer_iter_mut().zip(powers.outer_iter()) {
        row[0] = safe_ln(power.sum());
    }
    Ok(mfccs)
}

fn filterbank(params: &MelParams) -> Result<MelFilterbank> {
    let (low, high) = params
        .freq_range
        .unwrap_or((0.0, params.sample_rate as f32 / 2.0));
    MelFilterbank::new(params.num_filt, params.fft_size, params.sample_rate, low, high)
}
