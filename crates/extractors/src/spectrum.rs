use std::{fmt, sync::Arc};

use ndarray::{Array2, ArrayViewMut1};
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::Result;

/// Reusable real-input FFT that turns frames into power spectra.
///
/// Frames longer than the FFT are truncated and shorter ones zero-padded,
/// matching `rfft(frame, n=fft_size)`.
pub struct PowerSpectrum {
    fft_size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl PowerSpectrum {
    pub fn new(fft_size: usize) -> Self {
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        Self {
            fft_size,
            plan,
            input,
            spectrum,
            scratch,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Writes `|X|^2 / fft_size` for `frame` into `out`.
    pub fn process_into(&mut self, frame: &[f32], mut out: ArrayViewMut1<'_, f32>) -> Result<()> {
        let used = frame.len().min(self.fft_size);
        self.input[..used].copy_from_slice(&frame[..used]);
        self.input[used..].fill(0.0);

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        let norm = self.fft_size as f32;
        for (slot, bin) in out.iter_mut().zip(&self.spectrum) {
            *slot = bin.norm_sqr() / norm;
        }
        Ok(())
    }

    /// Power spectra for every frame yielded by `frames`, one row each.
    pub fn frames<'a, I>(&mut self, frames: I, count: usize) -> Result<Array2<f32>>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let mut powers = Array2::zeros((count, self.num_bins()));
        for (frame, row) in frames.into_iter().zip(powers.outer_iter_mut()) {
            self.process_into(frame, row)?;
        }
        Ok(powers)
    }
}

impl fmt::Debug for PowerSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerSpectrum")
            .field("fft_size", &self.fft_size)
            .finish()
    }
}
