//! Registry wiring for the bundled extractor backends.
//!
//! Every adapter maps the same calibration onto its backend's own argument
//! names, so sample rate, coefficient count, filter count and frequency band
//! always agree across libraries.

use mfcc_bench_core::{
    Calibration, FeatureMatrix, LibraryAdapter, LibraryRegistry, LiveConfig, Result, Signal,
};
use mfcc_bench_extractors::{
    framed::{self, MelParams, MfccParams},
    stft::{self, MfccRequest},
    timed::{self, CepstralConfig},
    DctBasis, MelFilterbank,
};

/// FFT size used when probing whether a backend accepts the calibration.
const PROBE_FFT_SIZE: usize = 512;

pub fn registry(calibration: Calibration) -> Result<LibraryRegistry> {
    LibraryRegistry::builder(calibration)
        .register(timed_adapter())
        .register(framed_adapter())
        .register(stft_adapter())
        .build()
}

fn timed_adapter() -> LibraryAdapter<(Signal, CepstralConfig)> {
    LibraryAdapter::new(
        "Timed",
        |signal: &Signal, hop, fft_size, calibration: &Calibration| {
            let config = CepstralConfig {
                sampling_frequency: calibration.sample_rate,
                frame_length: hop,
                frame_stride: hop,
                num_cepstral: calibration.coefficient_count,
                num_filters: calibration.filter_count,
                fft_length: fft_size,
                low_frequency: calibration.low_freq,
                high_frequency: Some(calibration.high_freq),
                dc_elimination: true,
            };
            (signal.clone(), config)
        },
        |(signal, config): &(Signal, CepstralConfig)| Ok(timed::mfcc(signal, config)?),
    )
    .with_probe(check_calibration)
}

fn framed_adapter() -> LibraryAdapter<(Signal, MfccParams)> {
    LibraryAdapter::new(
        "Framed",
        |signal: &Signal, hop, fft_size, calibration: &Calibration| {
            let step = calibration.samples_for(hop);
            let params = MfccParams {
                mel: MelParams {
                    sample_rate: calibration.sample_rate,
                    window_stride: (step, step),
                    fft_size,
                    num_filt: calibration.filter_count,
                    freq_range: Some((calibration.low_freq, calibration.high_freq)),
                },
                num_coeffs: calibration.coefficient_count,
            };
            (signal.clone(), params)
        },
        |(signal, params): &(Signal, MfccParams)| Ok(framed::mfcc_spec(signal, params)?),
    )
    .with_probe(check_calibration)
}

fn stft_adapter() -> LibraryAdapter<(Signal, MfccRequest)> {
    LibraryAdapter::new(
        "STFT",
        |signal: &Signal, hop, fft_size, calibration: &Calibration| {
            let request = MfccRequest {
                hop_length: calibration.samples_for(hop),
                n_fft: fft_size,
                n_mels: calibration.filter_count,
                n_mfcc: calibration.coefficient_count,
                fmin: calibration.low_freq,
                fmax: Some(calibration.high_freq),
                ..MfccRequest::new(calibration.sample_rate)
            };
            (signal.clone(), request)
        },
        |(signal, request): &(Signal, MfccRequest)| Ok(stft::mfcc(signal, request)?),
    )
    .with_probe(check_calibration)
}

/// Builds the filterbank and DCT a backend would need under `calibration`.
fn check_calibration(calibration: &Calibration) -> anyhow::Result<()> {
    MelFilterbank::new(
        calibration.filter_count,
        PROBE_FFT_SIZE,
        calibration.sample_rate,
        calibration.low_freq,
        calibration.high_freq,
    )?;
    DctBasis::new(calibration.filter_count, calibration.coefficient_count)?;
    Ok(())
}

/// The fixed Mel-spectrogram applied to every live frame.
pub fn mel_transform(live: &LiveConfig) -> impl FnMut(&[f32]) -> anyhow::Result<FeatureMatrix> {
    let params = MelParams {
        sample_rate: live.sample_rate,
        window_stride: (2 * live.stride, live.stride),
        fft_size: live.fft_size,
        num_filt: live.filter_count,
        freq_range: None,
    };
    move |frame: &[f32]| Ok(framed::mel_spec(frame, &params)?)
}
