use std::{
    f32::consts::PI,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{label, ParameterCatalog},
    registry::{LibraryRegistry, Signal},
    BenchError, Calibration, Result,
};

/// How the synthetic benchmark signal is generated. Content does not matter
/// for cost comparison, only that it is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum SignalPolicy {
    /// All-zero buffer.
    #[default]
    Silence,
    /// Unit-amplitude sine at the calibration sample rate.
    Tone { frequency: f32 },
}

impl SignalPolicy {
    pub fn synthesize(&self, len: usize, calibration: &Calibration) -> Signal {
        match *self {
            SignalPolicy::Silence => vec![0.0; len].into(),
            SignalPolicy::Tone { frequency } => {
                let step = 2.0 * PI * frequency / calibration.sample_rate as f32;
                (0..len).map(|i| (step * i as f32).sin()).collect()
            }
        }
    }
}

/// Wall time of `loop_count` compute calls for one library on one parameter
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    pub library_name: String,
    pub parameter_set_index: usize,
    pub elapsed: Duration,
}

impl TimingSample {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn label(&self) -> char {
        label(self.parameter_set_index)
    }
}

/// Samples of one library, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryTimings {
    pub name: String,
    pub samples: Vec<TimingSample>,
}

/// Timings of a whole run, libraries in registry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    libraries: Vec<LibraryTimings>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `sample` to its library's sequence, creating the sequence on
    /// first use.
    pub fn push(&mut self, sample: TimingSample) {
        match self
            .libraries
            .iter_mut()
            .find(|entry| entry.name == sample.library_name)
        {
            Some(entry) => entry.samples.push(sample),
            None => self.libraries.push(LibraryTimings {
                name: sample.library_name.clone(),
                samples: vec![sample],
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[TimingSample]> {
        self.libraries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.samples.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibraryTimings> {
        self.libraries.iter()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

/// Times every library on every parameter set, one measurement at a time.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRunner {
    signal_policy: SignalPolicy,
    warmup_calls: u32,
}

impl BenchmarkRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal_policy(mut self, policy: SignalPolicy) -> Self {
        self.signal_policy = policy;
        self
    }

    /// Untimed calls made after the arguments are built and before the clock
    /// starts.
    pub fn with_warmup(mut self, calls: u32) -> Self {
        self.warmup_calls = calls;
        self
    }

    /// Runs the sweep. The first failing compute call aborts the run; no
    /// partial timings are returned.
    pub fn run(&self, catalog: &ParameterCatalog, registry: &LibraryRegistry) -> Result<Timings> {
        let calibration = registry.calibration();
        let mut timings = Timings::new();

        for (index, params) in catalog.iter().enumerate() {
            let set_label = label(index);
            let _span = tracing::info_span!("parameter_set", label = %set_label).entered();
            tracing::info!(
                audio_length = params.audio_length,
                hop_duration = params.hop_duration,
                fft_size = params.fft_size,
                loops = params.loop_count,
                "=== {set_label} ==="
            );

            let signal = self.signal_policy.synthesize(params.audio_length, calibration);

            for library in registry.iter() {
                let failed = |source: anyhow::Error| BenchError::AdapterInvocation {
                    library: library.name().to_string(),
                    parameter_set: set_label.to_string(),
                    source,
                };

                let call = library.prepare(&signal, params.hop_duration, params.fft_size, calibration);
                for _ in 0..self.warmup_calls {
                    call.invoke().map_err(failed)?;
                }

                let begin = Instant::now();
                for _ in 0..params.loop_count {
                    call.invoke().map_err(failed)?;
                }
                let elapsed = begin.elapsed();

                tracing::info!(library = library.name(), seconds = elapsed.as_secs_f64(), "measured");
                timings.push(TimingSample {
                    library_name: library.name().to_string(),
                    parameter_set_index: index,
                    elapsed,
                });
            }
        }

        Ok(timings)
    }
}
