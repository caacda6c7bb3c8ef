//! Core library for the MFCC benchmark harness.
//!
//! The harness compares feature extractors it knows nothing about. Each
//! library is wrapped in an adapter that maps canonical parameters onto the
//! library's own arguments; the registry, runner and visualizer only ever see
//! adapters. Workflows:
//!
//! - [`BenchmarkRunner`] times every library on every [`ParameterSet`] and
//!   [`report::format`] turns the timings into tab-delimited tables.
//! - [`ComparisonVisualizer`] runs each library once on a real recording and
//!   hands the output to a [`VisualizationSink`].
//! - [`LivePipeline`] streams frames through one fixed transform until the
//!   sink is closed.

pub mod catalog;
pub mod config;
pub mod error;
pub mod live;
pub mod registry;
pub mod report;
pub mod runner;
pub mod source;
pub mod visualize;

pub use catalog::{ParameterCatalog, ParameterSet};
pub use config::{AppConfig, Calibration, LiveConfig, PreviewConfig, DEMO_AUDIO_URL};
pub use error::{BenchError, Result};
pub use live::{LivePipeline, PipelineState, SlidingWindow};
pub use registry::{
    ComputeResult, FeatureMatrix, Library, LibraryAdapter, LibraryRegistry, PreparedCall, Signal,
};
pub use report::Report;
pub use runner::{BenchmarkRunner, LibraryTimings, SignalPolicy, TimingSample, Timings};
pub use source::{AudioSource, DecodedAudio, WavSource};
pub use visualize::{normalize_peak, ComparisonVisualizer, VisualizationSink};
