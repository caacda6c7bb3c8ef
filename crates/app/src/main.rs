mod adapters;
mod mic;
mod sink;

use clap::{Parser, Subcommand};
use mfcc_bench_core::{
    report, AppConfig, AudioSource, BenchmarkRunner, ComparisonVisualizer, LiveConfig, LivePipeline,
    ParameterCatalog, Signal, SlidingWindow, WavSource, DEMO_AUDIO_URL,
};
use tracing_subscriber::EnvFilter;

use crate::{mic::MicrophoneChunks, sink::TerminalSink};

fn main() -> mfcc_bench_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::default();

    let result = match cli.command {
        Commands::Compare => run_compare(&config),
        Commands::Live => run_live(&config.live),
    };
    if let Err(err) = &result {
        tracing::error!(error = %err, "aborting");
    }
    result
}

fn run_compare(config: &AppConfig) -> mfcc_bench_core::Result<()> {
    let registry = adapters::registry(config.calibration.clone())?;
    let catalog = ParameterCatalog::standard(config.calibration.sample_rate);
    tracing::info!(
        libraries = registry.len(),
        parameter_sets = catalog.len(),
        "starting comparison"
    );

    let visualizer = ComparisonVisualizer::new(config.preview.clone());
    let mut sink = TerminalSink::new();

    // The benchmark runs on synthetic signals, so a missing recording only
    // costs the visual comparison.
    let preview = WavSource::new().fetch_signal(DEMO_AUDIO_URL);
    match &preview {
        Ok(audio) => {
            if audio.sample_rate != config.calibration.sample_rate {
                tracing::warn!(
                    recorded = audio.sample_rate,
                    assumed = config.calibration.sample_rate,
                    "recording rate differs from calibration"
                );
            }
            let signal: Signal = mfcc_bench_core::normalize_peak(&audio.samples).into();
            visualizer.show(&signal, &registry, &mut sink)?;
        }
        Err(err) => tracing::error!(error = %err, "skipping visual comparison"),
    }

    let timings = BenchmarkRunner::new().run(&catalog, &registry)?;
    let report = report::format(&catalog, registry.calibration(), &timings)?;
    println!();
    print!("{report}");

    visualizer.wait_for_close(&mut sink);
    preview.map(|_| ())
}

fn run_live(live: &LiveConfig) -> mfcc_bench_core::Result<()> {
    tracing::info!(
        stride = live.stride,
        width = live.width,
        frame_len = live.frame_len(),
        "starting live mode"
    );

    let chunks = MicrophoneChunks::open(live.sample_rate, live.stride)?;
    let frames = SlidingWindow::new(chunks, live.stride, live.width)?;
    let mut pipeline = LivePipeline::new(frames, live.label.clone(), adapters::mel_transform(live));
    let mut sink = TerminalSink::new();

    let processed = pipeline.run(&mut sink)?;
    tracing::info!(frames = processed, "live mode finished");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "MFCC library benchmark and comparison", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Preview every library on a sample recording, then time them on the
    /// standard parameter sweep.
    Compare,
    /// Stream the microphone through a Mel spectrogram until the display is
    /// closed.
    Live,
}
