use std::{thread, time::Duration};

use ndarray::{s, ArrayView2};

use crate::{
    registry::{FeatureMatrix, LibraryRegistry, Signal},
    BenchError, PreviewConfig, Result,
};

/// Something that can show labelled 2D matrices, such as a window manager.
pub trait VisualizationSink {
    /// Shows `matrix` under `label`, reusing the window if the label is
    /// already open. Returns `false` once the user has closed the display.
    fn display(&mut self, label: &str, matrix: ArrayView2<'_, f32>) -> bool;

    fn has_open_windows(&self) -> bool;

    /// Blocks until every window is closed. Sinks with a native close event
    /// should override the polling fallback.
    fn wait_until_closed(&mut self, poll_interval: Duration) {
        while self.has_open_windows() {
            thread::sleep(poll_interval);
        }
    }
}

/// Puts the longer axis first, treating the shorter one as coefficients.
/// Square matrices are returned unchanged.
pub fn orient(matrix: FeatureMatrix) -> FeatureMatrix {
    if matrix.nrows() < matrix.ncols() {
        matrix.reversed_axes()
    } else {
        matrix
    }
}

/// Drops coefficient 0 (energy/DC) from a frame-major matrix.
pub fn drop_leading_coefficient(matrix: &FeatureMatrix) -> Option<ArrayView2<'_, f32>> {
    (matrix.ncols() > 1).then(|| matrix.slice(s![.., 1..]))
}

/// Scales samples so the largest magnitude becomes 1. Silent input is
/// returned unchanged.
pub fn normalize_peak(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()));
    if peak > 0.0 {
        samples.iter().map(|s| s / peak).collect()
    } else {
        samples.to_vec()
    }
}

/// Runs each library once on a real signal and sends its output to a sink.
#[derive(Debug, Clone, Default)]
pub struct ComparisonVisualizer {
    preview: PreviewConfig,
}

impl ComparisonVisualizer {
    pub fn new(preview: PreviewConfig) -> Self {
        Self { preview }
    }

    /// Opens one window per library in registry order without waiting.
    pub fn show<S: VisualizationSink + ?Sized>(
        &self,
        signal: &Signal,
        registry: &LibraryRegistry,
        sink: &mut S,
    ) -> Result<()> {
        for library in registry.iter() {
            let failed = |source: anyhow::Error| BenchError::AdapterInvocation {
                library: library.name().to_string(),
                parameter_set: "preview".to_string(),
                source,
            };

            let matrix = library
                .prepare(
                    signal,
                    self.preview.hop_duration,
                    self.preview.fft_size,
                    registry.calibration(),
                )
                .invoke()
                .map_err(failed)?;
            let matrix = orient(matrix);
            let view = drop_leading_coefficient(&matrix).ok_or_else(|| {
                failed(anyhow::anyhow!(
                    "output of shape {:?} has no coefficients besides the first",
                    matrix.dim()
                ))
            })?;

            tracing::info!(library = library.name(), shape = ?view.dim(), "showing features");
            sink.display(library.name(), view);
        }
        Ok(())
    }

    /// Blocks until the sink reports that every window is closed.
    pub fn wait_for_close<S: VisualizationSink + ?Sized>(&self, sink: &mut S) {
        sink.wait_until_closed(self.preview.poll_interval);
    }

    /// [`show`](Self::show) followed by [`wait_for_close`](Self::wait_for_close).
    pub fn visualize_sample<S: VisualizationSink + ?Sized>(
        &self,
        signal: &Signal,
        registry: &LibraryRegistry,
        sink: &mut S,
    ) -> Result<()> {
        self.show(signal, registry, sink)?;
        self.wait_for_close(sink);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use ndarray::Array2;

    use super::*;
    use crate::{registry::LibraryAdapter, Calibration};

    #[derive(Default)]
    struct RecordingSink {
        shown: Vec<(String, (usize, usize), Vec<f32>)>,
        polls_until_closed: Cell<u32>,
    }

    impl VisualizationSink for RecordingSink {
        fn display(&mut self, label: &str, matrix: ArrayView2<'_, f32>) -> bool {
            self.shown
                .push((label.to_string(), matrix.dim(), matrix.iter().copied().collect()));
            true
        }

        fn has_open_windows(&self) -> bool {
            let left = self.polls_until_closed.get();
            self.polls_until_closed.set(left.saturating_sub(1));
            left > 0
        }
    }

    fn shaped(name: &str, rows: usize, cols: usize) -> LibraryAdapter<(usize, usize)> {
        LibraryAdapter::new(
            name,
            move |_: &Signal, _, _, _: &Calibration| (rows, cols),
            |&(rows, cols): &(usize, usize)| {
                Ok(Array2::from_shape_fn((rows, cols), |(r, c)| (r * 100 + c) as f32))
            },
        )
    }

    fn signal() -> Signal {
        vec![0.0; 16].into()
    }

    #[test]
    fn coefficient_major_output_is_flipped_and_trimmed() {
        let registry = LibraryRegistry::builder(Calibration::default())
            .register(shaped("wide", 3, 13))
            .register(shaped("tall", 40, 13))
            .build()
            .unwrap();
        let mut sink = RecordingSink::default();

        ComparisonVisualizer::default()
            .show(&signal(), &registry, &mut sink)
            .unwrap();

        assert_eq!(sink.shown.len(), 2);
        assert_eq!(sink.shown[0].0, "wide");
        assert_eq!(sink.shown[0].1, (13, 2));
        // Column 0 of the transposed matrix was input row 0.
        assert_eq!(&sink.shown[0].2[..2], &[100.0, 200.0]);
        assert_eq!(sink.shown[1].0, "tall");
        assert_eq!(sink.shown[1].1, (40, 12));
    }

    #[test]
    fn square_output_is_not_transposed() {
        let square = Array2::from_shape_fn((4, 4), |(r, c)| (r * 10 + c) as f32);
        let oriented = orient(square.clone());
        assert_eq!(oriented, square);

        let trimmed = drop_leading_coefficient(&oriented).unwrap();
        assert_eq!(trimmed.dim(), (4, 3));
        assert_eq!(trimmed[[0, 0]], 1.0);
    }

    #[test]
    fn single_coefficient_output_is_an_invocation_error() {
        let registry = LibraryRegistry::builder(Calibration::default())
            .register(shaped("flat", 1, 1))
            .build()
            .unwrap();
        let err = ComparisonVisualizer::default()
            .show(&signal(), &registry, &mut RecordingSink::default())
            .unwrap_err();
        assert!(matches!(err, BenchError::AdapterInvocation { ref library, .. } if library == "flat"));
    }

    #[test]
    fn preview_uses_fixed_call_shape() {
        let shapes = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen = shapes.clone();
        let registry = LibraryRegistry::builder(Calibration::default())
            .register(LibraryAdapter::new(
                "shape",
                move |_: &Signal, hop: f32, fft: usize, _: &Calibration| seen.borrow_mut().push((hop, fft)),
                |_: &()| Ok(Array2::zeros((10, 3))),
            ))
            .build()
            .unwrap();

        ComparisonVisualizer::default()
            .show(&signal(), &registry, &mut RecordingSink::default())
            .unwrap();

        assert_eq!(*shapes.borrow(), vec![(0.01, 512)]);
    }

    #[test]
    fn waits_until_windows_close() {
        let sink = &mut RecordingSink::default();
        sink.polls_until_closed.set(3);
        let visualizer = ComparisonVisualizer::new(PreviewConfig {
            poll_interval: Duration::from_millis(1),
            ..PreviewConfig::default()
        });

        visualizer.wait_for_close(sink);

        assert!(!sink.has_open_windows());
    }

    #[test]
    fn peak_normalization_uses_magnitude() {
        assert_eq!(normalize_peak(&[0.5, -2.0, 1.0]), vec![0.25, -1.0, 0.5]);
        assert_eq!(normalize_peak(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
