//! Pull-transform-push loop for live feature display.

use std::collections::VecDeque;

use crate::{registry::FeatureMatrix, visualize::VisualizationSink, BenchError, Result};

/// Turns a producer of `stride`-sample chunks into overlapping frames of
/// `stride * (width + 1)` samples, advancing by one chunk per frame.
///
/// Nothing is yielded until the first frame is full.
#[derive(Debug)]
pub struct SlidingWindow<I> {
    chunks: I,
    stride: usize,
    frame_len: usize,
    buffer: VecDeque<f32>,
}

impl<I> SlidingWindow<I>
where
    I: Iterator<Item = Result<Vec<f32>>>,
{
    pub fn new(chunks: I, stride: usize, width: usize) -> Result<Self> {
        if stride == 0 {
            return Err(BenchError::configuration("frame stride must be non-zero"));
        }
        let frame_len = stride * (width + 1);
        Ok(Self {
            chunks,
            stride,
            frame_len,
            buffer: VecDeque::with_capacity(frame_len),
        })
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

impl<I> Iterator for SlidingWindow<I>
where
    I: Iterator<Item = Result<Vec<f32>>>,
{
    type Item = Result<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let chunk = match self.chunks.next()? {
                Ok(chunk) => chunk,
                Err(err) => return Some(Err(err)),
            };
            if chunk.len() != self.stride {
                return Some(Err(BenchError::msg(format!(
                    "frame source produced {} samples, expected {}",
                    chunk.len(),
                    self.stride
                ))));
            }

            self.buffer.extend(chunk);
            let overflow = self.buffer.len().saturating_sub(self.frame_len);
            self.buffer.drain(..overflow);

            if self.buffer.len() == self.frame_len {
                return Some(Ok(self.buffer.iter().copied().collect()));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Streaming,
    Stopped,
}

/// A frame source bound to one fixed transform.
///
/// Starts in [`PipelineState::Streaming`]. The first `false` from the sink
/// (or the end of the source) moves it to [`PipelineState::Stopped`], after
/// which no further frames are pulled. A stopped pipeline cannot restart.
pub struct LivePipeline<F, T> {
    frames: F,
    transform: T,
    label: String,
    state: PipelineState,
    processed: usize,
}

impl<F, T> LivePipeline<F, T>
where
    F: Iterator<Item = Result<Vec<f32>>>,
    T: FnMut(&[f32]) -> anyhow::Result<FeatureMatrix>,
{
    pub fn new(frames: F, label: impl Into<String>, transform: T) -> Self {
        Self {
            frames,
            transform,
            label: label.into(),
            state: PipelineState::Streaming,
            processed: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Frames transformed so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Handles one frame. Returns the state after the step.
    pub fn step<S: VisualizationSink + ?Sized>(&mut self, sink: &mut S) -> Result<PipelineState> {
        if self.state == PipelineState::Stopped {
            return Ok(self.state);
        }

        let frame = match self.frames.next() {
            Some(frame) => frame?,
            None => {
                tracing::info!(frames = self.processed, "frame source exhausted");
                self.state = PipelineState::Stopped;
                return Ok(self.state);
            }
        };

        let features = (self.transform)(&frame).map_err(|source| BenchError::AdapterInvocation {
            library: self.label.clone(),
            parameter_set: format!("live frame {}", self.processed),
            source,
        })?;
        self.processed += 1;

        if !sink.display(&self.label, features.view()) {
            tracing::info!(frames = self.processed, "display closed, stopping");
            self.state = PipelineState::Stopped;
        }
        Ok(self.state)
    }

    /// Streams until the sink closes or the source ends.
    pub fn run<S: VisualizationSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize> {
        while self.step(sink)? == PipelineState::Streaming {}
        Ok(self.processed)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use ndarray::{Array2, ArrayView2};

    use super::*;

    struct ScriptedSink {
        answers: Vec<bool>,
        calls: usize,
    }

    impl VisualizationSink for ScriptedSink {
        fn display(&mut self, _label: &str, _matrix: ArrayView2<'_, f32>) -> bool {
            let answer = self.answers.get(self.calls).copied().unwrap_or(true);
            self.calls += 1;
            answer
        }

        fn has_open_windows(&self) -> bool {
            false
        }
    }

    fn counted_frames(count: usize, pulled: Rc<Cell<usize>>) -> impl Iterator<Item = Result<Vec<f32>>> {
        (0..count).map(move |i| {
            pulled.set(pulled.get() + 1);
            Ok(vec![i as f32; 4])
        })
    }

    #[test]
    fn stops_when_sink_closes() {
        let pulled = Rc::new(Cell::new(0));
        let transformed = Rc::new(Cell::new(0));
        let counter = transformed.clone();
        let mut sink = ScriptedSink {
            answers: vec![true, true, true, false],
            calls: 0,
        };

        let mut pipeline = LivePipeline::new(counted_frames(5, pulled.clone()), "Mel spectrogram", |frame: &[f32]| {
            counter.set(counter.get() + 1);
            Ok(Array2::from_elem((2, 2), frame[0]))
        });
        let processed = pipeline.run(&mut sink).unwrap();

        assert_eq!(processed, 4);
        assert_eq!(transformed.get(), 4);
        assert_eq!(pulled.get(), 4);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn stopped_pipeline_pulls_nothing_more() {
        let pulled = Rc::new(Cell::new(0));
        let mut sink = ScriptedSink {
            answers: vec![false],
            calls: 0,
        };
        let mut pipeline = LivePipeline::new(counted_frames(5, pulled.clone()), "x", |_: &[f32]| {
            Ok(Array2::zeros((1, 1)))
        });

        pipeline.run(&mut sink).unwrap();
        assert_eq!(pipeline.step(&mut sink).unwrap(), PipelineState::Stopped);
        assert_eq!(pulled.get(), 1);
        assert_eq!(sink.calls, 1);
    }

    #[test]
    fn exhausted_source_stops_the_pipeline() {
        let mut sink = ScriptedSink {
            answers: vec![],
            calls: 0,
        };
        let mut pipeline = LivePipeline::new(counted_frames(2, Rc::default()), "x", |_: &[f32]| {
            Ok(Array2::zeros((1, 1)))
        });
        assert_eq!(pipeline.run(&mut sink).unwrap(), 2);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn source_errors_propagate() {
        let frames = vec![Ok(vec![0.0; 4]), Err(BenchError::source_unavailable("mic", "device unplugged"))];
        let mut sink = ScriptedSink {
            answers: vec![],
            calls: 0,
        };
        let mut pipeline = LivePipeline::new(frames.into_iter(), "x", |_: &[f32]| Ok(Array2::zeros((1, 1))));
        let err = pipeline.run(&mut sink).unwrap_err();
        assert!(matches!(err, BenchError::SourceUnavailable { .. }));
    }

    #[test]
    fn sliding_window_overlaps_by_all_but_one_stride() {
        let chunks = (0..4).map(|i| Ok(vec![i as f32; 2]));
        let frames: Vec<Vec<f32>> = SlidingWindow::new(chunks, 2, 2)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(frames[1], vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn sliding_window_rejects_wrong_chunk_size() {
        let chunks = std::iter::once(Ok(vec![0.0; 3]));
        let mut frames = SlidingWindow::new(chunks, 2, 1).unwrap();
        assert!(frames.next().unwrap().is_err());
    }
}
