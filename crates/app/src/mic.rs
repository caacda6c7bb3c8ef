//! Microphone capture as a blocking chunk iterator.
//!
//! The cpal callback never allocates: it copies each device buffer into a
//! pre-allocated `Vec` taken from a free ring and hands it over on a filled
//! ring. The reading side drains filled buffers and returns them to the free
//! ring.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use mfcc_bench_core::{BenchError, Result};
use rtrb::{Consumer, Producer, RingBuffer};

const DEVICE: &str = "default input device";
const BUFFER_COUNT: usize = 32;
const BUFFER_SIZE: usize = 8192;
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Audio-thread half of the buffer pool.
struct CaptureSide {
    free: Consumer<Vec<f32>>,
    filled: Producer<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl CaptureSide {
    /// Copies `data` into a pooled buffer. Counts the callback as dropped when
    /// the reader has not returned any buffer yet.
    fn write(&mut self, data: &[f32]) {
        match self.free.pop() {
            Ok(mut buffer) => {
                buffer.clear();
                let len = data.len().min(buffer.capacity());
                buffer.extend_from_slice(&data[..len]);
                let _ = self.filled.push(buffer);
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Reader half: regroups captured buffers into `stride`-sample chunks.
struct ChunkSide {
    filled: Consumer<Vec<f32>>,
    free: Producer<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
    pending: Vec<f32>,
    stride: usize,
}

impl ChunkSide {
    fn try_next(&mut self) -> Option<Vec<f32>> {
        while self.pending.len() < self.stride {
            let buffer = self.filled.pop().ok()?;
            self.pending.extend_from_slice(&buffer);
            let _ = self.free.push(buffer);
        }

        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            tracing::debug!(dropped, "capture pool exhausted, device buffers lost");
        }

        let rest = self.pending.split_off(self.stride);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}

fn buffer_pool(count: usize, size: usize, stride: usize) -> (CaptureSide, ChunkSide) {
    let (mut free_tx, free_rx) = RingBuffer::new(count);
    let (filled_tx, filled_rx) = RingBuffer::new(count);
    for _ in 0..count {
        let _ = free_tx.push(Vec::with_capacity(size));
    }
    let dropped = Arc::new(AtomicUsize::new(0));

    let capture = CaptureSide {
        free: free_rx,
        filled: filled_tx,
        dropped: Arc::clone(&dropped),
    };
    let chunks = ChunkSide {
        filled: filled_rx,
        free: free_tx,
        dropped,
        pending: Vec::with_capacity(stride * 2),
        stride,
    };
    (capture, chunks)
}

/// Yields mono chunks of exactly `stride` samples from the default input
/// device. Iteration blocks until enough audio has arrived.
pub struct MicrophoneChunks {
    _stream: cpal::Stream,
    chunks: ChunkSide,
    errors: Receiver<String>,
}

impl MicrophoneChunks {
    pub fn open(sample_rate: u32, stride: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| BenchError::source_unavailable(DEVICE, "no input device available"))?;
        if let Ok(name) = device.name() {
            tracing::info!(device = %name, sample_rate, stride, "opening microphone");
        }

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (mut capture, chunks) = buffer_pool(BUFFER_COUNT, BUFFER_SIZE, stride);
        let (err_tx, errors) = mpsc::channel();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| capture.write(data),
                move |err| {
                    let _ = err_tx.send(err.to_string());
                },
                None,
            )
            .map_err(|err| BenchError::source_unavailable(DEVICE, err))?;
        stream.play().map_err(|err| BenchError::source_unavailable(DEVICE, err))?;

        Ok(Self {
            _stream: stream,
            chunks,
            errors,
        })
    }
}

impl Iterator for MicrophoneChunks {
    type Item = Result<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Ok(reason) = self.errors.try_recv() {
                return Some(Err(BenchError::source_unavailable(DEVICE, reason)));
            }
            if let Some(chunk) = self.chunks.try_next() {
                return Some(Ok(chunk));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
