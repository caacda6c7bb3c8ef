//! Terminal heatmap display.
//!
//! Each label is a "window": a block of truecolor cells with coefficients as
//! rows and time running left to right. Showing the label that was drawn last
//! redraws it in place, which is what the live view relies on. Pressing Enter
//! closes every window at once. Heatmaps go to stderr by default so stdout
//! only carries the report.

use std::{
    io::{self, BufRead, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use colored::Colorize;
use mfcc_bench_core::VisualizationSink;
use ndarray::ArrayView2;

const DEFAULT_COLUMNS: usize = 96;

/// Inferno-like colour stops, dark to bright.
const PALETTE: [(f32, f32, f32); 5] = [
    (0.0, 0.0, 4.0),
    (87.0, 16.0, 110.0),
    (188.0, 55.0, 84.0),
    (249.0, 142.0, 9.0),
    (252.0, 255.0, 164.0),
];

pub struct TerminalSink<W: Write = io::Stderr> {
    out: W,
    columns: usize,
    windows: Vec<String>,
    last_drawn: Option<(String, usize)>,
    closed: Arc<AtomicBool>,
    close_events: Option<mpsc::Receiver<()>>,
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::with_writer(io::stderr(), DEFAULT_COLUMNS)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn with_writer(out: W, columns: usize) -> Self {
        Self {
            out,
            columns: columns.max(1),
            windows: Vec::new(),
            last_drawn: None,
            closed: Arc::new(AtomicBool::new(false)),
            close_events: None,
        }
    }

    /// Starts the stdin listener on first use. Any line (or EOF) closes all
    /// windows.
    fn listen_for_close(&mut self) {
        if self.close_events.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        let closed = Arc::clone(&self.closed);
        thread::spawn(move || {
            let mut line = String::new();
            if let Err(err) = io::stdin().lock().read_line(&mut line) {
                tracing::warn!(error = %err, "stdin closed unexpectedly");
            }
            closed.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        });
        self.close_events = Some(rx);
    }

    fn draw(&mut self, label: &str, matrix: ArrayView2<'_, f32>) -> io::Result<()> {
        let lines = render(label, matrix, self.columns);

        if let Some((last, height)) = &self.last_drawn {
            if last == label {
                write!(self.out, "\x1b[{height}A")?;
            }
        }
        for line in &lines {
            writeln!(self.out, "{line}\x1b[K")?;
        }
        self.out.flush()?;

        self.last_drawn = Some((label.to_string(), lines.len()));
        Ok(())
    }
}

impl<W: Write> VisualizationSink for TerminalSink<W> {
    fn display(&mut self, label: &str, matrix: ArrayView2<'_, f32>) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.listen_for_close();

        if !self.windows.iter().any(|open| open == label) {
            self.windows.push(label.to_string());
        }
        if let Err(err) = self.draw(label, matrix) {
            tracing::warn!(label, error = %err, "failed to draw heatmap");
        }
        true
    }

    fn has_open_windows(&self) -> bool {
        !self.windows.is_empty() && !self.closed.load(Ordering::SeqCst)
    }

    fn wait_until_closed(&mut self, _poll_interval: Duration) {
        if !self.has_open_windows() {
            return;
        }
        let prompt = format!("press Enter to close {} window(s)", self.windows.len());
        if let Err(err) = writeln!(self.out, "{}", prompt.dimmed()) {
            tracing::warn!(error = %err, "failed to write close prompt");
        }
        if let Some(events) = &self.close_events {
            let _ = events.recv();
        }
        self.windows.clear();
    }
}

/// Renders one heatmap block: a title line followed by one line per
/// coefficient. `matrix` is frame-major.
fn render(label: &str, matrix: ArrayView2<'_, f32>, columns: usize) -> Vec<String> {
    let (frames, coeffs) = matrix.dim();
    let mut lines = Vec::with_capacity(coeffs + 1);
    lines.push(format!(
        "{} {}",
        label.bold(),
        format!("({frames} frames x {coeffs} coefficients)").dimmed()
    ));
    if frames == 0 || coeffs == 0 {
        return lines;
    }

    let (low, high) = matrix
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = if high > low { high - low } else { 1.0 };

    let cells = columns.min(frames);
    for coeff in 0..coeffs {
        let mut line = String::new();
        for cell in 0..cells {
            let start = cell * frames / cells;
            let end = ((cell + 1) * frames / cells).max(start + 1);
            let column = matrix.slice(ndarray::s![start..end, coeff]);
            let mean = column.sum() / column.len() as f32;
            let (r, g, b) = colour((mean - low) / span);
            line.push_str(&"█".truecolor(r, g, b).to_string());
        }
        lines.push(line);
    }
    lines
}

/// Maps `t` in 0..=1 onto the palette.
fn colour(t: f32) -> (u8, u8, u8) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (PALETTE.len() - 1) as f32;
    let index = (scaled.floor() as usize).min(PALETTE.len() - 2);
    let frac = scaled - index as f32;
    let (a, b) = (PALETTE[index], PALETTE[index + 1]);
    let lerp = |x: f32, y: f32| (x + (y - x) * frac).round() as u8;
    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}
