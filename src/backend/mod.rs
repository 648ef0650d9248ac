//! Glue between the synth and whatever pulls audio out of it.
//!
//! A device callback asks for interleaved frames of arbitrary length. The
//! synth renders planar stereo in blocks of at most [`MAX_BLOCK_SIZE`].
//! [`BlockAdapter`] bridges the two with preallocated scratch buffers:
//!
//! ```text
//!   callback(out: [L R L R ...], n frames)
//!     └─ for each chunk of <= MAX_BLOCK_SIZE frames
//!          renderer.render(left[..k], right[..k])
//!          interleave into out
//! ```
//!
//! Which backend drives the adapter is decided once at startup
//! ([`negotiate`]); afterwards only the [`Capability`] flag remains.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::synth::{MessageReceiver, PolySynth};
use crate::MAX_BLOCK_SIZE;

/// Pull-based stereo sample producer.
pub trait AudioRenderer: Send {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]);

    fn sample_rate(&self) -> f32;
}

impl<R: MessageReceiver + Send> AudioRenderer for PolySynth<R> {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        PolySynth::render(self, left, right);
    }

    fn sample_rate(&self) -> f32 {
        self.config().sample_rate
    }
}

/// Peak level of the most recent block, readable from any thread.
#[derive(Debug, Clone, Default)]
pub struct LevelMeter {
    bits: Arc<AtomicU32>,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn store(&self, peak: f32) {
        self.bits.store(peak.to_bits(), Ordering::Relaxed);
    }
}

pub struct BlockAdapter<R: AudioRenderer> {
    renderer: R,
    left: Vec<f32>,
    right: Vec<f32>,
    meter: Option<LevelMeter>,
}

impl<R: AudioRenderer> BlockAdapter<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            left: vec![0.0; MAX_BLOCK_SIZE],
            right: vec![0.0; MAX_BLOCK_SIZE],
            meter: None,
        }
    }

    pub fn with_meter(mut self, meter: LevelMeter) -> Self {
        self.meter = Some(meter);
        self
    }

    /// Fill an interleaved buffer of `channels` channels.
    ///
    /// Mono gets the average of both sides; channels past the second are
    /// left silent.
    pub fn process_interleaved(&mut self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let mut peak = 0.0f32;

        for frames in out.chunks_mut(MAX_BLOCK_SIZE * channels) {
            let len = frames.len() / channels;
            let left = &mut self.left[..len];
            let right = &mut self.right[..len];
            self.renderer.render(left, right);

            for (frame, (&l, &r)) in frames
                .chunks_exact_mut(channels)
                .zip(left.iter().zip(right.iter()))
            {
                peak = peak.max(l.abs()).max(r.abs());
                match frame {
                    [mono] => *mono = 0.5 * (l + r),
                    [fl, fr, rest @ ..] => {
                        *fl = l;
                        *fr = r;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        }

        if let Some(meter) = &self.meter {
            meter.store(peak);
        }
    }

    /// Planar stereo, any length.
    pub fn process_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = left.len().min(right.len());
        for (l, r) in left[..len]
            .chunks_mut(MAX_BLOCK_SIZE)
            .zip(right[..len].chunks_mut(MAX_BLOCK_SIZE))
        {
            self.renderer.render(l, r);
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_inner(self) -> R {
        self.renderer
    }
}

/// Outcome of the one-time backend negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// A device callback pulls samples.
    Realtime,
    /// No device; a paced thread pulls samples instead.
    Fallback,
}

impl Capability {
    pub fn is_realtime(self) -> bool {
        self == Capability::Realtime
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Realtime => f.write_str("realtime"),
            Capability::Fallback => f.write_str("offline"),
        }
    }
}

/// Try the realtime backend once. On failure the error is logged and the
/// caller gets `Fallback` with no backend.
pub fn negotiate<T, E: fmt::Display>(
    attempt: impl FnOnce() -> Result<T, E>,
) -> (Capability, Option<T>) {
    match attempt() {
        Ok(backend) => {
            info!("audio backend: realtime");
            (Capability::Realtime, Some(backend))
        }
        Err(err) => {
            warn!("realtime audio unavailable ({err}), rendering offline");
            (Capability::Fallback, None)
        }
    }
}

/// Renders blocks on a background thread at roughly real-time pace and
/// discards them. Keeps voices ageing when there is no device.
pub struct PacedRenderer {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PacedRenderer {
    pub fn spawn<R: AudioRenderer + 'static>(
        mut adapter: BlockAdapter<R>,
        block_frames: usize,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let block_frames = block_frames.clamp(1, MAX_BLOCK_SIZE);
        let sample_rate = adapter.renderer().sample_rate().max(1.0);
        let period = Duration::from_secs_f64(block_frames as f64 / f64::from(sample_rate));

        let thread = thread::Builder::new().name("offline-render".into()).spawn({
            let running = Arc::clone(&running);
            move || {
                let mut buffer = vec![0.0f32; block_frames * 2];
                let mut next = Instant::now();
                while running.load(Ordering::Relaxed) {
                    adapter.process_interleaved(&mut buffer, 2);
                    next += period;
                    if let Some(wait) = next.checked_duration_since(Instant::now()) {
                        thread::sleep(wait);
                    }
                }
            }
        })?;

        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    pub fn stop(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("offline renderer panicked");
            }
        }
    }
}

impl Drop for PacedRenderer {
    fn drop(&mut self) {
        self.join();
    }
}
