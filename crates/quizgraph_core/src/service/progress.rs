//! Progress reporting and cancellation for long-running batch operations.
//!
//! # Responsibility
//! - Let batch maintenance report `(processed, total)` to an external sink.
//! - Let callers stop a batch between per-record steps.
//!
//! # Invariants
//! - `advance` is called once per completed unit, with `done` increasing by 1.
//! - `should_stop` is consulted before each unit, never in the middle of one.

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_LOG_STRIDE: usize = 100;

/// Receiver of batch progress.
pub trait ProgressSink {
    /// A batch of `total` units is starting.
    fn begin(&mut self, _label: &str, _total: usize) {}
    /// `done` of `total` units are complete.
    fn advance(&mut self, _done: usize, _total: usize) {}
    /// The batch ended after `done` units.
    fn finish(&mut self, _label: &str, _done: usize) {}
    /// Returns `true` to stop before the next unit.
    fn should_stop(&self) -> bool {
        false
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Emits `event=progress` log lines every `stride` units and at the end.
#[derive(Debug)]
pub struct LogProgress {
    stride: usize,
    label: String,
    started_at: Option<Instant>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::with_stride(DEFAULT_LOG_STRIDE)
    }

    pub fn with_stride(stride: usize) -> Self {
        Self {
            stride: stride.max(1),
            label: String::new(),
            started_at: None,
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for LogProgress {
    fn begin(&mut self, label: &str, total: usize) {
        self.label = label.to_string();
        self.started_at = Some(Instant::now());
        info!("event=progress module=maintenance status=start label=\"{label}\" total={total}");
    }

    fn advance(&mut self, done: usize, total: usize) {
        if done % self.stride == 0 && done != total {
            info!(
                "event=progress module=maintenance status=running label=\"{}\" done={} total={}",
                self.label, done, total
            );
        }
    }

    fn finish(&mut self, label: &str, done: usize) {
        let duration_ms = self
            .started_at
            .map_or(0, |started_at| started_at.elapsed().as_millis());
        info!(
            "event=progress module=maintenance status=ok label=\"{label}\" done={done} duration_ms={duration_ms}"
        );
    }
}

/// Shared cancellation switch.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wraps a sink so that a `CancelFlag` can stop the batch.
#[derive(Debug)]
pub struct Cancellable<P> {
    inner: P,
    flag: CancelFlag,
}

impl<P: ProgressSink> Cancellable<P> {
    pub fn new(inner: P, flag: CancelFlag) -> Self {
        Self { inner, flag }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: ProgressSink> ProgressSink for Cancellable<P> {
    fn begin(&mut self, label: &str, total: usize) {
        self.inner.begin(label, total);
    }

    fn advance(&mut self, done: usize, total: usize) {
        self.inner.advance(done, total);
    }

    fn finish(&mut self, label: &str, done: usize) {
        self.inner.finish(label, done);
    }

    fn should_stop(&self) -> bool {
        self.flag.is_cancelled() || self.inner.should_stop()
    }
}
