//! Progress normalization
//!
//! [`ProgressTracker`] turns raw byte counts into percentages; [`ProgressSink`] is
//! the push side the extractor drives, forwarding normalized progress to the
//! worker's event channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::types::{Event, ProgressEvent};

/// Converts byte counts into a non-decreasing completion percentage
///
/// Updates without a known total produce nothing, so the last reported
/// percentage stands until a total becomes available.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<f32>,
}

impl ProgressTracker {
    /// Create a tracker that has reported nothing yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a byte count, returning the percentage if it advanced
    pub fn update(&mut self, downloaded: u64, total: Option<u64>) -> Option<f32> {
        let total = total.filter(|t| *t > 0)?;
        let percent = ((downloaded as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32;

        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }

    /// Last percentage returned by [`update`](Self::update)
    pub fn last(&self) -> Option<f32> {
        self.last
    }
}

/// Push-style progress channel handed to the extractor for one download
///
/// Enforces the event stream rules regardless of what the extractor reports:
/// percentages never go backwards, `PostProcessing` is reported once, and nothing
/// is forwarded after the operation's cancellation token fires.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    events: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    // f32 bits of the last forwarded percentage; NaN bits until the first one
    last_percent: Arc<AtomicU32>,
    post_processing: Arc<AtomicBool>,
}

impl ProgressSink {
    /// Create a sink that forwards to `events` until `cancel` fires
    pub fn new(events: mpsc::UnboundedSender<Event>, cancel: CancellationToken) -> Self {
        Self {
            events,
            cancel,
            last_percent: Arc::new(AtomicU32::new(f32::NAN.to_bits())),
            post_processing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report download completion percentage (clamped to 0..=100)
    pub fn downloading(&self, percent: f32) {
        if percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);

        let advanced = self
            .last_percent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let last = f32::from_bits(bits);
                (last.is_nan() || percent > last).then_some(percent.to_bits())
            })
            .is_ok();

        if advanced {
            self.emit(ProgressEvent::Downloading { percent });
        }
    }

    /// Report that merge or transcode has started
    pub fn post_processing(&self) {
        if !self.post_processing.swap(true, Ordering::AcqRel) {
            self.emit(ProgressEvent::PostProcessing);
        }
    }

    /// Report the finished file
    pub fn completed(&self, final_path: PathBuf) {
        self.emit(ProgressEvent::Completed { final_path });
    }

    /// Last forwarded percentage
    pub fn last_percent(&self) -> Option<f32> {
        let last = f32::from_bits(self.last_percent.load(Ordering::Acquire));
        (!last.is_nan()).then_some(last)
    }

    fn emit(&self, progress: ProgressEvent) {
        if self.cancel.is_cancelled() {
            tracing::trace!(?progress, "dropping progress after cancellation");
            return;
        }
        // Receiver may be gone if the caller dropped its side; progress is best-effort
        self.events.send(Event::Progress(progress)).ok();
    }
}
