//! Single-flight media worker
//!
//! The worker owns one background task that runs at most one fetch or download at
//! a time. Callers talk to it through a [`WorkerHandle`] (requests in) and an
//! [`EventReceiver`] (events out); neither side ever blocks on the other.
//!
//! Submodules:
//! - [`state`] - Admission rules and state transitions
//! - [`control`] - Supervising an in-flight operation (cancel, timeout)
//! - [`fetch`] - Metadata queries
//! - [`download`] - Downloads with progress
//! - [`lifecycle`] - Spawning, the request loop, and shutdown

mod control;
mod download;
mod fetch;
mod lifecycle;
pub(crate) mod state;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::Extractor;
use crate::types::{DownloadRequest, Event, FetchRequest, MediaInfo, Request, WorkerState};

/// Receiving side of the worker's event channel
///
/// Events for one operation arrive in emission order, ending with exactly one
/// terminal event, before any event of the next operation.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub(crate) type EventSender = mpsc::UnboundedSender<Event>;
pub(crate) type RequestReceiver = mpsc::UnboundedReceiver<Request>;

/// Background worker that executes fetches and downloads
///
/// Constructed only through [`MediaWorker::spawn`]; the value itself lives inside
/// the spawned task.
pub struct MediaWorker {
    /// Configuration (wrapped in Arc for sharing with operation futures)
    pub(crate) config: Arc<Config>,
    /// Extraction backend (trait object for pluggable implementations)
    pub(crate) extractor: Arc<dyn Extractor>,
    /// Event channel sender
    pub(crate) events: EventSender,
    /// Published state, mirrored by every handle
    pub(crate) state: watch::Sender<WorkerState>,
    /// Media info from the last successful fetch
    pub(crate) info: Option<MediaInfo>,
    /// Set once the request channel has closed
    pub(crate) requests_closed: bool,
}

/// Caller-side handle to a running [`MediaWorker`]
///
/// All request methods return immediately. They reject requests the worker's
/// current state cannot accept (according to the last published state); the
/// worker re-checks every request and ignores any that slipped through.
pub struct WorkerHandle {
    requests: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<WorkerState>,
    task: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl WorkerHandle {
    /// Resolve a URL to media info
    ///
    /// Answered by exactly one `InfoReady`, `Cancelled` or `Failed` event.
    ///
    /// # Errors
    ///
    /// `Error::RequestRejected` while another operation is in flight;
    /// `Error::WorkerStopped` once the worker has exited.
    pub fn fetch(&self, request: FetchRequest) -> Result<()> {
        self.submit(Request::Fetch(request))
    }

    /// Download the media from the last fetch
    ///
    /// Answered by `Progress` events ending in exactly one `Finished`,
    /// `Cancelled` or `Failed` event.
    ///
    /// # Errors
    ///
    /// `Error::RequestRejected` unless the worker is holding media info;
    /// `Error::WorkerStopped` once the worker has exited.
    pub fn download(&self, request: DownloadRequest) -> Result<()> {
        self.submit(Request::Download(request))
    }

    /// Cancel the in-flight operation
    ///
    /// Idempotent, and a no-op when nothing is running.
    ///
    /// # Errors
    ///
    /// `Error::WorkerStopped` once the worker has exited.
    pub fn cancel(&self) -> Result<()> {
        self.submit(Request::Cancel)
    }

    /// Discard retained media info and return to idle
    ///
    /// # Errors
    ///
    /// `Error::RequestRejected` while an operation is in flight;
    /// `Error::WorkerStopped` once the worker has exited.
    pub fn reset(&self) -> Result<()> {
        self.submit(Request::Reset)
    }

    /// Submit any request
    ///
    /// # Errors
    ///
    /// See the request-specific methods.
    pub fn submit(&self, request: Request) -> Result<()> {
        if self.requests.is_closed() {
            return Err(Error::WorkerStopped);
        }
        state::admit(self.state(), &request)?;
        self.requests
            .send(request)
            .map_err(|_| Error::WorkerStopped)
    }

    /// Last state published by the worker
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver that observes every published state change
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    /// Whether the worker task is still accepting requests
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish()
    }
}
