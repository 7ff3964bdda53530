//! Worker state machine rules
//!
//! Pure functions shared by the worker (authoritative) and [`WorkerHandle`](super::WorkerHandle)
//! (early rejection against its state mirror).

use crate::error::{Error, Result};
use crate::types::{MediaInfo, Request, WorkerState};

/// Long-running operation kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    Fetch,
    Download,
}

impl Operation {
    /// State while the operation is in flight
    pub(crate) fn running_state(self) -> WorkerState {
        match self {
            Operation::Fetch => WorkerState::FetchingInfo,
            Operation::Download => WorkerState::Downloading,
        }
    }

    /// State after the operation's terminal event
    ///
    /// Only a successful fetch leaves media info behind; every other ending
    /// returns to `Idle`.
    pub(crate) fn settled_state(self, succeeded: bool) -> WorkerState {
        match (self, succeeded) {
            (Operation::Fetch, true) => WorkerState::InfoReady,
            _ => WorkerState::Idle,
        }
    }
}

fn rejected(request: &Request, state: WorkerState, reason: &str) -> Error {
    Error::RequestRejected {
        request: request.kind(),
        state,
        reason: reason.to_string(),
    }
}

/// Whether `request` may be accepted in `state`
///
/// `Cancel` is always admitted (it is a no-op when nothing is in flight).
pub(crate) fn admit(state: WorkerState, request: &Request) -> Result<()> {
    match request {
        Request::Cancel => Ok(()),
        _ if state.is_busy() => Err(rejected(request, state, "another operation is in flight")),
        Request::Fetch(_) | Request::Reset => Ok(()),
        Request::Download(_) if state == WorkerState::InfoReady => Ok(()),
        Request::Download(_) => Err(rejected(
            request,
            state,
            "no media info available, fetch first",
        )),
    }
}

/// Whether a download URL refers to the media from the last fetch
pub(crate) fn check_download_url(
    state: WorkerState,
    request: &Request,
    info: Option<&MediaInfo>,
) -> Result<()> {
    let Request::Download(download) = request else {
        return Ok(());
    };
    match info {
        Some(info) if info.canonical_url == download.url => Ok(()),
        Some(_) => Err(rejected(
            request,
            state,
            "URL does not match the last fetched media",
        )),
        None => Err(rejected(
            request,
            state,
            "no media info available, fetch first",
        )),
    }
}
