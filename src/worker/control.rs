//! Supervision of the in-flight operation (cancellation and timeouts)

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorDetail, ExtractionError};
use crate::types::{Event, Request, WorkerState};

use super::{MediaWorker, RequestReceiver, state};

/// How a supervised operation ended
#[derive(Debug)]
pub(crate) enum Outcome<T> {
    Succeeded(T),
    Cancelled,
    Failed(ErrorDetail),
}

impl MediaWorker {
    /// Drive `op` to completion while serving requests
    ///
    /// Requests arriving while `op` runs are handled here: `Cancel` trips `token`,
    /// anything else is rejected. A closed request channel also trips `token`.
    /// When the configured operation timeout elapses first, `token` is tripped and
    /// the resulting cancellation is reported as a `timed_out` failure.
    ///
    /// `op` is always polled to completion before this returns.
    pub(crate) async fn supervise<T, F>(
        &mut self,
        op: F,
        token: &CancellationToken,
        requests: &mut RequestReceiver,
    ) -> Outcome<T>
    where
        F: Future<Output = crate::Result<T>>,
    {
        tokio::pin!(op);

        let timeout = self.config.worker.operation_timeout;
        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        let mut timed_out = false;

        let result = loop {
            tokio::select! {
                biased;
                result = &mut op => break result,
                request = requests.recv(), if !self.requests_closed => match request {
                    Some(Request::Cancel) => self.request_cancel(token),
                    Some(other) => {
                        if let Err(e) = self.admission(&other) {
                            self.reject(&other, &e);
                        }
                    }
                    None => {
                        tracing::info!("request channel closed, cancelling in-flight operation");
                        self.requests_closed = true;
                        self.request_cancel(token);
                    }
                },
                _ = &mut deadline, if !timed_out => {
                    timed_out = true;
                    tracing::warn!(timeout = ?timeout, state = %self.current_state(), "operation timed out, cancelling");
                    self.request_cancel(token);
                }
            }
        };

        match result {
            Ok(value) => Outcome::Succeeded(value),
            Err(Error::Cancelled) if timed_out => {
                let error: Error = ExtractionError::TimedOut {
                    after: timeout.unwrap_or_default(),
                }
                .into();
                Outcome::Failed(error.detail())
            }
            Err(Error::Cancelled) => Outcome::Cancelled,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    code = e.error_code(),
                    extractor = self.extractor.name(),
                    "operation failed"
                );
                Outcome::Failed(e.detail())
            }
        }
    }

    /// Trip the token of the in-flight operation
    pub(crate) fn request_cancel(&mut self, token: &CancellationToken) {
        if token.is_cancelled() {
            tracing::debug!("cancellation already requested");
            return;
        }
        tracing::info!(state = %self.current_state(), "cancelling in-flight operation");
        token.cancel();
        self.set_state(WorkerState::Cancelling);
    }

    /// Check `request` against the current state and retained media info
    pub(crate) fn admission(&self, request: &Request) -> crate::Result<()> {
        let state = self.current_state();
        state::admit(state, request)?;
        state::check_download_url(state, request, self.info.as_ref())
    }

    /// Log and drop a request the current state cannot accept
    pub(crate) fn reject(&self, request: &Request, error: &Error) {
        tracing::warn!(request = request.kind(), error = %error, "request rejected");
    }

    /// Publish a state change to every handle
    pub(crate) fn set_state(&mut self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "worker state changed");
        }
    }

    /// Current published state
    pub(crate) fn current_state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Emit an event to the caller
    pub(crate) fn emit(&self, event: Event) {
        // Receiver may be gone if the caller stopped listening; keep working regardless
        self.events.send(event).ok();
    }
}
