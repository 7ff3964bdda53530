//! Startup, the request loop, and shutdown coordination.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::{self, Extractor};
use crate::types::{Request, WorkerState};

use super::{EventReceiver, MediaWorker, RequestReceiver, WorkerHandle};

impl MediaWorker {
    /// Spawn the worker task on the current Tokio runtime
    ///
    /// Returns the handle used to submit requests and the receiver for the
    /// worker's events. Dropping the handle cancels any in-flight operation and
    /// stops the worker.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, CookieBrowser, Event, FetchRequest, MediaWorker, extractor};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> media_dl::Result<()> {
    /// let config = Config::default();
    /// let (handle, mut events) = MediaWorker::spawn(config.clone(), extractor::discover(&config));
    ///
    /// handle.fetch(FetchRequest::new("https://example.com/video", CookieBrowser::None))?;
    /// if let Some(Event::InfoReady(info)) = events.recv().await {
    ///     println!("{} ({})", info.title, info.duration_display);
    /// }
    ///
    /// handle.shutdown().await
    /// # }
    /// ```
    pub fn spawn(config: Config, extractor: Arc<dyn Extractor>) -> (WorkerHandle, EventReceiver) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);
        let shutdown_timeout = config.worker.shutdown_timeout;

        let worker = MediaWorker {
            config: Arc::new(config),
            extractor,
            events: event_tx,
            state: state_tx,
            info: None,
            requests_closed: false,
        };
        let task = tokio::spawn(worker.run(request_rx));

        let handle = WorkerHandle {
            requests: request_tx,
            state: state_rx,
            task,
            shutdown_timeout,
        };
        (handle, event_rx)
    }

    /// Spawn a worker using the extractor [`extractor::discover`] finds for `config`
    pub fn spawn_with_discovery(config: Config) -> (WorkerHandle, EventReceiver) {
        let extractor = extractor::discover(&config);
        Self::spawn(config, extractor)
    }

    /// Process requests one at a time until the request channel closes
    async fn run(mut self, mut requests: RequestReceiver) {
        tracing::info!(extractor = self.extractor.name(), "media worker started");

        while let Some(request) = requests.recv().await {
            self.handle_request(request, &mut requests).await;
            if self.requests_closed {
                break;
            }
        }

        tracing::info!("media worker stopped");
    }

    async fn handle_request(&mut self, request: Request, requests: &mut RequestReceiver) {
        if let Err(e) = self.admission(&request) {
            self.reject(&request, &e);
            return;
        }

        match request {
            Request::Fetch(fetch) => self.fetch(fetch, requests).await,
            Request::Download(download) => self.download(download, requests).await,
            Request::Cancel => tracing::debug!("cancel with nothing in flight, ignoring"),
            Request::Reset => {
                if self.info.take().is_some() {
                    tracing::debug!("discarded media info");
                }
                self.set_state(WorkerState::Idle);
            }
        }
    }
}

impl WorkerHandle {
    /// Gracefully stop the worker
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Cancels the in-flight operation, if any
    /// 2. Closes the request channel
    /// 3. Waits for the worker to emit the operation's terminal event and exit,
    ///    up to the configured shutdown timeout
    ///
    /// On timeout the worker task is aborted and shutdown still succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker task panicked.
    pub async fn shutdown(self) -> Result<()> {
        tracing::info!(state = %self.state(), "Initiating worker shutdown");

        let WorkerHandle {
            requests,
            mut task,
            shutdown_timeout,
            ..
        } = self;

        // Worker may already be gone
        requests.send(Request::Cancel).ok();
        drop(requests);

        match tokio::time::timeout(shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {
                tracing::info!("Worker shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Worker task failed during shutdown");
                Err(Error::Other(format!("worker task failed: {}", e)))
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?shutdown_timeout,
                    "Timeout waiting for worker to stop, aborting it"
                );
                task.abort();
                Ok(())
            }
        }
    }
}
