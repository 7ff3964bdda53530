//! Downloads with progress.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::extractor::ProgressSink;
use crate::types::{DownloadRequest, Event};

use super::control::Outcome;
use super::state::Operation;
use super::{MediaWorker, RequestReceiver};

impl MediaWorker {
    /// Run a download, forwarding progress, and emit its single terminal event
    ///
    /// Progress goes straight from the extractor to the event channel through a
    /// [`ProgressSink`] bound to this download's token, so nothing is forwarded
    /// once cancellation has been requested. Media info is consumed either way.
    pub(crate) async fn download(
        &mut self,
        request: DownloadRequest,
        requests: &mut RequestReceiver,
    ) {
        tracing::info!(
            url = %request.url,
            destination = %request.options.destination.display(),
            format = ?request.options.format_selector,
            audio = request.options.audio_extraction.is_some(),
            "starting download"
        );

        let token = CancellationToken::new();
        self.set_state(Operation::Download.running_state());

        let sink = ProgressSink::new(self.events.clone(), token.clone());
        let extractor = Arc::clone(&self.extractor);
        let op_token = token.clone();
        let op = async move {
            extractor
                .perform_download(&request, &sink, &op_token)
                .await
        };

        let outcome = self.supervise(op, &token, requests).await;

        self.info = None;
        match outcome {
            Outcome::Succeeded(path) => {
                tracing::info!(path = %path.display(), "download finished");
                self.set_state(Operation::Download.settled_state(true));
                self.emit(Event::Finished);
            }
            Outcome::Cancelled => {
                tracing::info!("download cancelled");
                self.set_state(Operation::Download.settled_state(false));
                self.emit(Event::Cancelled);
            }
            Outcome::Failed(detail) => {
                self.set_state(Operation::Download.settled_state(false));
                self.emit(Event::Failed(detail));
            }
        }
    }
}
