//! Metadata queries.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::types::{Event, FetchRequest};

use super::control::Outcome;
use super::state::Operation;
use super::{MediaWorker, RequestReceiver};

impl MediaWorker {
    /// Run a metadata query and emit its single terminal event
    ///
    /// A new fetch discards media info from any earlier fetch. Cancellation drops
    /// the query future, which kills the extractor process.
    pub(crate) async fn fetch(&mut self, request: FetchRequest, requests: &mut RequestReceiver) {
        tracing::info!(url = %request.url, browser = %request.cookie_browser, "fetching media info");

        let token = CancellationToken::new();
        self.info = None;
        self.set_state(Operation::Fetch.running_state());

        let extractor = Arc::clone(&self.extractor);
        let op_token = token.clone();
        let op = async move {
            tokio::select! {
                biased;
                _ = op_token.cancelled() => Err(Error::Cancelled),
                result = extractor.query_metadata(&request.url, request.cookie_browser) => result,
            }
        };

        match self.supervise(op, &token, requests).await {
            Outcome::Succeeded(info) => {
                tracing::info!(title = %info.title, url = %info.canonical_url, "media info ready");
                self.info = Some(info.clone());
                self.set_state(Operation::Fetch.settled_state(true));
                self.emit(Event::InfoReady(info));
            }
            Outcome::Cancelled => {
                tracing::info!("fetch cancelled");
                self.set_state(Operation::Fetch.settled_state(false));
                self.emit(Event::Cancelled);
            }
            Outcome::Failed(detail) => {
                self.set_state(Operation::Fetch.settled_state(false));
                self.emit(Event::Failed(detail));
            }
        }
    }
}
