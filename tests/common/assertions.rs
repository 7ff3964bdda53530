//! Custom test assertions for integration tests

use media_dl::{ErrorDetail, Event, EventReceiver, ProgressEvent};
use std::time::Duration;

/// How an operation ended
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Fetch succeeded
    InfoReady,
    /// Download finished
    Finished,
    /// Operation was cancelled
    Cancelled,
    /// Operation failed with this detail
    Failed(ErrorDetail),
    /// Timeout waiting for a terminal event
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Collect events until the operation's terminal event
///
/// # Returns
/// The outcome plus every `Downloading` percentage seen on the way
pub async fn wait_for_terminal(
    events: &mut EventReceiver,
    timeout: Duration,
) -> (WaitResult, Vec<f32>) {
    let mut percents = Vec::new();

    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Some(Event::Progress(ProgressEvent::Downloading { percent })) => {
                    percents.push(percent)
                }
                Some(Event::Progress(_)) => continue,
                Some(Event::InfoReady(_)) => return WaitResult::InfoReady,
                Some(Event::Finished) => return WaitResult::Finished,
                Some(Event::Cancelled) => return WaitResult::Cancelled,
                Some(Event::Failed(detail)) => return WaitResult::Failed(detail),
                None => return WaitResult::ChannelClosed,
            }
        }
    })
    .await
    .unwrap_or(WaitResult::Timeout);

    (result, percents)
}

/// Assert that percentages never decrease and stay within 0..=100
pub fn assert_monotonic(percents: &[f32]) {
    for pair in percents.windows(2) {
        assert!(pair[0] < pair[1], "progress went backwards: {percents:?}");
    }
    for p in percents {
        assert!((0.0..=100.0).contains(p), "progress out of range: {percents:?}");
    }
}
