//! Shared test helpers: a scripted in-memory extractor and event utilities.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, ExtractionError};
use crate::extractor::{Extractor, ExtractorCapabilities, ProgressSink, ProgressTracker};
use crate::types::{
    CookieBrowser, DownloadOptions, DownloadRequest, Event, FetchRequest, MediaInfo, WorkerState,
};
use crate::worker::{EventReceiver, MediaWorker, WorkerHandle};

pub(crate) const SAMPLE_URL: &str = "https://example.com/video";
pub(crate) const TEN_MB: u64 = 10 * 1024 * 1024;

/// How long a test waits for a single event before failing
pub(crate) const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

type ErrorFactory = Arc<dyn Fn() -> Error + Send + Sync>;

/// Metadata query behavior
#[derive(Clone)]
pub(crate) enum FetchScript {
    Succeed(MediaInfo),
    Fail(ErrorFactory),
    /// Never completes; only cancellation ends the fetch
    Hang,
}

/// One step of a scripted download
#[derive(Clone, Debug)]
pub(crate) enum Step {
    /// Report a byte count (a cancellation checkpoint precedes every step)
    Bytes { done: u64, total: Option<u64> },
    /// Report that post-processing started
    PostProcess,
    /// Wait before the next step
    Sleep(Duration),
    /// Block until the operation is cancelled
    WaitForCancel,
    /// Block until cancelled, then keep going as if the signal was missed
    MissCancel,
}

/// How a scripted download ends after its steps
#[derive(Clone)]
pub(crate) enum DownloadEnd {
    Complete(PathBuf),
    Fail(ErrorFactory),
}

/// In-memory extractor driven by a script
pub(crate) struct ScriptedExtractor {
    fetch: FetchScript,
    steps: Vec<Step>,
    end: DownloadEnd,
    fetch_calls: AtomicUsize,
    download_calls: AtomicUsize,
    last_download: Mutex<Option<DownloadRequest>>,
}

impl ScriptedExtractor {
    /// Fetch returns [`sample_info`]; download reports 25/50/75/100% of 10 MB and completes
    pub(crate) fn new() -> Self {
        Self {
            fetch: FetchScript::Succeed(sample_info()),
            steps: quarter_steps(),
            end: DownloadEnd::Complete(PathBuf::from("/downloads/Sample.mp4")),
            fetch_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            last_download: Mutex::new(None),
        }
    }

    pub(crate) fn with_info(mut self, info: MediaInfo) -> Self {
        self.fetch = FetchScript::Succeed(info);
        self
    }

    pub(crate) fn failing_fetch(
        mut self,
        error: impl Fn() -> Error + Send + Sync + 'static,
    ) -> Self {
        self.fetch = FetchScript::Fail(Arc::new(error));
        self
    }

    pub(crate) fn hanging_fetch(mut self) -> Self {
        self.fetch = FetchScript::Hang;
        self
    }

    pub(crate) fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub(crate) fn failing_download(
        mut self,
        error: impl Fn() -> Error + Send + Sync + 'static,
    ) -> Self {
        self.end = DownloadEnd::Fail(Arc::new(error));
        self
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_download(&self) -> Option<DownloadRequest> {
        self.last_download.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn query_metadata(
        &self,
        _url: &str,
        _cookie_browser: CookieBrowser,
    ) -> crate::Result<MediaInfo> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fetch {
            FetchScript::Succeed(info) => Ok(info.clone()),
            FetchScript::Fail(error) => Err(error()),
            FetchScript::Hang => std::future::pending().await,
        }
    }

    async fn perform_download(
        &self,
        request: &DownloadRequest,
        sink: &ProgressSink,
        cancel: &CancellationToken,
    ) -> crate::Result<PathBuf> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_download.lock().unwrap() = Some(request.clone());

        let mut tracker = ProgressTracker::new();
        for step in &self.steps {
            if cancel.is_cancelled() && !matches!(step, Step::MissCancel) {
                return Err(Error::Cancelled);
            }
            match step {
                Step::Bytes { done, total } => {
                    if let Some(percent) = tracker.update(*done, *total) {
                        sink.downloading(percent);
                    }
                }
                Step::PostProcess => sink.post_processing(),
                Step::Sleep(duration) => tokio::time::sleep(*duration).await,
                Step::WaitForCancel => cancel.cancelled().await,
                Step::MissCancel => {
                    cancel.cancelled().await;
                    // Behave like an adapter that reached its last checkpoint already
                    match &self.end {
                        DownloadEnd::Complete(path) => return Ok(path.clone()),
                        DownloadEnd::Fail(error) => return Err(error()),
                    }
                }
            }
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match &self.end {
            DownloadEnd::Complete(path) => {
                sink.completed(path.clone());
                Ok(path.clone())
            }
            DownloadEnd::Fail(error) => Err(error()),
        }
    }

    fn capabilities(&self) -> ExtractorCapabilities {
        ExtractorCapabilities {
            can_fetch: true,
            can_download: true,
            can_transcode: true,
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Media info the default script returns
pub(crate) fn sample_info() -> MediaInfo {
    MediaInfo {
        title: "Sample".to_string(),
        duration_display: "3:21".to_string(),
        thumbnail_url: None,
        canonical_url: SAMPLE_URL.to_string(),
    }
}

/// 10 MB reported in four 2.5 MB increments
pub(crate) fn quarter_steps() -> Vec<Step> {
    (1..=4)
        .map(|i| Step::Bytes {
            done: TEN_MB / 4 * i,
            total: Some(TEN_MB),
        })
        .collect()
}

pub(crate) fn network_error() -> Error {
    ExtractionError::Network("connection reset by peer".into()).into()
}

pub(crate) fn fetch_request() -> FetchRequest {
    FetchRequest::new(SAMPLE_URL, CookieBrowser::None)
}

pub(crate) fn download_request(info: &MediaInfo) -> DownloadRequest {
    DownloadRequest::for_media(info, DownloadOptions::new("/downloads"), CookieBrowser::None)
}

/// Spawn a worker with default config around `extractor`
pub(crate) fn spawn_worker(
    extractor: ScriptedExtractor,
) -> (WorkerHandle, EventReceiver, Arc<ScriptedExtractor>) {
    spawn_worker_with_config(Config::default(), extractor)
}

pub(crate) fn spawn_worker_with_config(
    config: Config,
    extractor: ScriptedExtractor,
) -> (WorkerHandle, EventReceiver, Arc<ScriptedExtractor>) {
    let extractor = Arc::new(extractor);
    let (handle, events) = MediaWorker::spawn(config, extractor.clone());
    (handle, events, extractor)
}

/// Next event, failing the test if none arrives in time
pub(crate) async fn next_event(events: &mut EventReceiver) -> Event {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Events up to and including the next terminal one
pub(crate) async fn events_until_terminal(events: &mut EventReceiver) -> Vec<Event> {
    let mut collected = Vec::new();
    loop {
        let event = next_event(events).await;
        let terminal = event.is_terminal();
        collected.push(event);
        if terminal {
            return collected;
        }
    }
}

/// Assert that no event arrives within a short grace period
pub(crate) async fn assert_no_event(events: &mut EventReceiver) {
    let result = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
    assert!(result.is_err(), "unexpected event: {result:?}");
}

/// Wait until the handle's state mirror shows `expected`
pub(crate) async fn wait_for_state(handle: &WorkerHandle, expected: WorkerState) {
    let mut rx = handle.watch_state();
    tokio::time::timeout(EVENT_TIMEOUT, rx.wait_for(|state| *state == expected))
        .await
        .expect("timed out waiting for state")
        .expect("worker state channel closed");
}

/// Fetch [`sample_info`] and wait for it
pub(crate) async fn fetch_ready(handle: &WorkerHandle, events: &mut EventReceiver) -> MediaInfo {
    handle.fetch(fetch_request()).unwrap();
    match next_event(events).await {
        Event::InfoReady(info) => info,
        other => panic!("expected InfoReady, got {other:?}"),
    }
}

pub(crate) fn downloading(percent: f32) -> Event {
    Event::Progress(crate::types::ProgressEvent::Downloading { percent })
}
