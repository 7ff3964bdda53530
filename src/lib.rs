//! # media-dl
//!
//! Asynchronous media download engine built around an external extractor (yt-dlp).
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Non-blocking** - One background worker runs the extractor; callers never wait on it
//! - **Single-flight** - At most one fetch or download at a time, enforced by a state machine
//! - **Event-driven** - Every operation ends in exactly one terminal event
//! - **Pluggable** - The extractor sits behind a trait, so tests and embedders can swap it
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{
//!     Config, DownloadOptions, DownloadRequest, Event, FetchRequest, MediaWorker, SettingsStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SettingsStore::open_default();
//!     let (handle, mut events) = MediaWorker::spawn_with_discovery(Config::default());
//!
//!     handle.fetch(FetchRequest::new(
//!         "https://example.com/watch?v=abc",
//!         settings.cookies_browser(),
//!     ))?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             Event::InfoReady(info) => {
//!                 println!("{} ({})", info.title, info.duration_display);
//!                 let options = DownloadOptions::new(settings.download_path());
//!                 handle.download(DownloadRequest::for_media(
//!                     &info,
//!                     options,
//!                     settings.cookies_browser(),
//!                 ))?;
//!             }
//!             Event::Progress(progress) => println!("{:?}", progress),
//!             Event::Finished | Event::Cancelled | Event::Failed(_) => break,
//!         }
//!     }
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Extraction backends (yt-dlp and friends)
pub mod extractor;
/// Persisted user preferences
pub mod settings;
/// Core types, requests and events
pub mod types;
/// Background worker and its handle
pub mod worker;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, ToolsConfig, WorkerConfig};
pub use error::{Error, ErrorDetail, ExtractionError, Result, SettingsError};
pub use extractor::{
    Extractor, ExtractorCapabilities, ProgressSink, ProgressTracker, UnavailableExtractor,
    YtDlpExtractor,
};
pub use settings::{Settings, SettingsStore};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    AudioExtraction, CookieBrowser, DownloadOptions, DownloadRequest, Event, FetchRequest,
    MediaInfo, ProgressEvent, QualityPreset, Request, WorkerState,
};
pub use worker::{EventReceiver, MediaWorker, WorkerHandle};

/// Wait for a termination signal, then shut the worker down
///
/// - **Unix:** SIGTERM or SIGINT, falling back to whichever can be registered.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaWorker, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> media_dl::Result<()> {
///     let (handle, mut events) = MediaWorker::spawn_with_discovery(Config::default());
///     tokio::spawn(async move {
///         while let Some(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     run_with_shutdown(handle).await
/// }
/// ```
pub async fn run_with_shutdown(handle: WorkerHandle) -> Result<()> {
    wait_for_signal().await;
    handle.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        return;
    }
    tracing::info!("Received Ctrl+C signal");
}
