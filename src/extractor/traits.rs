//! Traits and types for media extraction

use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::progress::ProgressSink;
use crate::types::{CookieBrowser, DownloadRequest, MediaInfo};

/// Capabilities of an extractor implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorCapabilities {
    /// Can resolve URLs to metadata
    pub can_fetch: bool,
    /// Can download media
    pub can_download: bool,
    /// Can merge streams and transcode (audio extraction needs this)
    pub can_transcode: bool,
}

/// Trait for media extraction backends
///
/// The worker drives exactly one call at a time. Implementations may block for
/// as long as the network requires; the worker never calls them from the
/// caller's context.
///
/// # Examples
///
/// ```no_run
/// use media_dl::extractor::{Extractor, YtDlpExtractor};
/// use media_dl::CookieBrowser;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = YtDlpExtractor::from_path()
///     .expect("yt-dlp not found in PATH");
///
/// let info = extractor
///     .query_metadata("https://example.com/video", CookieBrowser::None)
///     .await?;
/// println!("{} ({})", info.title, info.duration_display);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Resolve a URL to descriptive information without downloading media
    ///
    /// # Errors
    ///
    /// Returns `Error::Extraction` if:
    /// - The URL is malformed or not http(s)
    /// - No extractor supports the site
    /// - The network request fails
    ///
    /// Dropping the returned future abandons the query and releases its
    /// resources; this is how a fetch is cancelled.
    async fn query_metadata(
        &self,
        url: &str,
        cookie_browser: CookieBrowser,
    ) -> crate::Result<MediaInfo>;

    /// Download media, reporting progress to `sink`
    ///
    /// `cancel` must be checked at every progress checkpoint. When it is set the
    /// download stops and `Error::Cancelled` is returned, never an extraction
    /// error. On success `ProgressEvent::Completed` has been reported and the
    /// final file path is returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::Extraction` for the same causes as
    /// [`query_metadata`](Self::query_metadata), plus post-processing failures.
    async fn perform_download(
        &self,
        request: &DownloadRequest,
        sink: &ProgressSink,
        cancel: &CancellationToken,
    ) -> crate::Result<PathBuf>;

    /// Query capabilities of this extractor
    fn capabilities(&self) -> ExtractorCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
