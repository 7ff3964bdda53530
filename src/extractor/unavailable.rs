//! Stand-in extractor for when yt-dlp is not installed

use super::progress::ProgressSink;
use super::traits::{Extractor, ExtractorCapabilities};
use crate::error::ExtractionError;
use crate::types::{CookieBrowser, DownloadRequest, MediaInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Extractor used when no yt-dlp binary is available
///
/// Every operation fails with `ExtractionError::MissingTool`, so the worker keeps
/// running and the caller sees an ordinary `Failed` event explaining what to install.
///
/// # Examples
///
/// ```
/// use media_dl::extractor::{Extractor, UnavailableExtractor};
/// use media_dl::CookieBrowser;
///
/// # #[tokio::main]
/// # async fn main() {
/// let extractor = UnavailableExtractor;
/// let result = extractor
///     .query_metadata("https://example.com/video", CookieBrowser::None)
///     .await;
/// assert!(result.is_err());
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableExtractor;

fn missing_ytdlp() -> crate::Error {
    ExtractionError::MissingTool {
        tool: "yt-dlp".into(),
    }
    .into()
}

#[async_trait]
impl Extractor for UnavailableExtractor {
    async fn query_metadata(
        &self,
        _url: &str,
        _cookie_browser: CookieBrowser,
    ) -> crate::Result<MediaInfo> {
        Err(missing_ytdlp())
    }

    async fn perform_download(
        &self,
        _request: &DownloadRequest,
        _sink: &ProgressSink,
        _cancel: &CancellationToken,
    ) -> crate::Result<PathBuf> {
        Err(missing_ytdlp())
    }

    fn capabilities(&self) -> ExtractorCapabilities {
        ExtractorCapabilities {
            can_fetch: false,
            can_download: false,
            can_transcode: false,
        }
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
