//! Test fixtures: an in-memory extractor and a scripted stand-in for yt-dlp

use async_trait::async_trait;
use media_dl::{
    CancellationToken, Config, CookieBrowser, DownloadRequest, Error, EventReceiver,
    ExtractionError, Extractor, ExtractorCapabilities, MediaInfo, MediaWorker, ProgressSink,
    ProgressTracker, WorkerHandle,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// URL every fixture resolves
pub const VIDEO_URL: &str = "https://example.com/watch?v=abc123";

/// Total size reported by fixture downloads (10 MB)
pub const TOTAL_BYTES: u64 = 10 * 1024 * 1024;

/// Media info returned by [`FakeExtractor`]
pub fn video_info() -> MediaInfo {
    MediaInfo {
        title: "Integration Sample".to_string(),
        duration_display: "1:02:03".to_string(),
        thumbnail_url: Some("https://example.com/thumb.jpg".to_string()),
        canonical_url: VIDEO_URL.to_string(),
    }
}

/// Extractor that serves [`video_info`] and reports 10 MB in quarter steps
pub struct FakeExtractor {
    /// Sites that fail with `unsupported_site`
    pub unsupported: Vec<String>,
    /// Stop after this many progress steps and wait to be cancelled
    pub pause_after: Option<usize>,
    /// Delay between progress steps
    pub step_delay: Duration,
}

impl Default for FakeExtractor {
    fn default() -> Self {
        Self {
            unsupported: Vec::new(),
            pause_after: None,
            step_delay: Duration::from_millis(5),
        }
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn query_metadata(
        &self,
        url: &str,
        _cookie_browser: CookieBrowser,
    ) -> media_dl::Result<MediaInfo> {
        if self.unsupported.iter().any(|site| url.starts_with(site.as_str())) {
            return Err(ExtractionError::UnsupportedSite {
                url: url.to_string(),
            }
            .into());
        }
        Ok(video_info())
    }

    async fn perform_download(
        &self,
        request: &DownloadRequest,
        sink: &ProgressSink,
        cancel: &CancellationToken,
    ) -> media_dl::Result<PathBuf> {
        let mut tracker = ProgressTracker::new();
        for step in 1..=4u64 {
            if self.pause_after.is_some_and(|n| step as usize > n) {
                cancel.cancelled().await;
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            tokio::time::sleep(self.step_delay).await;
            if let Some(percent) = tracker.update(TOTAL_BYTES / 4 * step, Some(TOTAL_BYTES)) {
                sink.downloading(percent);
            }
        }

        let path = request.options.destination.join("Integration Sample.mp4");
        sink.completed(path.clone());
        Ok(path)
    }

    fn capabilities(&self) -> ExtractorCapabilities {
        ExtractorCapabilities {
            can_fetch: true,
            can_download: true,
            can_transcode: false,
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Spawn a worker around `extractor` with default configuration
pub fn spawn_fake(extractor: FakeExtractor) -> (WorkerHandle, EventReceiver) {
    MediaWorker::spawn(Config::default(), Arc::new(extractor))
}

/// Write a shell script that imitates yt-dlp and return a config that runs it
///
/// The script answers `--dump-single-json` with metadata for [`VIDEO_URL`] and any
/// other invocation with a quarter-step download ending in `[final-path]`.
#[cfg(unix)]
pub fn scripted_ytdlp(dir: &TempDir) -> Config {
    let script = dir.path().join("yt-dlp.sh");
    let body = format!(
        r#"case "$1" in
  --dump-single-json)
    echo '{{"title": "Integration Sample", "duration": 3723, "thumbnail": "https://example.com/thumb.jpg", "webpage_url": "{url}"}}'
    ;;
  *)
    echo '[youtube] abc123: Downloading webpage'
    echo '[download-progress] downloading 2621440 10485760 NA'
    echo '[download-progress] downloading 5242880 10485760 NA'
    echo '[download-progress] downloading 7864320 10485760 NA'
    echo '[download-progress] finished 10485760 10485760 NA'
    echo '[final-path] Integration Sample.mp4'
    ;;
esac
"#,
        url = VIDEO_URL
    );
    std::fs::write(&script, body).expect("Failed to write fake yt-dlp");

    let mut config = Config::with_ytdlp("sh");
    config.tools.ytdlp_args = vec![script.to_string_lossy().into_owned()];
    config
}

/// Destination directory inside `dir`
pub fn destination(dir: &TempDir) -> PathBuf {
    dir.path().join("downloads")
}

/// Whether `path` sits inside `dir`
pub fn is_within(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}
