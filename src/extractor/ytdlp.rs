//! yt-dlp backed extractor

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::parser::{
    OutputLine, classify_failure, download_progress_template, final_path_print, parse_metadata,
    parse_output_line, postprocess_progress_template,
};
use super::progress::{ProgressSink, ProgressTracker};
use super::traits::{Extractor, ExtractorCapabilities};
use crate::config::DownloadConfig;
use crate::error::{Error, ExtractionError};
use crate::types::{CookieBrowser, DownloadRequest, MediaInfo};

/// Extractor that runs the external `yt-dlp` executable
///
/// Metadata comes from `--dump-single-json`; downloads stream machine-readable
/// progress lines on stdout which are normalized into [`ProgressSink`] calls.
/// Child processes are killed when their future is dropped, so abandoning an
/// operation never leaks a process.
///
/// # Examples
///
/// ```no_run
/// use media_dl::extractor::YtDlpExtractor;
/// use std::path::PathBuf;
///
/// // Explicit binary, with ffmpeg for merging and audio extraction
/// let extractor = YtDlpExtractor::new("/usr/local/bin/yt-dlp")
///     .with_ffmpeg(Some(PathBuf::from("/usr/bin/ffmpeg")));
///
/// // Or run the Python module through an interpreter
/// let extractor = YtDlpExtractor::new("python3")
///     .with_launcher_args(vec!["-m".into(), "yt_dlp".into()]);
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    program: PathBuf,
    launcher_args: Vec<String>,
    ffmpeg: Option<PathBuf>,
    download: DownloadConfig,
}

impl YtDlpExtractor {
    /// Create an extractor with an explicit program path
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            launcher_args: Vec::new(),
            ffmpeg: None,
            download: DownloadConfig::default(),
        }
    }

    /// Attempt to find yt-dlp (and ffmpeg, if present) in PATH
    pub fn from_path() -> Option<Self> {
        let program = which::which("yt-dlp").ok()?;
        Some(Self::new(program).with_ffmpeg(which::which("ffmpeg").ok()))
    }

    /// Arguments placed before every invocation (e.g. `-m yt_dlp`)
    pub fn with_launcher_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    /// ffmpeg used for merging and audio extraction
    ///
    /// With `None`, yt-dlp looks for ffmpeg itself.
    pub fn with_ffmpeg(mut self, ffmpeg: Option<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    /// Output naming and playlist handling
    pub fn with_download_config(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    /// Program this extractor runs
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// ffmpeg passed to yt-dlp, if any
    pub fn ffmpeg(&self) -> Option<&Path> {
        self.ffmpeg.as_deref()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.launcher_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn common_args(&self, args: &mut Vec<OsString>, cookie_browser: CookieBrowser) {
        args.push("--no-warnings".into());
        if self.download.no_playlist {
            args.push("--no-playlist".into());
        }
        if let Some(browser) = cookie_browser.extractor_arg() {
            args.push("--cookies-from-browser".into());
            args.push(browser.into());
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
        }
    }

    /// Arguments for a metadata query
    pub(crate) fn metadata_args(&self, url: &str, cookie_browser: CookieBrowser) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--dump-single-json".into()];
        self.common_args(&mut args, cookie_browser);
        args.push(url.into());
        args
    }

    /// Arguments for a download
    pub(crate) fn download_args(&self, request: &DownloadRequest) -> Vec<OsString> {
        let options = &request.options;
        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--progress".into(),
            "--no-simulate".into(),
            "--progress-template".into(),
            download_progress_template().into(),
            "--progress-template".into(),
            postprocess_progress_template().into(),
            "--print".into(),
            final_path_print().into(),
            "-P".into(),
            options.destination.clone().into(),
            "-o".into(),
            self.download.output_template.clone().into(),
        ];

        if let Some(selector) = &options.format_selector {
            args.push("-f".into());
            args.push(selector.into());
        }
        if let Some(audio) = &options.audio_extraction {
            args.push("-x".into());
            args.push("--audio-format".into());
            args.push(audio.codec.clone().into());
            args.push("--audio-quality".into());
            args.push(audio.quality.clone().into());
        }

        self.common_args(&mut args, request.cookie_browser);
        args.push(request.url.clone().into());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            tracing::warn!(program = %self.program.display(), "yt-dlp executable not found");
            ExtractionError::MissingTool {
                tool: "yt-dlp".into(),
            }
            .into()
        } else {
            Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e))
        }
    }
}

/// Check that `raw` is an absolute http(s) URL with a host
pub fn validate_url(raw: &str) -> Result<Url, ExtractionError> {
    let invalid = |reason: String| ExtractionError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}

/// Next line without its terminator, with invalid UTF-8 replaced
///
/// yt-dlp writes titles and paths in the console encoding, which need not be UTF-8.
async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

async fn collect_stderr(stderr: ChildStderr) -> String {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut collected = String::new();
    while let Ok(Some(line)) = next_line_lossy(&mut reader, &mut buf).await {
        tracing::trace!(line = %line, "yt-dlp stderr");
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}

async fn stop(child: &mut Child) -> Error {
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "yt-dlp already exited");
    }
    Error::Cancelled
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn query_metadata(
        &self,
        url: &str,
        cookie_browser: CookieBrowser,
    ) -> crate::Result<MediaInfo> {
        validate_url(url)?;
        tracing::debug!(url = %url, browser = %cookie_browser, "querying metadata");

        let output = self
            .command()
            .args(self.metadata_args(url, cookie_browser))
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, output.status.code(), url).into());
        }

        Ok(parse_metadata(&output.stdout, url)?)
    }

    async fn perform_download(
        &self,
        request: &DownloadRequest,
        sink: &ProgressSink,
        cancel: &CancellationToken,
    ) -> crate::Result<PathBuf> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        validate_url(&request.url)?;

        let destination = &request.options.destination;
        tokio::fs::create_dir_all(destination).await?;

        let mut child = self
            .command()
            .args(self.download_args(request))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalTool("yt-dlp stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ExternalTool("yt-dlp stderr was not captured".into()))?;
        let stderr_task = tokio::spawn(collect_stderr(stderr));

        let mut stdout = BufReader::new(stdout);
        let mut buf = Vec::new();
        let mut tracker = ProgressTracker::new();
        let mut final_path: Option<PathBuf> = None;

        // Every line is a cancellation checkpoint
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    stderr_task.abort();
                    return Err(stop(&mut child).await);
                }
                next = next_line_lossy(&mut stdout, &mut buf) => next?,
            };
            let Some(line) = next else { break };

            let parsed = parse_output_line(&line);
            match &parsed {
                OutputLine::Download {
                    downloaded: Some(done),
                    ..
                } => {
                    if let Some(percent) = tracker.update(*done, parsed.best_total()) {
                        sink.downloading(percent);
                    }
                }
                OutputLine::Download { .. } => {}
                OutputLine::PostProcess { .. } | OutputLine::PostProcessBanner => {
                    sink.post_processing();
                }
                OutputLine::FinalPath(path) => {
                    final_path = Some(if path.is_relative() {
                        destination.join(path)
                    } else {
                        path.clone()
                    });
                }
                OutputLine::Other => tracing::trace!(line = %line, "yt-dlp stdout"),
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                stderr_task.abort();
                return Err(stop(&mut child).await);
            }
            status = child.wait() => status?,
        };
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let err = classify_failure(&stderr, status.code(), &request.url);
            tracing::warn!(url = %request.url, error = %err, "yt-dlp download failed");
            return Err(err.into());
        }

        let final_path = final_path.ok_or_else(|| {
            ExtractionError::MalformedOutput("yt-dlp did not report the downloaded file".into())
        })?;
        sink.completed(final_path.clone());
        Ok(final_path)
    }

    fn capabilities(&self) -> ExtractorCapabilities {
        ExtractorCapabilities {
            can_fetch: true,
            can_download: true,
            can_transcode: self.ffmpeg.is_some(),
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
