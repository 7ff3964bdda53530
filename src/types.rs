//! Core types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, ErrorDetail};

/// Browser whose cookie store the extractor should read
///
/// Serialized with the exact labels the front end shows (`"None"`, `"chrome"`, ...),
/// which is also the format of the persisted `cookies_browser` setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CookieBrowser {
    /// Do not load browser cookies
    #[default]
    #[serde(rename = "None")]
    None,
    /// Google Chrome
    #[serde(rename = "chrome")]
    Chrome,
    /// Microsoft Edge
    #[serde(rename = "edge")]
    Edge,
    /// Mozilla Firefox
    #[serde(rename = "firefox")]
    Firefox,
    /// Opera
    #[serde(rename = "opera")]
    Opera,
    /// Brave
    #[serde(rename = "brave")]
    Brave,
    /// Vivaldi
    #[serde(rename = "vivaldi")]
    Vivaldi,
}

impl CookieBrowser {
    /// Every selectable browser, in display order
    pub const ALL: [CookieBrowser; 7] = [
        CookieBrowser::None,
        CookieBrowser::Chrome,
        CookieBrowser::Edge,
        CookieBrowser::Firefox,
        CookieBrowser::Opera,
        CookieBrowser::Brave,
        CookieBrowser::Vivaldi,
    ];

    /// Label used in settings files and selection lists
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieBrowser::None => "None",
            CookieBrowser::Chrome => "chrome",
            CookieBrowser::Edge => "edge",
            CookieBrowser::Firefox => "firefox",
            CookieBrowser::Opera => "opera",
            CookieBrowser::Brave => "brave",
            CookieBrowser::Vivaldi => "vivaldi",
        }
    }

    /// Value for `--cookies-from-browser`, or `None` when no cookies should be loaded
    pub fn extractor_arg(&self) -> Option<&'static str> {
        match self {
            CookieBrowser::None => None,
            other => Some(other.as_str()),
        }
    }
}

impl std::fmt::Display for CookieBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CookieBrowser {
    type Err = Error;

    /// Parses a browser label, ignoring ASCII case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CookieBrowser::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::Config {
                message: format!("unknown cookie browser '{}'", trimmed),
                key: Some("cookies_browser".to_string()),
            })
    }
}

/// Request to resolve a URL into [`MediaInfo`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// URL exactly as the user supplied it (trimmed)
    pub url: String,
    /// Browser cookies to use for the lookup
    #[serde(default)]
    pub cookie_browser: CookieBrowser,
}

impl FetchRequest {
    /// Create a fetch request, trimming surrounding whitespace from the URL
    pub fn new(url: impl Into<String>, cookie_browser: CookieBrowser) -> Self {
        Self {
            url: url.into().trim().to_string(),
            cookie_browser,
        }
    }
}

/// Post-processing step that converts the download to an audio file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioExtraction {
    /// Target codec (e.g. "mp3")
    pub codec: String,
    /// Codec quality, as the extractor understands it (e.g. "192" for 192 kbps)
    pub quality: String,
}

/// How and where a download is stored
///
/// When both `format_selector` and `audio_extraction` are `None` the extractor
/// picks the best available format and runs no post-processing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Directory that receives the final file
    pub destination: PathBuf,
    /// Format selector override
    #[serde(default)]
    pub format_selector: Option<String>,
    /// Optional audio extraction post-process
    #[serde(default)]
    pub audio_extraction: Option<AudioExtraction>,
}

impl DownloadOptions {
    /// Best available quality saved to `destination`
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            format_selector: None,
            audio_extraction: None,
        }
    }

    /// Options for one of the caller-facing quality presets
    pub fn from_preset(preset: QualityPreset, destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            format_selector: preset.format_selector(),
            audio_extraction: preset.audio_extraction(),
        }
    }
}

/// Quality choices offered to the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum QualityPreset {
    /// Let the extractor choose
    #[default]
    Best,
    /// Video capped at 1080 lines plus best audio
    P1080,
    /// Video capped at 720 lines plus best audio
    P720,
    /// Video capped at 480 lines plus best audio
    P480,
    /// Best audio transcoded to MP3 at 192 kbps
    AudioMp3,
}

impl QualityPreset {
    /// Every preset, in display order
    pub const ALL: [QualityPreset; 5] = [
        QualityPreset::Best,
        QualityPreset::P1080,
        QualityPreset::P720,
        QualityPreset::P480,
        QualityPreset::AudioMp3,
    ];

    /// Caller-facing label, accepted verbatim by [`std::str::FromStr`]
    pub fn label(&self) -> &'static str {
        match self {
            QualityPreset::Best => "Best Quality",
            QualityPreset::P1080 => "1080p",
            QualityPreset::P720 => "720p",
            QualityPreset::P480 => "480p",
            QualityPreset::AudioMp3 => "Audio Only (MP3)",
        }
    }

    fn max_height(&self) -> Option<u32> {
        match self {
            QualityPreset::P1080 => Some(1080),
            QualityPreset::P720 => Some(720),
            QualityPreset::P480 => Some(480),
            QualityPreset::Best | QualityPreset::AudioMp3 => None,
        }
    }

    /// Format selector for this preset (`None` = no override)
    pub fn format_selector(&self) -> Option<String> {
        if let Some(h) = self.max_height() {
            return Some(format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]"
            ));
        }
        match self {
            QualityPreset::AudioMp3 => Some("bestaudio/best".to_string()),
            _ => None,
        }
    }

    /// Audio extraction step for this preset, if any
    pub fn audio_extraction(&self) -> Option<AudioExtraction> {
        match self {
            QualityPreset::AudioMp3 => Some(AudioExtraction {
                codec: "mp3".to_string(),
                quality: "192".to_string(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for QualityPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityPreset::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| Error::Config {
                message: format!("unknown quality preset '{}'", s),
                key: Some("quality".to_string()),
            })
    }
}

/// Request to download media previously resolved by a fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Canonical URL from the last [`Event::InfoReady`], not raw user input
    pub url: String,
    /// Storage and quality options
    pub options: DownloadOptions,
    /// Browser cookies to use for the download
    #[serde(default)]
    pub cookie_browser: CookieBrowser,
}

impl DownloadRequest {
    /// Build a download request for media described by `info`
    pub fn for_media(
        info: &MediaInfo,
        options: DownloadOptions,
        cookie_browser: CookieBrowser,
    ) -> Self {
        Self {
            url: info.canonical_url.clone(),
            options,
            cookie_browser,
        }
    }
}

/// Descriptive information produced by a successful fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Media title
    pub title: String,
    /// Human-readable duration (e.g. "3:21")
    pub duration_display: String,
    /// Thumbnail image URL, if the site provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// URL to use for the subsequent download
    pub canonical_url: String,
}

/// Progress of an in-flight download
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Bytes are being transferred
    Downloading {
        /// Completion percentage (0.0 to 100.0), non-decreasing within one download
        percent: f32,
    },
    /// Merge or transcode step running
    PostProcessing,
    /// Final file written
    Completed {
        /// Path of the finished file
        final_path: PathBuf,
    },
}

/// Event emitted by the worker to its caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// Fetch succeeded
    InfoReady(MediaInfo),
    /// Download progress update
    Progress(ProgressEvent),
    /// Download completed successfully
    Finished,
    /// Operation stopped on user request
    Cancelled,
    /// Operation failed
    Failed(ErrorDetail),
}

impl Event {
    /// Whether this event ends an operation
    ///
    /// `InfoReady` ends a fetch; `Finished`, `Cancelled` and `Failed` end either kind.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Progress(_))
    }
}

/// Message from the caller to the worker
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Resolve a URL to [`MediaInfo`]
    Fetch(FetchRequest),
    /// Download the media from the last fetch
    Download(DownloadRequest),
    /// Cancel the in-flight operation (no-op when idle)
    Cancel,
    /// Discard retained media info and return to idle
    Reset,
}

impl Request {
    /// Short name for logs and rejection errors
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Fetch(_) => "fetch",
            Request::Download(_) => "download",
            Request::Cancel => "cancel",
            Request::Reset => "reset",
        }
    }
}

/// Worker state machine position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Nothing in flight, no media info retained
    #[default]
    Idle,
    /// Metadata query running
    FetchingInfo,
    /// Metadata available; ready to download
    InfoReady,
    /// Download running
    Downloading,
    /// Cancel requested, waiting for the extractor to stop
    Cancelling,
}

impl WorkerState {
    /// Whether an operation is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            WorkerState::FetchingInfo | WorkerState::Downloading | WorkerState::Cancelling
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Idle => "idle",
            WorkerState::FetchingInfo => "fetching_info",
            WorkerState::InfoReady => "info_ready",
            WorkerState::Downloading => "downloading",
            WorkerState::Cancelling => "cancelling",
        };
        f.write_str(s)
    }
}
