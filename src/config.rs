//! Configuration types for media-dl
//!
//! [`Config`] configures the engine itself (which binaries to run, timeouts, output
//! naming). The user's persisted preferences live in [`crate::settings`].

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Main configuration for the download engine
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// External tool paths and discovery
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Worker task behavior
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Download naming and selection
    #[serde(default)]
    pub download: DownloadConfig,
}

/// External tool paths (yt-dlp, ffmpeg)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Arguments placed before every yt-dlp invocation
    ///
    /// Lets yt-dlp run through a launcher, e.g. `ytdlp_path = "python3"` with
    /// `ytdlp_args = ["-m", "yt_dlp"]`.
    #[serde(default)]
    pub ytdlp_args: Vec<String>,

    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ytdlp_args: Vec::new(),
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Worker task configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Upper bound on a single fetch or download (None = unbounded)
    ///
    /// When exceeded the operation is cancelled and reported as a recoverable
    /// `timed_out` failure rather than as a user cancellation.
    #[serde(default, with = "optional_duration_serde")]
    pub operation_timeout: Option<Duration>,

    /// How long `shutdown()` waits for the worker to finish (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            operation_timeout: None,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Download naming and selection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// yt-dlp output template, relative to the destination (default: "%(title)s.%(ext)s")
    #[serde(default = "default_output_template")]
    pub output_template: String,

    /// Download only the single item when a URL also names a playlist (default: true)
    #[serde(default = "default_true")]
    pub no_playlist: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_template: default_output_template(),
            no_playlist: true,
        }
    }
}

impl Config {
    /// Config with an explicit yt-dlp path and PATH search disabled
    pub fn with_ytdlp(path: impl Into<PathBuf>) -> Self {
        Self {
            tools: ToolsConfig {
                ytdlp_path: Some(path.into()),
                search_path: false,
                ..ToolsConfig::default()
            },
            ..Self::default()
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_output_template() -> String {
    "%(title)s.%(ext)s".to_string()
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
