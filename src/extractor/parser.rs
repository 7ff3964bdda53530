//! Parsing of yt-dlp output
//!
//! Download progress is requested through `--progress-template` with a fixed
//! prefix so lines can be recognized without scraping the human-readable bar.

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::ExtractionError;
use crate::types::MediaInfo;

/// Prefix of download progress lines
pub(crate) const DOWNLOAD_PROGRESS_PREFIX: &str = "[download-progress]";
/// Prefix of post-processor progress lines
pub(crate) const POSTPROCESS_PROGRESS_PREFIX: &str = "[postprocess-progress]";
/// Prefix of the line carrying the final file path
pub(crate) const FINAL_PATH_PREFIX: &str = "[final-path]";

/// `--progress-template` value for the download phase
pub(crate) fn download_progress_template() -> String {
    format!(
        "download:{DOWNLOAD_PROGRESS_PREFIX} %(progress.status)s %(progress.downloaded_bytes)s \
         %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
    )
}

/// `--progress-template` value for the post-processing phase
pub(crate) fn postprocess_progress_template() -> String {
    format!("postprocess:{POSTPROCESS_PROGRESS_PREFIX} %(progress.status)s %(progress.postprocessor)s")
}

/// `--print` value that reports where the finished file ended up
pub(crate) fn final_path_print() -> String {
    format!("after_move:{FINAL_PATH_PREFIX} %(filepath)s")
}

// Banners printed by yt-dlp's post-processors when not running quietly
const POSTPROCESS_BANNERS: &[&str] = &[
    "[Merger]",
    "[ExtractAudio]",
    "[VideoConvertor]",
    "[VideoRemuxer]",
    "[FixupM3u8]",
    "[FixupM4a]",
    "[FixupStretched]",
    "[FixupDuplicateMoov]",
    "[FixupTimestamp]",
    "[EmbedThumbnail]",
    "[EmbedSubtitle]",
    "[Metadata]",
];

/// One recognized line of yt-dlp stdout
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputLine {
    /// Bytes transferred for the current stream
    Download {
        status: String,
        downloaded: Option<u64>,
        total: Option<u64>,
        total_estimate: Option<u64>,
    },
    /// A post-processor started or finished
    PostProcess {
        status: String,
        postprocessor: String,
    },
    /// Legacy post-processor banner
    PostProcessBanner,
    /// Path of the finished file
    FinalPath(PathBuf),
    /// Anything else
    Other,
}

impl OutputLine {
    /// Total size to normalize against, preferring the exact value
    pub(crate) fn best_total(&self) -> Option<u64> {
        match self {
            OutputLine::Download {
                total,
                total_estimate,
                ..
            } => total.or(*total_estimate),
            _ => None,
        }
    }
}

/// Classify a single stdout line
pub(crate) fn parse_output_line(line: &str) -> OutputLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix(DOWNLOAD_PROGRESS_PREFIX) {
        let mut fields = rest.split_whitespace();
        let status = fields.next().unwrap_or_default().to_string();
        return OutputLine::Download {
            status,
            downloaded: fields.next().and_then(parse_byte_count),
            total: fields.next().and_then(parse_byte_count),
            total_estimate: fields.next().and_then(parse_byte_count),
        };
    }

    if let Some(rest) = line.strip_prefix(POSTPROCESS_PROGRESS_PREFIX) {
        let mut fields = rest.split_whitespace();
        return OutputLine::PostProcess {
            status: fields.next().unwrap_or_default().to_string(),
            postprocessor: fields.next().unwrap_or_default().to_string(),
        };
    }

    if let Some(rest) = line.strip_prefix(FINAL_PATH_PREFIX) {
        let path = rest.trim();
        if !path.is_empty() && path != "NA" {
            return OutputLine::FinalPath(PathBuf::from(path));
        }
        return OutputLine::Other;
    }

    if POSTPROCESS_BANNERS
        .iter()
        .any(|banner| line.starts_with(banner))
    {
        return OutputLine::PostProcessBanner;
    }

    OutputLine::Other
}

// yt-dlp prints "NA" for missing values and sometimes floats for estimates
fn parse_byte_count(field: &str) -> Option<u64> {
    if let Ok(n) = field.parse::<u64>() {
        return Some(n);
    }
    field
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64)
}

/// Subset of `--dump-single-json` output used to build [`MediaInfo`]
#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    duration_string: Option<String>,
    thumbnail: Option<String>,
    original_url: Option<String>,
    webpage_url: Option<String>,
}

/// Build [`MediaInfo`] from yt-dlp's JSON description of `requested_url`
pub(crate) fn parse_metadata(
    json: &[u8],
    requested_url: &str,
) -> Result<MediaInfo, ExtractionError> {
    let raw: RawInfo = serde_json::from_slice(json)
        .map_err(|e| ExtractionError::MalformedOutput(format!("metadata JSON: {}", e)))?;

    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Unknown Title".to_string());

    let duration_display = raw
        .duration_string
        .filter(|d| !d.trim().is_empty())
        .or_else(|| raw.duration.map(format_duration))
        .unwrap_or_else(|| "--:--".to_string());

    let canonical_url = raw
        .original_url
        .or(raw.webpage_url)
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| requested_url.to_string());

    Ok(MediaInfo {
        title,
        duration_display,
        thumbnail_url: raw.thumbnail.filter(|t| !t.is_empty()),
        canonical_url,
    })
}

/// Format seconds as `M:SS` or `H:MM:SS`
pub(crate) fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Turn a failed run's stderr into a typed error
pub(crate) fn classify_failure(stderr: &str, exit_code: Option<i32>, url: &str) -> ExtractionError {
    let message = error_message(stderr);
    let lower = message.to_lowercase();

    if lower.contains("unsupported url") {
        return ExtractionError::UnsupportedSite {
            url: url.to_string(),
        };
    }
    if lower.contains("is not a valid url") {
        return ExtractionError::InvalidUrl {
            url: url.to_string(),
            reason: message,
        };
    }
    if ["ffmpeg not found", "ffprobe not found", "ffmpeg is not installed", "postprocessing:"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return ExtractionError::PostProcess(message);
    }
    if [
        "unable to download webpage",
        "unable to download json",
        "http error",
        "urlopen error",
        "timed out",
        "name or service not known",
        "temporary failure in name resolution",
        "getaddrinfo failed",
        "connection reset",
        "connection refused",
        "network is unreachable",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        return ExtractionError::Network(message);
    }

    ExtractionError::Tool { message, exit_code }
}

// Last "ERROR:" line, else last non-empty line
fn error_message(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find_map(|l| l.strip_prefix("ERROR:"))
        .map(|l| l.trim().to_string())
        .or_else(|| lines.last().map(|l| l.to_string()))
        .unwrap_or_else(|| "yt-dlp exited without an error message".to_string())
}
