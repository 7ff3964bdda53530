//! Media extraction backends
//!
//! This module isolates the external extraction tool behind the [`Extractor`]
//! trait so the worker only deals in [`MediaInfo`](crate::MediaInfo),
//! [`ProgressSink`] calls and typed errors.
//!
//! ## Architecture
//!
//! - [`YtDlpExtractor`]: runs the external `yt-dlp` executable
//! - [`UnavailableExtractor`]: stand-in when yt-dlp cannot be found, failing every
//!   operation with a clear "missing tool" error
//!
//! [`discover`] picks one from a [`Config`].
//!
//! ## Usage
//!
//! ```no_run
//! use media_dl::{Config, extractor};
//!
//! let extractor = extractor::discover(&Config::default());
//! println!("using {}", extractor.name());
//! ```

mod parser;
mod progress;
mod traits;
mod unavailable;
mod ytdlp;

pub use progress::{ProgressSink, ProgressTracker};
pub use traits::{Extractor, ExtractorCapabilities};
pub use unavailable::UnavailableExtractor;
pub use ytdlp::{YtDlpExtractor, validate_url};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ToolsConfig};

/// Build the extractor described by `config`
///
/// An explicit `ytdlp_path` wins; otherwise PATH is searched when
/// `search_path` is enabled. Falls back to [`UnavailableExtractor`].
pub fn discover(config: &Config) -> Arc<dyn Extractor> {
    let tools = &config.tools;

    let Some(program) = locate(tools.ytdlp_path.as_deref(), "yt-dlp", tools) else {
        tracing::warn!("yt-dlp not found, downloads are unavailable");
        return Arc::new(UnavailableExtractor);
    };
    let ffmpeg = locate(tools.ffmpeg_path.as_deref(), "ffmpeg", tools);

    tracing::info!(
        program = %program.display(),
        ffmpeg = ?ffmpeg,
        "using yt-dlp extractor"
    );

    Arc::new(
        YtDlpExtractor::new(program)
            .with_launcher_args(tools.ytdlp_args.clone())
            .with_ffmpeg(ffmpeg)
            .with_download_config(config.download.clone()),
    )
}

// Explicit paths are used as given (they may name a launcher on PATH)
fn locate(explicit: Option<&Path>, binary: &str, tools: &ToolsConfig) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if tools.search_path {
        return which::which(binary).ok();
    }
    None
}
