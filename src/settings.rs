//! Persisted user preferences
//!
//! A flat JSON object with two keys the engine cares about:
//!
//! ```json
//! {
//!     "download_path": "/home/user/Downloads",
//!     "cookies_browser": "None"
//! }
//! ```
//!
//! Loading never fails: a missing or unreadable file, a malformed document, or a
//! single bad value all fall back to defaults. Keys this crate does not know are
//! kept and written back unchanged.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{Result, SettingsError};
use crate::types::CookieBrowser;

const DOWNLOAD_PATH_KEY: &str = "download_path";
const COOKIES_BROWSER_KEY: &str = "cookies_browser";

/// File name used by [`SettingsStore::open_default`]
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// User preferences
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Directory downloads are saved to
    pub download_path: PathBuf,
    /// Browser whose cookies are passed to the extractor
    pub cookies_browser: CookieBrowser,
    extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_path: default_download_path(),
            cookies_browser: CookieBrowser::None,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Build settings from a parsed JSON object, falling back per key
    pub fn from_json(mut map: Map<String, Value>) -> Self {
        let download_path = match map.remove(DOWNLOAD_PATH_KEY) {
            Some(Value::String(s)) if !s.trim().is_empty() => PathBuf::from(s),
            Some(other) => {
                tracing::warn!(value = %other, "invalid download_path in settings, using default");
                default_download_path()
            }
            None => default_download_path(),
        };

        let cookies_browser = match map.remove(COOKIES_BROWSER_KEY) {
            Some(Value::String(s)) => s.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %s, "unknown cookies_browser in settings, using None");
                CookieBrowser::None
            }),
            Some(other) => {
                tracing::warn!(value = %other, "invalid cookies_browser in settings, using None");
                CookieBrowser::None
            }
            None => CookieBrowser::None,
        };

        Self {
            download_path,
            cookies_browser,
            extra: map,
        }
    }

    /// JSON object form, including any unrecognized keys read from disk
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        map.insert(
            DOWNLOAD_PATH_KEY.to_string(),
            Value::String(self.download_path.to_string_lossy().into_owned()),
        );
        map.insert(
            COOKIES_BROWSER_KEY.to_string(),
            Value::String(self.cookies_browser.as_str().to_string()),
        );
        map
    }

    /// Read settings from `path`, reporting why the file could not be used
    pub fn load(path: &Path) -> std::result::Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let map: Map<String, Value> =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_json(map))
    }
}

/// Settings bound to the file they persist to
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Open the settings file at `path`
    ///
    /// Never fails; any problem with the file yields default settings.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match Settings::load(&path) {
            Ok(settings) => {
                tracing::debug!(path = %path.display(), "loaded settings");
                settings
            }
            Err(SettingsError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Settings::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "settings unusable, using defaults");
                Settings::default()
            }
        };
        Self { path, settings }
    }

    /// Open `settings.json` in the platform config directory (`<config>/media-dl/`)
    ///
    /// Falls back to the working directory when no config directory is known.
    pub fn open_default() -> Self {
        let path = dirs::config_dir()
            .map(|dir| dir.join("media-dl").join(SETTINGS_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
        Self::open(path)
    }

    /// File this store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Directory downloads are saved to
    pub fn download_path(&self) -> &Path {
        &self.settings.download_path
    }

    /// Browser whose cookies are passed to the extractor
    pub fn cookies_browser(&self) -> CookieBrowser {
        self.settings.cookies_browser
    }

    /// Change the download directory and persist
    ///
    /// The new value is kept in memory even if writing the file fails.
    pub fn set_download_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.settings.download_path = path.into();
        self.save()
    }

    /// Change the cookie browser and persist
    ///
    /// The new value is kept in memory even if writing the file fails.
    pub fn set_cookies_browser(&mut self, browser: CookieBrowser) -> Result<()> {
        self.settings.cookies_browser = browser;
        self.save()
    }

    /// Write the current settings as pretty-printed JSON
    pub fn save(&self) -> Result<()> {
        self.write().map_err(|e| {
            tracing::warn!(error = %e, "failed to save settings");
            e.into()
        })
    }

    fn write(&self) -> std::result::Result<(), SettingsError> {
        let to_write_error = |source: std::io::Error| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(to_write_error)?;
        }

        let mut json = serde_json::to_string_pretty(&Value::Object(self.settings.to_json()))
            .map_err(|e| to_write_error(std::io::Error::other(e)))?;
        json.push('\n');
        std::fs::write(&self.path, json).map_err(to_write_error)?;

        tracing::debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }
}

/// `<home>/Downloads`, or `./downloads` when no home directory is known
pub fn default_download_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}
