//! Settings file on disk
//!
//! Settings are stored as pretty-printed JSON under the platform config
//! directory. Reading never blocks a copy: a missing, empty or unreadable
//! file yields defaults. Writes go to a sibling `.bak` first and are renamed
//! into place, so a crash mid-write leaves the previous file intact.

use crate::config::Settings;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir.
const CONFIG_DIR_NAME: &str = "pastemark";

const SETTINGS_FILE: &str = "config.json";
const STAGING_SUFFIX: &str = "bak";

/// A settings file at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/pastemark/config.json`.
    pub fn user() -> Result<Self> {
        let base = dirs::config_dir().ok_or(Error::ConfigDirNotFound)?;
        Ok(Self::new(base.join(CONFIG_DIR_NAME).join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        self.path.with_extension(format!("json.{}", STAGING_SUFFIX))
    }

    /// Read and sanitize the settings. A missing or blank file is not an
    /// error; malformed JSON is.
    pub fn read(&self) -> Result<Settings> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}; using defaults", self.path.display());
                return Ok(Settings::default());
            }
            Err(e) => {
                return Err(Error::ConfigLoad {
                    path: self.path.clone(),
                    source: Box::new(e),
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }

        let settings = Settings::from_json_sanitized(&contents).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", self.path.display(), e),
            source: Some(Box::new(e)),
        })?;
        debug!("Read settings from {}", self.path.display());
        Ok(settings)
    }

    /// Write `settings`, creating the parent directory when needed.
    pub fn write(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| save_err(dir, e))?;
        }
        let json =
            serde_json::to_string_pretty(settings).map_err(|e| save_err(&self.path, e))?;

        let staging = self.staging_path();
        fs::write(&staging, json).map_err(|e| save_err(&staging, e))?;
        fs::rename(&staging, &self.path).map_err(|e| save_err(&self.path, e))?;

        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

fn save_err(path: &Path, source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::ConfigSave {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

/// Settings from the user's config file, or defaults if they cannot be read.
pub fn load_config() -> Settings {
    ConfigFile::user()
        .and_then(|file| file.read())
        .unwrap_or_warn_default(Settings::default(), "Could not read settings")
}

/// Save to the user's config file. Returns whether the save succeeded.
pub fn save_config_silent(settings: &Settings) -> bool {
    match ConfigFile::user().and_then(|file| file.write(settings)) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not save settings: {}", e);
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
