use crate::model::{FileType, SidTimerPolicy, StorageTarget, TypeFilter};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "cartstream";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub default_storage: StorageTarget,
    #[serde(default)]
    pub default_filter: TypeFilter,
    #[serde(default)]
    pub play_timer_seconds: Option<u64>,
    #[serde(default)]
    pub sid_timer_policy: SidTimerPolicy,
    #[serde(default)]
    pub library_root: Option<PathBuf>,
    /// Overrides for the built-in filter to file type mapping.
    #[serde(default)]
    pub type_filters: HashMap<TypeFilter, Vec<FileType>>,
}

impl Settings {
    pub fn file_types(&self, filter: TypeFilter) -> Vec<FileType> {
        self.type_filters
            .get(&filter)
            .cloned()
            .unwrap_or_else(|| filter.default_file_types())
    }

    pub fn play_timer(&self) -> Option<Duration> {
        self.play_timer_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("CARTSTREAM_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = if cfg!(windows) {
        env::var("USERPROFILE").context("USERPROFILE is not set")?
    } else {
        env::var("HOME").context("HOME is not set")?
    };
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn load_settings() -> Result<Settings> {
    let path = settings_path()?;
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    ensure_config_dir()?;
    let path = settings_path()?;
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
