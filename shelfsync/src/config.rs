//! Configuration.
//!
//! [`ConfigFile`] is the persisted INI file at `~/.shelfsync/config.ini`:
//!
//! ```ini
//! [paths]
//! download_dir = ~/Games
//! manifest_file = ~/.shelfsync/manifest.json
//! cache_file = ~/.shelfsync/validation.json
//!
//! [transfer]
//! workers = 4
//! priority = interleaved
//! timeout_secs = 300
//! block_size = 65536
//! report_interval_ms = 1000
//!
//! [logging]
//! level = info
//! file = ~/.shelfsync/shelfsync.log
//!
//! [overrides]
//! some_game = Some Game (2019)
//! ```
//!
//! [`SyncConfig`] is the runtime configuration built from it, with command
//! line flags applied on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache::ComparisonMode;
use crate::scheduler::PriorityMode;
use crate::transfer::{DEFAULT_BLOCK_SIZE, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS};

/// Configuration directory name under the home directory.
pub const CONFIG_DIR: &str = ".shelfsync";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.ini";

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: ini::Error },

    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// `~/.shelfsync`.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// `~/.shelfsync/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE)
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}

/// `[paths]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    pub download_dir: PathBuf,
    pub manifest_file: PathBuf,
    pub cache_file: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        let base = config_directory();
        Self {
            download_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Games"),
            manifest_file: base.join("manifest.json"),
            cache_file: base.join("validation.json"),
        }
    }
}

/// `[transfer]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub workers: usize,
    pub priority: PriorityMode,
    pub timeout_secs: u64,
    pub block_size: usize,
    pub report_interval_ms: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            priority: PriorityMode::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            block_size: DEFAULT_BLOCK_SIZE,
            report_interval_ms: 1000,
        }
    }
}

/// `[logging]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathSettings,
    pub transfer: TransferSettings,
    pub logging: LogSettings,
    /// Item id or directory hint to destination directory.
    pub overrides: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Load from the default location; missing file gives defaults.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`; missing file gives defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Save to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("paths")) {
            if let Some(v) = section.get("download_dir") {
                config.paths.download_dir = expand_tilde(v);
            }
            if let Some(v) = section.get("manifest_file") {
                config.paths.manifest_file = expand_tilde(v);
            }
            if let Some(v) = section.get("cache_file") {
                config.paths.cache_file = expand_tilde(v);
            }
        }

        if let Some(section) = ini.section(Some("transfer")) {
            let t = &mut config.transfer;
            if let Some(v) = section.get("workers") {
                t.workers = parse_value("transfer", "workers", v)?;
                if t.workers == 0 {
                    return Err(invalid("transfer", "workers", v, "must be at least 1"));
                }
            }
            if let Some(v) = section.get("priority") {
                t.priority = parse_value("transfer", "priority", v)?;
            }
            if let Some(v) = section.get("timeout_secs") {
                t.timeout_secs = parse_value("transfer", "timeout_secs", v)?;
            }
            if let Some(v) = section.get("block_size") {
                t.block_size = parse_value("transfer", "block_size", v)?;
                if t.block_size == 0 {
                    return Err(invalid("transfer", "block_size", v, "must be at least 1"));
                }
            }
            if let Some(v) = section.get("report_interval_ms") {
                t.report_interval_ms = parse_value("transfer", "report_interval_ms", v)?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = section.get("level") {
                config.logging.level = v.trim().to_string();
            }
            if let Some(v) = section.get("file").filter(|v| !v.trim().is_empty()) {
                config.logging.file = Some(expand_tilde(v.trim()));
            }
        }

        if let Some(section) = ini.section(Some("overrides")) {
            config.overrides = section
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("paths"))
            .set("download_dir", self.paths.download_dir.to_string_lossy())
            .set("manifest_file", self.paths.manifest_file.to_string_lossy())
            .set("cache_file", self.paths.cache_file.to_string_lossy());

        ini.with_section(Some("transfer"))
            .set("workers", self.transfer.workers.to_string())
            .set("priority", self.transfer.priority.to_string())
            .set("timeout_secs", self.transfer.timeout_secs.to_string())
            .set("block_size", self.transfer.block_size.to_string())
            .set(
                "report_interval_ms",
                self.transfer.report_interval_ms.to_string(),
            );

        ini.with_section(Some("logging"))
            .set("level", self.logging.level.as_str());
        if let Some(file) = &self.logging.file {
            ini.with_section(Some("logging"))
                .set("file", file.to_string_lossy());
        }

        for (key, dir) in &self.overrides {
            ini.with_section(Some("overrides")).set(key.as_str(), dir.as_str());
        }

        ini
    }
}

fn parse_value<T>(section: &str, key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(section, key, value, &e.to_string()))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Runtime configuration for a synchronization run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub download_dir: PathBuf,
    pub cache_file: PathBuf,
    pub workers: usize,
    pub priority: PriorityMode,
    pub comparison: ComparisonMode,
    pub timeout: Duration,
    pub block_size: usize,
    pub report_interval: Duration,
    pub overrides: BTreeMap<String, String>,
}

impl SyncConfig {
    pub fn new(download_dir: impl Into<PathBuf>, cache_file: impl Into<PathBuf>) -> Self {
        let transfer = TransferSettings::default();
        Self {
            download_dir: download_dir.into(),
            cache_file: cache_file.into(),
            workers: transfer.workers,
            priority: transfer.priority,
            comparison: ComparisonMode::default(),
            timeout: Duration::from_secs(transfer.timeout_secs),
            block_size: transfer.block_size,
            report_interval: Duration::from_millis(transfer.report_interval_ms),
            overrides: BTreeMap::new(),
        }
    }

    /// Build from the persisted configuration.
    pub fn from_file(file: &ConfigFile) -> Self {
        Self::new(&file.paths.download_dir, &file.paths.cache_file)
            .with_workers(file.transfer.workers)
            .with_priority_mode(file.transfer.priority)
            .with_timeout(Duration::from_secs(file.transfer.timeout_secs))
            .with_block_size(file.transfer.block_size)
            .with_report_interval(Duration::from_millis(file.transfer.report_interval_ms))
            .with_overrides(file.overrides.clone())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_priority_mode(mut self, priority: PriorityMode) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_comparison(mut self, comparison: ComparisonMode) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.transfer.workers, 4);
        assert_eq!(config.transfer.priority, PriorityMode::Interleaved);
        assert_eq!(config.transfer.block_size, 64 * 1024);
    }

    #[test]
    fn test_load_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(
            &path,
            "[paths]\ndownload_dir = /data/games\n\n\
             [transfer]\nworkers = 8\npriority = sequential\ntimeout_secs = 30\n\n\
             [logging]\nlevel = debug\nfile = /tmp/shelfsync.log\n\n\
             [overrides]\nsome_game = Some Game\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.paths.download_dir, PathBuf::from("/data/games"));
        assert_eq!(config.transfer.workers, 8);
        assert_eq!(config.transfer.priority, PriorityMode::Sequential);
        assert_eq!(config.transfer.timeout_secs, 30);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/shelfsync.log")));
        assert_eq!(config.overrides["some_game"], "Some Game");
    }

    #[test]
    fn test_invalid_value_names_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[transfer]\nworkers = lots\n").unwrap();

        match ConfigFile::load_from(&path) {
            Err(ConfigError::InvalidValue {
                section, key, value, ..
            }) => {
                assert_eq!(section, "transfer");
                assert_eq!(key, "workers");
                assert_eq!(value, "lots");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }

        fs::write(&path, "[transfer]\npriority = random\n").unwrap();
        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        fs::write(&path, "[transfer]\nworkers = 0\n").unwrap();
        assert!(ConfigFile::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.transfer.workers = 2;
        config.transfer.priority = PriorityMode::Sequential;
        config.logging.file = Some(temp.path().join("log.txt"));
        config.overrides.insert("42".to_string(), "/mnt/games".to_string());

        config.save_to(&path).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_sync_config_from_file() {
        let mut file = ConfigFile::default();
        file.transfer.workers = 6;
        file.transfer.report_interval_ms = 250;

        let config = SyncConfig::from_file(&file).with_workers(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.report_interval, Duration::from_millis(250));
        assert_eq!(config.comparison, ComparisonMode::Incremental);
    }
}
