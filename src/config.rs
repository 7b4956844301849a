use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "backlog.toml";

const DATA_DIR_ENV: &str = "BACKLOG_DATA_DIR";
const DEFAULT_PACE_ENV: &str = "BACKLOG_DEFAULT_PACE";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    /// Directory holding backlog.csv and history.csv
    data_dir: String,
    /// Lectures a day assumed by `estimate` without an argument
    default_pace: i64,
    /// env_logger filter, overridden by RUST_LOG
    log_level: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            default_pace: 2,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub default_pace: i64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Config {
            data_dir: PathBuf::from(raw.data_dir),
            default_pace: raw.default_pace,
            log_level: raw.log_level,
        }
    }
}

impl Config {
    /// Reads `path` (or `backlog.toml` when `None`), then applies environment
    /// overrides. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let raw = if path.exists() {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            Self::parse_raw(&text).map_err(|e| format!("Failed to parse {}: {e}", path.display()))?
        } else {
            RawConfig::default()
        };

        let mut config = Config::from(raw);
        config.apply_env(
            std::env::var(DATA_DIR_ENV).ok(),
            std::env::var(DEFAULT_PACE_ENV).ok(),
        );
        config.sanitize();
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let mut config = Config::from(Self::parse_raw(text)?);
        config.sanitize();
        Ok(config)
    }

    fn parse_raw(text: &str) -> Result<RawConfig, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_env(&mut self, data_dir: Option<String>, default_pace: Option<String>) {
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(pace) = default_pace {
            match pace.trim().parse::<i64>() {
                Ok(p) => self.default_pace = p,
                Err(_) => warn!("ignoring {}={}: not a number", DEFAULT_PACE_ENV, pace),
            }
        }
    }

    fn sanitize(&mut self) {
        let defaults = RawConfig::default();
        if self.default_pace <= 0 {
            warn!(
                "default_pace must be positive, got {}; using {}",
                self.default_pace, defaults.default_pace
            );
            self.default_pace = defaults.default_pace;
        }
        if self.log_level.trim().is_empty() {
            self.log_level = defaults.log_level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
        assert_eq!(Config::default().data_dir, PathBuf::from("./data"));
        assert_eq!(Config::default().default_pace, 2);
    }

    #[test]
    fn reads_partial_file() {
        let config = Config::from_toml("data_dir = \"/tmp/jee\"\ndefault_pace = 4\n").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/jee"));
        assert_eq!(config.default_pace, 4);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn non_positive_pace_falls_back() {
        let config = Config::from_toml("default_pace = 0").unwrap();
        assert_eq!(config.default_pace, 2);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Config::from_toml("default_pace = \"fast\"").is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = Config::default();
        config.apply_env(Some("/srv/backlog".to_string()), Some("3".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/srv/backlog"));
        assert_eq!(config.default_pace, 3);

        config.apply_env(Some("  ".to_string()), Some("lots".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/srv/backlog"));
        assert_eq!(config.default_pace, 3);
    }

    #[test]
    fn load_reads_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.toml");
        fs::write(&path, "log_level = \"debug\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "debug");

        let missing = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(missing.log_level, "info");
    }
}
