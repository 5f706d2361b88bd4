// ================================
// src/config.rs - node settings (TOML + defaults)
// ================================
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "./gripper.toml";

/// Gripper node settings loaded from a TOML file.
///
/// Every key is optional; missing keys fall back to [`GripperConfig::default`].
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GripperConfig {
    // Names
    pub node_name: String,
    pub parent_frame: String,
    pub base_frame: String,
    pub marker_topic: String,
    pub server_namespace: String,
    pub marker_name: String,

    // Finger geometry
    pub finger_gain: f64,
    pub initial_offset: f64,
    pub finger_y: f64,
    pub finger_z: f64,

    // Interactive marker server
    pub keep_alive_ms: u64,
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            node_name: "gripper".to_string(),
            parent_frame: "world".to_string(),
            base_frame: "base".to_string(),
            marker_topic: "visualization_marker".to_string(),
            server_namespace: "gripper_marker".to_string(),
            marker_name: "gripper".to_string(),
            finger_gain: 3.0,
            initial_offset: 5.0,
            finger_y: 2.0,
            finger_z: -1.0,
            keep_alive_ms: 500,
        }
    }
}

impl GripperConfig {
    /// Load from `$CONFIG_PATH` (or `./gripper.toml`). No file means defaults.
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_or_default(&config_path)
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    pub fn keep_alive_period(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_demo_layout() {
        let config = GripperConfig::default();
        assert_eq!(config.parent_frame, "world");
        assert_eq!(config.base_frame, "base");
        assert_eq!(config.marker_topic, "visualization_marker");
        assert_eq!(config.server_namespace, "gripper_marker");
        assert_eq!(config.marker_name, "gripper");
        assert_eq!(config.finger_gain, 3.0);
        assert_eq!(config.initial_offset, 5.0);
        assert_eq!(config.keep_alive_period(), Duration::from_millis(500));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = GripperConfig::from_toml_str("finger_gain = 2.5\nbase_frame = \"palm\"\n")
            .unwrap();
        assert_eq!(config.finger_gain, 2.5);
        assert_eq!(config.base_frame, "palm");
        assert_eq!(config.parent_frame, "world");
        assert_eq!(config.initial_offset, 5.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(GripperConfig::from_toml_str("finger_gian = 2.5").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GripperConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, GripperConfig::default());
    }

    #[test]
    fn broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "finger_gain = \"three\"").unwrap();
        let err = GripperConfig::load_or_default(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn zero_keep_alive_is_bumped_to_one_millisecond() {
        let config = GripperConfig {
            keep_alive_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.keep_alive_period(), Duration::from_millis(1));
    }
}
