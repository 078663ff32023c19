//! Agora Configuration
//!
//! Loads and saves the client's configuration from `~/.agora/config.json`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::identity::session::get_agora_dir;

/// Config file name within the agora directory.
const CONFIG_FILENAME: &str = "config.json";

/// Default platform base URL, matching the local platform node.
const DEFAULT_PLATFORM_URL: &str = "http://localhost:3001";

/// Default refresh interval for the task watch mode, in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgoraConfig {
    pub platform_url: String,
    pub poll_interval_secs: u64,
}

pub fn default_config() -> AgoraConfig {
    AgoraConfig {
        platform_url: DEFAULT_PLATFORM_URL.to_string(),
        poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
    }
}

/// Returns the full path to the config file: `~/.agora/config.json`.
pub fn get_config_path() -> PathBuf {
    get_agora_dir().join(CONFIG_FILENAME)
}

/// Load the config from disk, merging missing fields with defaults.
///
/// Returns the defaults if the file does not exist or cannot be parsed;
/// a client with no config is still expected to work against the
/// default platform URL.
pub fn load_config() -> AgoraConfig {
    let config_path = get_config_path();
    let Ok(contents) = fs::read_to_string(&config_path) else {
        return default_config();
    };
    let mut config: AgoraConfig = match serde_json::from_str(&contents) {
        Ok(c) => c,
        Err(_) => return default_config(),
    };

    let defaults = default_config();
    if config.platform_url.is_empty() {
        config.platform_url = defaults.platform_url;
    }
    if config.poll_interval_secs == 0 {
        config.poll_interval_secs = defaults.poll_interval_secs;
    }

    config
}

/// Save the config to disk at `~/.agora/config.json`.
///
/// Creates the agora directory with mode 0o700 if it does not exist.
pub fn save_config(config: &AgoraConfig) -> Result<()> {
    let dir = get_agora_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create agora directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let config_path = get_config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&config_path, &json).context("Failed to write config file")?;

    Ok(())
}

/// Normalize a platform URL for storage: trim whitespace and any
/// trailing slash so stored and default URLs compare equal.
pub fn normalize_platform_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
