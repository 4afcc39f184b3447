use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the answering service
    pub endpoint: String,

    /// Path the chat requests are posted to
    pub ask_path: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Name of the storage slot holding all conversations
    pub storage_slot: String,

    /// Data directory (config, chats, log)
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: "http://127.0.0.1:5000".to_string(),
            ask_path: "/ask".to_string(),
            request_timeout_secs: 30,
            storage_slot: "healthcoach_chats".to_string(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".healthcoach")
}

impl Config {
    /// Load `config.toml` from the data directory, falling back to defaults
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        fs::create_dir_all(&data_dir)
            .context("Failed to create data directory")?;

        let config_path = data_dir.join("config.toml");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            Config::default()
        };

        config.data_dir = data_dir;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(self.config_path(), content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("healthcoach.log")
    }

    pub fn storage_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full URL chat and feedback requests are sent to
    pub fn ask_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if self.ask_path.starts_with('/') {
            format!("{}{}", base, self.ask_path)
        } else {
            format!("{}/{}", base, self.ask_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:5000");
        assert_eq!(config.storage_slot, "healthcoach_chats");
        assert_eq!(config.data_dir, temp_dir.path());
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            "endpoint = \"https://coach.example.com/\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();

        let config = Config::load(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.ask_path, "/ask");
        assert_eq!(config.ask_url(), "https://coach.example.com/ask");
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("config.toml"), "endpoint = [").unwrap();
        assert!(Config::load(Some(temp_dir.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::load(Some(temp_dir.path().to_path_buf())).unwrap();
        config.ask_path = "chat".to_string();
        config.save().unwrap();

        let reloaded = Config::load(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reloaded.ask_url(), "http://127.0.0.1:5000/chat");
    }
}
