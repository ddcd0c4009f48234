//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variable holding the generative-AI API key
pub const AI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Environment variable holding the image store private key
pub const IMAGE_STORE_KEY_VAR: &str = "IMAGEKIT_PRIVATE_KEY";

/// Vibecap configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub ai: AiConfig,
    pub images: ImagesConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(skip)]
    pub private_key: Option<String>,
    pub upload_url: String,
    pub api_url: String,
    pub folder: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite file; `None` uses the default location under the config dir
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory backing the client-local settings store
    pub settings_dir: Option<PathBuf>,
    /// Time before expiry at which the warning fires
    pub warning_window_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            top_k: 32,
            top_p: 0.95,
            timeout_secs: 60,
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            upload_url: "https://upload.imagekit.io/api/v1/files/upload".to_string(),
            api_url: "https://api.imagekit.io/v1".to_string(),
            folder: "vibecap".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settings_dir: None,
            warning_window_secs: 5 * 60,
        }
    }
}

impl AiConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;
        Ok(env::var(AI_API_KEY_VAR).ok().filter(|k| !k.is_empty()))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "AI API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl ImagesConfig {
    pub fn resolved_private_key(&self) -> anyhow::Result<Option<String>> {
        if self.private_key.is_some() {
            return Err(anyhow!(
                "Image store keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(env::var(IMAGE_STORE_KEY_VAR).ok().filter(|k| !k.is_empty()))
    }
}

fn redact(key: &str) -> String {
    if key.len() <= 4 {
        "***".to_string()
    } else {
        format!("***{}", &key[key.len() - 4..])
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("VIBECAP_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("vibecap")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ai.enforce_env_only()?;
        if self.images.private_key.is_some() {
            return Err(anyhow!("Image store keys cannot be stored in configuration"));
        }
        if self.session.warning_window_secs == 0 {
            return Err(anyhow!("session.warning_window_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Resolved SQLite database path
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("vibecap.db")),
        }
    }

    /// Resolved directory for the client-local session settings
    pub fn settings_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.session.settings_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("local")),
        }
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "ai.base_url" => Ok(self.ai.base_url.clone()),
            "ai.model" => Ok(self.ai.model.clone()),
            "ai.temperature" => Ok(self.ai.temperature.to_string()),
            "ai.top_k" => Ok(self.ai.top_k.to_string()),
            "ai.top_p" => Ok(self.ai.top_p.to_string()),
            "ai.timeout_secs" => Ok(self.ai.timeout_secs.to_string()),

            "images.upload_url" => Ok(self.images.upload_url.clone()),
            "images.api_url" => Ok(self.images.api_url.clone()),
            "images.folder" => Ok(self.images.folder.clone()),
            "images.timeout_secs" => Ok(self.images.timeout_secs.to_string()),

            "storage.database_path" => Ok(self.database_path()?.display().to_string()),

            "session.settings_dir" => Ok(self.settings_dir()?.display().to_string()),
            "session.warning_window_secs" => Ok(self.session.warning_window_secs.to_string()),

            // API key (special handling - show redacted)
            "ai.api_key" | "api_key" => match self.ai.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(format!("(not set - use {} env var)", AI_API_KEY_VAR)),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `vibecap config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "ai.base_url" => self.ai.base_url = value.trim_end_matches('/').to_string(),
            "ai.model" => self.ai.model = value.to_string(),
            "ai.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.ai.temperature = temp;
            }
            "ai.top_k" => {
                self.ai.top_k = value
                    .parse()
                    .with_context(|| format!("Invalid top_k value: {}", value))?;
            }
            "ai.top_p" => {
                let top_p: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid top_p value: {}", value))?;
                if !(0.0..=1.0).contains(&top_p) {
                    return Err(anyhow!("top_p must be between 0.0 and 1.0"));
                }
                self.ai.top_p = top_p;
            }
            "ai.timeout_secs" => {
                self.ai.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            "images.upload_url" => self.images.upload_url = value.to_string(),
            "images.api_url" => self.images.api_url = value.trim_end_matches('/').to_string(),
            "images.folder" => self.images.folder = value.to_string(),
            "images.timeout_secs" => {
                self.images.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            "storage.database_path" => {
                self.storage.database_path = Some(PathBuf::from(value));
            }

            "session.settings_dir" => {
                self.session.settings_dir = Some(PathBuf::from(value));
            }
            "session.warning_window_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid warning_window_secs value: {}", value))?;
                if secs == 0 {
                    return Err(anyhow!("Warning window must be greater than 0"));
                }
                self.session.warning_window_secs = secs;
            }

            // API key cannot be set via config
            "ai.api_key" | "api_key" | "images.private_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the {} or {} environment variable instead.",
                    AI_API_KEY_VAR,
                    IMAGE_STORE_KEY_VAR
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `vibecap config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "ai.base_url",
            "ai.model",
            "ai.temperature",
            "ai.top_k",
            "ai.top_p",
            "ai.timeout_secs",
            "ai.api_key",
            "images.upload_url",
            "images.api_url",
            "images.folder",
            "images.timeout_secs",
            "storage.database_path",
            "session.settings_dir",
            "session.warning_window_secs",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
