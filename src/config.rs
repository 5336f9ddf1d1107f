use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Image compression tool settings
    pub image: ImageToolConfig,
    /// Video compression tool settings
    pub video: VideoToolConfig,
    /// Worker loop timing
    pub worker: WorkerConfig,
}

/// Settings for the external image tool (ImageMagick by default)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageToolConfig {
    /// Tool binary name or path
    pub tool: String,
    /// Output quality (1-100)
    pub quality: u8,
    /// Wall-clock bound for one image compression
    pub timeout_secs: u64,
}

impl Default for ImageToolConfig {
    fn default() -> Self {
        Self {
            tool: "magick".to_string(),
            quality: 75,
            timeout_secs: 300,
        }
    }
}

/// Settings for the external video tool (FFmpeg by default)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoToolConfig {
    /// Tool binary name or path
    pub tool: String,
    /// Video codec passed to the tool
    pub codec: String,
    /// Encoder preset
    pub preset: String,
    /// Constant rate factor (0-51)
    pub crf: u8,
    /// Audio codec
    pub audio_codec: String,
    /// Audio bitrate
    pub audio_bitrate: String,
    /// Wall-clock bound for one video compression
    pub timeout_secs: u64,
}

impl Default for VideoToolConfig {
    fn default() -> Self {
        Self {
            tool: "ffmpeg".to_string(),
            codec: "libx265".to_string(),
            preset: "slow".to_string(),
            crf: 28,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            timeout_secs: 1200,
        }
    }
}

/// Worker loop timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Idle sleep between queue polls, in seconds
    pub poll_interval_secs: u64,
    /// Sleep after a store-level failure before retrying the cycle
    pub error_backoff_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1,
            error_backoff_secs: 5,
        }
    }
}

#[allow(clippy::derivable_impls)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image: ImageToolConfig::default(),
            video: VideoToolConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default TOML file, or create it if not found
    pub fn load() -> Self {
        let config_path = Self::config_path();

        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config: {}. Using defaults.", e);
                }
            }
        }

        let config = Self::default();
        // Save default config for future editing
        if let Err(e) = config.save() {
            warn!("Failed to save default config: {}", e);
        }
        config
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default TOML file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, toml_string)
            .map_err(|e| AppError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediapress")
            .join("config.toml")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.image.quality == 0 || self.image.quality > 100 {
            return Err(AppError::Config(
                "Image quality must be between 1 and 100".to_string(),
            ));
        }
        if self.video.crf > 51 {
            return Err(AppError::Config(
                "Video CRF must be between 0 and 51".to_string(),
            ));
        }
        if self.image.timeout_secs == 0 || self.video.timeout_secs == 0 {
            return Err(AppError::Config(
                "Tool timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image.timeout_secs)
    }

    pub fn video_timeout(&self) -> Duration {
        Duration::from_secs(self.video.timeout_secs)
    }
}
