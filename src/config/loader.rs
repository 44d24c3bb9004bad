//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（narrator.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::voice::Speed;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["narrator", "narrator.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "NARRATOR";

/// 加载应用配置
///
/// # 环境变量示例
/// - `NARRATOR_SYNTHESIS__URL=http://tts-server:3001/api`
/// - `NARRATOR_CACHE__CAPACITY=20`
/// - `NARRATOR_PLAYBACK__VOICE=online:zh-CN-XiaoxiaoNeural`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let defaults = Config::try_from(&AppConfig::default())?;
    let mut builder = Config::builder().add_source(defaults);

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: NARRATOR_SYNTHESIS__URL=http://tts-server:3001/api
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;
    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.synthesis.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Synthesis URL cannot be empty".to_string(),
        ));
    }

    if config.cache.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Cache capacity cannot be 0".to_string(),
        ));
    }

    if config.segmenter.max_unit_chars == 0 {
        return Err(ConfigError::ValidationError(
            "max_unit_chars cannot be 0".to_string(),
        ));
    }

    if config.segmenter.soft_break_window >= config.segmenter.max_unit_chars {
        return Err(ConfigError::ValidationError(format!(
            "soft_break_window ({}) must be smaller than max_unit_chars ({})",
            config.segmenter.soft_break_window, config.segmenter.max_unit_chars
        )));
    }

    if config.batch.failure_threshold == 0 {
        return Err(ConfigError::ValidationError(
            "Batch failure threshold cannot be 0".to_string(),
        ));
    }

    let speed = config.playback.speed;
    if !(Speed::MIN..=Speed::MAX).contains(&speed) {
        return Err(ConfigError::ValidationError(format!(
            "Playback speed {} is outside {}-{}",
            speed,
            Speed::MIN,
            Speed::MAX
        )));
    }

    Ok(())
}

/// 以 TOML 形式输出生效的配置
pub fn render_config(config: &AppConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::debug!("=== Narrator Configuration ===");
    tracing::debug!("Synthesis URL: {}", config.synthesis.url);
    tracing::debug!(
        "Synthesis Timeout: {}s, attempts: {}",
        config.synthesis.timeout_secs,
        config.synthesis.max_retries
    );
    tracing::debug!(
        "Segmenter: max {} chars, window {}",
        config.segmenter.max_unit_chars,
        config.segmenter.soft_break_window
    );
    tracing::debug!("Cache Capacity: {}", config.cache.capacity);
    tracing::debug!("Voice: {} (fallback {})", config.playback.voice, config.playback.fallback_voice);
    tracing::debug!("Speed: {}", config.playback.speed);
    tracing::debug!("Batch Failure Threshold: {}", config.batch.failure_threshold);
    tracing::debug!("Output Directory: {:?}", config.export.output_dir);
    tracing::debug!("Log Level: {}", config.log.level);
    tracing::debug!("==============================");
}
