//! Configuration Types
//!
//! 定义所有配置结构体

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::PlaybackConfig;
use crate::domain::{SegmenterConfig, DEFAULT_MAX_UNIT_CHARS, DEFAULT_SOFT_BREAKS, DEFAULT_SOFT_BREAK_WINDOW};
use crate::infrastructure::adapters::{HttpSynthesisClientConfig, RetryPolicy};
use crate::infrastructure::memory::DEFAULT_CACHE_CAPACITY;
use crate::infrastructure::worker::BatchPipelineConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 远程合成服务配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 分段配置
    #[serde(default)]
    pub segmenter: SegmenterSettings,

    /// 单句音频缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// 批量合成配置
    #[serde(default)]
    pub batch: BatchConfig,

    /// 导出配置
    #[serde(default)]
    pub export: ExportConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 远程合成服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// 服务基础 URL（含 `/api`）
    #[serde(default = "default_synthesis_url")]
    pub url: String,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,

    /// 总尝试次数（含第一次）
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 退避基数（毫秒），第 n 次失败后等待 `base * 2^(n-1)`
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// 退避上限（毫秒）
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_ms: u64,

    /// 健康检查超时时间（秒）
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
}

fn default_synthesis_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_synthesis_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_backoff_cap() -> u64 {
    5000
}

fn default_health_timeout() -> u64 {
    5
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: default_synthesis_url(),
            timeout_secs: default_synthesis_timeout(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
            backoff_cap_ms: default_backoff_cap(),
            health_timeout_secs: default_health_timeout(),
        }
    }
}

impl SynthesisConfig {
    pub fn client_config(&self) -> HttpSynthesisClientConfig {
        HttpSynthesisClientConfig {
            base_url: self.url.clone(),
            timeout_secs: self.timeout_secs,
            health_timeout_secs: self.health_timeout_secs,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            attempt_timeout: Duration::from_secs(self.timeout_secs),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_cap: Duration::from_millis(self.backoff_cap_ms),
        }
    }
}

/// 分段配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterSettings {
    /// 片段最大字符数
    #[serde(default = "default_max_unit_chars")]
    pub max_unit_chars: usize,

    /// 软断点搜索窗口
    #[serde(default = "default_soft_break_window")]
    pub soft_break_window: usize,

    /// 软断点字符，逐字符解释
    #[serde(default = "default_soft_breaks")]
    pub soft_breaks: String,
}

fn default_max_unit_chars() -> usize {
    DEFAULT_MAX_UNIT_CHARS
}

fn default_soft_break_window() -> usize {
    DEFAULT_SOFT_BREAK_WINDOW
}

fn default_soft_breaks() -> String {
    DEFAULT_SOFT_BREAKS.iter().collect()
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            max_unit_chars: default_max_unit_chars(),
            soft_break_window: default_soft_break_window(),
            soft_breaks: default_soft_breaks(),
        }
    }
}

impl SegmenterSettings {
    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            max_unit_chars: self.max_unit_chars,
            soft_break_window: self.soft_break_window,
            soft_breaks: self.soft_breaks.chars().collect(),
        }
    }
}

/// 单句音频缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 最多缓存的句数
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// 默认音色；`online:` 前缀表示远程音色
    #[serde(default = "default_voice")]
    pub voice: String,

    /// 远程合成失败时改用的本机音色
    #[serde(default = "default_fallback_voice")]
    pub fallback_voice: String,

    /// 默认语速
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// 本机朗读看门狗（秒）
    #[serde(default = "default_watchdog")]
    pub watchdog_secs: u64,

    /// 播放前再次检查的句子长度上限
    #[serde(default = "default_max_playable_chars")]
    pub max_playable_chars: usize,

    #[serde(default = "default_remote_advance")]
    pub remote_advance_ms: u64,

    #[serde(default = "default_audio_error_advance")]
    pub audio_error_advance_ms: u64,

    #[serde(default = "default_device_error_advance")]
    pub device_error_advance_ms: u64,

    #[serde(default = "default_seek_settle")]
    pub seek_settle_ms: u64,
}

fn default_voice() -> String {
    "online:zh-CN-YunyangNeural".to_string()
}

fn default_fallback_voice() -> String {
    "zh-CN-YunYangNeural".to_string()
}

fn default_speed() -> f64 {
    1.0
}

fn default_watchdog() -> u64 {
    15
}

fn default_max_playable_chars() -> usize {
    200
}

fn default_remote_advance() -> u64 {
    100
}

fn default_audio_error_advance() -> u64 {
    500
}

fn default_device_error_advance() -> u64 {
    1000
}

fn default_seek_settle() -> u64 {
    200
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            fallback_voice: default_fallback_voice(),
            speed: default_speed(),
            watchdog_secs: default_watchdog(),
            max_playable_chars: default_max_playable_chars(),
            remote_advance_ms: default_remote_advance(),
            audio_error_advance_ms: default_audio_error_advance(),
            device_error_advance_ms: default_device_error_advance(),
            seek_settle_ms: default_seek_settle(),
        }
    }
}

impl PlaybackSettings {
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            fallback_voice: self.fallback_voice.clone(),
            watchdog: Duration::from_secs(self.watchdog_secs),
            max_playable_chars: self.max_playable_chars,
            remote_advance: Duration::from_millis(self.remote_advance_ms),
            audio_error_advance: Duration::from_millis(self.audio_error_advance_ms),
            device_error_advance: Duration::from_millis(self.device_error_advance_ms),
            seek_settle: Duration::from_millis(self.seek_settle_ms),
        }
    }
}

/// 批量合成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 连续失败多少次后询问用户
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_success_delay")]
    pub success_delay_ms: u64,

    /// 服务不可达且用户选择继续时的等待
    #[serde(default = "default_offline_cooldown")]
    pub offline_cooldown_ms: u64,
}

fn default_failure_threshold() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_success_delay() -> u64 {
    200
}

fn default_offline_cooldown() -> u64 {
    3000
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            retry_delay_ms: default_retry_delay(),
            success_delay_ms: default_success_delay(),
            offline_cooldown_ms: default_offline_cooldown(),
        }
    }
}

impl BatchConfig {
    pub fn pipeline_config(&self) -> BatchPipelineConfig {
        BatchPipelineConfig {
            failure_threshold: self.failure_threshold,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            success_delay: Duration::from_millis(self.success_delay_ms),
            offline_cooldown: Duration::from_millis(self.offline_cooldown_ms),
        }
    }
}

/// 导出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// 音频文件输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.synthesis.url, "http://localhost:3001/api");
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.playback.voice, "online:zh-CN-YunyangNeural");
        assert_eq!(config.batch.failure_threshold, 10);
        assert_eq!(config.segmenter.max_unit_chars, 150);
    }

    #[test]
    fn test_segmenter_config_round_trips_soft_breaks() {
        let settings = SegmenterSettings::default();
        assert_eq!(settings.segmenter_config(), SegmenterConfig::default());
    }

    #[test]
    fn test_retry_policy() {
        let policy = SynthesisConfig::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(4), Duration::from_secs(5));
    }

    #[test]
    fn test_playback_config_matches_defaults() {
        let config = PlaybackSettings::default().playback_config();
        let defaults = PlaybackConfig::default();
        assert_eq!(config.watchdog, defaults.watchdog);
        assert_eq!(config.fallback_voice, defaults.fallback_voice);
        assert_eq!(config.seek_settle, defaults.seek_settle);
    }
}
