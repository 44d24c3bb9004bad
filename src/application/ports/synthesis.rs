//! Synthesis Port - 远程语音合成抽象
//!
//! 定义远程合成服务的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use super::audio_cache::{generate_cache_key, AudioCachePort, CacheKey};
use crate::domain::export::AudioData;
use crate::domain::voice::{RateDescriptor, VoiceInfo};

/// 合成错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Request timeout")]
    Timeout,

    #[error("Service error ({status}): {message}")]
    ServiceError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 单句合成请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// 要合成的文本
    pub text: String,
    /// 远程音色名（不带 `online:` 前缀）
    pub voice: String,
    /// 语速参数，如 `+20%`
    pub rate: RateDescriptor,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>, rate: RateDescriptor) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            rate,
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        generate_cache_key(&self.voice, &self.text, &self.rate)
    }
}

/// Synthesis Port
///
/// 不做缓存，缓存由调用方负责
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    /// 合成一句，返回完整的音频字节
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioData, SynthesisError>;

    /// 获取可用音色
    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError>;

    /// 检查合成服务是否可达
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}

/// 先查缓存，未命中再合成并写回缓存
pub async fn synthesize_cached(
    synthesis: &dyn SynthesisPort,
    cache: &dyn AudioCachePort,
    request: &SynthesisRequest,
) -> Result<AudioData, SynthesisError> {
    let key = request.cache_key();
    if let Some(audio) = cache.get(&key).await {
        tracing::debug!(key = %key, "Cache hit");
        return Ok(audio);
    }

    let audio = synthesis.synthesize(request).await?;
    cache.put(key, audio.clone()).await;
    Ok(audio)
}
