//! Retrying Synthesis Client - 超时、重试与指数退避
//!
//! 包装任意 SynthesisPort：每次尝试单独计时，失败后按 `min(base·2^(n-1), cap)` 等待再试，
//! 只把最后一次失败返回给调用方

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{SynthesisError, SynthesisPort, SynthesisRequest};
use crate::domain::export::AudioData;
use crate::domain::voice::VoiceInfo;

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    /// 单次尝试超时
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
            backoff_base: Duration::from_millis(1000),
            backoff_cap: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exp)
            .min(self.backoff_cap)
    }
}

/// 带重试的合成客户端
pub struct RetryingSynthesisClient {
    inner: Arc<dyn SynthesisPort>,
    policy: RetryPolicy,
}

impl RetryingSynthesisClient {
    pub fn new(inner: Arc<dyn SynthesisPort>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, request: &SynthesisRequest) -> Result<AudioData, SynthesisError> {
        match tokio::time::timeout(self.policy.attempt_timeout, self.inner.synthesize(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout),
        }
    }
}

#[async_trait]
impl SynthesisPort for RetryingSynthesisClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioData, SynthesisError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(request).await {
                Ok(audio) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Synthesis succeeded after retry");
                    }
                    return Ok(audio);
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Synthesis failed, retries exhausted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Synthesis attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
        match tokio::time::timeout(self.policy.attempt_timeout, self.inner.list_voices()).await {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout),
        }
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::Speed;
    use crate::infrastructure::adapters::synthesis::ScriptedSynthesisClient;
    use tokio::time::Instant;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest::new(text, "zh-CN-XiaoxiaoNeural", Speed::default().rate_descriptor())
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(4000));
        assert_eq!(policy.backoff(4), Duration::from_millis(5000));
        assert_eq!(policy.backoff(40), Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let scripted = Arc::new(ScriptedSynthesisClient::new().fail_times("你好。", 2));
        let client = RetryingSynthesisClient::new(scripted.clone(), RetryPolicy::default());

        let started = Instant::now();
        let audio = client.synthesize(&request("你好。")).await.unwrap();

        assert!(!audio.is_empty());
        assert_eq!(scripted.call_count("你好。"), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_surfaces_last_error() {
        let scripted = Arc::new(
            ScriptedSynthesisClient::new()
                .fail_always("坏句子。")
                .with_error(SynthesisError::ServiceError {
                    status: 502,
                    message: "bad gateway".into(),
                }),
        );
        let client = RetryingSynthesisClient::new(scripted.clone(), RetryPolicy::default());

        let err = client.synthesize(&request("坏句子。")).await.unwrap_err();
        assert!(matches!(err, SynthesisError::ServiceError { status: 502, .. }));
        assert_eq!(scripted.call_count("坏句子。"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_attempt() {
        let scripted = Arc::new(ScriptedSynthesisClient::new().with_delay(Duration::from_secs(60)));
        let client = RetryingSynthesisClient::new(scripted.clone(), RetryPolicy::default());

        let started = Instant::now();
        let err = client.synthesize(&request("慢。")).await.unwrap_err();

        assert_eq!(err, SynthesisError::Timeout);
        assert_eq!(scripted.call_count("慢。"), 3);
        // 3 × 30s 超时 + 1s + 2s 退避
        assert_eq!(started.elapsed(), Duration::from_secs(93));
    }
}
