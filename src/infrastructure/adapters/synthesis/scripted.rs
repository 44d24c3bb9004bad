//! Scripted Synthesis Client - 用于测试和离线试运行的合成客户端
//!
//! 不调用任何服务；按预设脚本返回成功或失败，并记录每次调用

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{SynthesisError, SynthesisPort, SynthesisRequest};
use crate::domain::export::AudioData;
use crate::domain::voice::VoiceInfo;

type CallHook = Box<dyn Fn(&SynthesisRequest) + Send + Sync>;

/// Scripted Synthesis Client
///
/// 返回的音频内容为 `voice|rate|text`，便于断言
pub struct ScriptedSynthesisClient {
    remaining_failures: Mutex<HashMap<String, u32>>,
    fail_always: HashSet<String>,
    error: SynthesisError,
    delay: Option<Duration>,
    healthy: AtomicBool,
    health_checks: AtomicUsize,
    calls: Mutex<Vec<String>>,
    voices: Vec<VoiceInfo>,
    on_call: Option<CallHook>,
}

impl ScriptedSynthesisClient {
    pub fn new() -> Self {
        Self {
            remaining_failures: Mutex::new(HashMap::new()),
            fail_always: HashSet::new(),
            error: SynthesisError::NetworkError("scripted failure".to_string()),
            delay: None,
            healthy: AtomicBool::new(true),
            health_checks: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            voices: Vec::new(),
            on_call: None,
        }
    }

    /// 该文本的前 `times` 次调用失败
    pub fn fail_times(self, text: &str, times: u32) -> Self {
        if let Ok(mut map) = self.remaining_failures.lock() {
            map.insert(text.to_string(), times);
        }
        self
    }

    /// 该文本总是失败
    pub fn fail_always(mut self, text: &str) -> Self {
        self.fail_always.insert(text.to_string());
        self
    }

    pub fn with_error(mut self, error: SynthesisError) -> Self {
        self.error = error;
        self
    }

    /// 每次调用前等待
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_voices(mut self, voices: Vec<VoiceInfo>) -> Self {
        self.voices = voices;
        self
    }

    /// 每次调用开始时执行
    pub fn on_call(mut self, hook: impl Fn(&SynthesisRequest) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// 所有调用过的文本，按调用顺序
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, text: &str) -> usize {
        self.calls().iter().filter(|t| t.as_str() == text).count()
    }

    pub fn health_check_count(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    /// 预期的音频内容
    pub fn audio_for(request: &SynthesisRequest) -> AudioData {
        AudioData::from(format!("{}|{}|{}", request.voice, request.rate, request.text).as_bytes())
    }

    fn should_fail(&self, text: &str) -> bool {
        if self.fail_always.contains(text) {
            return true;
        }
        let Ok(mut map) = self.remaining_failures.lock() else {
            return false;
        };
        match map.get_mut(text) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for ScriptedSynthesisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SynthesisPort for ScriptedSynthesisClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioData, SynthesisError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.text.clone());
        }
        if let Some(hook) = &self.on_call {
            hook(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail(&request.text) {
            tracing::debug!(text = %request.text, "ScriptedSynthesisClient: scripted failure");
            return Err(self.error.clone());
        }
        Ok(Self::audio_for(request))
    }

    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
        Ok(self.voices.clone())
    }

    async fn health_check(&self) -> bool {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        self.healthy.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::Speed;

    #[tokio::test]
    async fn test_fail_times_then_succeed() {
        let client = ScriptedSynthesisClient::new().fail_times("a", 2);
        let req = SynthesisRequest::new("a", "v", Speed::default().rate_descriptor());

        assert!(client.synthesize(&req).await.is_err());
        assert!(client.synthesize(&req).await.is_err());
        let audio = client.synthesize(&req).await.unwrap();
        assert_eq!(&audio[..], b"v|+0%|a");
        assert_eq!(client.call_count("a"), 3);
    }

    #[tokio::test]
    async fn test_health_flag() {
        let client = ScriptedSynthesisClient::new();
        assert!(client.health_check().await);
        client.set_healthy(false);
        assert!(!client.health_check().await);
        assert_eq!(client.health_check_count(), 2);
    }
}
