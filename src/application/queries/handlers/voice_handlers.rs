//! Voice Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::SynthesisPort;
use crate::application::queries::{CheckSynthesisHealth, ListVoices};
use crate::domain::voice::{default_voice, rank_voices, VoiceInfo, REMOTE_VOICE_PREFIX};

// ============================================================================
// Response DTOs
// ============================================================================

/// 音色列表响应
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    pub voices: Vec<VoiceInfo>,
    /// 默认音色标识（带 `online:` 前缀）
    pub default_voice: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// ListVoices Handler
pub struct ListVoicesHandler {
    synthesis: Arc<dyn SynthesisPort>,
}

impl ListVoicesHandler {
    pub fn new(synthesis: Arc<dyn SynthesisPort>) -> Self {
        Self { synthesis }
    }

    pub async fn handle(&self, query: ListVoices) -> Result<VoiceCatalog, ApplicationError> {
        let voices = self.synthesis.list_voices().await?;
        let voices = rank_voices(voices, query.language.as_deref());
        let default_voice = default_voice(&voices).map(|v| format!("{}{}", REMOTE_VOICE_PREFIX, v.name));

        tracing::debug!(count = voices.len(), language = ?query.language, "Voices listed");
        Ok(VoiceCatalog {
            voices,
            default_voice,
        })
    }
}

/// CheckSynthesisHealth Handler
pub struct CheckSynthesisHealthHandler {
    synthesis: Arc<dyn SynthesisPort>,
}

impl CheckSynthesisHealthHandler {
    pub fn new(synthesis: Arc<dyn SynthesisPort>) -> Self {
        Self { synthesis }
    }

    pub async fn handle(&self, _query: CheckSynthesisHealth) -> bool {
        self.synthesis.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::ScriptedSynthesisClient;

    fn voice(name: &str, language: &str, recommended: bool) -> VoiceInfo {
        VoiceInfo {
            name: name.to_string(),
            display_name: format!("Microsoft {} Online (Natural)", name),
            language: language.to_string(),
            gender: "Female".to_string(),
            is_recommended: recommended,
        }
    }

    #[tokio::test]
    async fn test_list_voices_filters_and_ranks() {
        let synthesis = Arc::new(ScriptedSynthesisClient::new().with_voices(vec![
            voice("en-US-AriaNeural", "en-US", true),
            voice("zh-CN-YunxiNeural", "zh-CN", false),
            voice("zh-CN-XiaoxiaoNeural", "zh-CN", true),
        ]));
        let handler = ListVoicesHandler::new(synthesis);

        let catalog = handler
            .handle(ListVoices {
                language: Some("zh".to_string()),
            })
            .await
            .unwrap();
        let names: Vec<_> = catalog.voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["zh-CN-XiaoxiaoNeural", "zh-CN-YunxiNeural"]);
        assert_eq!(
            catalog.default_voice.as_deref(),
            Some("online:zh-CN-XiaoxiaoNeural")
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let synthesis = Arc::new(ScriptedSynthesisClient::new());
        let handler = CheckSynthesisHealthHandler::new(synthesis.clone());
        assert!(handler.handle(CheckSynthesisHealth).await);

        synthesis.set_healthy(false);
        assert!(!handler.handle(CheckSynthesisHealth).await);
    }
}
