//! Voice Context - 远程音色目录

use serde::{Deserialize, Serialize};

/// 远程合成服务提供的音色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    pub name: String,
    pub display_name: String,
    pub language: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub is_recommended: bool,
}

impl VoiceInfo {
    /// 去掉厂商前缀与 "Online" 后缀的显示名
    pub fn short_display_name(&self) -> String {
        self.display_name
            .split_whitespace()
            .filter(|word| *word != "Microsoft" && *word != "Online")
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 按语言前缀过滤、去重，推荐音色排在前面
pub fn rank_voices(voices: Vec<VoiceInfo>, language_prefix: Option<&str>) -> Vec<VoiceInfo> {
    let mut seen = std::collections::HashSet::new();
    let mut ranked: Vec<VoiceInfo> = voices
        .into_iter()
        .filter(|v| language_prefix.map_or(true, |p| v.language.starts_with(p)))
        .filter(|v| seen.insert(v.name.clone()))
        .collect();

    ranked.sort_by_key(|v| !v.is_recommended);
    ranked
}

/// 默认音色：第一个推荐音色，否则第一个
pub fn default_voice(voices: &[VoiceInfo]) -> Option<&VoiceInfo> {
    voices
        .iter()
        .find(|v| v.is_recommended)
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, language: &str, recommended: bool) -> VoiceInfo {
        VoiceInfo {
            name: name.to_string(),
            display_name: format!("Microsoft {} Online (Natural)", name),
            language: language.to_string(),
            gender: "Female".to_string(),
            is_recommended: recommended,
        }
    }

    #[test]
    fn test_rank_filters_and_orders() {
        let voices = vec![
            voice("zh-CN-XiaochenNeural", "zh-CN", false),
            voice("en-US-AriaNeural", "en-US", true),
            voice("zh-CN-XiaoxiaoNeural", "zh-CN", true),
            voice("zh-CN-XiaoxiaoNeural", "zh-CN", true),
        ];

        let ranked = rank_voices(voices, Some("zh"));
        let names: Vec<&str> = ranked.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["zh-CN-XiaoxiaoNeural", "zh-CN-XiaochenNeural"]);
        assert_eq!(default_voice(&ranked).map(|v| v.name.as_str()), Some("zh-CN-XiaoxiaoNeural"));
    }

    #[test]
    fn test_short_display_name() {
        let v = voice("Xiaoxiao", "zh-CN", true);
        assert_eq!(v.short_display_name(), "Xiaoxiao (Natural)");
    }

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{"name":"zh-CN-YunyangNeural","displayName":"Microsoft Yunyang Online","language":"zh-CN","gender":"Male","isRecommended":true}"#;
        let v: VoiceInfo = serde_json::from_str(json).unwrap();
        assert!(v.is_recommended);
        assert_eq!(v.display_name, "Microsoft Yunyang Online");
    }
}
