//! Voice Queries

/// 列出远程合成服务的音色
#[derive(Debug, Clone, Default)]
pub struct ListVoices {
    /// 语言前缀过滤，如 `zh`
    pub language: Option<String>,
}

/// 检查远程合成服务是否可达
#[derive(Debug, Clone)]
pub struct CheckSynthesisHealth;
