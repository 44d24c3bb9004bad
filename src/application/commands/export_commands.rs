//! Export Commands - 导出整本书

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::voice::{Speed, VoiceSelection};
use crate::domain::SpeakableUnit;

/// 批量合成并导出为一个音频文件
#[derive(Debug, Clone)]
pub struct ExportAudio {
    pub units: Arc<[SpeakableUnit]>,
    pub voice: VoiceSelection,
    pub speed: Speed,
    pub output_dir: PathBuf,
    /// 从第几句开始（从 0 开始）
    pub resume_from: usize,
}

/// 导出 SSML
#[derive(Debug, Clone)]
pub struct ExportSsml {
    pub units: Arc<[SpeakableUnit]>,
    pub voice: VoiceSelection,
    pub speed: Speed,
    pub output: PathBuf,
}

/// 导出分段后的纯文本
#[derive(Debug, Clone)]
pub struct ExportText {
    pub units: Arc<[SpeakableUnit]>,
    pub output: PathBuf,
}
