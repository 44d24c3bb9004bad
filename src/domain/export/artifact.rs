//! Export Context - 导出产物

use chrono::{DateTime, Utc};

use super::job::{AudioData, BatchReport};

pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// 合并后的音频文件
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    file_name: String,
    data: Vec<u8>,
    report: BatchReport,
    created_at: DateTime<Utc>,
}

impl AudioArtifact {
    /// 按顺序拼接所有音频片段
    pub fn merge(parts: &[AudioData], report: BatchReport) -> Self {
        let created_at = Utc::now();
        let size = parts.iter().map(|p| p.len()).sum();
        let mut data = Vec::with_capacity(size);
        for part in parts {
            data.extend_from_slice(part);
        }
        Self {
            file_name: file_name_at(created_at),
            data,
            report,
            created_at,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        AUDIO_MIME_TYPE
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// `ebook-tts-<毫秒时间戳>.mp3`
pub fn file_name_at(at: DateTime<Utc>) -> String {
    format!("ebook-tts-{}.mp3", at.timestamp_millis())
}
