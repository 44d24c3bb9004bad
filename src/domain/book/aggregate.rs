//! Book Context - Aggregate Root

use std::sync::Arc;

use crate::domain::text_segmenter::{segment, SegmenterConfig, SpeakableUnit};

/// Book 聚合根
///
/// 不变量:
/// - 片段序列创建后不可变，按位置索引
/// - 播放与导出共享同一份片段序列
#[derive(Debug, Clone)]
pub struct Book {
    title: String,
    units: Arc<[SpeakableUnit]>,
}

impl Book {
    /// 从原始文本创建并自动分段
    pub fn from_text(title: impl Into<String>, text: &str, config: &SegmenterConfig) -> Self {
        Self::from_units(title, segment(text, config))
    }

    pub fn from_units(title: impl Into<String>, units: Vec<SpeakableUnit>) -> Self {
        Self {
            title: title.into(),
            units: units.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn units(&self) -> &Arc<[SpeakableUnit]> {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 结构性片段数量（标题 / 目录项）
    pub fn heading_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_structural()).count()
    }
}
