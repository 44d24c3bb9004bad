//! Export Context - 批量合成任务
//!
//! 不变量:
//! - `unit_buffers[i]` 有值当且仅当第 i 句合成成功
//! - 最终导出至少需要一段音频

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 一段音频数据（整段 mp3 字节，不可变共享）
pub type AudioData = Arc<[u8]>;

/// 批量合成的最终报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// 从未成功的句子编号（从 1 开始）
    pub failed: Vec<usize>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_list(&self) -> String {
        self.failed
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "成功: {}/{} 句", self.succeeded, self.total)?;
        if !self.failed.is_empty() {
            write!(f, "，失败: {} 句 ({})", self.failed.len(), self.failed_list())?;
        }
        Ok(())
    }
}

/// 批量合成任务状态
///
/// 由批量流水线独占；用户选择不再继续时保留，供之后从中断处恢复。
#[derive(Debug)]
pub struct BatchJob {
    id: Uuid,
    unit_buffers: Vec<Option<AudioData>>,
    failed: BTreeSet<usize>,
    cancel: CancellationToken,
    consecutive_failures: u32,
    next_index: usize,
}

impl BatchJob {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_buffers: Vec::new(),
            failed: BTreeSet::new(),
            cancel: CancellationToken::new(),
            consecutive_failures: 0,
            next_index: 0,
        }
    }

    /// 为一次运行准备状态
    ///
    /// 从 0 开始或句子数量变化时丢弃旧缓冲区；否则保留已成功的部分。
    pub fn prepare(&mut self, total: usize, resume_from: usize) {
        if resume_from == 0 || self.unit_buffers.len() != total {
            self.unit_buffers = vec![None; total];
            self.failed.clear();
        }
        self.consecutive_failures = 0;
        self.next_index = resume_from.min(total);
    }

    pub fn record_success(&mut self, index: usize, audio: AudioData) {
        if let Some(slot) = self.unit_buffers.get_mut(index) {
            *slot = Some(audio);
        }
        self.consecutive_failures = 0;
        self.next_index = index + 1;
    }

    /// 记录一次失败，返回当前连续失败次数
    pub fn record_failure(&mut self, index: usize) -> u32 {
        self.failed.insert(index);
        self.consecutive_failures += 1;
        self.next_index = index;
        self.consecutive_failures
    }

    pub fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn is_populated(&self, index: usize) -> bool {
        matches!(self.unit_buffers.get(index), Some(Some(_)))
    }

    pub fn succeeded_count(&self) -> usize {
        self.unit_buffers.iter().filter(|b| b.is_some()).count()
    }

    /// 尝试过但从未成功的句子（位置，从 0 开始）
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed
            .iter()
            .copied()
            .filter(|i| !self.is_populated(*i))
            .collect()
    }

    pub fn report(&self) -> BatchReport {
        BatchReport {
            total: self.unit_buffers.len(),
            succeeded: self.succeeded_count(),
            failed: self.failed_indices().into_iter().map(|i| i + 1).collect(),
        }
    }

    /// 按原顺序取出所有成功的音频
    pub fn compact(&self) -> Vec<AudioData> {
        self.unit_buffers.iter().flatten().cloned().collect()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 换上新的取消标志，返回其副本
    pub fn reset_cancel(&mut self) -> CancellationToken {
        self.cancel = CancellationToken::new();
        self.cancel.clone()
    }

    /// 丢弃全部状态（成功导出或取消后）
    pub fn clear(&mut self) {
        self.unit_buffers.clear();
        self.failed.clear();
        self.consecutive_failures = 0;
        self.next_index = 0;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn total(&self) -> usize {
        self.unit_buffers.len()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// 下一个待处理的位置，用于恢复
    pub fn next_index(&self) -> usize {
        self.next_index
    }
}

impl Default for BatchJob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(byte: u8) -> AudioData {
        Arc::from(vec![byte; 4])
    }

    #[test]
    fn test_report_excludes_eventually_successful() {
        let mut job = BatchJob::new();
        job.prepare(4, 0);
        job.record_success(0, audio(0));
        assert_eq!(job.record_failure(1), 1);
        assert_eq!(job.record_failure(1), 2);
        job.record_success(1, audio(1));
        job.record_failure(2);

        let report = job.report();
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, vec![3]);
        assert_eq!(job.consecutive_failures(), 1);
    }

    #[test]
    fn test_prepare_keeps_buffers_on_resume() {
        let mut job = BatchJob::new();
        job.prepare(3, 0);
        job.record_success(0, audio(7));
        job.record_failure(1);

        job.prepare(3, 1);
        assert!(job.is_populated(0));
        assert_eq!(job.next_index(), 1);
        assert_eq!(job.consecutive_failures(), 0);

        job.prepare(3, 0);
        assert!(!job.is_populated(0));
        assert!(job.failed_indices().is_empty());
    }

    #[test]
    fn test_compact_preserves_order() {
        let mut job = BatchJob::new();
        job.prepare(3, 0);
        job.record_success(2, audio(2));
        job.record_success(0, audio(0));

        let parts = job.compact();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0][0], 0);
        assert_eq!(parts[1][0], 2);
    }

    #[test]
    fn test_cancel_token_shared() {
        let mut job = BatchJob::new();
        let token = job.cancel_token();
        token.cancel();
        assert!(job.is_cancelled());

        let fresh = job.reset_cancel();
        assert!(!job.is_cancelled());
        fresh.cancel();
        assert!(job.is_cancelled());
    }

    #[test]
    fn test_report_display() {
        let report = BatchReport {
            total: 10,
            succeeded: 8,
            failed: vec![3, 7],
        };
        assert_eq!(report.to_string(), "成功: 8/10 句，失败: 2 句 (3, 7)");
    }
}
