//! Decision Port - 由用户决定是否继续

use async_trait::async_trait;

/// 批量合成持续失败时询问是否继续
#[async_trait]
pub trait DecisionPort: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}
