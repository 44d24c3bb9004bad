//! Document Source Port - 读取待朗读的文档

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported document format: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 提取后的纯文本，段落之间以空行分隔
#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub text: String,
}

#[async_trait]
pub trait DocumentSourcePort: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Document, DocumentError>;
}
