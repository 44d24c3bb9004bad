//! Document Adapter - 读取纯文本文档

use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::{Document, DocumentError, DocumentSourcePort};

/// 支持的扩展名
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md"];

/// 纯文本文档
///
/// 非 UTF-8 内容按替换字符解码；打包格式（epub / pdf 等）需要先在外部提取成文本
#[derive(Debug, Default)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentSourcePort for PlainTextSource {
    async fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !extension.is_empty() && !TEXT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(DocumentError::Unsupported(format!(
                ".{} (convert it to plain text first)",
                extension
            )));
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DocumentError::NotFound(path.to_path_buf()),
            _ => DocumentError::IoError(e.to_string()),
        })?;

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Document is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let text = text.trim_start_matches('\u{feff}').replace("\r\n", "\n");

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        tracing::info!(path = %path.display(), chars = text.chars().count(), "Document loaded");
        Ok(Document { title, text })
    }
}
