//! Book Command Handlers

use std::sync::Arc;

use crate::application::commands::OpenBook;
use crate::application::error::ApplicationError;
use crate::application::ports::DocumentSourcePort;
use crate::domain::book::Book;
use crate::domain::SegmenterConfig;

/// OpenBook Handler - 读取文档并分段
pub struct OpenBookHandler {
    source: Arc<dyn DocumentSourcePort>,
    segmenter: SegmenterConfig,
}

impl OpenBookHandler {
    pub fn new(source: Arc<dyn DocumentSourcePort>, segmenter: SegmenterConfig) -> Self {
        Self { source, segmenter }
    }

    pub async fn handle(&self, command: OpenBook) -> Result<Book, ApplicationError> {
        let document = self.source.load(&command.path).await?;
        let book = Book::from_text(document.title, &document.text, &self.segmenter);

        if book.is_empty() {
            tracing::warn!(path = %command.path.display(), "Document contains no readable text");
        }
        tracing::info!(
            path = %command.path.display(),
            title = %book.title(),
            units = book.len(),
            headings = book.heading_count(),
            "Book opened"
        );
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::PlainTextSource;

    #[tokio::test]
    async fn test_open_book_segments_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("三体.txt");
        std::fs::write(&path, "第一章\n\n这是一个句子。这是另一个句子！").unwrap();

        let handler = OpenBookHandler::new(Arc::new(PlainTextSource), SegmenterConfig::default());
        let book = handler.handle(OpenBook { path }).await.unwrap();

        assert_eq!(book.title(), "三体");
        assert_eq!(book.len(), 2);
        assert_eq!(book.heading_count(), 1);
        assert_eq!(book.units()[1].text(), "这是一个句子。这是另一个句子！");
    }

    #[tokio::test]
    async fn test_open_missing_book() {
        let dir = tempfile::tempdir().unwrap();
        let handler = OpenBookHandler::new(Arc::new(PlainTextSource), SegmenterConfig::default());
        let result = handler
            .handle(OpenBook {
                path: dir.path().join("missing.txt"),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::DocumentError(_))));
    }
}
