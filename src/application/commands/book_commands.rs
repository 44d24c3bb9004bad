//! Book Commands

use std::path::PathBuf;

/// 打开文档并分段
#[derive(Debug, Clone)]
pub struct OpenBook {
    pub path: PathBuf,
}
