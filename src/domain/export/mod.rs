//! Export Context - 批量合成与导出

mod artifact;
mod job;
mod ssml;

pub use artifact::{file_name_at, AudioArtifact, AUDIO_MIME_TYPE};
pub use job::{AudioData, BatchJob, BatchReport};
pub use ssml::{escape_xml, render_plain_text, render_ssml, SENTENCE_BREAK};
