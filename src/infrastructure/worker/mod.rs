//! Worker Layer - Background Processing
//!
//! 实现 BatchPipeline，逐句合成整本书并合并导出

mod batch_pipeline;

pub use batch_pipeline::{BatchOutcome, BatchPipeline, BatchPipelineConfig, BatchRequest};
