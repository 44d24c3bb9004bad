//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod book_handlers;
mod export_handlers;
mod playback_orchestrator;

pub use book_handlers::*;
pub use export_handlers::*;
pub use playback_orchestrator::*;
