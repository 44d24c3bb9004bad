//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod decision;
pub mod device;
pub mod document;
pub mod synthesis;

pub use decision::{FixedDecision, LineDecisionProvider, StdinDecisionProvider};
pub use device::{PacedAudioOutput, PacedSpeechDevice};
pub use document::PlainTextSource;
pub use synthesis::*;
