//! Events - 事件推送

mod publisher;

pub use publisher::{EventPublisher, NoticeLevel, ReaderEvent};
