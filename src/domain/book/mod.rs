//! Book Context - 已分段的读物

mod aggregate;

pub use aggregate::Book;
