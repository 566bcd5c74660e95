//! Live completion announcements over server-sent events

pub mod manager;
pub mod messages;

pub use manager::{ConnectionManager, Listener};
pub use messages::StreamMessage;
