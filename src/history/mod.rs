//! Session history: the append-only message log and its derived views

pub mod log;
pub mod record;
pub mod sessions;

pub use log::MessageLog;
pub use record::{MessageRecord, PastedContent, Role};
pub use sessions::{
    MessagePage, SessionDetail, SessionMessage, SessionSummary, list_sessions, page_messages,
    session_detail,
};
