//! Message model: wire format, classes, tags, filters, and payload views.
//!
//! A mailbox entry is a 4-byte header (`class << 28 | tag`) followed by raw
//! payload bytes. The runtime never interprets payloads; actors exchange
//! plain bytes and agree on their meaning out of band.

pub mod filter;
pub mod types;

pub use filter::RecvFilter;
pub use types::{
    ExitInfo, Message, MsgClass, MsgInfo, Tag, HEADER_SIZE, MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE,
};
