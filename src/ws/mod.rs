//! WebSocket handling and protocol definitions

pub mod handler;
pub mod protocol;
