//! Data models shared by the services and the chat handlers.

pub mod message;
pub mod session;
pub mod transfer;
pub mod wallet;
