//! The research pipeline and the values its stages exchange.

pub mod coordinator;
pub mod messages;
