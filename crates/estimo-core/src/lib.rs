// Shared building blocks for the estimo client: configuration, the local
// key-value store that keeps the session token, and the wire models.

pub mod config;
pub mod filters;
pub mod models;
pub mod storage;
