// Typed client for the estimates REST API: transport, shared client and the
// per-resource stores that cache the last response.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod stores;
pub mod transport;

pub use client::{ApiClient, Download};
pub use error::{ApiError, AuthError};
pub use stores::Stores;
