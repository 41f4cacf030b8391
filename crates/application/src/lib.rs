//! Application layer - Use cases and orchestration
//!
//! Contains the draft service facade and the components it composes
//! (book reconciliation, asynchronous audit writing, expiration and latency
//! budget monitoring), plus the port definitions adapters implement.

pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
