//! Automation HTTP surface over `secret-core` — see `main.rs` for the
//! runnable binary and its environment configuration.

pub mod dto;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{AppState, RateLimiter, Shared};
