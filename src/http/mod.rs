//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, catch-all route, middleware)
//!     → handler.rs (fixed paths, echo/stats shortcut, file serving,
//!                   capture pipeline, path directives)
//!     → JSON capture record back to the client
//! ```

pub mod directives;
pub mod handler;
pub mod mime;
pub mod server;

pub use server::{AppState, EchoServer};
