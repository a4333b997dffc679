//! HTTP/UDP echo and introspection server.
//!
//! Reflects everything an inbound request contained (headers, body, protocol
//! metadata, timing) back at the caller as a structured JSON document. Binary
//! bodies are stored out-of-line in a bounded content-addressable cache and
//! served back under `/file/{hash}`.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 ECHO SERVER                  │
//!                    │                                              │
//!   Client Request   │  ┌─────────┐   ┌──────────┐   ┌──────────┐  │
//!   ─────────────────┼─▶│  http   │──▶│ capture  │──▶│ history  │  │
//!                    │  │ handler │   │ pipeline │   │  ledger  │  │
//!                    │  └────┬────┘   └────┬─────┘   └──────────┘  │
//!                    │       │             │                       │
//!                    │       │             ▼                       │
//!                    │       │        ┌──────────┐                 │
//!                    │       └───────▶│   blob   │  /file/{hash}   │
//!                    │                │  cache   │                 │
//!                    │                └──────────┘                 │
//!                    │                                             │
//!                    │  ┌───────────────────────────────────────┐  │
//!                    │  │          Cross-Cutting Concerns       │  │
//!                    │  │  ┌────────┐ ┌─────────────┐ ┌─────┐   │  │
//!                    │  │  │ config │ │observability│ │ udp │   │  │
//!                    │  │  └────────┘ └─────────────┘ └─────┘   │  │
//!                    │  └───────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod cache;
pub mod capture;
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod observability;
pub mod udp;

pub use config::schema::EchoConfig;
pub use http::EchoServer;
