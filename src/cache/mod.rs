//! Content-addressable blob cache subsystem.
//!
//! # Data Flow
//! ```text
//! capture pipeline classifies a binary body
//!     → store.rs put(hash, filename, mime, bytes)
//!     → FIFO eviction while over the byte budget
//!
//! GET /file/{hash}
//!     → store.rs get(hash)
//!     → raw bytes served with the stored MIME type
//! ```
//!
//! # Design Decisions
//! - Keys are content hashes, so identical payloads deduplicate for free
//! - Eviction is strictly insertion-ordered (a memory-bound ring, not an LRU);
//!   re-reading an old blob does not protect it from eviction
//! - One mutex over the whole structure; operations are O(entries evicted)

pub mod store;

pub use store::{BlobEntry, BlobStore};
