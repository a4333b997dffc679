//! Request capture subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → pipeline.rs (identity resolution, header filtering, body shape)
//!     → body.rs (inline UTF-8 text vs. out-of-line blob reference)
//!     → record.rs (one immutable CapturedRequest)
//!     → history.rs (append-only ledger + stats counters)
//!     → serialized back to the caller as pretty JSON
//! ```
//!
//! # Design Decisions
//! - Capture failures are data on the record, never 5xx responses
//! - The body representation is a closed sum type so serialization stays
//!   exhaustive: a body is inline text or a blob reference, nothing else
//! - Only the first error per request is retained (no aggregation)

pub mod body;
pub mod history;
pub mod pipeline;
pub mod record;

pub use body::classify;
pub use history::{History, Stats};
pub use record::{BlobRef, BodyRepr, CapturedRequest};
