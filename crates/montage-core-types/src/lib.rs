//! Core types shared across the Montage session crates
//!
//! - **Correlation types**: `RequestId` and the `RequestContext` that
//!   follows a queued command onto the session loop
//! - **Schema constants**: the `SessionOp` boundary operations and the
//!   canonical field keys and event names used by the logging facility

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId};
pub use schema::SessionOp;
