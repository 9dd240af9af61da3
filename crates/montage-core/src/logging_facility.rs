//! Structured logging facility for the session core
//!
//! - Single initialization point via `init(profile)`
//! - Structured boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Boundary events (start/end/end_error) belong to the orchestration layer.
//! The index, query and command internals emit `tracing::debug!` only.
//!
//! # Usage
//!
//! ```rust
//! use montage_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
