//! Montage Engine - Session orchestration layer
//!
//! Runs the session loop thread that consumes the command queue and
//! triggers fixture rebuilds, and offers the command service facade used by
//! front ends to cycle, bind and dispatch commands.

pub mod config;
pub mod dispatcher;
pub mod looper;
pub mod service;

pub use config::EngineConfig;
pub use dispatcher::Dispatcher;
pub use looper::Looper;
pub use service::SessionCommandService;
