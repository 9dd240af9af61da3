//! Montage Core - session model of the editor
//!
//! This crate provides the object graph a montage session is made of, and
//! the machinery to navigate and mutate it:
//! - Placements binding model objects to locating pins, owned by the
//!   PlacementIndex which records the scope tree
//! - Scope paths and a reference counted query focus stack
//! - Type-filtered lazy queries (contents, children, parents, path)
//! - Undoable commands with memento capture, handling patterns and a queue
//! - The Fixture, a segmented timeline re-derived from the model
//!
//! A [`Session`] ties these together. It is passed explicitly; there is no
//! global session.

pub mod command;
pub mod errors;
pub mod fixture;
pub mod focus;
pub mod index;
pub mod locator;
pub mod logging_facility;
pub mod model;
pub mod placement;
pub mod query;
pub mod scope;
pub mod scope_path;
pub mod session;
pub mod session_commands;

// Re-export commonly used types
pub use command::{Command, CommandId, CommandQueue, CommandRegistry, ExecResult, PatternId};
pub use errors::{ErrorCategory, ExError, ExErrorKind, Result, SessionError};
pub use fixture::{Fixture, Segment};
pub use focus::{QueryFocus, QueryFocusStack};
pub use index::PlacementIndex;
pub use locator::ScopeLocator;
pub use model::{MObject, MObjectKind};
pub use placement::{Placement, PlacementId, PlacementRef};
pub use query::{QueryKind, QueryResolver, ScopeQuery};
pub use scope::Scope;
pub use scope_path::ScopePath;
pub use session::Session;
pub use session_commands::SessionHandle;
