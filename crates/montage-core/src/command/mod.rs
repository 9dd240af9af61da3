//! Undoable commands over the session
//!
//! A command pairs a forward operation ([`Mutation`]) with an undo
//! operation ([`UndoMutation`]) that first captures a memento of whatever
//! the forward operation is about to change. Both are type-erased so that
//! commands of any argument type can be stored, queued and dispatched
//! alike; binding checks the argument type against the definition.
//!
//! ```text
//! Unbound --bind--> Bound --exec--> Executed --undo--> Bound
//! ```
//!
//! Commands are defined through a [`CommandRegistry`], looked up by ID,
//! bound, and handed to a [`HandlingPattern`] which decides how they run.

pub mod closure;
pub mod definition;
pub mod exec_result;
pub mod handle;
pub mod mutation;
pub mod pattern;
pub mod queue;
pub mod registry;

use std::sync::Arc;

pub use closure::{CmdClosure, CommandArgs};
pub use definition::{CommandDef, OperationDef, UndoDef};
pub use exec_result::ExecResult;
pub use handle::Command;
pub use mutation::{Memento, Mutation, UndoMutation};
pub use pattern::{
    AsyncPattern, CommandDispatch, DummyPattern, HandlingPattern, HandlingPatterns, PatternId,
    SyncPattern, SyncThrowPattern,
};
pub use queue::{CommandQueue, QueueEntry};
pub use registry::CommandRegistry;

/// Symbolic command ID, e.g. `"session.attach"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(Arc<str>);

impl CommandId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CommandId {
    fn from(id: &str) -> Self {
        CommandId::new(id)
    }
}

impl From<String> for CommandId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which half of a command to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Exec,
    Undo,
}

/// Lifecycle state of one command instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandState {
    /// Defined, but no arguments bound yet
    Unbound,
    /// Arguments bound, ready to execute
    Bound,
    /// Executed, a memento is available for undo
    Executed,
}
