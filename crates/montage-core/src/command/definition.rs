//! Staged command definition
//!
//! ```ignore
//! registry
//!     .define("timeline.shift")
//!     .operation(|args: &(PlacementId, Duration)| ...)
//!     .capture_undo(|args: &(PlacementId, Duration)| ...)
//!     .undo_operation(|args, memento| ...)?;
//! ```
//!
//! Each stage only offers the next step, so an incomplete definition can't
//! be registered. Dropping a stage abandons the definition.

use std::marker::PhantomData;

use crate::command::handle::CommandImpl;
use crate::command::{CmdClosure, Command, CommandArgs, CommandId, CommandRegistry, Mutation, UndoMutation};
use crate::errors::Result;

type CaptureFn<A, M> = Box<dyn Fn(&A) -> Result<M> + Send + Sync>;

#[must_use = "a command definition is registered only once undo_operation is supplied"]
pub struct CommandDef {
    registry: CommandRegistry,
    id: CommandId,
}

impl CommandDef {
    pub(crate) fn new(registry: CommandRegistry, id: CommandId) -> Self {
        Self { registry, id }
    }

    pub fn id(&self) -> &CommandId {
        &self.id
    }

    /// Forward operation; fixes the argument type `A`
    pub fn operation<A, F>(self, op: F) -> OperationDef<A>
    where
        A: CommandArgs,
        F: Fn(&A) -> Result<()> + Send + Sync + 'static,
    {
        OperationDef {
            registry: self.registry,
            id: self.id,
            do_op: Mutation::new(op),
            _args: PhantomData,
        }
    }
}

#[must_use = "a command definition is registered only once undo_operation is supplied"]
pub struct OperationDef<A> {
    registry: CommandRegistry,
    id: CommandId,
    do_op: Mutation,
    _args: PhantomData<fn(&A)>,
}

impl<A: CommandArgs> OperationDef<A> {
    /// Memento capture, run with the bound arguments right before the operation
    pub fn capture_undo<M, C>(self, capture: C) -> UndoDef<A, M>
    where
        M: CommandArgs,
        C: Fn(&A) -> Result<M> + Send + Sync + 'static,
    {
        UndoDef {
            registry: self.registry,
            id: self.id,
            do_op: self.do_op,
            capture: Box::new(capture),
        }
    }
}

#[must_use = "a command definition is registered only once undo_operation is supplied"]
pub struct UndoDef<A, M> {
    registry: CommandRegistry,
    id: CommandId,
    do_op: Mutation,
    capture: CaptureFn<A, M>,
}

impl<A: CommandArgs, M: CommandArgs> UndoDef<A, M> {
    /// Undo operation; completes and registers the definition
    ///
    /// # Errors
    ///
    /// `DuplicateCommand` if the ID is already defined.
    pub fn undo_operation<U>(self, undo: U) -> Result<Command>
    where
        U: Fn(&A, &M) -> Result<()> + Send + Sync + 'static,
    {
        let undo_op = UndoMutation::new(self.capture, undo);
        let imp = CommandImpl::new(
            self.do_op,
            undo_op,
            CmdClosure::for_type::<A>(),
            self.registry.live_counter(),
        );
        self.registry.register(self.id, imp)
    }
}
