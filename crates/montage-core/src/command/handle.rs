//! Command handle and the shared command implementation record

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::command::{
    Action, CmdClosure, CommandArgs, CommandId, CommandRegistry, CommandState, ExecResult,
    HandlingPattern, Mutation, PatternId, SyncThrowPattern, UndoMutation,
};
use crate::errors::{Result, SessionError};

/// Counts live command records towards the registry's instance count
pub(crate) struct InstanceToken(Arc<AtomicUsize>);

impl InstanceToken {
    pub(crate) fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Clone for InstanceToken {
    fn clone(&self) -> Self {
        InstanceToken::new(self.0.clone())
    }
}

impl Drop for InstanceToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Operation record behind one or more handles
#[derive(Clone)]
pub(crate) struct CommandImpl {
    pub(crate) do_op: Mutation,
    pub(crate) undo_op: UndoMutation,
    pub(crate) closure: CmdClosure,
    pub(crate) pattern: PatternId,
    pub(crate) anonymous: bool,
    _live: InstanceToken,
}

impl CommandImpl {
    pub(crate) fn new(
        do_op: Mutation,
        undo_op: UndoMutation,
        closure: CmdClosure,
        live: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            do_op,
            undo_op,
            closure,
            pattern: PatternId::default(),
            anonymous: false,
            _live: InstanceToken::new(live),
        }
    }

    /// Copy of this record with the memento dropped
    pub(crate) fn fresh_copy(&self, anonymous: bool) -> Self {
        let mut copy = self.clone();
        copy.undo_op.clear();
        copy.anonymous = anonymous;
        copy
    }

    fn state(&self) -> CommandState {
        if !self.closure.is_bound() {
            CommandState::Unbound
        } else if self.undo_op.has_memento() {
            CommandState::Executed
        } else {
            CommandState::Bound
        }
    }
}

/// Handle to a command
///
/// Handles obtained from the registry share the registered definition;
/// binding through one is visible through all. [`Command::new_instance`]
/// creates an independent anonymous copy with its own memento slot.
#[derive(Clone)]
pub struct Command {
    id: CommandId,
    imp: Arc<Mutex<CommandImpl>>,
    registry: CommandRegistry,
}

impl Command {
    pub(crate) fn from_impl(id: CommandId, imp: Arc<Mutex<CommandImpl>>, registry: CommandRegistry) -> Self {
        Self { id, imp, registry }
    }

    /// Look up a registered definition
    ///
    /// # Errors
    ///
    /// `InvalidCommand` if `id` is not defined.
    pub fn get(registry: &CommandRegistry, id: impl Into<CommandId>) -> Result<Command> {
        registry.get(id)
    }

    pub fn id(&self) -> &CommandId {
        &self.id
    }

    pub(crate) fn shares_impl(&self, imp: &Arc<Mutex<CommandImpl>>) -> bool {
        Arc::ptr_eq(&self.imp, imp)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CommandImpl>> {
        self.imp
            .lock()
            .map_err(|_| SessionError::poisoned("command"))
    }

    /// Bind argument values; drops any memento of a previous execution
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `A` is not the definition's argument type.
    pub fn bind<A: CommandArgs>(&self, args: A) -> Result<Command> {
        let mut imp = self.lock()?;
        imp.closure.bind(&self.id, args)?;
        imp.undo_op.clear();
        tracing::debug!(command_id = %self.id, "arguments bound");
        Ok(self.clone())
    }

    /// Return to the pristine unbound state
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the command record is poisoned.
    pub fn unbind(&self) -> Result<()> {
        let mut imp = self.lock()?;
        imp.closure.unbind();
        imp.undo_op.clear();
        Ok(())
    }

    /// A poisoned record reports `Unbound`
    pub fn state(&self) -> CommandState {
        self.lock()
            .map(|imp| imp.state())
            .unwrap_or(CommandState::Unbound)
    }

    pub fn can_exec(&self) -> bool {
        self.state() != CommandState::Unbound
    }

    pub fn can_undo(&self) -> bool {
        self.state() == CommandState::Executed
    }

    pub fn is_anonymous(&self) -> bool {
        self.lock().map(|imp| imp.anonymous).unwrap_or(false)
    }

    /// Typed copy of the bound arguments
    pub fn args<A: CommandArgs>(&self) -> Option<A> {
        self.lock().ok().and_then(|imp| imp.closure.args::<A>().cloned())
    }

    pub fn handling_pattern(&self) -> PatternId {
        self.lock().map(|imp| imp.pattern).unwrap_or_default()
    }

    /// Change the pattern used by [`Command::exec`], returning the previous one
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the command record is poisoned.
    pub fn set_handling_pattern(&self, pattern: PatternId) -> Result<PatternId> {
        let mut imp = self.lock()?;
        Ok(std::mem::replace(&mut imp.pattern, pattern))
    }

    /// Independent anonymous copy keeping the bound arguments
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the command record is poisoned.
    pub fn new_instance(&self) -> Result<Command> {
        let copy = self.lock()?.fresh_copy(true);
        Ok(Command::from_impl(
            self.id.clone(),
            Arc::new(Mutex::new(copy)),
            self.registry.clone(),
        ))
    }

    /// Register a copy of this command under `new_id`
    ///
    /// # Errors
    ///
    /// `DuplicateCommand` if `new_id` is taken.
    pub fn store_def(&self, new_id: impl Into<CommandId>) -> Result<Command> {
        let copy = self.lock()?.fresh_copy(false);
        self.registry.register(new_id.into(), copy)
    }

    /// Execute through the command's own handling pattern
    ///
    /// # Errors
    ///
    /// `UnboundArguments` if not bound, otherwise as the pattern reports.
    pub fn exec(&self) -> Result<ExecResult> {
        let pattern = self.registry.patterns().get(self.handling_pattern());
        self.exec_with(pattern.as_ref())
    }

    /// # Errors
    ///
    /// `UnboundArguments` if not bound, otherwise as the pattern reports.
    pub fn exec_with(&self, pattern: &dyn HandlingPattern) -> Result<ExecResult> {
        if !self.can_exec() {
            return Err(SessionError::UnboundArguments {
                command_id: self.id.to_string(),
            });
        }
        pattern.exec(self)
    }

    /// Execute on the calling thread, propagating failures
    ///
    /// # Errors
    ///
    /// `UnboundArguments` if not bound, or the operation's failure.
    pub fn exec_sync(&self) -> Result<()> {
        self.exec_with(&SyncThrowPattern)?.maybe_throw()
    }

    /// Undo the last execution through the command's own handling pattern
    ///
    /// # Errors
    ///
    /// `MissingMemento` if nothing to undo, otherwise as the pattern reports.
    pub fn undo(&self) -> Result<ExecResult> {
        let pattern = self.registry.patterns().get(self.handling_pattern());
        self.undo_with(pattern.as_ref())
    }

    /// # Errors
    ///
    /// `MissingMemento` if nothing to undo, otherwise as the pattern reports.
    pub fn undo_with(&self, pattern: &dyn HandlingPattern) -> Result<ExecResult> {
        if !self.can_undo() {
            return Err(SessionError::MissingMemento {
                command_id: self.id.to_string(),
            });
        }
        pattern.undo(self)
    }

    /// Run one half of the command right now, on the calling thread
    ///
    /// This is what handling patterns and dispatchers call. Exec captures
    /// the memento first and stores it only once the operation succeeded;
    /// a failed capture means the operation never runs. Undo consumes the
    /// memento. The record is not locked while user operations run.
    ///
    /// # Errors
    ///
    /// `UnboundArguments`, `MissingMemento`, or whatever the operation,
    /// capture or undo function reports.
    pub fn perform(&self, action: Action) -> Result<()> {
        let (do_op, undo_op, args) = {
            let imp = self.lock()?;
            let args = imp
                .closure
                .value()
                .ok_or_else(|| SessionError::UnboundArguments {
                    command_id: self.id.to_string(),
                })?;
            (imp.do_op.clone(), imp.undo_op.clone(), args)
        };

        match action {
            Action::Exec => {
                let memento = undo_op.capture(&self.id, args.as_ref())?;
                do_op.invoke(&self.id, args.as_ref())?;
                self.lock()?.undo_op.store(memento);
            }
            Action::Undo => {
                undo_op.run_undo(&self.id, args.as_ref())?;
                self.lock()?.undo_op.clear();
            }
        }
        tracing::debug!(command_id = %self.id, ?action, "command performed");
        Ok(())
    }

    fn signature(&self) -> Option<(Mutation, UndoMutation, PatternId, CmdClosure)> {
        let imp = self.lock().ok()?;
        Some((
            imp.do_op.clone(),
            imp.undo_op.clone(),
            imp.pattern,
            imp.closure.clone(),
        ))
    }
}

/// Same record, or same operations, pattern, arguments and memento
impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.imp, &other.imp) {
            return true;
        }
        match (self.signature(), other.signature()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.state() {
            CommandState::Unbound => "def",
            CommandState::Bound => "exec",
            CommandState::Executed => "undo",
        };
        write!(f, "Command(\"{}\") {{{}}}", self.id, tag)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("pattern", &self.handling_pattern())
            .finish()
    }
}
