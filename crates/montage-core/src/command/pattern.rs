//! Handling patterns: strategies deciding how a bound command is run
//!
//! | pattern      | effect                                        |
//! |--------------|-----------------------------------------------|
//! | `Sync`       | run now, capture failures in the result       |
//! | `SyncThrow`  | run now, propagate failures as errors         |
//! | `Async`      | hand over to the dispatcher, return at once   |
//! | `Dummy`      | count the invocation, run nothing             |

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::command::{Action, Command, ExecResult};
use crate::errors::{Result, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatternId {
    Sync,
    #[default]
    SyncThrow,
    Async,
    Dummy,
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PatternId::Sync => "SYNC",
            PatternId::SyncThrow => "SYNC_THROW",
            PatternId::Async => "ASYNC",
            PatternId::Dummy => "DUMMY",
        };
        f.write_str(name)
    }
}

/// Strategy for invoking a command
///
/// `exec` and `undo` both funnel through `invoke`.
pub trait HandlingPattern: Send + Sync {
    fn id(&self) -> PatternId;

    /// # Errors
    ///
    /// Pattern specific; see the implementations.
    fn invoke(&self, command: &Command, action: Action) -> Result<ExecResult>;

    /// # Errors
    ///
    /// See [`HandlingPattern::invoke`].
    fn exec(&self, command: &Command) -> Result<ExecResult> {
        self.invoke(command, Action::Exec)
    }

    /// # Errors
    ///
    /// See [`HandlingPattern::invoke`].
    fn undo(&self, command: &Command) -> Result<ExecResult> {
        self.invoke(command, Action::Undo)
    }
}

/// Receiver of asynchronously dispatched commands
pub trait CommandDispatch: Send + Sync {
    /// # Errors
    ///
    /// `UnboundArguments` for an unbound command, `Lifecycle` if the
    /// dispatcher no longer accepts work.
    fn enqueue(&self, command: Command, action: Action) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct SyncPattern;

impl HandlingPattern for SyncPattern {
    fn id(&self) -> PatternId {
        PatternId::Sync
    }

    /// Never fails; a failing command yields [`ExecResult::Failed`]
    fn invoke(&self, command: &Command, action: Action) -> Result<ExecResult> {
        match command.perform(action) {
            Ok(()) => Ok(ExecResult::Done),
            Err(err) => {
                tracing::debug!(command_id = %command.id(), error = %err, "command failed");
                Ok(ExecResult::Failed(err))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncThrowPattern;

impl HandlingPattern for SyncThrowPattern {
    fn id(&self) -> PatternId {
        PatternId::SyncThrow
    }

    fn invoke(&self, command: &Command, action: Action) -> Result<ExecResult> {
        command.perform(action)?;
        Ok(ExecResult::Done)
    }
}

/// Hands commands to whatever dispatcher is currently connected
#[derive(Default)]
pub struct AsyncPattern {
    dispatcher: RwLock<Option<Weak<dyn CommandDispatch>>>,
}

impl AsyncPattern {
    /// # Errors
    ///
    /// `LockPoisoned` if the dispatcher slot is poisoned.
    pub fn connect(&self, dispatcher: Weak<dyn CommandDispatch>) -> Result<()> {
        let mut slot = self
            .dispatcher
            .write()
            .map_err(|_| SessionError::poisoned("dispatcher slot"))?;
        *slot = Some(dispatcher);
        Ok(())
    }

    /// # Errors
    ///
    /// `LockPoisoned` if the dispatcher slot is poisoned.
    pub fn disconnect(&self) -> Result<()> {
        let mut slot = self
            .dispatcher
            .write()
            .map_err(|_| SessionError::poisoned("dispatcher slot"))?;
        *slot = None;
        Ok(())
    }

    fn current(&self) -> Result<Option<Arc<dyn CommandDispatch>>> {
        let slot = self
            .dispatcher
            .read()
            .map_err(|_| SessionError::poisoned("dispatcher slot"))?;
        Ok(slot.as_ref().and_then(Weak::upgrade))
    }
}

impl HandlingPattern for AsyncPattern {
    fn id(&self) -> PatternId {
        PatternId::Async
    }

    /// # Errors
    ///
    /// `Lifecycle` when no dispatcher is running, otherwise whatever the
    /// dispatcher reports on enqueue.
    fn invoke(&self, command: &Command, action: Action) -> Result<ExecResult> {
        let dispatcher = self.current()?.ok_or_else(|| SessionError::Lifecycle {
            message: "dispatcher closed".to_string(),
        })?;
        dispatcher.enqueue(command.clone(), action)?;
        Ok(ExecResult::Dispatched)
    }
}

impl std::fmt::Debug for AsyncPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connected = self.current().ok().flatten().is_some();
        f.debug_struct("AsyncPattern")
            .field("connected", &connected)
            .finish()
    }
}

/// Diagnostic pattern: records invocations, never runs the command
#[derive(Debug, Default)]
pub struct DummyPattern {
    invocations: AtomicUsize,
}

impl DummyPattern {
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl HandlingPattern for DummyPattern {
    fn id(&self) -> PatternId {
        PatternId::Dummy
    }

    fn invoke(&self, command: &Command, action: Action) -> Result<ExecResult> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(command_id = %command.id(), ?action, "dummy invocation");
        Ok(ExecResult::Skipped)
    }
}

/// One instance of every pattern, shared by all commands of a registry
#[derive(Debug, Default)]
pub struct HandlingPatterns {
    sync: Arc<SyncPattern>,
    sync_throw: Arc<SyncThrowPattern>,
    dispatch: Arc<AsyncPattern>,
    dummy: Arc<DummyPattern>,
}

impl HandlingPatterns {
    pub fn get(&self, id: PatternId) -> Arc<dyn HandlingPattern> {
        match id {
            PatternId::Sync => self.sync.clone(),
            PatternId::SyncThrow => self.sync_throw.clone(),
            PatternId::Async => self.dispatch.clone(),
            PatternId::Dummy => self.dummy.clone(),
        }
    }

    pub fn dummy(&self) -> &DummyPattern {
        &self.dummy
    }

    /// Route the `Async` pattern into `dispatcher`
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the dispatcher slot is poisoned.
    pub fn connect_dispatcher(&self, dispatcher: Weak<dyn CommandDispatch>) -> Result<()> {
        self.dispatch.connect(dispatcher)
    }

    /// # Errors
    ///
    /// `LockPoisoned` if the dispatcher slot is poisoned.
    pub fn disconnect_dispatcher(&self) -> Result<()> {
        self.dispatch.disconnect()
    }
}
