//! Command service facade
//!
//! Front ends address commands by ID. The service hands out fresh
//! anonymous instances, binds their arguments and dispatches them to the
//! session loop, so the registered definitions are never mutated by a
//! front end.

use std::sync::Arc;
use std::time::Instant;

use montage_core::command::{Action, CommandArgs};
use montage_core::{log_op_end, log_op_error, log_op_start};
use montage_core::{Command, CommandId, ExecResult, Result, Session};
use montage_core_types::{RequestContext, SessionOp};

use crate::dispatcher::Dispatcher;

#[derive(Debug, Clone)]
pub struct SessionCommandService {
    session: Arc<Session>,
    dispatcher: Arc<Dispatcher>,
}

impl SessionCommandService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            session: dispatcher.session().clone(),
            dispatcher,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Fresh anonymous instance of a registered command
    ///
    /// # Errors
    ///
    /// `InvalidCommand` if `id` is not defined.
    pub fn cycle(&self, id: impl Into<CommandId>) -> Result<Command> {
        self.session.command(id)?.new_instance()
    }

    /// # Errors
    ///
    /// `InvalidArguments` if `args` don't match the command's signature.
    pub fn bind_arg<A: CommandArgs>(&self, command: &Command, args: A) -> Result<()> {
        command.bind(args).map(|_| ())
    }

    /// Queue the command for execution on the session loop
    ///
    /// # Errors
    ///
    /// `UnboundArguments` if not bound, `Lifecycle` once the loop stopped.
    pub fn invoke(&self, command: &Command) -> Result<ExecResult> {
        self.dispatch(command, Action::Exec, RequestContext::new())
    }

    /// Queue an undo of the command's last execution
    ///
    /// The memento is checked when the loop runs the undo, since the
    /// execution itself may still be queued.
    ///
    /// # Errors
    ///
    /// `UnboundArguments` if not bound, `Lifecycle` once the loop stopped.
    pub fn invoke_undo(&self, command: &Command) -> Result<ExecResult> {
        self.dispatch(command, Action::Undo, RequestContext::new())
    }

    /// Cycle, bind and invoke in one go
    ///
    /// Returns the dispatched instance, which can later be undone. The
    /// trigger and the later dispatch on the session loop are logged with
    /// the same `request_id`.
    ///
    /// # Errors
    ///
    /// Whatever cycling, binding or invoking reports; nothing is queued
    /// on failure.
    pub fn trigger<A: CommandArgs>(&self, id: impl Into<CommandId>, args: A) -> Result<Command> {
        let id = id.into();
        let request = RequestContext::new();
        let request_id = request.request_id();
        let started = Instant::now();
        log_op_start!(SessionOp::CommandTrigger, command_id = %id, request_id = %request_id);

        let outcome = self.cycle(id.clone()).and_then(|command| {
            self.bind_arg(&command, args)?;
            self.dispatch(&command, Action::Exec, request)?;
            Ok(command)
        });

        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => {
                log_op_end!(
                    SessionOp::CommandTrigger,
                    duration_ms = duration_ms,
                    command_id = %id,
                    request_id = %request_id
                );
            }
            Err(err) => {
                log_op_error!(
                    SessionOp::CommandTrigger,
                    err.clone(),
                    duration_ms = duration_ms,
                    command_id = %id,
                    request_id = %request_id
                );
            }
        }
        outcome
    }

    fn dispatch(&self, command: &Command, action: Action, request: RequestContext) -> Result<ExecResult> {
        self.dispatcher.submit(request, command.clone(), action)?;
        Ok(ExecResult::Dispatched)
    }
}
