//! Session loop thread
//!
//! The [`Dispatcher`] owns a command queue and one worker thread. Each turn
//! of the worker either dispatches a single queued command or, when the
//! [`Looper`] says so, rebuilds the session fixture. Commands run with
//! throwing semantics on the worker; their failures are logged and
//! recorded, and the loop carries on. Only fatal failures end the loop.
//!
//! The dispatcher connects itself to the session's ASYNC handling pattern,
//! so commands executed through that pattern land in its queue.
//!
//! Lock order is looper state first, then the queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use montage_core::command::{Action, CommandDispatch, SyncThrowPattern};
use montage_core::{log_op_end, log_op_error, log_op_start};
use montage_core::{Command, CommandQueue, ExecResult, Result, Session, SessionError};
use montage_core_types::{RequestContext, SessionOp};

use crate::config::EngineConfig;
use crate::looper::Looper;

const LOOP_THREAD_NAME: &str = "montage-session";
const SHUTDOWN_THREAD_NAME: &str = "montage-shutdown";

/// Receives the error description, if the thread ended abnormally
pub type ExitCallback = Box<dyn FnOnce(Option<String>) + Send>;

struct Shared {
    session: Arc<Session>,
    queue: Arc<CommandQueue>,
    looper: Mutex<Looper>,
    wake: Condvar,
    dispatched: AtomicUsize,
    builds: AtomicUsize,
    last_error: Mutex<Option<SessionError>>,
}

impl Shared {
    fn lock_looper(&self) -> Result<MutexGuard<'_, Looper>> {
        self.looper.lock().map_err(|_| poisoned("looper"))
    }

    fn record_failure(&self, err: SessionError) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(err);
        }
    }

    /// Absorbs ordinary failures; only fatal ones end the loop
    fn absorb(&self, outcome: Result<()>) -> Result<()> {
        match outcome {
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.record_failure(err);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn dispatch_next(&self) -> Result<()> {
        let Some(entry) = self.queue.pop()? else {
            return Ok(());
        };
        let started = Instant::now();
        let request_id = entry.request.request_id();
        log_op_start!(
            SessionOp::CommandDispatch,
            command_id = %entry.command.id(),
            request_id = %request_id,
            action = ?entry.action,
            queued_ms = entry.request.queued_ms()
        );

        let outcome = match entry.action {
            Action::Exec => entry.command.exec_with(&SyncThrowPattern),
            Action::Undo => entry.command.undo_with(&SyncThrowPattern),
        }
        .and_then(ExecResult::maybe_throw);

        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::SeqCst);
                log_op_end!(
                    SessionOp::CommandDispatch,
                    duration_ms = duration_ms,
                    command_id = %entry.command.id(),
                    request_id = %request_id
                );
            }
            Err(err) => {
                log_op_error!(
                    SessionOp::CommandDispatch,
                    err.clone(),
                    duration_ms = duration_ms,
                    command_id = %entry.command.id(),
                    request_id = %request_id
                );
            }
        }
        self.absorb(outcome)
    }

    fn build(&self) -> Result<()> {
        let started = Instant::now();
        log_op_start!(SessionOp::FixtureBuild);

        let outcome = self.session.rebuild_fixture();

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(fixture) => {
                self.builds.fetch_add(1, Ordering::SeqCst);
                log_op_end!(SessionOp::FixtureBuild, duration_ms = duration_ms, segment_count = fixture.len());
                Ok(())
            }
            Err(err) => {
                log_op_error!(SessionOp::FixtureBuild, err.clone(), duration_ms = duration_ms);
                self.absorb(Err(err))
            }
        }
    }

    fn run(&self) -> Result<()> {
        loop {
            let (run_build, working) = {
                let looper = self.lock_looper()?;
                let timeout = looper.timeout();
                let looper = match timeout {
                    Some(timeout) => self
                        .wake
                        .wait_timeout_while(looper, timeout, |l| !l.require_action())
                        .map(|(guard, _)| guard)
                        .map_err(|_| poisoned("looper"))?,
                    None => self
                        .wake
                        .wait_while(looper, |l| !l.require_action())
                        .map_err(|_| poisoned("looper"))?,
                };

                if !looper.shall_loop() {
                    break;
                }
                (looper.run_build(), looper.is_working())
            };

            if run_build {
                self.build()?;
            } else if working {
                self.dispatch_next()?;
            }

            self.lock_looper()?.mark_state_processed();
            self.wake.notify_all();
        }
        Ok(())
    }

    fn close(&self) {
        if let Ok(mut looper) = self.looper.lock() {
            looper.trigger_shutdown();
        }
        self.wake.notify_all();
        match self.queue.clear() {
            Ok(0) => {}
            Ok(dropped) => tracing::warn!(queue_len = dropped, "discarded pending commands at loop exit"),
            Err(err) => tracing::error!(error = %err, "can't discard pending commands"),
        }
    }
}

fn session_loop(shared: Arc<Shared>, on_exit: ExitCallback) {
    tracing::info!("session loop started");
    let error = shared.run().err().map(|err| err.to_string());
    shared.close();
    match &error {
        Some(message) => tracing::error!(error = %message, "session loop terminated abnormally"),
        None => tracing::info!("session loop stopped"),
    }
    on_exit(error);
}

fn poisoned(resource: &str) -> SessionError {
    SessionError::LockPoisoned {
        resource: resource.to_string(),
    }
}

/// Owner of the session loop thread
pub struct Dispatcher {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
    loop_thread: ThreadId,
}

impl Dispatcher {
    /// Launch the loop thread for `session`
    ///
    /// `on_exit` runs on the loop thread right before it ends.
    ///
    /// # Errors
    ///
    /// `Lifecycle` if the thread can't be spawned, `LockPoisoned` if the
    /// ASYNC pattern can't be connected.
    pub fn start<F>(session: Arc<Session>, config: &EngineConfig, on_exit: F) -> Result<Arc<Dispatcher>>
    where
        F: FnOnce(Option<String>) + Send + 'static,
    {
        let queue = Arc::new(CommandQueue::new());
        let pending = queue.clone();
        let mut looper = Looper::new(config, move || !pending.is_empty());
        looper.enable_processing(config.start_active);

        let shared = Arc::new(Shared {
            session,
            queue,
            looper: Mutex::new(looper),
            wake: Condvar::new(),
            dispatched: AtomicUsize::new(0),
            builds: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        });

        let worker = shared.clone();
        let on_exit: ExitCallback = Box::new(on_exit);
        let handle = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || session_loop(worker, on_exit))
            .map_err(|e| SessionError::Lifecycle {
                message: format!("can't start the session loop thread: {}", e),
            })?;

        let dispatcher = Arc::new(Dispatcher {
            loop_thread: handle.thread().id(),
            shared,
            thread: Mutex::new(Some(handle)),
        });
        let weak = Arc::downgrade(&dispatcher) as Weak<dyn CommandDispatch>;
        dispatcher
            .shared
            .session
            .registry()
            .patterns()
            .connect_dispatcher(weak)?;

        tracing::info!(
            builder_delay_ms = config.builder_delay_ms,
            start_active = config.start_active,
            "dispatcher started"
        );
        Ok(dispatcher)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.shared.session
    }

    /// Enqueue ahead of all ordinary commands
    ///
    /// # Errors
    ///
    /// As [`CommandDispatch::enqueue`].
    pub fn enqueue_urgent(&self, command: Command) -> Result<()> {
        self.push(command, Action::Exec, true, RequestContext::new())
    }

    /// Queue under the caller's request, so the dispatch is logged with
    /// the same `request_id` as the submission
    ///
    /// # Errors
    ///
    /// `UnboundArguments` if not bound, `Lifecycle` once the loop stopped.
    pub fn submit(&self, request: RequestContext, command: Command, action: Action) -> Result<()> {
        self.push(command, action, false, request)
    }

    fn push(&self, command: Command, action: Action, urgent: bool, request: RequestContext) -> Result<()> {
        let looper = self.shared.lock_looper()?;
        if looper.is_dying() {
            return Err(SessionError::Lifecycle {
                message: "dispatcher closed".to_string(),
            });
        }
        self.shared.queue.enqueue(command, action, urgent, request)?;
        drop(looper);
        self.shared.wake.notify_all();
        Ok(())
    }

    /// # Errors
    ///
    /// `LockPoisoned` if the loop state is poisoned.
    pub fn activate(&self) -> Result<()> {
        self.enable_processing(true)
    }

    /// Stop taking commands from the queue; queued commands stay
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the loop state is poisoned.
    pub fn deactivate(&self) -> Result<()> {
        self.enable_processing(false)
    }

    fn enable_processing(&self, enabled: bool) -> Result<()> {
        self.shared.lock_looper()?.enable_processing(enabled);
        self.shared.wake.notify_all();
        tracing::debug!(enabled, "command processing toggled");
        Ok(())
    }

    /// Ask the loop to end after the current turn
    ///
    /// Disconnects the ASYNC pattern; the loop thread is not joined.
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the loop state or the dispatcher slot is poisoned.
    pub fn request_stop(&self) -> Result<()> {
        self.shared.session.registry().patterns().disconnect_dispatcher()?;
        self.shared.lock_looper()?.trigger_shutdown();
        self.shared.wake.notify_all();
        tracing::debug!("session loop stop requested");
        Ok(())
    }

    /// Block until every queued command and the due build were processed
    ///
    /// Returns right away while processing is deactivated or the loop is
    /// shutting down.
    ///
    /// # Errors
    ///
    /// `Fatal` when called from the loop thread itself, which could never
    /// make progress.
    pub fn await_state_processed(&self) -> Result<()> {
        if thread::current().id() == self.loop_thread {
            return Err(SessionError::Fatal {
                message: "possible deadlock: awaiting state processing on the session loop thread"
                    .to_string(),
            });
        }
        let looper = self.shared.lock_looper()?;
        let _synched = self
            .shared
            .wake
            .wait_while(looper, |l| !l.is_state_synched())
            .map_err(|_| poisoned("looper"))?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Commands dispatched successfully so far
    pub fn dispatched(&self) -> usize {
        self.shared.dispatched.load(Ordering::SeqCst)
    }

    /// Fixture builds completed so far
    pub fn builds(&self) -> usize {
        self.shared.builds.load(Ordering::SeqCst)
    }

    /// Most recent command or build failure absorbed by the loop
    pub fn last_error(&self) -> Option<SessionError> {
        self.shared.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    /// Stop the loop from a separate supervisor thread
    ///
    /// Returns immediately. The supervisor requests stop, joins the loop
    /// thread and then calls `on_complete`, with an error description if
    /// the loop thread panicked. Safe to call from within a command.
    ///
    /// # Errors
    ///
    /// `Lifecycle` if already shut down or the supervisor can't be spawned.
    pub fn shutdown<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce(Option<String>) + Send + 'static,
    {
        self.request_stop()?;
        let handle = self
            .thread
            .lock()
            .map_err(|_| poisoned("loop thread handle"))?
            .take()
            .ok_or_else(|| SessionError::Lifecycle {
                message: "session loop already shut down".to_string(),
            })?;

        thread::Builder::new()
            .name(SHUTDOWN_THREAD_NAME.to_string())
            .spawn(move || {
                let outcome = handle
                    .join()
                    .err()
                    .map(|_| "session loop thread panicked".to_string());
                tracing::info!(clean = outcome.is_none(), "session loop joined");
                on_complete(outcome);
            })
            .map_err(|e| SessionError::Lifecycle {
                message: format!("can't start the shutdown supervisor: {}", e),
            })?;
        Ok(())
    }
}

impl CommandDispatch for Dispatcher {
    /// # Errors
    ///
    /// `Lifecycle` once the loop is shutting down, `UnboundArguments` for
    /// an unbound command.
    fn enqueue(&self, command: Command, action: Action) -> Result<()> {
        self.push(command, action, false, RequestContext::new())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Ok(mut looper) = self.shared.looper.lock() {
            looper.trigger_shutdown();
        }
        self.shared.wake.notify_all();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("running", &self.is_running())
            .field("queue_len", &self.queue_len())
            .field("dispatched", &self.dispatched())
            .field("builds", &self.builds())
            .finish()
    }
}
