//! FIFO of bound commands with a priority lane
//!
//! Entries fed through [`CommandQueue::feed_priority`] are popped before
//! ordinary ones. Inside each lane the order is strictly FIFO.
//! The queue has its own lock, independent of the placement index.
//!
//! Every entry carries the [`RequestContext`] it was submitted with, so the
//! thread that pops it can log under the submitter's `request_id`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use montage_core_types::RequestContext;

use crate::command::{Action, Command};
use crate::errors::{Result, SessionError};

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub command: Command,
    pub action: Action,
    pub request: RequestContext,
}

#[derive(Debug, Default)]
struct Lanes {
    urgent: VecDeque<QueueEntry>,
    normal: VecDeque<QueueEntry>,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    lanes: Mutex<Lanes>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lanes(&self) -> Result<MutexGuard<'_, Lanes>> {
        self.lanes
            .lock()
            .map_err(|_| SessionError::poisoned("command queue"))
    }

    /// Enqueue for execution in arrival order
    ///
    /// # Errors
    ///
    /// `UnboundArguments` if the command is not bound; the queue is unchanged.
    pub fn feed(&self, command: Command) -> Result<()> {
        self.enqueue(command, Action::Exec, false, RequestContext::new())
    }

    /// Enqueue ahead of all ordinary entries
    ///
    /// # Errors
    ///
    /// `UnboundArguments` if the command is not bound; the queue is unchanged.
    pub fn feed_priority(&self, command: Command) -> Result<()> {
        self.enqueue(command, Action::Exec, true, RequestContext::new())
    }

    /// # Errors
    ///
    /// `UnboundArguments` if the command is not bound; the queue is unchanged.
    pub fn enqueue(
        &self,
        command: Command,
        action: Action,
        urgent: bool,
        request: RequestContext,
    ) -> Result<()> {
        if !command.can_exec() {
            return Err(SessionError::UnboundArguments {
                command_id: command.id().to_string(),
            });
        }
        let mut lanes = self.lanes()?;
        let lane = if urgent {
            &mut lanes.urgent
        } else {
            &mut lanes.normal
        };
        lane.push_back(QueueEntry {
            command,
            action,
            request,
        });
        Ok(())
    }

    /// Oldest urgent entry, else oldest ordinary entry
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the queue lock is poisoned.
    pub fn pop(&self) -> Result<Option<QueueEntry>> {
        let mut lanes = self.lanes()?;
        Ok(lanes.urgent.pop_front().or_else(|| lanes.normal.pop_front()))
    }

    /// Drop all entries, returning how many were discarded
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the queue lock is poisoned.
    pub fn clear(&self) -> Result<usize> {
        let mut lanes = self.lanes()?;
        let dropped = lanes.urgent.len() + lanes.normal.len();
        lanes.urgent.clear();
        lanes.normal.clear();
        Ok(dropped)
    }

    /// A poisoned queue reports zero
    pub fn len(&self) -> usize {
        self.lanes()
            .map(|l| l.urgent.len() + l.normal.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an equal command is waiting
    pub fn contains(&self, command: &Command) -> bool {
        let waiting: Vec<Command> = match self.lanes() {
            Ok(lanes) => lanes
                .urgent
                .iter()
                .chain(lanes.normal.iter())
                .map(|e| e.command.clone())
                .collect(),
            Err(_) => return false,
        };
        waiting.iter().any(|c| c == command)
    }
}
