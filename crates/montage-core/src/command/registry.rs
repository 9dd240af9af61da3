//! Command registry: definitions by symbolic ID
//!
//! The registry is an explicitly passed service; there is no process-wide
//! command table. Cloning yields another handle onto the same table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::command::definition::CommandDef;
use crate::command::handle::CommandImpl;
use crate::command::{Command, CommandId, HandlingPatterns};
use crate::errors::{Result, SessionError};

type DefTable = HashMap<CommandId, Arc<Mutex<CommandImpl>>>;

#[derive(Default)]
struct RegistryInner {
    defs: Mutex<DefTable>,
    live: Arc<AtomicUsize>,
    patterns: HandlingPatterns,
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    inner: Arc<RegistryInner>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> Result<MutexGuard<'_, DefTable>> {
        self.inner
            .defs
            .lock()
            .map_err(|_| SessionError::poisoned("command registry"))
    }

    /// Start defining a command; nothing is registered until the
    /// definition is complete
    pub fn define(&self, id: impl Into<CommandId>) -> CommandDef {
        CommandDef::new(self.clone(), id.into())
    }

    pub(crate) fn live_counter(&self) -> Arc<AtomicUsize> {
        self.inner.live.clone()
    }

    pub(crate) fn register(&self, id: CommandId, imp: CommandImpl) -> Result<Command> {
        let mut defs = self.table()?;
        if defs.contains_key(&id) {
            return Err(SessionError::DuplicateCommand {
                command_id: id.to_string(),
            });
        }
        let imp = Arc::new(Mutex::new(imp));
        defs.insert(id.clone(), imp.clone());
        tracing::debug!(command_id = %id, definitions = defs.len(), "command defined");
        Ok(Command::from_impl(id, imp, self.clone()))
    }

    /// Handle onto a registered definition
    ///
    /// # Errors
    ///
    /// `InvalidCommand` if `id` is not defined.
    pub fn get(&self, id: impl Into<CommandId>) -> Result<Command> {
        let id = id.into();
        let imp = self
            .table()?
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::InvalidCommand {
                command_id: id.to_string(),
                reason: "not defined".to_string(),
            })?;
        Ok(Command::from_impl(id, imp, self.clone()))
    }

    /// Drop a definition; handles already handed out stay usable
    pub fn remove(&self, id: impl Into<CommandId>) -> bool {
        let id = id.into();
        self.table()
            .map(|mut defs| defs.remove(&id).is_some())
            .unwrap_or(false)
    }

    pub fn is_defined(&self, id: impl Into<CommandId>) -> bool {
        let id = id.into();
        self.table()
            .map(|defs| defs.contains_key(&id))
            .unwrap_or(false)
    }

    /// False for unknown IDs
    pub fn can_exec(&self, id: impl Into<CommandId>) -> bool {
        self.get(id).map(|cmd| cmd.can_exec()).unwrap_or(false)
    }

    /// False for unknown IDs
    pub fn can_undo(&self, id: impl Into<CommandId>) -> bool {
        self.get(id).map(|cmd| cmd.can_undo()).unwrap_or(false)
    }

    pub fn definition_count(&self) -> usize {
        self.table().map(|defs| defs.len()).unwrap_or(0)
    }

    /// Live command records, registered or anonymous
    pub fn instance_count(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// ID under which `command`, or an equal command, is registered
    pub fn find_definition(&self, command: &Command) -> Option<CommandId> {
        let candidates: Vec<(CommandId, Arc<Mutex<CommandImpl>>)> = self
            .table()
            .ok()?
            .iter()
            .map(|(id, imp)| (id.clone(), imp.clone()))
            .collect();

        if let Some((id, _)) = candidates.iter().find(|(_, imp)| command.shares_impl(imp)) {
            return Some(id.clone());
        }
        candidates
            .into_iter()
            .find(|(id, imp)| *command == Command::from_impl(id.clone(), imp.clone(), self.clone()))
            .map(|(id, _)| id)
    }

    pub fn patterns(&self) -> &HandlingPatterns {
        &self.inner.patterns
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("definitions", &self.definition_count())
            .field("instances", &self.instance_count())
            .finish()
    }
}
