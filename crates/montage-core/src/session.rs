//! Session: the explicitly passed context owning the model and its services
//!
//! There is no process-wide current session. Components receive the
//! session, or the parts of it they need, at construction.

use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::command::{Command, CommandId, CommandRegistry};
use crate::errors::{Result, SessionError};
use crate::fixture::Fixture;
use crate::focus::{self, QueryFocus, QueryFocusStack};
use crate::index::{PlacementIndex, RemovalObserver};
use crate::locator::ScopeLocator;
use crate::placement::{Placement, PlacementId};
use crate::query::QueryResolver;
use crate::scope::Scope;
use crate::session_commands::{self, SessionHandle};

pub struct Session {
    index: Arc<PlacementIndex>,
    focus: Arc<Mutex<QueryFocusStack>>,
    registry: CommandRegistry,
    fixture: RwLock<Arc<Fixture>>,
}

impl Session {
    /// Empty session with a fresh model root and the standard commands
    ///
    /// # Errors
    ///
    /// Fails only if the standard commands can't be registered.
    pub fn new() -> Result<Self> {
        Self::with_registry(CommandRegistry::new())
    }

    /// Empty session using `registry` for its commands
    ///
    /// # Errors
    ///
    /// `DuplicateCommand` if `registry` already defines a standard command.
    pub fn with_registry(registry: CommandRegistry) -> Result<Self> {
        let index = Arc::new(PlacementIndex::new());
        let focus = Arc::new(Mutex::new(QueryFocusStack::new(index.root_id())));
        let observer: Weak<dyn RemovalObserver> = Arc::downgrade(&focus) as Weak<dyn RemovalObserver>;
        index.add_removal_observer(observer);
        session_commands::register_all(&registry)?;

        tracing::debug!(root = %index.root_id(), "session created");
        Ok(Self {
            index,
            focus,
            registry,
            fixture: RwLock::new(Arc::new(Fixture::empty())),
        })
    }

    pub fn index(&self) -> &Arc<PlacementIndex> {
        &self.index
    }

    /// Handle to bind as first argument of the session commands
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.index.clone())
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Registered command by ID
    ///
    /// # Errors
    ///
    /// `InvalidCommand` if `id` is not defined.
    pub fn command(&self, id: impl Into<CommandId>) -> Result<Command> {
        self.registry.get(id)
    }

    pub fn resolver(&self) -> Arc<dyn QueryResolver> {
        self.index.clone()
    }

    /// Handle on the current query focus
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the focus stack lock is poisoned.
    pub fn focus(&self) -> Result<QueryFocus> {
        QueryFocus::current(self.focus.clone(), self.index.clone())
    }

    pub fn scope_locator(&self) -> ScopeLocator {
        ScopeLocator::new(self.index.clone(), self.focus.clone())
    }

    /// Attach a placement below the currently focused scope
    ///
    /// # Errors
    ///
    /// `EmptyScopePath` if the focus was moved above the root,
    /// `InvalidScope` if the focused scope is gone.
    pub fn attach(&self, placement: Placement) -> Result<PlacementId> {
        let scope = self.focus()?.scope()?;
        self.attach_to(placement, scope)
    }

    /// # Errors
    ///
    /// `InvalidScope` if `scope` is invalid or unknown.
    pub fn attach_to(&self, placement: Placement, scope: Scope) -> Result<PlacementId> {
        self.index.insert(placement, scope.require_top()?)
    }

    /// Remove a placement and its subtree; `false` if it was not attached
    ///
    /// # Errors
    ///
    /// `RootRemoval` for the model root.
    pub fn detach(&self, id: PlacementId) -> Result<bool> {
        self.index.remove(id)
    }

    /// Drop the whole model below the root and reset focus and fixture
    ///
    /// # Errors
    ///
    /// Any failure here is escalated to `Fatal`.
    pub fn clear(&self) -> Result<()> {
        self.clear_all()
            .map_err(|err| err.escalate("failure while clearing the session"))
    }

    fn clear_all(&self) -> Result<()> {
        let removed = self.index.clear()?;
        focus::lock(&self.focus)?.clear();
        *self.fixture_slot_mut()? = Arc::new(Fixture::empty());
        self.index.verify()?;
        tracing::info!(removed_count = removed, "session cleared");
        Ok(())
    }

    /// Re-derive the fixture from the current model
    ///
    /// # Errors
    ///
    /// Whatever [`Fixture::build`] reports; the previous fixture stays.
    pub fn rebuild_fixture(&self) -> Result<Arc<Fixture>> {
        let fixture = Arc::new(Fixture::build(&self.index)?);
        let mut slot = self.fixture_slot_mut()?;
        if slot.digest() != fixture.digest() {
            tracing::info!(segment_count = fixture.len(), digest = fixture.digest(), "fixture changed");
        }
        *slot = fixture.clone();
        Ok(fixture)
    }

    /// Most recently built fixture
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the fixture slot is poisoned.
    pub fn fixture(&self) -> Result<Arc<Fixture>> {
        self.fixture
            .read()
            .map(|f| f.clone())
            .map_err(|_| SessionError::poisoned("fixture"))
    }

    fn fixture_slot_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, Arc<Fixture>>> {
        self.fixture
            .write()
            .map_err(|_| SessionError::poisoned("fixture"))
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.index, &other.index)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.index.root_id())
            .field("size", &self.index.size())
            .field("commands", &self.registry.definition_count())
            .finish()
    }
}
