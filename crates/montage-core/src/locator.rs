//! ScopeLocator: session-level access point for scope navigation and queries

use std::sync::{Arc, Mutex};

use crate::errors::Result;
use crate::focus::{QueryFocus, QueryFocusStack};
use crate::index::PlacementIndex;
use crate::model::{MObject, MObjectKind};
use crate::query::{QueryKind, ScopeQuery};
use crate::scope::Scope;
use crate::scope_path::ScopePath;

#[derive(Clone)]
pub struct ScopeLocator {
    index: Arc<PlacementIndex>,
    stack: Arc<Mutex<QueryFocusStack>>,
}

impl ScopeLocator {
    pub fn new(index: Arc<PlacementIndex>, stack: Arc<Mutex<QueryFocusStack>>) -> Self {
        Self { index, stack }
    }

    /// Handle on the current focus frame
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the focus stack lock is poisoned.
    pub fn current(&self) -> Result<QueryFocus> {
        QueryFocus::current(self.stack.clone(), self.index.clone())
    }

    /// Path of the current focus
    ///
    /// # Errors
    ///
    /// See [`ScopeLocator::current`].
    pub fn current_path(&self) -> Result<ScopePath> {
        self.current()?.current_path()
    }

    /// The scope followed by all its enclosing scopes, leaf first
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is unknown.
    pub fn raw_path(&self, scope: Scope) -> Result<ScopeQuery<MObject>> {
        ScopeQuery::issue(self.index.clone(), scope, QueryKind::Path)
    }

    /// Move the current focus to `scope`
    ///
    /// The focus stays there as long as the returned handle, or a clone of
    /// it, is alive.
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is not connected to the model root.
    pub fn locate(&self, scope: Scope) -> Result<QueryFocus> {
        let focus = self.current()?;
        focus.navigate(scope)?;
        Ok(focus)
    }

    /// Direct children of `scope` holding a `K`
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is unknown.
    pub fn explore<K: MObjectKind>(&self, scope: Scope) -> Result<ScopeQuery<K>> {
        ScopeQuery::issue(self.index.clone(), scope, QueryKind::Children)
    }

    /// Everything below `scope` holding a `K`, depth first
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is unknown.
    pub fn query<K: MObjectKind>(&self, scope: Scope) -> Result<ScopeQuery<K>> {
        ScopeQuery::issue(self.index.clone(), scope, QueryKind::Contents)
    }
}

impl std::fmt::Debug for ScopeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeLocator")
            .field("index_size", &self.index.size())
            .finish_non_exhaustive()
    }
}
