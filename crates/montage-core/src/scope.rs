//! Scope: the set of placements nested below a given placement

use crate::errors::{Result, SessionError};
use crate::index::PlacementIndex;
use crate::placement::PlacementId;

/// Back-reference to the placement constituting a scope
///
/// A scope never owns anything; it is a lookup key into the index. The
/// default value is the invalid scope, which is outside of any model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Scope(Option<PlacementId>);

impl Scope {
    pub const INVALID: Scope = Scope(None);

    pub fn new(top: PlacementId) -> Self {
        Scope(Some(top))
    }

    /// Scope enclosing the given placement
    ///
    /// # Errors
    ///
    /// `NotInSession` if the placement is not registered.
    pub fn containing(index: &PlacementIndex, id: PlacementId) -> Result<Self> {
        Ok(Scope::new(index.get_scope(id)?))
    }

    pub fn top(&self) -> Option<PlacementId> {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_root(&self, index: &PlacementIndex) -> bool {
        self.0 == Some(index.root_id())
    }

    /// The enclosing scope one level up
    ///
    /// # Errors
    ///
    /// `InvalidScope` for the invalid scope and for the root scope,
    /// `NotInSession` if the top placement is gone.
    pub fn parent(&self, index: &PlacementIndex) -> Result<Scope> {
        let top = self.require_top()?;
        if index.is_root(top) {
            return Err(SessionError::InvalidScope {
                scope_id: top.to_string(),
                reason: "the root scope has no parent".to_string(),
            });
        }
        Scope::containing(index, top)
    }

    pub(crate) fn require_top(&self) -> Result<PlacementId> {
        self.0.ok_or_else(|| SessionError::InvalidScope {
            scope_id: "-".to_string(),
            reason: "scope outside the model".to_string(),
        })
    }
}

impl From<PlacementId> for Scope {
    fn from(id: PlacementId) -> Self {
        Scope::new(id)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{}", id.short()),
            None => write!(f, "-"),
        }
    }
}
