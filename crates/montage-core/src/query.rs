//! Type-filtered, lazily evaluated queries over the scope tree
//!
//! A query is issued against a [`QueryResolver`]. Issuing materializes the
//! matching IDs under the resolver's read lock; the placements themselves
//! are fetched one by one as the caller advances the iterator.
//!
//! An iterator held open across a concurrent removal is not atomic against
//! it: removed placements are skipped when reached. Callers keeping long
//! lived queries over a mutating index must serialize with the mutators.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::Result;
use crate::index::PlacementIndex;
use crate::model::{MObject, MObjectKind};
use crate::placement::{Placement, PlacementId};
use crate::scope::Scope;

/// Relationship a query explores, starting from a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Everything below the scope, depth-first pre-order
    Contents,
    /// Immediate children only
    Children,
    /// Enclosing scopes up to the root, excluding the start
    Parents,
    /// The start scope followed by its enclosing scopes up to the root
    Path,
}

/// Answers scope queries; decouples query users from the index
pub trait QueryResolver: Send + Sync {
    /// IDs matching `kind` from `start`, in result order
    ///
    /// # Errors
    ///
    /// `InvalidScope` or `NotInSession` if `start` is unknown.
    fn resolve_ids(&self, kind: QueryKind, start: PlacementId) -> Result<Vec<PlacementId>>;

    /// Current snapshot of a placement, `None` once it is gone
    fn fetch(&self, id: PlacementId) -> Option<Placement>;
}

impl QueryResolver for PlacementIndex {
    fn resolve_ids(&self, kind: QueryKind, start: PlacementId) -> Result<Vec<PlacementId>> {
        match kind {
            QueryKind::Contents => self.contents(start),
            QueryKind::Children => self.children(start),
            QueryKind::Parents => self.ancestors(start),
            QueryKind::Path => {
                let mut path = vec![start];
                path.extend(self.ancestors(start)?);
                Ok(path)
            }
        }
    }

    fn fetch(&self, id: PlacementId) -> Option<Placement> {
        self.find(id).ok()
    }
}

/// Finite, non-restartable sequence of placements holding a `K`
///
/// Exhausting it requires issuing the query again.
pub struct ScopeQuery<K: MObjectKind = MObject> {
    resolver: Arc<dyn QueryResolver>,
    kind: QueryKind,
    start: Scope,
    pending: std::vec::IntoIter<PlacementId>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: MObjectKind> ScopeQuery<K> {
    /// Issue a query, materializing the candidate IDs
    ///
    /// # Errors
    ///
    /// `InvalidScope` for the invalid scope or an unknown start.
    pub fn issue(resolver: Arc<dyn QueryResolver>, start: Scope, kind: QueryKind) -> Result<Self> {
        let top = start.require_top()?;
        let ids = resolver.resolve_ids(kind, top)?;
        tracing::debug!(
            scope_id = %top,
            ?kind,
            filter = K::NAME,
            candidates = ids.len(),
            "scope query issued"
        );
        Ok(Self {
            resolver,
            kind,
            start,
            pending: ids.into_iter(),
            _kind: PhantomData,
        })
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn start(&self) -> Scope {
        self.start
    }

    /// Collect the IDs of the remaining results
    pub fn ids(self) -> Vec<PlacementId> {
        self.map(|p| p.id()).collect()
    }
}

impl<K: MObjectKind> Iterator for ScopeQuery<K> {
    type Item = Placement;

    fn next(&mut self) -> Option<Placement> {
        for id in self.pending.by_ref() {
            if let Some(placement) = self.resolver.fetch(id) {
                if placement.is::<K>() {
                    return Some(placement);
                }
            }
        }
        None
    }
}

impl<K: MObjectKind> std::fmt::Debug for ScopeQuery<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeQuery")
            .field("kind", &self.kind)
            .field("filter", &K::NAME)
            .field("start", &self.start)
            .field("remaining", &self.pending.len())
            .finish()
    }
}

/// Shorthand for a depth-first contents query
///
/// # Errors
///
/// See [`ScopeQuery::issue`].
pub fn contents<K: MObjectKind>(resolver: Arc<dyn QueryResolver>, scope: Scope) -> Result<ScopeQuery<K>> {
    ScopeQuery::issue(resolver, scope, QueryKind::Contents)
}

/// Shorthand for a direct-children query
///
/// # Errors
///
/// See [`ScopeQuery::issue`].
pub fn children<K: MObjectKind>(resolver: Arc<dyn QueryResolver>, scope: Scope) -> Result<ScopeQuery<K>> {
    ScopeQuery::issue(resolver, scope, QueryKind::Children)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::SessionError;
    use crate::model::{AssetCategory, AssetRef, Clip, Duration, Fork, Sequence};

    fn clip(name: &str) -> Placement {
        Placement::new(MObject::clip(
            name,
            AssetRef::new(AssetCategory::Video, name),
            Duration(10),
        ))
    }

    fn setup() -> (Arc<PlacementIndex>, PlacementId, PlacementId, PlacementId) {
        let index = Arc::new(PlacementIndex::new());
        let root = index.root_id();
        let seq = index
            .insert(Placement::new(MObject::sequence("main")), root)
            .unwrap();
        let fork = index.insert(Placement::new(MObject::fork("V1")), seq).unwrap();
        let c = index.insert(clip("c1"), fork).unwrap();
        (index, seq, fork, c)
    }

    #[test]
    fn test_contents_filters_by_kind() {
        let (index, _, _, c) = setup();
        let root = Scope::new(index.root_id());

        let all: Vec<_> = contents::<MObject>(index.clone(), root).unwrap().ids();
        let clips: Vec<_> = contents::<Clip>(index.clone(), root).unwrap().ids();

        assert_eq!(all.len(), 3);
        assert_eq!(clips, vec![c]);
    }

    #[test]
    fn test_children_only_one_level() {
        let (index, seq, fork, _) = setup();
        let kids = children::<MObject>(index.clone(), Scope::new(seq)).unwrap().ids();
        assert_eq!(kids, vec![fork]);
    }

    #[test]
    fn test_parents_and_path_differ_by_start() {
        let (index, seq, fork, c) = setup();
        let root = index.root_id();

        let parents = ScopeQuery::<MObject>::issue(index.clone(), Scope::new(c), QueryKind::Parents)
            .unwrap()
            .ids();
        let path = ScopeQuery::<MObject>::issue(index.clone(), Scope::new(c), QueryKind::Path)
            .unwrap()
            .ids();

        assert_eq!(parents, vec![fork, seq, root]);
        assert_eq!(path, vec![c, fork, seq, root]);
        let seqs = ScopeQuery::<Sequence>::issue(index.clone(), Scope::new(c), QueryKind::Parents)
            .unwrap()
            .ids();
        assert_eq!(seqs, vec![seq]);
    }

    #[test]
    fn test_query_on_unknown_scope_fails() {
        let (index, _, _, _) = setup();
        let result = contents::<MObject>(index.clone(), Scope::new(PlacementId::new()));
        assert!(matches!(result, Err(SessionError::InvalidScope { .. })));
        let result = contents::<MObject>(index, Scope::INVALID);
        assert!(matches!(result, Err(SessionError::InvalidScope { .. })));
    }

    #[test]
    fn test_removed_entries_are_skipped_by_open_query() {
        let (index, _, fork, c) = setup();
        let mut query = contents::<MObject>(index.clone(), Scope::new(index.root_id())).unwrap();

        // first result is the sequence; then remove the fork subtree
        assert!(query.next().is_some());
        index.remove(fork).unwrap();

        assert!(query.next().is_none());
        assert!(!index.contains(c));
    }

    #[test]
    fn test_concurrent_open_queries() {
        let (index, _, _, _) = setup();
        let root = Scope::new(index.root_id());
        let mut q1 = contents::<MObject>(index.clone(), root).unwrap();
        let q2 = contents::<Fork>(index.clone(), root).unwrap();

        assert!(q1.next().is_some());
        assert_eq!(q2.count(), 1);
        assert_eq!(q1.count(), 2);
    }
}
