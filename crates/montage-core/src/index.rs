//! PlacementIndex: the authoritative registry of all placements in a session
//!
//! The index owns every placement and records the scope tree: each
//! placement has exactly one enclosing scope, the model root is its own
//! scope and can't be removed. All access goes through one coarse
//! read/write lock, held for the duration of a single call.
//!
//! ## Removal observers
//!
//! Components anchored at placements (the query focus) register a
//! [`RemovalObserver`]. Observers are called after the write lock has been
//! released, so they may query the index again.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::errors::{Result, SessionError};
use crate::model::{MObject, MObjectKind, SessionRoot};
use crate::placement::{Placement, PlacementId};

/// Notified whenever placements leave the index
pub trait RemovalObserver: Send + Sync {
    /// `removed` lists every placement that was dropped, `surviving_parent`
    /// is the scope the removed subtree was attached to.
    fn placements_removed(&self, removed: &[PlacementId], surviving_parent: PlacementId);
}

/// One placement of a subtree snapshot, with its exact tree location
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeEntry {
    pub placement: Placement,
    pub scope: PlacementId,
    pub position: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    placement: Placement,
    scope: PlacementId,
}

#[derive(Debug)]
struct Table {
    root: PlacementId,
    entries: HashMap<PlacementId, Entry>,
    children: HashMap<PlacementId, Vec<PlacementId>>,
}

impl Table {
    fn entry(&self, id: PlacementId) -> Result<&Entry> {
        self.entries
            .get(&id)
            .ok_or_else(|| SessionError::NotInSession {
                placement_id: id.to_string(),
            })
    }

    fn children_of(&self, scope: PlacementId) -> &[PlacementId] {
        self.children.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    fn require_scope(&self, scope: PlacementId) -> Result<()> {
        if self.entries.contains_key(&scope) {
            Ok(())
        } else {
            Err(SessionError::InvalidScope {
                scope_id: scope.to_string(),
                reason: "scope not registered in the index".to_string(),
            })
        }
    }

    fn link(&mut self, placement: Placement, scope: PlacementId, position: Option<usize>) {
        let id = placement.id();
        self.entries.insert(id, Entry { placement, scope });
        let siblings = self.children.entry(scope).or_default();
        match position {
            Some(pos) => siblings.insert(pos.min(siblings.len()), id),
            None => siblings.push(id),
        }
    }

    /// Depth-first pre-order below `scope`, excluding `scope` itself
    fn descendants(&self, scope: PlacementId) -> Vec<PlacementId> {
        let mut out = Vec::new();
        let mut stack: Vec<PlacementId> = self.children_of(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children_of(id).iter().rev().copied());
        }
        out
    }

    /// Parent chain from the enclosing scope of `id` up to root
    fn ancestors(&self, id: PlacementId) -> Result<Vec<PlacementId>> {
        let mut out = Vec::new();
        let mut current = id;
        while current != self.root {
            let scope = self.entry(current)?.scope;
            out.push(scope);
            if out.len() > self.entries.len() {
                return Err(SessionError::IndexCorrupted {
                    message: format!("scope chain of {} does not reach root", id),
                });
            }
            current = scope;
        }
        Ok(out)
    }

    /// Drop `id` and everything below it; returns the removed IDs, top first
    fn unlink_subtree(&mut self, id: PlacementId) -> Vec<PlacementId> {
        let mut removed = vec![id];
        removed.extend(self.descendants(id));

        if let Some(scope) = self.entries.get(&id).map(|e| e.scope) {
            if let Some(siblings) = self.children.get_mut(&scope) {
                siblings.retain(|c| *c != id);
                if siblings.is_empty() {
                    self.children.remove(&scope);
                }
            }
        }
        for gone in &removed {
            self.entries.remove(gone);
            self.children.remove(gone);
        }
        removed
    }
}

/// Registry of all placements, shared between threads behind an `Arc`
pub struct PlacementIndex {
    root: PlacementId,
    table: RwLock<Table>,
    observers: Mutex<Vec<Weak<dyn RemovalObserver>>>,
}

impl PlacementIndex {
    /// Create an index holding only a fresh model root
    pub fn new() -> Self {
        Self::with_root(Placement::new(MObject::Root(SessionRoot {})))
    }

    /// Create an index around the given root placement
    pub fn with_root(root: Placement) -> Self {
        let root_id = root.id();
        let mut entries = HashMap::new();
        entries.insert(
            root_id,
            Entry {
                placement: root,
                scope: root_id,
            },
        );
        Self {
            root: root_id,
            table: RwLock::new(Table {
                root: root_id,
                entries,
                children: HashMap::new(),
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table>> {
        self.table
            .read()
            .map_err(|_| SessionError::poisoned("placement index"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table>> {
        self.table
            .write()
            .map_err(|_| SessionError::poisoned("placement index"))
    }

    pub fn root_id(&self) -> PlacementId {
        self.root
    }

    pub fn is_root(&self, id: PlacementId) -> bool {
        id == self.root
    }

    /// Snapshot of the root placement
    ///
    /// # Errors
    ///
    /// Fails only if the index lock is poisoned.
    pub fn root(&self) -> Result<Placement> {
        self.find(self.root)
    }

    /// Register a placement as child of `scope`, appended after its siblings
    ///
    /// The placement keeps its ID unless that ID is already registered, in
    /// which case the stored copy gets a fresh identity.
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is not registered.
    pub fn insert(&self, placement: Placement, scope: PlacementId) -> Result<PlacementId> {
        self.insert_impl(placement, scope, None)
    }

    /// Register a placement at a given position among the children of `scope`
    ///
    /// Positions beyond the end append.
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is not registered.
    pub fn insert_at(
        &self,
        placement: Placement,
        scope: PlacementId,
        position: usize,
    ) -> Result<PlacementId> {
        self.insert_impl(placement, scope, Some(position))
    }

    fn insert_impl(
        &self,
        mut placement: Placement,
        scope: PlacementId,
        position: Option<usize>,
    ) -> Result<PlacementId> {
        let mut table = self.write()?;
        table.require_scope(scope)?;

        if table.entries.contains_key(&placement.id()) {
            placement.assign_id(PlacementId::new());
        }
        let id = placement.id();
        table.link(placement, scope, position);

        tracing::debug!(
            placement_id = %id,
            scope_id = %scope,
            index_size = table.entries.len() - 1,
            "placement inserted"
        );
        Ok(id)
    }

    /// Remove a placement together with everything registered below it
    ///
    /// Returns `false` if the ID was not registered.
    ///
    /// # Errors
    ///
    /// `RootRemoval` when asked to remove the model root.
    pub fn remove(&self, id: PlacementId) -> Result<bool> {
        if self.is_root(id) {
            return Err(SessionError::RootRemoval);
        }

        let (removed, parent) = {
            let mut table = self.write()?;
            let parent = match table.entries.get(&id) {
                Some(entry) => entry.scope,
                None => return Ok(false),
            };
            let removed = table.unlink_subtree(id);
            tracing::debug!(
                placement_id = %id,
                removed_count = removed.len(),
                index_size = table.entries.len() - 1,
                "placement removed"
            );
            (removed, parent)
        };

        self.notify_removed(&removed, parent);
        Ok(true)
    }

    /// Remove everything below `scope`, keeping `scope` itself
    ///
    /// Returns the number of removed placements.
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is not registered.
    pub fn clear_scope(&self, scope: PlacementId) -> Result<usize> {
        let removed = {
            let mut table = self.write()?;
            table.require_scope(scope)?;
            let top: Vec<PlacementId> = table.children_of(scope).to_vec();
            let mut removed = Vec::new();
            for child in top {
                removed.extend(table.unlink_subtree(child));
            }
            removed
        };

        if !removed.is_empty() {
            tracing::debug!(scope_id = %scope, removed_count = removed.len(), "scope cleared");
            self.notify_removed(&removed, scope);
        }
        Ok(removed.len())
    }

    /// Remove every placement except the model root
    ///
    /// # Errors
    ///
    /// Fails only if the index lock is poisoned.
    pub fn clear(&self) -> Result<usize> {
        self.clear_scope(self.root)
    }

    /// Whether `id` is registered
    ///
    /// A poisoned index is logged and reports `false`; use
    /// [`PlacementIndex::find`] where poisoning must surface as an error.
    pub fn contains(&self, id: PlacementId) -> bool {
        match self.read() {
            Ok(table) => table.entries.contains_key(&id),
            Err(err) => {
                tracing::error!(placement_id = %id, error = %err, "contains on poisoned index");
                false
            }
        }
    }

    /// Number of registered placements, not counting the root
    ///
    /// A poisoned index is logged and reports zero.
    pub fn size(&self) -> usize {
        match self.read() {
            Ok(table) => table.entries.len().saturating_sub(1),
            Err(err) => {
                tracing::error!(error = %err, "size on poisoned index");
                0
            }
        }
    }

    /// Snapshot of a registered placement
    ///
    /// # Errors
    ///
    /// `NotInSession` if the ID is not registered.
    pub fn find(&self, id: PlacementId) -> Result<Placement> {
        let table = self.read()?;
        Ok(table.entry(id)?.placement.clone())
    }

    /// Snapshot of a placement whose subject must be a `K`
    ///
    /// # Errors
    ///
    /// `NotInSession` for unknown IDs, `PlacementType` for a kind mismatch.
    pub fn find_as<K: MObjectKind>(&self, id: PlacementId) -> Result<Placement> {
        let placement = self.find(id)?;
        if !placement.is::<K>() {
            return Err(SessionError::PlacementType {
                placement_id: id.to_string(),
                expected: K::NAME.to_string(),
            });
        }
        Ok(placement)
    }

    /// Enclosing scope of a placement; the root is its own scope
    ///
    /// # Errors
    ///
    /// `NotInSession` if the ID is not registered.
    pub fn get_scope(&self, id: PlacementId) -> Result<PlacementId> {
        let table = self.read()?;
        Ok(table.entry(id)?.scope)
    }

    /// Direct children of `scope`, in insertion order
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is not registered.
    pub fn children(&self, scope: PlacementId) -> Result<Vec<PlacementId>> {
        let table = self.read()?;
        table.require_scope(scope)?;
        Ok(table.children_of(scope).to_vec())
    }

    /// Everything below `scope` in depth-first pre-order
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `scope` is not registered.
    pub fn contents(&self, scope: PlacementId) -> Result<Vec<PlacementId>> {
        let table = self.read()?;
        table.require_scope(scope)?;
        Ok(table.descendants(scope))
    }

    /// Enclosing scopes from the parent of `id` up to the root
    ///
    /// Empty for the root itself.
    ///
    /// # Errors
    ///
    /// `NotInSession` if `id` is unknown, `IndexCorrupted` if the chain
    /// does not terminate at the root.
    pub fn ancestors(&self, id: PlacementId) -> Result<Vec<PlacementId>> {
        let table = self.read()?;
        table.ancestors(id)
    }

    /// Closest enclosing scope whose subject is a `K`
    ///
    /// # Errors
    ///
    /// Same as [`PlacementIndex::ancestors`].
    pub fn nearest_enclosing<K: MObjectKind>(&self, id: PlacementId) -> Result<Option<PlacementId>> {
        let table = self.read()?;
        for scope in table.ancestors(id)? {
            if table.entry(scope)?.placement.is::<K>() {
                return Ok(Some(scope));
            }
        }
        Ok(None)
    }

    /// Position of `id` among the children of its scope
    ///
    /// # Errors
    ///
    /// `NotInSession` for unknown IDs, `InvalidScope` for the root.
    pub fn position_in_scope(&self, id: PlacementId) -> Result<usize> {
        let table = self.read()?;
        let scope = table.entry(id)?.scope;
        if id == table.root {
            return Err(SessionError::InvalidScope {
                scope_id: id.to_string(),
                reason: "the model root has no enclosing scope".to_string(),
            });
        }
        table
            .children_of(scope)
            .iter()
            .position(|c| *c == id)
            .ok_or_else(|| SessionError::IndexCorrupted {
                message: format!("{} missing from the children of {}", id, scope),
            })
    }

    /// Edit a registered placement in place, under the write lock
    ///
    /// The placement keeps its ID whatever the closure does.
    ///
    /// # Errors
    ///
    /// `NotInSession` if the ID is not registered.
    pub fn modify<F, R>(&self, id: PlacementId, f: F) -> Result<R>
    where
        F: FnOnce(&mut Placement) -> R,
    {
        let mut table = self.write()?;
        let entry = table
            .entries
            .get_mut(&id)
            .ok_or_else(|| SessionError::NotInSession {
                placement_id: id.to_string(),
            })?;
        let out = f(&mut entry.placement);
        entry.placement.assign_id(id);
        Ok(out)
    }

    /// Snapshot of `id` and its descendants with exact tree locations
    ///
    /// Entries come in pre-order, so [`PlacementIndex::restore`] can replay
    /// them front to back.
    ///
    /// # Errors
    ///
    /// `NotInSession` if `id` is unknown, `InvalidScope` for the root.
    pub fn subtree(&self, id: PlacementId) -> Result<Vec<SubtreeEntry>> {
        let table = self.read()?;
        if id == table.root {
            return Err(SessionError::InvalidScope {
                scope_id: id.to_string(),
                reason: "the model root can't be snapshotted as a subtree".to_string(),
            });
        }

        let mut ids = vec![id];
        ids.extend(table.descendants(id));
        ids.into_iter()
            .map(|member| {
                let entry = table.entry(member)?;
                let position = table
                    .children_of(entry.scope)
                    .iter()
                    .position(|c| *c == member)
                    .unwrap_or(0);
                Ok(SubtreeEntry {
                    placement: entry.placement.clone(),
                    scope: entry.scope,
                    position,
                })
            })
            .collect()
    }

    /// Re-insert a subtree snapshot with its original IDs and positions
    ///
    /// Either all entries are restored or none.
    ///
    /// # Errors
    ///
    /// `InvalidPlacement` if an ID is already registered, `InvalidScope` if
    /// an entry's scope is neither registered nor an earlier entry of the
    /// snapshot.
    pub fn restore(&self, entries: &[SubtreeEntry]) -> Result<()> {
        let mut table = self.write()?;

        let mut incoming = HashSet::new();
        for entry in entries {
            let id = entry.placement.id();
            if table.entries.contains_key(&id) || incoming.contains(&id) {
                return Err(SessionError::InvalidPlacement {
                    placement_id: id.to_string(),
                    reason: "already registered".to_string(),
                });
            }
            if !incoming.contains(&entry.scope) {
                table.require_scope(entry.scope)?;
            }
            incoming.insert(id);
        }

        for entry in entries {
            table.link(entry.placement.clone(), entry.scope, Some(entry.position));
        }
        tracing::debug!(
            restored = entries.len(),
            index_size = table.entries.len() - 1,
            "subtree restored"
        );
        Ok(())
    }

    /// Full consistency check of the scope tree
    ///
    /// # Errors
    ///
    /// `IndexCorrupted` describing the first violation found.
    pub fn verify(&self) -> Result<()> {
        let table = self.read()?;
        let corrupted = |message: String| SessionError::IndexCorrupted { message };

        match table.entries.get(&table.root) {
            Some(entry) if entry.scope == table.root => {}
            Some(_) => return Err(corrupted("root is attached to another scope".to_string())),
            None => return Err(corrupted("root placement missing".to_string())),
        }

        let mut linked = 0usize;
        for (scope, kids) in &table.children {
            if !table.entries.contains_key(scope) {
                return Err(corrupted(format!("children recorded for unknown scope {}", scope)));
            }
            for kid in kids {
                match table.entries.get(kid) {
                    Some(entry) if entry.scope == *scope => linked += 1,
                    Some(_) => {
                        return Err(corrupted(format!("{} listed below {} but scoped elsewhere", kid, scope)))
                    }
                    None => return Err(corrupted(format!("unknown child {} below {}", kid, scope))),
                }
            }
        }

        for (id, entry) in &table.entries {
            if *id == table.root {
                continue;
            }
            if entry.placement.id() != *id {
                return Err(corrupted(format!("entry {} holds placement {}", id, entry.placement.id())));
            }
            if !table.children_of(entry.scope).contains(id) {
                return Err(corrupted(format!("{} not registered as child of {}", id, entry.scope)));
            }
            table.ancestors(*id)?;
        }

        if linked + 1 != table.entries.len() {
            return Err(corrupted(format!(
                "{} child links for {} placements",
                linked,
                table.entries.len()
            )));
        }
        Ok(())
    }

    /// Register an observer for removals; dropped observers are pruned
    pub fn add_removal_observer(&self, observer: Weak<dyn RemovalObserver>) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(observer);
        }
    }

    fn notify_removed(&self, removed: &[PlacementId], parent: PlacementId) {
        let live: Vec<_> = match self.observers.lock() {
            Ok(mut observers) => {
                observers.retain(|o| o.strong_count() > 0);
                observers.iter().filter_map(Weak::upgrade).collect()
            }
            Err(_) => return,
        };
        for observer in live {
            observer.placements_removed(removed, parent);
        }
    }
}

impl Default for PlacementIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlacementIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementIndex")
            .field("root", &self.root)
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{Fork, Sequence};
    use std::sync::Arc;

    fn seq(name: &str) -> Placement {
        Placement::new(MObject::sequence(name))
    }

    #[test]
    fn test_new_index_holds_only_root() {
        let index = PlacementIndex::new();
        assert_eq!(index.size(), 0);
        assert!(index.contains(index.root_id()));
        assert_eq!(index.get_scope(index.root_id()).unwrap(), index.root_id());
        index.verify().unwrap();
    }

    #[test]
    fn test_insert_into_unknown_scope_fails() {
        let index = PlacementIndex::new();
        let result = index.insert(seq("a"), PlacementId::new());

        assert!(matches!(result, Err(SessionError::InvalidScope { .. })));
        assert_eq!(index.size(), 0);
    }

    #[test]
    fn test_reinserting_same_placement_gets_fresh_id() {
        let index = PlacementIndex::new();
        let p = seq("a");
        let first = index.insert(p.clone(), index.root_id()).unwrap();
        let second = index.insert(p.clone(), index.root_id()).unwrap();

        assert_eq!(first, p.id());
        assert_ne!(first, second);
        assert_eq!(index.size(), 2);
    }

    #[test]
    fn test_remove_root_fails() {
        let index = PlacementIndex::new();
        let result = index.remove(index.root_id());
        assert!(matches!(result, Err(SessionError::RootRemoval)));
    }

    #[test]
    fn test_remove_unknown_returns_false() {
        let index = PlacementIndex::new();
        assert!(!index.remove(PlacementId::new()).unwrap());
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let index = PlacementIndex::new();
        let root = index.root_id();
        let a = index.insert(seq("a"), root).unwrap();
        let b = index.insert(seq("b"), root).unwrap();
        let c = index.insert_at(seq("c"), root, 1).unwrap();

        assert_eq!(index.children(root).unwrap(), vec![a, c, b]);
        assert_eq!(index.position_in_scope(b).unwrap(), 2);
    }

    #[test]
    fn test_contents_is_preorder() {
        let index = PlacementIndex::new();
        let root = index.root_id();
        let a = index.insert(seq("a"), root).unwrap();
        let a1 = index.insert(seq("a1"), a).unwrap();
        let b = index.insert(seq("b"), root).unwrap();
        let a2 = index.insert(seq("a2"), a).unwrap();

        assert_eq!(index.contents(root).unwrap(), vec![a, a1, a2, b]);
        assert_eq!(index.ancestors(a2).unwrap(), vec![a, root]);
    }

    #[test]
    fn test_find_as_checks_kind() {
        let index = PlacementIndex::new();
        let a = index.insert(seq("a"), index.root_id()).unwrap();

        assert!(index.find_as::<Sequence>(a).is_ok());
        assert!(matches!(
            index.find_as::<Fork>(a),
            Err(SessionError::PlacementType { .. })
        ));
    }

    #[test]
    fn test_modify_keeps_identity() {
        let index = PlacementIndex::new();
        let a = index.insert(seq("a"), index.root_id()).unwrap();

        index
            .modify(a, |p| p.assign_id(PlacementId::new()))
            .unwrap();

        assert!(index.contains(a));
        index.verify().unwrap();
    }

    #[test]
    fn test_clear_scope_keeps_scope() {
        let index = PlacementIndex::new();
        let root = index.root_id();
        let a = index.insert(seq("a"), root).unwrap();
        index.insert(seq("a1"), a).unwrap();
        index.insert(seq("a2"), a).unwrap();

        assert_eq!(index.clear_scope(a).unwrap(), 2);
        assert!(index.contains(a));
        assert_eq!(index.size(), 1);
        assert_eq!(index.clear().unwrap(), 1);
        assert_eq!(index.size(), 0);
        index.verify().unwrap();
    }

    #[test]
    fn test_subtree_restore_is_exact() {
        let index = PlacementIndex::new();
        let root = index.root_id();
        let a = index.insert(seq("a"), root).unwrap();
        let b = index.insert(seq("b"), root).unwrap();
        let b1 = index.insert(seq("b1"), b).unwrap();
        let c = index.insert(seq("c"), root).unwrap();

        let snapshot = index.subtree(b).unwrap();
        index.remove(b).unwrap();
        index.restore(&snapshot).unwrap();

        assert_eq!(index.children(root).unwrap(), vec![a, b, c]);
        assert_eq!(index.children(b).unwrap(), vec![b1]);
        index.verify().unwrap();
    }

    #[test]
    fn test_restore_refuses_duplicates() {
        let index = PlacementIndex::new();
        let a = index.insert(seq("a"), index.root_id()).unwrap();
        let snapshot = index.subtree(a).unwrap();

        let result = index.restore(&snapshot);
        assert!(matches!(result, Err(SessionError::InvalidPlacement { .. })));
        assert_eq!(index.size(), 1);
    }

    #[test]
    fn test_restore_rejects_self_scoped_entry() {
        // GIVEN a snapshot entry that names itself as its scope
        let index = PlacementIndex::new();
        let p = seq("loop");
        let id = p.id();
        let entry = SubtreeEntry {
            placement: p,
            scope: id,
            position: 0,
        };

        // WHEN restoring it
        let result = index.restore(&[entry]);

        // THEN it is refused and the tree stays intact
        assert!(matches!(result, Err(SessionError::InvalidScope { .. })));
        assert!(!index.contains(id));
        assert_eq!(index.size(), 0);
        index.verify().unwrap();
    }

    #[test]
    fn test_restore_rejects_child_before_parent() {
        let index = PlacementIndex::new();
        let root = index.root_id();
        let b = index.insert(seq("b"), root).unwrap();
        index.insert(seq("b1"), b).unwrap();
        let mut snapshot = index.subtree(b).unwrap();
        index.remove(b).unwrap();

        snapshot.reverse();
        let result = index.restore(&snapshot);

        assert!(matches!(result, Err(SessionError::InvalidScope { .. })));
        assert_eq!(index.size(), 0);
        index.verify().unwrap();
    }

    #[test]
    fn test_poisoned_index_reports_empty() {
        // GIVEN an index whose lock was poisoned by a panicking writer
        let index = Arc::new(PlacementIndex::new());
        let a = index.insert(seq("a"), index.root_id()).unwrap();
        let writer = index.clone();
        let joined = std::thread::spawn(move || {
            let _table = writer.table.write().unwrap();
            panic!("writer died holding the index");
        })
        .join();
        assert!(joined.is_err());

        // THEN the boolean accessors fall back, the fallible ones report it
        assert!(!index.contains(a));
        assert_eq!(index.size(), 0);
        assert!(matches!(index.find(a), Err(SessionError::LockPoisoned { .. })));
    }

    struct Recorder(Mutex<Vec<(usize, PlacementId)>>);

    impl RemovalObserver for Recorder {
        fn placements_removed(&self, removed: &[PlacementId], surviving_parent: PlacementId) {
            self.0.lock().unwrap().push((removed.len(), surviving_parent));
        }
    }

    #[test]
    fn test_observer_sees_removed_subtree() {
        let index = PlacementIndex::new();
        let root = index.root_id();
        let a = index.insert(seq("a"), root).unwrap();
        index.insert(seq("a1"), a).unwrap();

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let as_observer: Arc<dyn RemovalObserver> = recorder.clone();
        index.add_removal_observer(Arc::downgrade(&as_observer));

        index.remove(a).unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec![(2, root)]);
    }
}
