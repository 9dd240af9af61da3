//! ScopePath: the chain of scopes from the model root down to a leaf
//!
//! Three shapes matter:
//! - *empty*: no element at all, most operations fail on it
//! - *root-only*: just the model root, the default focus
//! - *valid*: root plus at least one nested scope

use crate::errors::{Result, SessionError};
use crate::index::PlacementIndex;
use crate::placement::PlacementId;
use crate::scope::Scope;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScopePath {
    path: Vec<Scope>,
}

impl ScopePath {
    /// Build the path to `leaf` by walking parent links up to the root
    ///
    /// The invalid scope yields the empty path. The root always succeeds.
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `leaf` is not connected to the model root.
    pub fn new(index: &PlacementIndex, leaf: Scope) -> Result<Self> {
        let top = match leaf.top() {
            Some(top) => top,
            None => return Ok(ScopePath::empty()),
        };
        if index.is_root(top) {
            return Ok(ScopePath::root_only(index));
        }

        let ancestors = index
            .ancestors(top)
            .map_err(|e| SessionError::InvalidScope {
                scope_id: top.to_string(),
                reason: format!("not connected to the model root ({})", e),
            })?;

        let mut path: Vec<Scope> = ancestors.into_iter().rev().map(Scope::new).collect();
        path.push(leaf);
        Ok(ScopePath { path })
    }

    pub fn empty() -> Self {
        ScopePath { path: Vec::new() }
    }

    pub fn root_only(index: &PlacementIndex) -> Self {
        ScopePath::root_of(index.root_id())
    }

    /// Root-only path for a known root ID, without consulting an index
    pub fn root_of(root: PlacementId) -> Self {
        ScopePath {
            path: vec![Scope::new(root)],
        }
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Root plus at least one nested scope
    pub fn is_valid(&self) -> bool {
        self.path.len() > 1
    }

    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }

    /// Scopes from root to leaf
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.path.iter()
    }

    /// # Errors
    ///
    /// `EmptyScopePath` on the empty path.
    pub fn leaf(&self) -> Result<Scope> {
        self.check_not_empty("leaf")?;
        Ok(self.path[self.path.len() - 1])
    }

    pub fn ends_at(&self, scope: Scope) -> bool {
        self.path.last() == Some(&scope)
    }

    /// Drop the leaf and return the new one
    ///
    /// Moving up from a root-only path leaves the empty path behind and
    /// returns the invalid scope.
    ///
    /// # Errors
    ///
    /// `EmptyScopePath` on the empty path.
    pub fn move_up(&mut self) -> Result<Scope> {
        self.check_not_empty("move_up")?;
        self.path.pop();
        Ok(self.path.last().copied().unwrap_or(Scope::INVALID))
    }

    /// Cut the path back to the root element
    ///
    /// # Errors
    ///
    /// `EmptyScopePath` on the empty path.
    pub fn go_root(&mut self) -> Result<Scope> {
        self.check_not_empty("go_root")?;
        self.path.truncate(1);
        Ok(self.path[0])
    }

    /// Replace the path wholesale by the path to `target`
    ///
    /// On failure the path is left unchanged.
    ///
    /// # Errors
    ///
    /// `EmptyScopePath` on the empty path, `InvalidScope` if `target` is
    /// invalid or not connected to the model root.
    pub fn navigate(&mut self, index: &PlacementIndex, target: Scope) -> Result<()> {
        self.check_not_empty("navigate")?;
        if !target.is_valid() {
            return Err(SessionError::InvalidScope {
                scope_id: target.to_string(),
                reason: "can't navigate to a target scope outside the model".to_string(),
            });
        }
        let other = ScopePath::new(index, target)?;
        self.path = other.path;
        Ok(())
    }

    /// Whether `scope` lies on this path; the invalid scope is contained everywhere
    pub fn contains_scope(&self, scope: Scope) -> bool {
        !scope.is_valid() || self.path.contains(&scope)
    }

    /// Prefix containment: every scope of `other` lies on this path
    ///
    /// An invalid `other` is contained in anything, an empty or root-only
    /// `self` contains no valid path.
    pub fn contains(&self, other: &ScopePath) -> bool {
        if !other.is_valid() {
            return true;
        }
        if !self.is_valid() {
            return false;
        }
        other.path.iter().all(|s| self.contains_scope(*s))
    }

    /// Cut the path above the first scope that is in `removed`
    ///
    /// Returns whether the path changed.
    pub fn truncate_at_removed(&mut self, removed: &[PlacementId]) -> bool {
        let hit = self
            .path
            .iter()
            .position(|s| s.top().is_some_and(|top| removed.contains(&top)));
        match hit {
            Some(pos) => {
                self.path.truncate(pos);
                true
            }
            None => false,
        }
    }

    fn check_not_empty(&self, op: &str) -> Result<()> {
        if self.path.is_empty() {
            return Err(SessionError::EmptyScopePath { op: op.to_string() });
        }
        Ok(())
    }
}

/// Longest chain of scopes shared by both paths, starting at the root
///
/// Paths that do not even share the root yield the empty path.
pub fn common_prefix(path1: &ScopePath, path2: &ScopePath) -> ScopePath {
    let path = path1
        .path
        .iter()
        .zip(path2.path.iter())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| *a)
        .collect();
    ScopePath { path }
}

/// Both paths are valid and share nothing beyond the root
pub fn disjoint(path1: &ScopePath, path2: &ScopePath) -> bool {
    path1.is_valid() && path2.is_valid() && common_prefix(path1, path2).len() <= 1
}

impl std::fmt::Display for ScopePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.path.len() {
            0 => write!(f, "!"),
            1 => write!(f, "/"),
            _ => {
                for scope in &self.path[1..] {
                    write!(f, "/{}", scope)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::MObject;
    use crate::placement::Placement;

    struct Tree {
        index: PlacementIndex,
        a: PlacementId,
        a1: PlacementId,
        a1x: PlacementId,
        a2: PlacementId,
        b: PlacementId,
    }

    // root
    // ├── a
    // │   ├── a1
    // │   │   └── a1x
    // │   └── a2
    // └── b
    fn tree() -> Tree {
        let index = PlacementIndex::new();
        let root = index.root_id();
        let seq = |n: &str| Placement::new(MObject::sequence(n));
        let a = index.insert(seq("a"), root).unwrap();
        let a1 = index.insert(seq("a1"), a).unwrap();
        let a1x = index.insert(seq("a1x"), a1).unwrap();
        let a2 = index.insert(seq("a2"), a).unwrap();
        let b = index.insert(seq("b"), root).unwrap();
        Tree {
            index,
            a,
            a1,
            a1x,
            a2,
            b,
        }
    }

    fn path(t: &Tree, id: PlacementId) -> ScopePath {
        ScopePath::new(&t.index, Scope::new(id)).unwrap()
    }

    #[test]
    fn test_path_walks_up_to_root() {
        let t = tree();
        let p = path(&t, t.a1x);

        assert_eq!(p.len(), 4);
        assert!(p.is_valid());
        assert_eq!(p.leaf().unwrap(), Scope::new(t.a1x));
        assert_eq!(p.iter().next(), Some(&Scope::new(t.index.root_id())));
    }

    #[test]
    fn test_detached_leaf_is_rejected() {
        let t = tree();
        let result = ScopePath::new(&t.index, Scope::new(PlacementId::new()));
        assert!(matches!(result, Err(SessionError::InvalidScope { .. })));
    }

    #[test]
    fn test_empty_path_operations_fail() {
        let mut p = ScopePath::empty();
        assert!(matches!(p.leaf(), Err(SessionError::EmptyScopePath { .. })));
        assert!(matches!(p.move_up(), Err(SessionError::EmptyScopePath { .. })));
        assert!(matches!(p.go_root(), Err(SessionError::EmptyScopePath { .. })));
        assert_eq!(ScopePath::new(&PlacementIndex::new(), Scope::INVALID).unwrap(), p);
    }

    #[test]
    fn test_move_up_from_root_gives_empty_path() {
        let t = tree();
        let mut p = path(&t, t.a);

        assert_eq!(p.move_up().unwrap(), Scope::new(t.index.root_id()));
        assert!(p.is_root());
        assert_eq!(p.move_up().unwrap(), Scope::INVALID);
        assert!(p.is_empty());
    }

    #[test]
    fn test_go_root_keeps_root_element() {
        let t = tree();
        let mut p = path(&t, t.a1x);
        p.go_root().unwrap();
        assert_eq!(p, ScopePath::root_only(&t.index));
    }

    #[test]
    fn test_failed_navigate_leaves_path_unchanged() {
        let t = tree();
        let mut p = path(&t, t.a1);
        let before = p.clone();

        assert!(p.navigate(&t.index, Scope::INVALID).is_err());
        assert!(p.navigate(&t.index, Scope::new(PlacementId::new())).is_err());
        assert_eq!(p, before);

        p.navigate(&t.index, Scope::new(t.b)).unwrap();
        assert_eq!(p, path(&t, t.b));
    }

    #[test]
    fn test_contains_is_reflexive_prefix_containment() {
        let t = tree();
        let deep = path(&t, t.a1x);
        let mid = path(&t, t.a1);

        assert!(deep.contains(&deep));
        assert!(deep.contains(&mid));
        assert!(!mid.contains(&deep));
        assert!(deep.contains(&ScopePath::empty()));
        assert!(!ScopePath::empty().contains(&mid));
        assert!(deep.contains_scope(Scope::INVALID));
    }

    #[test]
    fn test_common_prefix_walks_full_length() {
        let t = tree();
        let left = path(&t, t.a1x);
        let right = path(&t, t.a2);

        let prefix = common_prefix(&left, &right);
        assert_eq!(prefix, path(&t, t.a));
        assert!(!disjoint(&left, &right));
    }

    #[test]
    fn test_paths_sharing_only_root_are_disjoint() {
        let t = tree();
        let left = path(&t, t.a1);
        let right = path(&t, t.b);

        assert!(disjoint(&left, &right));
        assert_eq!(common_prefix(&left, &right), ScopePath::root_only(&t.index));
        assert!(!disjoint(&left, &ScopePath::root_only(&t.index)));
    }

    #[test]
    fn test_display_forms() {
        let t = tree();
        assert_eq!(ScopePath::empty().to_string(), "!");
        assert_eq!(ScopePath::root_only(&t.index).to_string(), "/");
        assert_eq!(
            path(&t, t.a1).to_string(),
            format!("/{}/{}", t.a.short(), t.a1.short())
        );
    }

    #[test]
    fn test_truncate_at_removed_keeps_surviving_prefix() {
        let t = tree();
        let mut p = path(&t, t.a1x);

        assert!(p.truncate_at_removed(&[t.a1, t.a1x]));
        assert_eq!(p, path(&t, t.a));
        assert!(!p.truncate_at_removed(&[t.b]));
    }
}
