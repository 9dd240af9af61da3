//! Query focus: the currently active navigation context
//!
//! [`QueryFocusStack`] keeps an arena of scope path frames, each with a
//! liveness counter. The frame on top with a nonzero count is the current
//! focus. Unreferenced frames are swept lazily before the top is read, and
//! an emptied stack re-opens a root-only frame, so callers always observe
//! some focus.
//!
//! [`QueryFocus`] is the handle UI and query code hold on to: cloning it
//! adds a reference to its frame, dropping it releases the reference.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{Result, SessionError};
use crate::index::{PlacementIndex, RemovalObserver};
use crate::model::MObjectKind;
use crate::placement::PlacementId;
use crate::query::{QueryKind, ScopeQuery};
use crate::scope::Scope;
use crate::scope_path::ScopePath;

/// Stable handle of one frame, never reused within a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

#[derive(Debug, Clone)]
struct Frame {
    id: FrameId,
    path: ScopePath,
    refs: usize,
}

#[derive(Debug)]
pub struct QueryFocusStack {
    root: PlacementId,
    frames: Vec<Frame>,
    next_id: u64,
}

impl QueryFocusStack {
    /// Stack holding a single, unreferenced root frame
    pub fn new(root: PlacementId) -> Self {
        let mut stack = Self {
            root,
            frames: Vec::new(),
            next_id: 0,
        };
        stack.open_default_frame();
        stack
    }

    fn open_default_frame(&mut self) -> FrameId {
        let path = ScopePath::root_of(self.root);
        self.open_frame(path)
    }

    fn open_frame(&mut self, path: ScopePath) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        self.frames.push(Frame { id, path, refs: 0 });
        id
    }

    /// Push a new frame focused at `start`
    ///
    /// The model root always succeeds, even before anything was resolved.
    /// On failure the stack is left unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `start` is invalid or not connected to the root.
    pub fn push(&mut self, index: &PlacementIndex, start: Scope) -> Result<FrameId> {
        if start.top() == Some(self.root) {
            return Ok(self.open_default_frame());
        }
        if !start.is_valid() {
            return Err(SessionError::InvalidScope {
                scope_id: start.to_string(),
                reason: "can't focus a scope outside the model".to_string(),
            });
        }
        let path = ScopePath::new(index, start)?;
        Ok(self.open_frame(path))
    }

    /// Current focus frame, after sweeping unreferenced frames
    pub fn top(&mut self) -> (FrameId, &ScopePath) {
        self.pop_unused();
        if self.frames.is_empty() {
            self.open_default_frame();
        }
        let frame = &self.frames[self.frames.len() - 1];
        (frame.id, &frame.path)
    }

    /// Drop every frame whose reference count is zero
    ///
    /// A lone unreferenced root frame stays; an emptied stack re-opens one.
    pub fn pop_unused(&mut self) {
        if self.frames.len() == 1 && self.frames[0].path.is_root() && self.frames[0].refs == 0 {
            return;
        }
        let before = self.frames.len();
        self.frames.retain(|f| f.refs > 0);
        if self.frames.is_empty() {
            self.open_default_frame();
        }
        if self.frames.len() != before {
            tracing::debug!(swept = before - self.frames.len(), "focus frames swept");
        }
    }

    /// Reset to a single unreferenced root frame
    pub fn clear(&mut self) {
        self.frames.clear();
        self.open_default_frame();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// # Errors
    ///
    /// `ExpiredHandle` if the frame was swept.
    pub fn add_ref(&mut self, frame: FrameId) -> Result<usize> {
        let f = self.frame_mut(frame)?;
        f.refs += 1;
        Ok(f.refs)
    }

    /// Release one reference; a swept frame is ignored
    pub fn release(&mut self, frame: FrameId) {
        if let Ok(f) = self.frame_mut(frame) {
            f.refs = f.refs.saturating_sub(1);
        }
    }

    pub fn ref_count(&self, frame: FrameId) -> Option<usize> {
        self.frames.iter().find(|f| f.id == frame).map(|f| f.refs)
    }

    /// # Errors
    ///
    /// `ExpiredHandle` if the frame was swept.
    pub fn path(&self, frame: FrameId) -> Result<&ScopePath> {
        self.frames
            .iter()
            .find(|f| f.id == frame)
            .map(|f| &f.path)
            .ok_or_else(|| expired(frame))
    }

    /// # Errors
    ///
    /// `ExpiredHandle` if the frame was swept.
    pub fn path_mut(&mut self, frame: FrameId) -> Result<&mut ScopePath> {
        self.frame_mut(frame).map(|f| &mut f.path)
    }

    /// Move every frame anchored at or below a removed placement up to the
    /// nearest surviving ancestor
    pub fn relocate(&mut self, removed: &[PlacementId]) -> usize {
        let moved = self
            .frames
            .iter_mut()
            .map(|f| f.path.truncate_at_removed(removed))
            .filter(|moved| *moved)
            .count();
        if moved > 0 {
            tracing::debug!(frames = moved, "focus relocated after removal");
        }
        moved
    }

    fn frame_mut(&mut self, frame: FrameId) -> Result<&mut Frame> {
        self.frames
            .iter_mut()
            .find(|f| f.id == frame)
            .ok_or_else(|| expired(frame))
    }
}

fn expired(frame: FrameId) -> SessionError {
    SessionError::ExpiredHandle {
        what: format!("focus frame {}", frame.0),
    }
}

impl RemovalObserver for Mutex<QueryFocusStack> {
    fn placements_removed(&self, removed: &[PlacementId], _surviving_parent: PlacementId) {
        if let Ok(mut stack) = self.lock() {
            stack.relocate(removed);
        }
    }
}

/// Handle on one focus frame
///
/// Holding a handle keeps its frame alive on the stack.
pub struct QueryFocus {
    stack: Arc<Mutex<QueryFocusStack>>,
    index: Arc<PlacementIndex>,
    frame: FrameId,
}

impl QueryFocus {
    /// Attach to the current top of the stack
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the focus stack lock is poisoned.
    pub fn current(stack: Arc<Mutex<QueryFocusStack>>, index: Arc<PlacementIndex>) -> Result<Self> {
        let frame = {
            let mut guard = lock(&stack)?;
            let (frame, _) = guard.top();
            guard.add_ref(frame)?;
            frame
        };
        Ok(Self { stack, index, frame })
    }

    /// Open a nested focus frame at `start`
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `start` is not connected to the model root.
    pub fn push(&self, start: Scope) -> Result<QueryFocus> {
        let frame = {
            let mut guard = lock(&self.stack)?;
            let frame = guard.push(&self.index, start)?;
            guard.add_ref(frame)?;
            frame
        };
        Ok(Self {
            stack: self.stack.clone(),
            index: self.index.clone(),
            frame,
        })
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame
    }

    /// # Errors
    ///
    /// `ExpiredHandle` if the frame is gone (stack cleared).
    pub fn current_path(&self) -> Result<ScopePath> {
        Ok(lock(&self.stack)?.path(self.frame)?.clone())
    }

    /// Leaf scope of this focus
    ///
    /// # Errors
    ///
    /// `EmptyScopePath` if the path was moved up past the root.
    pub fn scope(&self) -> Result<Scope> {
        lock(&self.stack)?.path(self.frame)?.leaf()
    }

    /// Shift this focus to `target`; unchanged on failure
    ///
    /// # Errors
    ///
    /// `InvalidScope` if `target` is not connected to the model root.
    pub fn navigate(&self, target: Scope) -> Result<()> {
        let mut guard = lock(&self.stack)?;
        guard.path_mut(self.frame)?.navigate(&self.index, target)
    }

    /// # Errors
    ///
    /// `EmptyScopePath` if the focus path is already empty.
    pub fn move_up(&self) -> Result<Scope> {
        lock(&self.stack)?.path_mut(self.frame)?.move_up()
    }

    /// # Errors
    ///
    /// `EmptyScopePath` if the focus path is empty.
    pub fn go_root(&self) -> Result<Scope> {
        lock(&self.stack)?.path_mut(self.frame)?.go_root()
    }

    /// Query relative to the focused scope
    ///
    /// # Errors
    ///
    /// `EmptyScopePath` or `InvalidScope` if the focus is not usable.
    pub fn query<K: MObjectKind>(&self, kind: QueryKind) -> Result<ScopeQuery<K>> {
        let scope = self.scope()?;
        ScopeQuery::issue(self.index.clone(), scope, kind)
    }

    /// # Errors
    ///
    /// See [`QueryFocus::query`].
    pub fn children<K: MObjectKind>(&self) -> Result<ScopeQuery<K>> {
        self.query(QueryKind::Children)
    }

    /// # Errors
    ///
    /// See [`QueryFocus::query`].
    pub fn contents<K: MObjectKind>(&self) -> Result<ScopeQuery<K>> {
        self.query(QueryKind::Contents)
    }
}

impl Clone for QueryFocus {
    fn clone(&self) -> Self {
        if let Ok(mut guard) = self.stack.lock() {
            guard.add_ref(self.frame).ok();
        }
        Self {
            stack: self.stack.clone(),
            index: self.index.clone(),
            frame: self.frame,
        }
    }
}

impl Drop for QueryFocus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.stack.lock() {
            guard.release(self.frame);
        }
    }
}

impl std::fmt::Debug for QueryFocus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = self
            .current_path()
            .map(|p| p.to_string())
            .unwrap_or_else(|_| "<expired>".to_string());
        f.debug_struct("QueryFocus")
            .field("frame", &self.frame)
            .field("path", &path)
            .finish()
    }
}

pub(crate) fn lock(stack: &Mutex<QueryFocusStack>) -> Result<MutexGuard<'_, QueryFocusStack>> {
    stack.lock().map_err(|_| SessionError::poisoned("query focus stack"))
}
