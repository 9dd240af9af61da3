//! Placement: a model object together with its positioning constraints

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SessionError};
use crate::index::PlacementIndex;
use crate::model::{ExplicitPosition, Fork, LocatingPin, MObject, MObjectKind, Time};

/// Stable identity of a placement within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(Uuid);

impl PlacementId {
    /// Generate a fresh ID (UUIDv7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Last eight hex digits, enough to tell placements apart in logs
    pub fn short(&self) -> String {
        let simple = self.0.simple().to_string();
        simple[simple.len() - 8..].to_string()
    }
}

impl Default for PlacementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle binding a model object to a chain of locating pins
///
/// Cloning is cheap: the subject is shared. A clone keeps the ID, so it
/// compares equal to its original; the index hands out a fresh ID when a
/// clone is inserted next to the original.
#[derive(Debug, Clone)]
pub struct Placement {
    id: PlacementId,
    subject: Arc<MObject>,
    pins: Vec<LocatingPin>,
}

impl Placement {
    pub fn new(subject: MObject) -> Self {
        Self {
            id: PlacementId::new(),
            subject: Arc::new(subject),
            pins: Vec::new(),
        }
    }

    /// Append a pin (builder style)
    pub fn with_pin(mut self, pin: LocatingPin) -> Self {
        self.pins.push(pin);
        self
    }

    pub fn id(&self) -> PlacementId {
        self.id
    }

    pub fn subject(&self) -> &MObject {
        &self.subject
    }

    /// Typed view of the subject, `None` if it is of another kind
    pub fn subject_as<K: MObjectKind>(&self) -> Option<&K> {
        K::downcast(&self.subject)
    }

    pub fn is<K: MObjectKind>(&self) -> bool {
        self.subject.is::<K>()
    }

    pub fn pins(&self) -> &[LocatingPin] {
        &self.pins
    }

    pub fn push_pin(&mut self, pin: LocatingPin) {
        self.pins.push(pin);
    }

    /// Replace the whole constraint chain, returning the previous one
    pub fn replace_pins(&mut self, pins: Vec<LocatingPin>) -> Vec<LocatingPin> {
        std::mem::replace(&mut self.pins, pins)
    }

    pub(crate) fn assign_id(&mut self, id: PlacementId) {
        self.id = id;
    }

    /// Resolve the pin chain into an absolute position
    ///
    /// A placement without a `Track` pin outputs to the nearest enclosing
    /// fork scope, if it is registered below one.
    ///
    /// # Errors
    ///
    /// `NotInSession` if a relative anchor is unknown, `InvalidPlacement`
    /// for a cycle of relative pins.
    pub fn resolve(&self, index: &PlacementIndex) -> Result<ExplicitPosition> {
        let mut visiting = vec![self.id];
        self.resolve_guarded(index, &mut visiting)
    }

    fn resolve_guarded(
        &self,
        index: &PlacementIndex,
        visiting: &mut Vec<PlacementId>,
    ) -> Result<ExplicitPosition> {
        let mut start = Time::ZERO;
        let mut track = None;

        for pin in &self.pins {
            match *pin {
                LocatingPin::Fixed { start: at } => start = at,
                LocatingPin::Track { fork } => track = Some(fork),
                LocatingPin::Relative { anchor, offset } => {
                    if visiting.contains(&anchor) {
                        return Err(SessionError::InvalidPlacement {
                            placement_id: self.id.to_string(),
                            reason: format!("relative pins form a cycle through {}", anchor),
                        });
                    }
                    let anchor_placement = index.find(anchor)?;
                    visiting.push(anchor);
                    let anchored = anchor_placement.resolve_guarded(index, visiting)?;
                    visiting.pop();

                    start = anchored.start + offset;
                    if track.is_none() {
                        track = anchored.track;
                    }
                }
                LocatingPin::Shift { offset } => start = start + offset,
            }
        }

        if track.is_none() && index.contains(self.id) {
            track = index.nearest_enclosing::<Fork>(self.id)?;
        }

        Ok(ExplicitPosition { start, track })
    }
}

impl PartialEq for Placement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Placement {}

impl std::hash::Hash for Placement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Typed reference to a placement, resolved through the index on use
///
/// Holds only the ID, so it survives any reshuffling of the index and
/// reports an expired handle once its target was removed.
pub struct PlacementRef<K: MObjectKind = MObject> {
    id: PlacementId,
    _kind: PhantomData<fn() -> K>,
}

impl<K: MObjectKind> PlacementRef<K> {
    /// Reference by ID without checking the target
    pub fn new(id: PlacementId) -> Self {
        Self {
            id,
            _kind: PhantomData,
        }
    }

    /// Reference an existing placement, checking its kind
    ///
    /// # Errors
    ///
    /// `PlacementType` if the subject is not a `K`.
    pub fn to(placement: &Placement) -> Result<Self> {
        if !placement.is::<K>() {
            return Err(SessionError::PlacementType {
                placement_id: placement.id().to_string(),
                expected: K::NAME.to_string(),
            });
        }
        Ok(Self::new(placement.id()))
    }

    pub fn id(&self) -> PlacementId {
        self.id
    }

    /// Fetch a snapshot of the referenced placement
    ///
    /// # Errors
    ///
    /// `ExpiredHandle` if the target was removed, `PlacementType` if the ID
    /// now denotes a placement of another kind.
    pub fn resolve(&self, index: &PlacementIndex) -> Result<Placement> {
        let placement = index.find(self.id).map_err(|_| SessionError::ExpiredHandle {
            what: format!("placement {}", self.id),
        })?;
        if !placement.is::<K>() {
            return Err(SessionError::PlacementType {
                placement_id: self.id.to_string(),
                expected: K::NAME.to_string(),
            });
        }
        Ok(placement)
    }

    pub fn is_valid(&self, index: &PlacementIndex) -> bool {
        self.resolve(index).is_ok()
    }
}

impl<K: MObjectKind> Clone for PlacementRef<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: MObjectKind> Copy for PlacementRef<K> {}

impl<K: MObjectKind> PartialEq for PlacementRef<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K: MObjectKind> Eq for PlacementRef<K> {}

impl<K: MObjectKind> std::fmt::Debug for PlacementRef<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlacementRef<{}>({})", K::NAME, self.id.short())
    }
}
