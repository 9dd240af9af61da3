//! Standard commands mutating the session model
//!
//! Every command takes a [`SessionHandle`] as its first argument, so the
//! session it operates on is explicit in the bound arguments.
//!
//! | ID                 | arguments                                  | memento             |
//! |--------------------|--------------------------------------------|---------------------|
//! | `session.attach`   | `(SessionHandle, Placement, PlacementId)`  | attached ID         |
//! | `session.detach`   | `(SessionHandle, PlacementId)`             | subtree snapshot    |
//! | `session.relocate` | `(SessionHandle, PlacementId, Vec<LocatingPin>)` | previous pins |

use std::sync::Arc;

use crate::command::CommandRegistry;
use crate::errors::{Result, SessionError};
use crate::index::{PlacementIndex, SubtreeEntry};
use crate::model::LocatingPin;
use crate::placement::{Placement, PlacementId};

pub const ATTACH: &str = "session.attach";
pub const DETACH: &str = "session.detach";
pub const RELOCATE: &str = "session.relocate";

/// Placement index of one session, as bound into command arguments
///
/// Equality is identity of the underlying index.
#[derive(Clone)]
pub struct SessionHandle(Arc<PlacementIndex>);

impl SessionHandle {
    pub fn new(index: Arc<PlacementIndex>) -> Self {
        Self(index)
    }

    pub fn index(&self) -> &PlacementIndex {
        &self.0
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionHandle(root={})", self.0.root_id().short())
    }
}

pub type AttachArgs = (SessionHandle, Placement, PlacementId);
pub type DetachArgs = (SessionHandle, PlacementId);
pub type RelocateArgs = (SessionHandle, PlacementId, Vec<LocatingPin>);

/// Define the standard session commands in `registry`
///
/// # Errors
///
/// `DuplicateCommand` if any of them is already defined.
pub fn register_all(registry: &CommandRegistry) -> Result<()> {
    registry
        .define(ATTACH)
        .operation(|(session, placement, scope): &AttachArgs| {
            session.index().insert(placement.clone(), *scope).map(|_| ())
        })
        .capture_undo(|(session, placement, _): &AttachArgs| {
            if session.index().contains(placement.id()) {
                return Err(SessionError::InvalidPlacement {
                    placement_id: placement.id().to_string(),
                    reason: "already attached".to_string(),
                });
            }
            Ok(placement.id())
        })
        .undo_operation(|(session, _, _): &AttachArgs, attached: &PlacementId| {
            session.index().remove(*attached).map(|_| ())
        })?;

    registry
        .define(DETACH)
        .operation(|(session, id): &DetachArgs| {
            if session.index().remove(*id)? {
                Ok(())
            } else {
                Err(SessionError::NotInSession {
                    placement_id: id.to_string(),
                })
            }
        })
        .capture_undo(|(session, id): &DetachArgs| session.index().subtree(*id))
        .undo_operation(|(session, _): &DetachArgs, snapshot: &Vec<SubtreeEntry>| {
            session.index().restore(snapshot)
        })?;

    registry
        .define(RELOCATE)
        .operation(|(session, id, pins): &RelocateArgs| {
            session
                .index()
                .modify(*id, |p| {
                    p.replace_pins(pins.clone());
                })
        })
        .capture_undo(|(session, id, _): &RelocateArgs| {
            Ok(session.index().find(*id)?.pins().to_vec())
        })
        .undo_operation(|(session, id, _): &RelocateArgs, previous: &Vec<LocatingPin>| {
            session
                .index()
                .modify(*id, |p| {
                    p.replace_pins(previous.clone());
                })
        })?;

    tracing::debug!(definitions = registry.definition_count(), "session commands registered");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{MObject, Time};

    fn setup() -> (CommandRegistry, SessionHandle) {
        let registry = CommandRegistry::new();
        register_all(&registry).unwrap();
        (registry, SessionHandle::new(Arc::new(PlacementIndex::new())))
    }

    #[test]
    fn test_attach_then_undo() {
        let (registry, session) = setup();
        let root = session.index().root_id();
        let placement = Placement::new(MObject::sequence("s"));
        let id = placement.id();

        let cmd = registry
            .get(ATTACH)
            .unwrap()
            .new_instance()
            .unwrap()
            .bind((session.clone(), placement, root))
            .unwrap();
        cmd.exec_sync().unwrap();
        assert!(session.index().contains(id));

        cmd.undo().unwrap();
        assert!(!session.index().contains(id));
        assert_eq!(session.index().size(), 0);
    }

    #[test]
    fn test_attach_twice_rejected_by_capture() {
        let (registry, session) = setup();
        let root = session.index().root_id();
        let placement = Placement::new(MObject::sequence("s"));
        session.index().insert(placement.clone(), root).unwrap();

        let cmd = registry.get(ATTACH).unwrap().new_instance().unwrap();
        cmd.bind((session.clone(), placement, root)).unwrap();

        assert!(matches!(
            cmd.exec_sync(),
            Err(SessionError::InvalidPlacement { .. })
        ));
        assert_eq!(session.index().size(), 1);
    }

    #[test]
    fn test_detach_restores_subtree_exactly() {
        let (registry, session) = setup();
        let index = session.index();
        let root = index.root_id();
        let first = index.insert(Placement::new(MObject::sequence("a")), root).unwrap();
        let middle = index.insert(Placement::new(MObject::sequence("b")), root).unwrap();
        index.insert(Placement::new(MObject::sequence("c")), root).unwrap();
        let nested = index.insert(Placement::new(MObject::fork("V1")), middle).unwrap();

        let cmd = registry.get(DETACH).unwrap().new_instance().unwrap();
        cmd.bind((session.clone(), middle)).unwrap();
        cmd.exec_sync().unwrap();
        assert!(!index.contains(nested));

        cmd.undo().unwrap();
        assert!(index.contains(nested));
        assert_eq!(index.position_in_scope(middle).unwrap(), 1);
        assert_eq!(index.children(root).unwrap()[0], first);
        index.verify().unwrap();
    }

    #[test]
    fn test_relocate_round_trip() {
        let (registry, session) = setup();
        let root = session.index().root_id();
        let id = session
            .index()
            .insert(
                Placement::new(MObject::sequence("s"))
                    .with_pin(LocatingPin::Fixed { start: Time(5) }),
                root,
            )
            .unwrap();

        let cmd = registry.get(RELOCATE).unwrap().new_instance().unwrap();
        cmd.bind((
            session.clone(),
            id,
            vec![LocatingPin::Fixed { start: Time(500) }],
        ))
        .unwrap();
        cmd.exec_sync().unwrap();
        assert_eq!(
            session.index().find(id).unwrap().pins(),
            &[LocatingPin::Fixed { start: Time(500) }]
        );

        cmd.undo().unwrap();
        assert_eq!(
            session.index().find(id).unwrap().pins(),
            &[LocatingPin::Fixed { start: Time(5) }]
        );
    }
}
