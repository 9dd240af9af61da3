use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use montage_core::model::{AssetCategory, AssetRef, Duration, LocatingPin, MObject, Time};
use montage_core::{Command, CommandRegistry, Placement, PlacementId, PlacementIndex, Session};

/// Create a new empty session for testing
#[allow(dead_code)]
pub fn new_session() -> Session {
    Session::new().expect("session should be created")
}

#[allow(dead_code)]
pub fn sequence(name: &str) -> Placement {
    Placement::new(MObject::sequence(name))
}

#[allow(dead_code)]
pub fn fork(name: &str) -> Placement {
    Placement::new(MObject::fork(name))
}

/// Video clip with a fixed start, in microseconds
#[allow(dead_code)]
pub fn clip_at(name: &str, start: i64, duration: i64) -> Placement {
    Placement::new(MObject::clip(
        name,
        AssetRef::new(AssetCategory::Video, name),
        Duration(duration),
    ))
    .with_pin(LocatingPin::Fixed { start: Time(start) })
}

/// Insert a chain of nested sequences below `scope`, returning their IDs
#[allow(dead_code)]
pub fn insert_chain(index: &PlacementIndex, scope: PlacementId, names: &[&str]) -> Vec<PlacementId> {
    let mut ids = Vec::new();
    let mut parent = scope;
    for name in names {
        parent = index.insert(sequence(name), parent).expect("insert should succeed");
        ids.push(parent);
    }
    ids
}

/// Every placement below the root with its scope, sibling position and pins
#[allow(dead_code)]
pub fn snapshot(index: &PlacementIndex) -> Vec<(PlacementId, PlacementId, usize, Vec<LocatingPin>)> {
    index
        .contents(index.root_id())
        .expect("root contents")
        .into_iter()
        .map(|id| {
            (
                id,
                index.get_scope(id).expect("scope"),
                index.position_in_scope(id).expect("position"),
                index.find(id).expect("placement").pins().to_vec(),
            )
        })
        .collect()
}

/// Define "test.increment" adding its argument to a shared counter
#[allow(dead_code)]
pub fn define_counter(registry: &CommandRegistry, id: &str, start: i64) -> (Command, Arc<AtomicI64>) {
    let counter = Arc::new(AtomicI64::new(start));
    let (op, capture, undo) = (counter.clone(), counter.clone(), counter.clone());
    let cmd = registry
        .define(id)
        .operation(move |n: &i64| {
            op.fetch_add(*n, Ordering::SeqCst);
            Ok(())
        })
        .capture_undo(move |_: &i64| Ok(capture.load(Ordering::SeqCst)))
        .undo_operation(move |_: &i64, previous: &i64| {
            undo.store(*previous, Ordering::SeqCst);
            Ok(())
        })
        .expect("definition should register");
    (cmd, counter)
}
