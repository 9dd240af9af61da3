#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{clip_at, fork, new_session, sequence};
use montage_core::model::{Clip, LocatingPin, Time};
use montage_core::session_commands::{ATTACH, RELOCATE};
use montage_core::{PlacementRef, Scope};

#[test]
fn test_fixture_follows_command_driven_edits() {
    // GIVEN a sequence with one track, built through the attach command
    let session = new_session();
    let root = session.index().root_id();
    let seq = sequence("main");
    let seq_id = seq.id();
    let track = fork("V1");
    let track_id = track.id();
    let clip = clip_at("intro", 0, 1_000);
    let clip_id = clip.id();

    for (placement, scope) in [(seq, root), (track, seq_id), (clip, track_id)] {
        session
            .command(ATTACH)
            .unwrap()
            .new_instance()
            .unwrap()
            .bind((session.handle(), placement, scope))
            .unwrap()
            .exec_sync()
            .unwrap();
    }

    // WHEN the fixture is rebuilt
    let first = session.rebuild_fixture().unwrap();

    // THEN it holds one segment with the clip on V1
    assert_eq!(first.len(), 1);
    let element = &first.segments()[0].elements[0];
    assert_eq!(element.id, clip_id);
    assert_eq!(element.track, Some(track_id));

    // WHEN the clip is relocated and the fixture rebuilt
    let relocate = session.command(RELOCATE).unwrap().new_instance().unwrap();
    relocate
        .bind((session.handle(), clip_id, vec![LocatingPin::Fixed { start: Time(5_000) }]))
        .unwrap();
    relocate.exec_sync().unwrap();
    let second = session.rebuild_fixture().unwrap();

    // THEN the digest changed and the segment moved
    assert_ne!(first.digest(), second.digest());
    assert!(second.segment_at(Time(5_500)).is_some());
    assert!(second.segment_at(Time(500)).is_none());

    // WHEN undoing the relocation
    relocate.undo().unwrap();

    // THEN a rebuild reproduces the first fixture
    assert_eq!(session.rebuild_fixture().unwrap().digest(), first.digest());
}

#[test]
fn test_placement_ref_expires_with_detach() {
    let session = new_session();
    let root = session.index().root_id();
    let id = session.attach_to(clip_at("c", 0, 10), Scope::new(root)).unwrap();
    let handle: PlacementRef<Clip> = PlacementRef::new(id);
    assert!(handle.is_valid(session.index()));

    session.detach(id).unwrap();

    assert!(matches!(
        handle.resolve(session.index()),
        Err(montage_core::SessionError::ExpiredHandle { .. })
    ));
}

#[test]
fn test_clear_is_repeatable() {
    let session = new_session();
    session.attach(sequence("a")).unwrap();
    session.clear().unwrap();
    session.clear().unwrap();
    assert_eq!(session.index().size(), 0);
    session.index().verify().unwrap();
}
