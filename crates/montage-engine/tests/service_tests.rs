#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::atomic::Ordering;

use common::*;
use montage_core::session_commands::{ATTACH, DETACH};
use montage_core::command::CommandState;
use montage_core::logging_facility::init_test_capture;
use montage_core::{MObject, Placement, Scope, SessionError};
use montage_core_types::schema::{EVENT_END, EVENT_START, FIELD_QUEUED_MS};
use montage_core_types::SessionOp;
use montage_engine::SessionCommandService;

#[test]
fn test_cycle_gives_fresh_anonymous_instance() {
    let session = new_session();
    let service = SessionCommandService::new(start(&session, &fast_config()));

    let first = service.cycle(ATTACH).unwrap();
    let second = service.cycle(ATTACH).unwrap();

    assert!(first.is_anonymous());
    assert_eq!(first.state(), CommandState::Unbound);

    let root = session.index().root_id();
    service
        .bind_arg(&first, (session.handle(), Placement::new(MObject::sequence("s")), root))
        .unwrap();

    // binding one instance leaves the other and the definition untouched
    assert_eq!(first.state(), CommandState::Bound);
    assert_eq!(second.state(), CommandState::Unbound);
    assert!(!session.command(ATTACH).unwrap().can_exec());
}

#[test]
fn test_cycle_unknown_command_fails() {
    let session = new_session();
    let service = SessionCommandService::new(start(&session, &fast_config()));

    let result = service.cycle("no.such.command");

    assert!(matches!(result, Err(SessionError::InvalidCommand { .. })));
}

#[test]
fn test_bind_arg_checks_type() {
    let session = new_session();
    let service = SessionCommandService::new(start(&session, &fast_config()));
    let cmd = service.cycle(ATTACH).unwrap();

    let result = service.bind_arg(&cmd, 42i64);

    assert!(matches!(result, Err(SessionError::InvalidArguments { .. })));
    assert_eq!(cmd.state(), CommandState::Unbound);
}

#[test]
fn test_invoke_unbound_fails() {
    let session = new_session();
    let service = SessionCommandService::new(start(&session, &fast_config()));
    let cmd = service.cycle(ATTACH).unwrap();

    let result = service.invoke(&cmd);

    assert!(matches!(result, Err(SessionError::UnboundArguments { .. })));
}

#[test]
fn test_trigger_attach_then_undo() {
    // GIVEN a service over a running dispatcher
    let session = new_session();
    let dispatcher = start(&session, &fast_config());
    let service = SessionCommandService::new(dispatcher.clone());
    let root = session.index().root_id();
    let sequence = Placement::new(MObject::sequence("main"));
    let seq_id = sequence.id();

    // WHEN triggering an attach
    let cmd = service
        .trigger(ATTACH, (session.handle(), sequence, root))
        .unwrap();
    dispatcher.await_state_processed().unwrap();

    // THEN the placement is in the model and the instance can be undone
    assert!(session.index().contains(seq_id));
    assert_eq!(cmd.state(), CommandState::Executed);

    service.invoke_undo(&cmd).unwrap();
    dispatcher.await_state_processed().unwrap();

    assert!(!session.index().contains(seq_id));
    assert_eq!(cmd.state(), CommandState::Bound);
}

#[test]
fn test_trigger_detach_restores_subtree_on_undo() {
    // GIVEN a sequence holding a clip
    let session = new_session();
    let dispatcher = start(&session, &fast_config());
    let service = SessionCommandService::new(dispatcher.clone());
    let root = session.index().root_id();
    let seq = session
        .attach_to(Placement::new(MObject::sequence("s")), Scope::new(root))
        .unwrap();
    let clip = session.attach_to(clip_at("c", 0, 10), Scope::new(seq)).unwrap();

    // WHEN detaching the sequence and undoing it
    let cmd = service.trigger(DETACH, (session.handle(), seq)).unwrap();
    dispatcher.await_state_processed().unwrap();
    assert!(!session.index().contains(clip));

    service.invoke_undo(&cmd).unwrap();
    dispatcher.await_state_processed().unwrap();

    // THEN the whole subtree is back in place
    assert_eq!(session.index().get_scope(clip).unwrap(), seq);
    assert_eq!(session.index().get_scope(seq).unwrap(), root);
}

#[test]
fn test_trigger_counter_through_custom_registry_entry() {
    let session = new_session();
    let dispatcher = start(&session, &fast_config());
    let service = SessionCommandService::new(dispatcher.clone());
    let (_, counter) = define_counter(session.registry(), "test.count");

    service.trigger("test.count", 4i64).unwrap();
    service.trigger("test.count", 6i64).unwrap();
    dispatcher.await_state_processed().unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert_eq!(dispatcher.dispatched(), 2);
}

#[test]
fn test_trigger_and_dispatch_share_request_id() {
    // GIVEN log capture and a service over a running dispatcher
    let capture = init_test_capture();
    let session = new_session();
    let dispatcher = start(&session, &fast_config());
    let (_, counter) = define_counter(session.registry(), "test.correlated");
    let service = SessionCommandService::new(dispatcher.clone());

    // WHEN a command is triggered and the loop settles
    service.trigger("test.correlated", 4i64).unwrap();
    dispatcher.await_state_processed().unwrap();

    // THEN the dispatch on the loop is logged under the trigger's request
    assert_eq!(counter.load(Ordering::SeqCst), 4);
    capture.assert_completed(SessionOp::CommandTrigger, "test.correlated");
    capture.assert_completed(SessionOp::CommandDispatch, "test.correlated");
    let triggered = capture
        .find(SessionOp::CommandTrigger, EVENT_START, "test.correlated")
        .unwrap();
    let dispatched = capture
        .find(SessionOp::CommandDispatch, EVENT_START, "test.correlated")
        .unwrap();
    let finished = capture
        .find(SessionOp::CommandDispatch, EVENT_END, "test.correlated")
        .unwrap();
    assert!(triggered.request_id().is_some());
    assert_eq!(dispatched.request_id(), triggered.request_id());
    assert_eq!(finished.request_id(), triggered.request_id());
    assert!(dispatched.field(FIELD_QUEUED_MS).is_some());
}
