#![allow(clippy::unwrap_used, clippy::expect_used)]

use montage_core::errors::SessionError;
use montage_core::logging_facility::test_capture::init_test_capture;
use montage_core::{log_op_end, log_op_error, log_op_start};
use montage_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_COMPONENT, FIELD_ERR_CATEGORY, FIELD_ERR_KIND,
};
use montage_core_types::{RequestContext, SessionOp};

#[test]
fn test_start_event_names_op_and_command() {
    // GIVEN the global capture
    let capture = init_test_capture();
    let request = RequestContext::new();

    // WHEN a trigger starts
    log_op_start!(
        SessionOp::CommandTrigger,
        command_id = "logtest.start",
        request_id = %request.request_id()
    );

    // THEN the event carries op, component, command and request
    let start = capture
        .find(SessionOp::CommandTrigger, EVENT_START, "logtest.start")
        .expect("start event");
    assert_eq!(start.field("op"), Some("command_trigger"));
    assert!(start.field(FIELD_COMPONENT).is_some());
    assert_eq!(start.request_id(), Some(request.request_id().to_string().as_str()));
}

#[test]
fn test_end_event_carries_duration() {
    let capture = init_test_capture();

    log_op_end!(SessionOp::FixtureBuild, duration_ms = 42, command_id = "logtest.end");

    let end = capture
        .find(SessionOp::FixtureBuild, EVENT_END, "logtest.end")
        .expect("end event");
    assert_eq!(end.duration_ms(), Some(42));
}

#[test]
fn test_error_event_carries_kind_code_and_category() {
    let capture = init_test_capture();
    let err = SessionError::UnboundArguments {
        command_id: "logtest.error".to_string(),
    };

    log_op_error!(SessionOp::CommandDispatch, err, duration_ms = 10, command_id = "logtest.error");

    capture.assert_failed(SessionOp::CommandDispatch, "logtest.error", "ERR_UNBOUND_ARGUMENTS");
    let failure = capture
        .find(SessionOp::CommandDispatch, EVENT_END_ERROR, "logtest.error")
        .unwrap();
    assert_eq!(failure.field(FIELD_ERR_KIND), Some("UnboundArguments"));
    assert_eq!(failure.field(FIELD_ERR_CATEGORY), Some("State"));
    assert_eq!(failure.level, tracing::Level::ERROR);
}

#[test]
fn test_start_and_end_complete_an_operation() {
    let capture = init_test_capture();

    log_op_start!(SessionOp::CommandDispatch, command_id = "logtest.pair");
    log_op_end!(SessionOp::CommandDispatch, duration_ms = 1, command_id = "logtest.pair");

    capture.assert_completed(SessionOp::CommandDispatch, "logtest.pair");
    assert_eq!(capture.for_command("logtest.pair").len(), 2);
}
