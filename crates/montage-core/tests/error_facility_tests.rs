#![allow(clippy::unwrap_used, clippy::expect_used)]

use montage_core::errors::{ErrorCategory, ExError, ExErrorKind, SessionError};
use montage_core_types::RequestId;

#[test]
fn test_every_kind_has_code_and_category() {
    // GIVEN one error of each broad family
    let cases = [
        (
            SessionError::InvalidScope {
                scope_id: "s".to_string(),
                reason: "unknown".to_string(),
            },
            ErrorCategory::Invalid,
            "ERR_INVALID_SCOPE",
        ),
        (
            SessionError::EmptyScopePath {
                op: "leaf".to_string(),
            },
            ErrorCategory::Invalid,
            "ERR_EMPTY_SCOPE_PATH",
        ),
        (
            SessionError::ExpiredHandle {
                what: "frame".to_string(),
            },
            ErrorCategory::State,
            "ERR_EXPIRED_HANDLE",
        ),
        (
            SessionError::IndexCorrupted {
                message: "cycle".to_string(),
            },
            ErrorCategory::Fatal,
            "ERR_INDEX_CORRUPTED",
        ),
    ];

    // WHEN converting to the structured error
    for (err, category, code) in cases {
        let ex: ExError = err.clone().into();

        // THEN kind, code and category agree
        assert_eq!(err.category(), category);
        assert_eq!(ex.category(), category);
        assert_eq!(ex.code(), code);
        assert_eq!(ex.kind(), err.kind());
    }
}

#[test]
fn test_ex_error_builder_keeps_correlation() {
    let request_id = RequestId::new();

    let ex = ExError::new(ExErrorKind::OperationFailed)
        .with_op("command_exec")
        .with_command_id("session.attach")
        .with_request_id(request_id)
        .with_message("operation failed");

    assert_eq!(ex.op(), Some("command_exec"));
    assert_eq!(ex.command_id(), Some("session.attach"));
    assert_eq!(ex.request_id(), Some(request_id));
    assert_eq!(ex.message(), "operation failed");
}

#[test]
fn test_placement_errors_carry_placement_id() {
    let ex: ExError = SessionError::NotInSession {
        placement_id: "p-42".to_string(),
    }
    .into();
    assert_eq!(ex.placement_id(), Some("p-42"));
    assert_eq!(ex.kind(), ExErrorKind::NotInSession);
}
