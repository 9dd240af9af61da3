//! Canonical schema constants for structured logging
//!
//! Every crate logs through these keys so captured output stays comparable.

use std::fmt;

/// Operations that emit boundary events (start, end, end_error)
///
/// Internals of the index, queries and commands log at debug level only;
/// these are the operations a caller waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOp {
    /// A front end cycles, binds and queues a command
    CommandTrigger,
    /// The session loop runs one queued command
    CommandDispatch,
    /// The session loop rebuilds the fixture
    FixtureBuild,
    /// A session is populated from a session file
    SessionLoad,
}

impl SessionOp {
    pub const ALL: [SessionOp; 4] = [
        SessionOp::CommandTrigger,
        SessionOp::CommandDispatch,
        SessionOp::FixtureBuild,
        SessionOp::SessionLoad,
    ];

    /// Value of the `op` field
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionOp::CommandTrigger => "command_trigger",
            SessionOp::CommandDispatch => "command_dispatch",
            SessionOp::FixtureBuild => "fixture_build",
            SessionOp::SessionLoad => "session_load",
        }
    }
}

impl fmt::Display for SessionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Boundary keys
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Command correlation
pub const FIELD_COMMAND_ID: &str = "command_id";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_ACTION: &str = "action";
pub const FIELD_QUEUED_MS: &str = "queued_ms";

// Session entities and sizes
pub const FIELD_PLACEMENT_ID: &str = "placement_id";
pub const FIELD_SCOPE_ID: &str = "scope_id";
pub const FIELD_PLACEMENT_COUNT: &str = "placement_count";
pub const FIELD_SEGMENT_COUNT: &str = "segment_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";
pub const FIELD_ERR_CATEGORY: &str = "err_category";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_op_names_are_distinct_snake_case() {
        let names: HashSet<&str> = SessionOp::ALL.iter().map(|op| op.as_str()).collect();

        assert_eq!(names.len(), SessionOp::ALL.len());
        for name in names {
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{}", name);
        }
    }

    #[test]
    fn test_op_display_matches_field_value() {
        assert_eq!(SessionOp::FixtureBuild.to_string(), "fixture_build");
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }
}
