//! In-memory capture of boundary events for test assertions
//!
//! Events are looked up the way the session logs them: by [`SessionOp`],
//! by `command_id`, and by the `request_id` that follows a command from its
//! trigger onto the session loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use montage_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_COMMAND_ID, FIELD_DURATION_MS,
    FIELD_ERR_CODE, FIELD_EVENT, FIELD_OP, FIELD_REQUEST_ID,
};
use montage_core_types::SessionOp;
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One captured event with its fields rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Whether this is the given boundary event of `op`
    pub fn is(&self, op: SessionOp, event: &str) -> bool {
        self.field(FIELD_OP) == Some(op.as_str()) && self.field(FIELD_EVENT) == Some(event)
    }

    pub fn command_id(&self) -> Option<&str> {
        self.field(FIELD_COMMAND_ID)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.field(FIELD_REQUEST_ID)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.field(FIELD_DURATION_MS).and_then(|d| d.parse().ok())
    }
}

#[derive(Default)]
struct FieldVisitor(HashMap<String, String>);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

/// Layer appending every event to a shared buffer
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: events.clone(),
            },
            TestCapture { events },
        )
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        if let Ok(mut events) = self.events.lock() {
            events.push(CapturedEvent {
                level: *event.metadata().level(),
                fields: visitor.0,
            });
        }
    }
}

/// Read side of the capture buffer
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Every event logged for one command, oldest first
    pub fn for_command(&self, command_id: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.command_id() == Some(command_id))
            .collect()
    }

    /// First `event` of `op` logged for `command_id`
    pub fn find(&self, op: SessionOp, event: &str, command_id: &str) -> Option<CapturedEvent> {
        self.for_command(command_id)
            .into_iter()
            .find(|e| e.is(op, event))
    }

    /// Assert `op` started and ended successfully for `command_id`
    ///
    /// # Panics
    ///
    /// Panics if either event is missing.
    pub fn assert_completed(&self, op: SessionOp, command_id: &str) {
        for event in [EVENT_START, EVENT_END] {
            assert!(
                self.find(op, event, command_id).is_some(),
                "no {} event of {} for command {}",
                event,
                op,
                command_id
            );
        }
    }

    /// Assert `op` failed for `command_id` with the given error code
    ///
    /// # Panics
    ///
    /// Panics if there is no such failure.
    pub fn assert_failed(&self, op: SessionOp, command_id: &str, err_code: &str) {
        let failure = self.find(op, EVENT_END_ERROR, command_id);
        assert_eq!(
            failure.as_ref().and_then(|e| e.field(FIELD_ERR_CODE)),
            Some(err_code),
            "no {} failure of {} for command {}",
            err_code,
            op,
            command_id
        );
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as global subscriber (once per process)
///
/// All tests in one binary share the buffer, so assertions should filter
/// by their own command IDs rather than count totals.
///
/// ```
/// use montage_core::logging_facility::test_capture::init_test_capture;
/// use montage_core::log_op_start;
/// use montage_core_types::SessionOp;
///
/// let capture = init_test_capture();
/// log_op_start!(SessionOp::CommandTrigger, command_id = "doc.cmd");
/// assert!(capture.find(SessionOp::CommandTrigger, "start", "doc.cmd").is_some());
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = CaptureLayer::new();
            tracing_subscriber::registry().with(layer).try_init().ok();
            capture
        })
        .clone()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::SessionError;
    use crate::{log_op_end, log_op_error, log_op_start};

    fn captured(emit: impl FnOnce()) -> TestCapture {
        let (layer, capture) = CaptureLayer::new();
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), emit);
        capture
    }

    #[test]
    fn test_completed_command_is_found_by_id() {
        let capture = captured(|| {
            log_op_start!(SessionOp::CommandDispatch, command_id = "cap.ok", request_id = "r-1");
            log_op_end!(SessionOp::CommandDispatch, duration_ms = 7, command_id = "cap.ok", request_id = "r-1");
            log_op_start!(SessionOp::CommandDispatch, command_id = "cap.other");
        });

        capture.assert_completed(SessionOp::CommandDispatch, "cap.ok");
        assert_eq!(capture.for_command("cap.ok").len(), 2);
        let end = capture
            .find(SessionOp::CommandDispatch, EVENT_END, "cap.ok")
            .unwrap();
        assert_eq!(end.duration_ms(), Some(7));
        assert_eq!(end.request_id(), Some("r-1"));
        assert_eq!(end.level, Level::INFO);
    }

    #[test]
    fn test_failure_is_found_by_code() {
        let capture = captured(|| {
            let err = SessionError::MissingMemento {
                command_id: "cap.undo".to_string(),
            };
            log_op_error!(SessionOp::CommandDispatch, err, duration_ms = 1, command_id = "cap.undo");
        });

        capture.assert_failed(SessionOp::CommandDispatch, "cap.undo", "ERR_MISSING_MEMENTO");
        assert!(capture
            .find(SessionOp::CommandDispatch, EVENT_START, "cap.undo")
            .is_none());
    }

    #[test]
    #[should_panic(expected = "no end event")]
    fn test_started_only_is_not_completed() {
        let capture = captured(|| {
            log_op_start!(SessionOp::CommandTrigger, command_id = "cap.pending");
        });

        capture.assert_completed(SessionOp::CommandTrigger, "cap.pending");
    }
}
