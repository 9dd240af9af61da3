//! Boundary logging macros
//!
//! Every boundary event names a [`SessionOp`](montage_core_types::SessionOp)
//! and one of the schema's start/end/end_error events. Further fields use
//! `tracing` syntax; commands add `command_id` and `request_id` so a
//! command can be followed from its trigger to its dispatch.
//!
//! Callers must depend on `montage-core-types` and `tracing`.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_boundary {
    ($level:ident, $op:expr, $event:expr) => {
        tracing::$level!(
            component = module_path!(),
            op = montage_core_types::SessionOp::as_str($op),
            event = $event,
        )
    };
    ($level:ident, $op:expr, $event:expr, $($field:tt)+) => {
        tracing::$level!(
            component = module_path!(),
            op = montage_core_types::SessionOp::as_str($op),
            event = $event,
            $($field)+
        )
    };
}

/// Start of a boundary operation
///
/// ```
/// use montage_core::log_op_start;
/// use montage_core_types::SessionOp;
///
/// log_op_start!(SessionOp::FixtureBuild);
/// log_op_start!(SessionOp::CommandTrigger, command_id = "session.attach");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        $crate::__log_boundary!(info, $op, montage_core_types::schema::EVENT_START)
    };
    ($op:expr, $($field:tt)+) => {
        $crate::__log_boundary!(info, $op, montage_core_types::schema::EVENT_START, $($field)+)
    };
}

/// Successful end of a boundary operation, with its duration
///
/// ```
/// use montage_core::log_op_end;
/// use montage_core_types::SessionOp;
///
/// log_op_end!(SessionOp::FixtureBuild, duration_ms = 3, segment_count = 4);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {
        $crate::__log_boundary!(
            info,
            $op,
            montage_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)+)?
        )
    };
}

/// Failed end of a boundary operation
///
/// The error goes through [`ExError`](crate::errors::ExError), so the event
/// carries its kind, stable code and category.
///
/// ```
/// use montage_core::errors::SessionError;
/// use montage_core::log_op_error;
/// use montage_core_types::SessionOp;
///
/// let err = SessionError::UnboundArguments { command_id: "session.detach".to_string() };
/// log_op_error!(SessionOp::CommandDispatch, err, duration_ms = 1, command_id = "session.detach");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_boundary!(
            error,
            $op,
            montage_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err_category = ?ex_err.category()
            $(, $($field)+)?
        )
    }};
}
