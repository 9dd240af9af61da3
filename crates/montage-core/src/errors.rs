use montage_core_types::RequestId;
use thiserror::Error;

/// Result type alias using SessionError
pub type Result<T> = std::result::Result<T, SessionError>;

// ========== Error Facility ==========

/// Coarse error taxonomy of the session core
///
/// - `Invalid`: structural violation, recoverable by correcting the input
/// - `State`: lifecycle violation, recoverable by fixing the call order
/// - `Fatal`: corruption of core housekeeping, must halt the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Invalid,
    State,
    Fatal,
}

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable by tests, the CLI and any
/// UI layer that wants to react to a failure without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural
    NotInSession,
    InvalidScope,
    RootRemoval,
    EmptyScopePath,
    PlacementType,
    InvalidPlacement,

    // Command definition and binding
    InvalidCommand,
    DuplicateCommand,
    InvalidArguments,

    // Lifecycle
    UnboundArguments,
    MissingMemento,
    ExpiredHandle,
    Lifecycle,
    OperationFailed,

    // Integration
    Serialization,
    Config,

    // Housekeeping
    IndexCorrupted,
    Concurrency,
    Fatal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotInSession => "ERR_NOT_IN_SESSION",
            ExErrorKind::InvalidScope => "ERR_INVALID_SCOPE",
            ExErrorKind::RootRemoval => "ERR_ROOT_REMOVAL",
            ExErrorKind::EmptyScopePath => "ERR_EMPTY_SCOPE_PATH",
            ExErrorKind::PlacementType => "ERR_PLACEMENT_TYPE",
            ExErrorKind::InvalidPlacement => "ERR_INVALID_PLACEMENT",
            ExErrorKind::InvalidCommand => "ERR_INVALID_COMMAND",
            ExErrorKind::DuplicateCommand => "ERR_DUPLICATE_COMMAND",
            ExErrorKind::InvalidArguments => "ERR_INVALID_ARGUMENTS",
            ExErrorKind::UnboundArguments => "ERR_UNBOUND_ARGUMENTS",
            ExErrorKind::MissingMemento => "ERR_MISSING_MEMENTO",
            ExErrorKind::ExpiredHandle => "ERR_EXPIRED_HANDLE",
            ExErrorKind::Lifecycle => "ERR_LIFECYCLE",
            ExErrorKind::OperationFailed => "ERR_OPERATION_FAILED",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::IndexCorrupted => "ERR_INDEX_CORRUPTED",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Fatal => "ERR_FATAL",
        }
    }

    /// Map the kind onto the coarse taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExErrorKind::NotInSession
            | ExErrorKind::InvalidScope
            | ExErrorKind::RootRemoval
            | ExErrorKind::EmptyScopePath
            | ExErrorKind::PlacementType
            | ExErrorKind::InvalidPlacement
            | ExErrorKind::InvalidCommand
            | ExErrorKind::DuplicateCommand
            | ExErrorKind::InvalidArguments
            | ExErrorKind::Serialization
            | ExErrorKind::Config => ErrorCategory::Invalid,
            ExErrorKind::UnboundArguments
            | ExErrorKind::MissingMemento
            | ExErrorKind::ExpiredHandle
            | ExErrorKind::Lifecycle
            | ExErrorKind::OperationFailed => ErrorCategory::State,
            ExErrorKind::IndexCorrupted | ExErrorKind::Concurrency | ExErrorKind::Fatal => {
                ErrorCategory::Fatal
            }
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus optional context for logging and
/// reporting. Built from a `SessionError` via `From`.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    placement_id: Option<String>,
    command_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            placement_id: None,
            command_id: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add placement ID context
    pub fn with_placement_id(mut self, id: impl Into<String>) -> Self {
        self.placement_id = Some(id.into());
        self
    }

    /// Add command ID context
    pub fn with_command_id(mut self, id: impl Into<String>) -> Self {
        self.command_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn placement_id(&self) -> Option<&str> {
        self.placement_id.as_deref()
    }

    pub fn command_id(&self) -> Option<&str> {
        self.command_id.as_deref()
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(placement_id) = &self.placement_id {
            write!(f, " (placement_id: {})", placement_id)?;
        }
        if let Some(command_id) = &self.command_id {
            write!(f, " (command_id: {})", command_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for session model operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    // ===== Structural Errors =====
    /// Placement ID is not registered in the index
    #[error("Placement not registered in the session: {placement_id}")]
    NotInSession { placement_id: String },

    /// Scope is unknown or can't be connected to the model root
    #[error("Invalid scope {scope_id}: {reason}")]
    InvalidScope { scope_id: String, reason: String },

    /// Attempt to remove the root placement
    #[error("Can't detach the model root")]
    RootRemoval,

    /// Operation requires a non-empty scope path
    #[error("Operation '{op}' on an empty scope path")]
    EmptyScopePath { op: String },

    /// Placement subject is not of the requested kind
    #[error("Placement {placement_id} does not hold a {expected}")]
    PlacementType {
        placement_id: String,
        expected: String,
    },

    /// Placement can't be positioned (e.g. a cycle of relative pins)
    #[error("Placement {placement_id} can't be resolved: {reason}")]
    InvalidPlacement {
        placement_id: String,
        reason: String,
    },

    // ===== Command Errors =====
    /// Command is unknown or its definition is incomplete
    #[error("Invalid command '{command_id}': {reason}")]
    InvalidCommand { command_id: String, reason: String },

    /// A command with this ID is already registered
    #[error("Command '{command_id}' is already defined")]
    DuplicateCommand { command_id: String },

    /// Arguments don't match the operation signature
    #[error("Arguments for command '{command_id}' don't match, expected {expected}")]
    InvalidArguments {
        command_id: String,
        expected: String,
    },

    /// Command invoked before arguments were bound
    #[error("Command '{command_id}' has no bound arguments")]
    UnboundArguments { command_id: String },

    /// Undo requested without a captured memento
    #[error("Command '{command_id}' can't undo, no state was captured")]
    MissingMemento { command_id: String },

    /// Handle refers to something no longer alive
    #[error("Expired handle: {what}")]
    ExpiredHandle { what: String },

    /// Call sequence violates a component lifecycle
    #[error("Lifecycle violation: {message}")]
    Lifecycle { message: String },

    /// The operation of a command reported a failure
    #[error("Command '{command_id}' failed: {message}")]
    OperationFailed { command_id: String, message: String },

    // ===== Integration Errors =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ===== Fatal Errors =====
    /// Index self-check found an inconsistency
    #[error("Placement index corrupted: {message}")]
    IndexCorrupted { message: String },

    /// A lock guarding shared session state was poisoned by a panic
    #[error("Lock poisoned: {resource}")]
    LockPoisoned { resource: String },

    #[error("Fatal: {message}")]
    Fatal { message: String },
}

impl SessionError {
    /// Stable classification of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            SessionError::NotInSession { .. } => ExErrorKind::NotInSession,
            SessionError::InvalidScope { .. } => ExErrorKind::InvalidScope,
            SessionError::RootRemoval => ExErrorKind::RootRemoval,
            SessionError::EmptyScopePath { .. } => ExErrorKind::EmptyScopePath,
            SessionError::PlacementType { .. } => ExErrorKind::PlacementType,
            SessionError::InvalidPlacement { .. } => ExErrorKind::InvalidPlacement,
            SessionError::InvalidCommand { .. } => ExErrorKind::InvalidCommand,
            SessionError::DuplicateCommand { .. } => ExErrorKind::DuplicateCommand,
            SessionError::InvalidArguments { .. } => ExErrorKind::InvalidArguments,
            SessionError::UnboundArguments { .. } => ExErrorKind::UnboundArguments,
            SessionError::MissingMemento { .. } => ExErrorKind::MissingMemento,
            SessionError::ExpiredHandle { .. } => ExErrorKind::ExpiredHandle,
            SessionError::Lifecycle { .. } => ExErrorKind::Lifecycle,
            SessionError::OperationFailed { .. } => ExErrorKind::OperationFailed,
            SessionError::Serialization { .. } => ExErrorKind::Serialization,
            SessionError::Config { .. } => ExErrorKind::Config,
            SessionError::IndexCorrupted { .. } => ExErrorKind::IndexCorrupted,
            SessionError::LockPoisoned { .. } => ExErrorKind::Concurrency,
            SessionError::Fatal { .. } => ExErrorKind::Fatal,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }

    /// Wrap any failure raised while clearing core state
    pub fn escalate(self, context: &str) -> SessionError {
        match self {
            SessionError::Fatal { .. } => self,
            other => SessionError::Fatal {
                message: format!("{}: {}", context, other),
            },
        }
    }

    pub(crate) fn poisoned(resource: &str) -> SessionError {
        SessionError::LockPoisoned {
            resource: resource.to_string(),
        }
    }
}

impl From<SessionError> for ExError {
    fn from(err: SessionError) -> Self {
        let base = ExError::new(err.kind()).with_message(err.to_string());
        match err {
            SessionError::NotInSession { placement_id }
            | SessionError::PlacementType { placement_id, .. }
            | SessionError::InvalidPlacement { placement_id, .. } => {
                base.with_placement_id(placement_id)
            }
            SessionError::InvalidScope { scope_id, .. } => base.with_placement_id(scope_id),
            SessionError::EmptyScopePath { op } => base.with_op(op),
            SessionError::InvalidCommand { command_id, .. }
            | SessionError::DuplicateCommand { command_id }
            | SessionError::InvalidArguments { command_id, .. }
            | SessionError::UnboundArguments { command_id }
            | SessionError::MissingMemento { command_id }
            | SessionError::OperationFailed { command_id, .. } => base.with_command_id(command_id),
            SessionError::RootRemoval => base.with_op("remove"),
            SessionError::ExpiredHandle { .. }
            | SessionError::Lifecycle { .. }
            | SessionError::Serialization { .. }
            | SessionError::Config { .. }
            | SessionError::IndexCorrupted { .. }
            | SessionError::LockPoisoned { .. }
            | SessionError::Fatal { .. } => base,
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization {
            message: err.to_string(),
        }
    }
}
