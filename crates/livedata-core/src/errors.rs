use livedata_core_types::{SessionId, TraceId};
use thiserror::Error;

/// Result type alias using LiveDataError
pub type Result<T> = std::result::Result<T, LiveDataError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and responses handed to subscription consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Document
    /// The query document could not be parsed
    InvalidDocument,
    /// The query document selects a field the schema does not define
    UnknownField,

    // Snapshot integrity
    /// Two entities in one collection share an id
    DuplicateEntityId,

    // Execution
    /// A resolver failed in a way that invalidates the whole result
    ExecutionFailed,

    // Configuration
    InvalidConfig,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidDocument => "ERR_INVALID_DOCUMENT",
            ExErrorKind::UnknownField => "ERR_UNKNOWN_FIELD",
            ExErrorKind::DuplicateEntityId => "ERR_DUPLICATE_ENTITY_ID",
            ExErrorKind::ExecutionFailed => "ERR_EXECUTION_FAILED",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context for
/// debugging. `ExError` is `Clone + PartialEq` because it travels inside the
/// items a live subscription delivers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    session_id: Option<SessionId>,
    trace_id: Option<TraceId>,
    path: Option<Vec<String>>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            session_id: None,
            trace_id: None,
            path: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add session ID context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add the response path the error refers to
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = Some(path);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the session ID context, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the response path, if any
    pub fn path(&self) -> Option<&[String]> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
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
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.join("."))?;
        }
        if let Some(session_id) = &self.session_id {
            write!(f, " (session_id: {})", session_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for livedata operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiveDataError {
    // ===== Snapshot Errors =====
    /// Two entities in the same collection share an id
    #[error("Duplicate id {entity_id} in collection {collection}")]
    DuplicateEntityId {
        collection: String,
        entity_id: String,
    },

    // ===== Document Errors =====
    /// Query document failed to parse
    #[error("Syntax error at offset {offset}: {reason}")]
    DocumentSyntax { offset: usize, reason: String },

    /// Query document selects a field the type does not define
    #[error("Cannot query field \"{field}\" on type \"{type_name}\"")]
    UnknownField { type_name: String, field: String },

    /// An object-typed field was selected without a sub-selection
    #[error("Field \"{field}\" of type \"{type_name}\" must have a selection of subfields")]
    MissingSubselection { type_name: String, field: String },

    /// A scalar field was given a sub-selection
    #[error("Field \"{field}\" must not have a selection since type \"{type_name}\" has no subfields")]
    UnexpectedSubselection { type_name: String, field: String },

    /// Two selections share a response key but select different things
    #[error("Fields \"{key}\" on type \"{type_name}\" conflict: they select different fields or subfields under the same response key")]
    ConflictingResponseKey { type_name: String, key: String },

    // ===== Execution Errors =====
    /// A resolver failed fatally
    #[error("Resolver failed at {path}: {reason}")]
    ResolverFailed { path: String, reason: String },

    // ===== Configuration Errors =====
    /// Configuration text could not be parsed or holds invalid values
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Configuration file could not be read
    #[error("Cannot read configuration {path}: {reason}")]
    ConfigIo { path: String, reason: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from LiveDataError to ExError
impl From<LiveDataError> for ExError {
    fn from(err: LiveDataError) -> Self {
        match err {
            LiveDataError::DuplicateEntityId {
                collection,
                entity_id,
            } => ExError::new(ExErrorKind::DuplicateEntityId)
                .with_entity_id(entity_id)
                .with_path(vec![collection.clone()])
                .with_message(format!("Duplicate id in collection {}", collection)),

            LiveDataError::DocumentSyntax { offset, reason } => {
                ExError::new(ExErrorKind::InvalidDocument)
                    .with_op("parse_document")
                    .with_message(format!("Syntax error at offset {}: {}", offset, reason))
            }

            err @ LiveDataError::UnknownField { .. } => ExError::new(ExErrorKind::UnknownField)
                .with_op("validate_document")
                .with_message(err.to_string()),

            err @ (LiveDataError::MissingSubselection { .. }
            | LiveDataError::UnexpectedSubselection { .. }
            | LiveDataError::ConflictingResponseKey { .. }) => {
                ExError::new(ExErrorKind::InvalidDocument)
                    .with_op("validate_document")
                    .with_message(err.to_string())
            }

            LiveDataError::ResolverFailed { path, reason } => {
                ExError::new(ExErrorKind::ExecutionFailed)
                    .with_op("query_execute")
                    .with_path(path.split('.').map(str::to_string).collect())
                    .with_message(reason)
            }

            LiveDataError::InvalidConfig { reason } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(reason)
            }

            LiveDataError::ConfigIo { path, reason } => ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("{}: {}", path, reason)),

            LiveDataError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            LiveDataError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to LiveDataError
impl From<serde_json::Error> for LiveDataError {
    fn from(err: serde_json::Error) -> Self {
        LiveDataError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from toml::de::Error to LiveDataError
impl From<toml::de::Error> for LiveDataError {
    fn from(err: toml::de::Error) -> Self {
        LiveDataError::InvalidConfig {
            reason: err.to_string(),
        }
    }
}
