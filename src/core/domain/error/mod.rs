use std::time::Duration;
use thiserror::Error;

/// The main error type for guest lifecycle operations.
///
/// This enum represents every failure the lifecycle core can surface:
/// configuration problems, name resolution failures, control-plane
/// rejections, timeouts and fleet registry bookkeeping errors.
#[derive(Error, Debug)]
pub enum CunikError {
    /// A required key is absent from a guest configuration map
    ///
    /// # Fields
    /// * `field` - The name of the missing key
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    /// A domain configuration was serialized before its required fields were set
    ///
    /// # Fields
    /// * `missing` - The names of the unset fields, in declaration order
    #[error("Incomplete domain configuration, missing: {}", missing.join(", "))]
    IncompleteConfig { missing: Vec<&'static str> },

    /// A logical image or volume name could not be resolved to a path
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(#[from] ResolveError),

    /// The control plane refused to define a domain
    ///
    /// # Fields
    /// * `domain` - The domain name that was being defined
    /// * `source` - The control-plane diagnostic
    #[error("Definition of domain '{domain}' failed: {source}")]
    Definition {
        domain: String,
        source: ControlPlaneError,
    },

    /// The control plane rejected a lifecycle command
    ///
    /// # Fields
    /// * `operation` - The command that was rejected
    /// * `source` - The control-plane diagnostic
    #[error("Lifecycle operation '{operation}' failed: {source}")]
    Lifecycle {
        operation: Operation,
        source: ControlPlaneError,
    },

    /// The control plane could not be reached
    #[error("Connection error: {0}")]
    Connection(ControlPlaneError),

    /// A control-plane call did not complete within the configured deadline
    #[error("Control-plane call '{operation}' timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },

    /// An operation was attempted on a guest that can no longer accept it
    #[error("Guest {guest} cannot {operation} while {status}")]
    InvalidState {
        guest: String,
        operation: &'static str,
        status: String,
    },

    /// The fleet registry failed to record a transition
    #[error("Fleet registry error: {0}")]
    Registry(String),

    /// Represents validation failures with detailed context
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Failure to resolve a logical name through one of the registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown image '{0}'")]
    UnknownImage(String),

    #[error("unknown data volume '{0}'")]
    UnknownVolume(String),
}

/// Diagnostic reported by a hypervisor control-plane collaborator.
///
/// `code` carries the control plane's native error number when it has one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ControlPlaneError {
    pub message: String,
    pub code: Option<i32>,
}

impl ControlPlaneError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

/// A single round trip to the hypervisor control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Define,
    Close,
    IsActive,
    Create,
    Resume,
    Suspend,
    Destroy,
    Undefine,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Connect => "connect",
            Operation::Define => "define",
            Operation::Close => "close",
            Operation::IsActive => "is_active",
            Operation::Create => "create",
            Operation::Resume => "resume",
            Operation::Suspend => "suspend",
            Operation::Destroy => "destroy",
            Operation::Undefine => "undefine",
        };
        f.write_str(name)
    }
}

/// Type alias for Results that may fail with a CunikError
pub type CunikResult<T> = Result<T, CunikError>;
