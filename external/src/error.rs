//! Fatal error channel for external functions.
//!
//! Anything returned here terminates the call: no envelope is produced.
//! Recoverable conditions (missing capability, nothing to remove) are
//! reported as [`crate::Warning`]s instead.

use thiserror::Error;

use crate::lang::StringManager;

/// Result type for the contract layer.
pub type Result<T> = std::result::Result<T, ExternalError>;

/// Error category, used by transports to pick a wire error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input: unknown key, missing field, failed coercion.
    InvalidInput,
    /// A referenced entity (assignment, course module, user) does not exist.
    NotFound,
    /// A site feature needed by the function is switched off.
    FeatureDisabled,
    /// The caller could not be identified.
    AccessDenied,
    /// The function produced output that does not match its declaration,
    /// or a collaborator failed unexpectedly.
    Internal,
}

impl ErrorCategory {
    /// Machine-readable code for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::FeatureDisabled => "FEATURE_DISABLED",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExternalError {
    #[error("invalid parameter value detected ({path}: {reason})")]
    InvalidParameter { path: String, reason: String },

    #[error("missing required parameter: {path}")]
    MissingParameter { path: String },

    #[error("invalid response value detected ({path}: {reason})")]
    InvalidResponse { path: String, reason: String },

    #[error("can't find data record in database table {table} (id {id})")]
    RecordNotFound { table: &'static str, id: String },

    #[error("{message}")]
    Exception {
        category: ErrorCategory,
        errorcode: String,
        component: String,
        message: String,
    },

    #[error("invalid token - token not found")]
    InvalidToken,

    #[error("can't find function {name}")]
    UnknownFunction { name: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExternalError {
    /// Build a localized exception, mirroring `throw new exception($code, $component)`.
    pub fn exception(
        category: ErrorCategory,
        errorcode: &str,
        component: &str,
        strings: &dyn StringManager,
    ) -> Self {
        Self::Exception {
            category,
            errorcode: errorcode.to_string(),
            component: component.to_string(),
            message: strings.get_string(errorcode, component),
        }
    }

    pub fn invalid_parameter(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn record_not_found(table: &'static str, id: impl ToString) -> Self {
        Self::RecordNotFound {
            table,
            id: id.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidParameter { .. } | Self::MissingParameter { .. } => {
                ErrorCategory::InvalidInput
            }
            Self::RecordNotFound { .. } | Self::UnknownFunction { .. } => ErrorCategory::NotFound,
            Self::Exception { category, .. } => *category,
            Self::InvalidToken => ErrorCategory::AccessDenied,
            Self::InvalidResponse { .. } | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Stable error code sent to clients alongside the message.
    pub fn errorcode(&self) -> &str {
        match self {
            Self::InvalidParameter { .. } => "invalidparameter",
            Self::MissingParameter { .. } => "missingparam",
            Self::InvalidResponse { .. } => "invalidresponse",
            Self::RecordNotFound { .. } => "invalidrecord",
            Self::Exception { errorcode, .. } => errorcode,
            Self::InvalidToken => "invalidtoken",
            Self::UnknownFunction { .. } => "invalidfunction",
            Self::Internal(_) => "internalerror",
        }
    }

    /// Component whose string table owns the error code.
    pub fn component(&self) -> &str {
        match self {
            Self::Exception { component, .. } => component,
            Self::InvalidToken | Self::UnknownFunction { .. } => "webservice",
            _ => "core",
        }
    }
}
