//! Error types for the domain crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("course {0} not found")]
    CourseNotFound(i64),

    #[error("course module {0} not found")]
    ModuleNotFound(i64),

    #[error("role '{0}' not found")]
    RoleNotFound(String),

    #[error("badge {0} not found")]
    BadgeNotFound(i64),

    #[error("backpack {0} not found")]
    BackpackNotFound(i64),

    #[error("report {0} not found")]
    ReportNotFound(i64),

    #[error("unknown module type '{0}'")]
    UnknownModuleType(String),

    #[error("unknown report source '{0}'")]
    UnknownSource(String),

    #[error("invalid {kind} identifier '{identifier}' for report {reportid}")]
    InvalidIdentifier {
        kind: &'static str,
        identifier: String,
        reportid: i64,
    },

    #[error("duplicate {kind}: {key}")]
    Duplicate { kind: &'static str, key: String },
}

/// Errors raised while building fixtures. A missing property is a coding
/// error in the caller, not a data problem.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Record must contain '{0}' property")]
    MissingProperty(&'static str),

    #[error("property '{property}' is invalid: {reason}")]
    InvalidProperty {
        property: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("failed to read seed {path}: {source}")]
    SeedIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed {path}: {reason}")]
    SeedParse { path: String, reason: String },
}
