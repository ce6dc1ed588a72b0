//! `lms-external`: contract layer for LMS web-service external functions.
//!
//! Every external function follows the same pipeline:
//!
//! 1. **Validate** caller arguments against the input [`Description`]
//!    (unknown keys rejected, defaults filled, values coerced).
//! 2. **Check** structural preconditions (fatal [`ExternalError`]) and
//!    authorization preconditions (non-fatal [`Warning`]s).
//! 3. **Delegate** to a domain collaborator.
//! 4. **Shape** a [`ResultEnvelope`] and clean it against the output
//!    [`Description`], dropping anything undeclared.
//!
//! Functions are registered in a [`FunctionRegistry`], which owns the
//! validate → execute → clean sequence so individual functions only
//! implement step 2 and 3.

pub mod context;
pub mod envelope;
pub mod error;
pub mod function;
pub mod lang;
pub mod schema;
pub mod validate;

pub use context::{CapabilitySet, ContextLevel, ContextPath, FeatureFlags, RequestContext};
pub use envelope::{BatchOutcome, Outcome, ResultEnvelope, StatusOnly, Warning};
pub use error::{ErrorCategory, ExternalError, Result};
pub use function::{ExternalFunction, FunctionInfo, FunctionRegistry, ValidatedArgs};
pub use lang::{LangStrings, StringManager};
pub use schema::{Description, Field, ParamType, Presence};
pub use validate::{clean_return_value, validate_parameters};
