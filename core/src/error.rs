//! Error types for schema construction, compilation, and validation.
//!
//! Failures fall into three families that surface at different times:
//!
//! - [`SchemaError`]: the schema itself is malformed. Raised while the
//!   schema is being built (or, for lazy references, on first resolution).
//! - [`CompileError`]: the schema is valid but cannot be lowered into a
//!   compiled routine. Raised once, by [`Validator::compile`](crate::Validator::compile).
//! - [`ValidationError`]: a value does not match the schema. Raised by
//!   `assert`/`construct`, collapsed to `false` by `check`.
//!
//! [`CitoError`] unifies all of them (plus config and deserialization
//! failures) for the top-level entry points.

use thiserror::Error;

use crate::context::Path;

/// A value did not match its schema.
///
/// The `Display` impl renders the single diagnostic line:
///
/// ```text
/// Expected <expected> @ <path> (got <actual>)
/// ```
///
/// The `@ <path>` clause is omitted when the mismatch is at the top level.
///
/// # Examples
///
/// ```
/// use cito_core::{array, object, string};
/// use serde_json::json;
///
/// let schema = object([("items", array(string()))]).unwrap();
/// let err = schema.assert(&json!({"items": ["a", 2]})).unwrap_err();
/// assert_eq!(err.to_string(), "Expected string @ items[1] (got 2)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Expected {expected}{} (got {actual})", display_at(.path))]
pub struct ValidationError {
    /// Location of the mismatch inside the validated value.
    pub path: Path,
    /// Description of what the schema expected at `path`.
    pub expected: String,
    /// Preview of the value actually found at `path`.
    pub actual: String,
}

fn display_at(path: &Path) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" @ {path}")
    }
}

/// Malformed schema definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// `union` was given no alternatives.
    #[error("union must have at least one alternative")]
    EmptyUnion,
    /// `tuple` was given no positions.
    #[error("tuple must have at least one position")]
    EmptyTuple,
    /// `enums` was given no members.
    #[error("enum must have at least one member")]
    EmptyEnum,
    /// An object schema declares the same field twice.
    #[error("duplicate field in object schema: {0}")]
    DuplicateField(String),
    /// A chain of lazy references leads back to itself without ever
    /// reaching a concrete validator.
    #[error("lazy reference resolves to itself")]
    LazyCycle,
}

/// A schema that cannot be lowered into a compiled routine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Some node (usually a custom rule) supplies no generator.
    #[error("no code generator for `{description}`")]
    MissingGenerator {
        /// Description of the node that could not be compiled.
        description: String,
    },
    /// A lazy reference could not be resolved.
    #[error("unresolved lazy reference: {0}")]
    UnresolvedLazy(SchemaError),
}

/// Errors returned by the top-level entry points.
#[derive(Debug, Error)]
pub enum CitoError {
    /// The value did not match the schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Recursive validation went deeper than the configured limit.
    #[error("nesting depth limit of {limit} exceeded{}", display_at(.path))]
    DepthLimitExceeded {
        /// The configured `max_depth`.
        limit: usize,
        /// Where in the value the limit was hit.
        path: Path,
    },

    /// The schema is malformed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The schema cannot be compiled.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// The value matched, but could not be deserialized into the requested type.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure (configuration files).
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// File I/O failure (configuration files).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CitoError {
    /// Returns the validation diagnostic, if this is a value mismatch.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            CitoError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`CitoError`].
pub type Result<T> = std::result::Result<T, CitoError>;
