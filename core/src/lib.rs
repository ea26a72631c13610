//! Composable runtime validators for JSON values.
//!
//! Schemas are built once from small combinators and then used to check
//! untrusted [`serde_json::Value`]s:
//!
//! - [`Validator::check`]: a plain yes/no answer. Never fails.
//! - [`Validator::assert`]: the value back on success, otherwise a
//!   [`ValidationError`] naming what was expected, where, and what was found.
//! - [`Validator::construct`]: validate, then deserialize into a typed struct.
//! - [`Validator::compile`]: lower the schema into a single reusable routine
//!   ([`Compiled`]) with the same accept/reject behavior.
//!
//! Recursive schemas are written with [`lazy`] references, usually pointing
//! at a `static` [`LazyLock`](std::sync::LazyLock).
//!
//! # Example
//!
//! ```
//! use cito_core::{SchemaError, any, date, enums, integer, number, object, record, string, tuple};
//! use serde_json::json;
//!
//! let launch = object([
//!     ("id", integer()),
//!     ("name", string()),
//!     ("kind", enums(["crewed", "cargo"])?),
//!     ("window", tuple([number(), number()])?),
//!     ("scheduled", date()),
//!     ("extra", record(any()).optional()),
//! ])?;
//!
//! let value = json!({
//!     "id": 7,
//!     "name": "Demo-2",
//!     "kind": "crewed",
//!     "window": [0.5, 2.0],
//!     "scheduled": "2020-05-30T15:22:00-04:00",
//! });
//! assert!(launch.check(&value));
//! assert!(launch.compile().unwrap().check(&value));
//!
//! let err = launch.assert(&json!({"id": 7, "name": 3})).unwrap_err();
//! assert_eq!(err.to_string(), "Expected string @ name (got 3)");
//! # Ok::<(), SchemaError>(())
//! ```

pub mod combinators;
mod compile;
mod config;
mod context;
mod error;
mod rules;
mod validator;
mod value;

pub use combinators::*;
pub use compile::Compiled;
pub use config::{DEFAULT_MAX_DEPTH, DEFAULT_PREVIEW_LEN, ValidationConfig};
pub use context::{Context, Path, PathSegment, Segment};
pub use error::{CitoError, CompileError, Result, SchemaError, ValidationError};
pub use rules::DateTimeRule;
pub use validator::{Rule, Validator};
pub use value::{Container, Literal, Primitive};
