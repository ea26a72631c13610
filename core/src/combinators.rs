//! Schema constructors.
//!
//! Every function here is a pure constructor: arguments are never
//! modified, and the result is a new, immutable [`Validator`]. Constructors
//! that can be given a malformed definition return a [`SchemaError`]
//! instead of producing a validator that could never behave sensibly.
//!
//! # Examples
//!
//! ```
//! use cito_core::{SchemaError, any, array, date, enums, nullable, number, object, record, string, tuple};
//! use serde_json::json;
//!
//! let launch = object([
//!     ("mission_name", string()),
//!     ("launch_date_local", date()),
//!     ("links", object([("article_link", nullable(string()))])?),
//!     ("tags", array(enums(["crewed", "cargo"])?)),
//!     ("site", tuple([number(), number()])?),
//!     ("extra", record(any()).optional()),
//! ])?;
//!
//! assert!(launch.check(&json!({
//!     "mission_name": "Demo-2",
//!     "launch_date_local": "2020-05-30T15:22:00-04:00",
//!     "links": {"article_link": null},
//!     "tags": ["crewed"],
//!     "site": [28.6, -80.6],
//! })));
//! # Ok::<(), SchemaError>(())
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::rules::DateTimeRule;
use crate::validator::{LazyRef, NodeKind, Rule, Validator};
use crate::value::{Container, Literal, Primitive};

/// Accepts any string.
pub fn string() -> Validator {
    Validator::new(NodeKind::Primitive(Primitive::String))
}

/// Accepts any number.
pub fn number() -> Validator {
    Validator::new(NodeKind::Primitive(Primitive::Number))
}

/// Accepts numbers without a fractional part.
pub fn integer() -> Validator {
    Validator::new(NodeKind::Primitive(Primitive::Integer))
}

/// Accepts `true` and `false`.
pub fn boolean() -> Validator {
    Validator::new(NodeKind::Primitive(Primitive::Boolean))
}

/// Accepts everything, including a missing value.
pub fn any() -> Validator {
    Validator::new(NodeKind::Primitive(Primitive::Any))
}

/// Alias of [`any`].
pub fn unknown() -> Validator {
    any()
}

/// Accepts RFC 3339 timestamps such as `"2024-01-15T10:30:00Z"`.
pub fn date() -> Validator {
    string().and(custom(DateTimeRule))
}

/// Accepts exactly `null`.
pub fn null() -> Validator {
    literal(Literal::Null)
}

/// Accepts only a missing value.
pub fn undefined() -> Validator {
    literal(Literal::Undefined)
}

/// Accepts values strictly equal to `value`.
pub fn literal(value: impl Into<Literal>) -> Validator {
    Validator::new(NodeKind::Literal(value.into()))
}

/// Accepts any value of the given container kind, without looking inside.
pub fn instance(kind: Container) -> Validator {
    Validator::new(NodeKind::Instance(kind))
}

/// Accepts values matching both `a` and `b`.
pub fn and(a: Validator, b: Validator) -> Validator {
    a.and(b)
}

/// Accepts values matching `a` or `b`; `b` is only tried if `a` fails.
pub fn or(a: Validator, b: Validator) -> Validator {
    a.or(b)
}

/// `or(null(), inner)`.
pub fn nullable(inner: Validator) -> Validator {
    inner.nullable()
}

/// `or(undefined(), inner)`.
pub fn optional(inner: Validator) -> Validator {
    inner.optional()
}

/// Accepts arrays whose every element matches `item`.
pub fn array(item: Validator) -> Validator {
    Validator::new(NodeKind::Array(item))
}

/// Accepts objects whose every value matches `item`.
pub fn record(item: Validator) -> Validator {
    Validator::new(NodeKind::Record(item))
}

/// Accepts arrays of exactly as many elements as `positions`, each matching
/// the validator at the same position.
///
/// # Errors
///
/// Returns [`SchemaError::EmptyTuple`] if `positions` is empty.
pub fn tuple(positions: impl IntoIterator<Item = Validator>) -> Result<Validator, SchemaError> {
    let positions: Vec<Validator> = positions.into_iter().collect();
    if positions.is_empty() {
        return Err(SchemaError::EmptyTuple);
    }
    Ok(Validator::new(NodeKind::Tuple(positions)))
}

/// Accepts objects whose declared fields match, in declaration order.
///
/// Fields the schema does not declare are ignored. A declared field that is
/// absent is checked as a missing value, so it only passes if its validator
/// is [`optional`].
///
/// # Errors
///
/// Returns [`SchemaError::DuplicateField`] if a field name repeats.
pub fn object<K>(fields: impl IntoIterator<Item = (K, Validator)>) -> Result<Validator, SchemaError>
where
    K: Into<Arc<str>>,
{
    let mut seen: HashSet<Arc<str>> = HashSet::new();
    let mut declared = Vec::new();
    for (key, validator) in fields {
        let key: Arc<str> = key.into();
        if !seen.insert(Arc::clone(&key)) {
            return Err(SchemaError::DuplicateField(key.to_string()));
        }
        declared.push((key, validator));
    }
    Ok(Validator::new(NodeKind::Object(declared)))
}

/// Accepts values matching any alternative, tried in order.
///
/// # Errors
///
/// Returns [`SchemaError::EmptyUnion`] if `alternatives` is empty.
pub fn union(alternatives: impl IntoIterator<Item = Validator>) -> Result<Validator, SchemaError> {
    let alternatives: Vec<Validator> = alternatives.into_iter().collect();
    if alternatives.is_empty() {
        return Err(SchemaError::EmptyUnion);
    }
    Ok(Validator::new(NodeKind::Union(alternatives)))
}

/// Accepts values strictly equal to one of `members`.
///
/// # Errors
///
/// Returns [`SchemaError::EmptyEnum`] if `members` is empty.
pub fn enums<L>(members: impl IntoIterator<Item = L>) -> Result<Validator, SchemaError>
where
    L: Into<Literal>,
{
    let members: Vec<Literal> = members.into_iter().map(Into::into).collect();
    if members.is_empty() {
        return Err(SchemaError::EmptyEnum);
    }
    Ok(Validator::new(NodeKind::Enum(members)))
}

/// Defers building a validator until it is first used.
///
/// `factory` runs at most once; its result is kept for every later call.
/// Returning a clone of a shared validator from the factory is what lets a
/// schema refer to itself:
///
/// ```
/// use std::sync::LazyLock;
///
/// use cito_core::{lazy, object, string, Validator};
/// use serde_json::json;
///
/// static NODE: LazyLock<Validator> = LazyLock::new(|| {
///     object([
///         ("data", string()),
///         ("next", lazy(|| NODE.clone()).optional()),
///     ])
///     .unwrap()
/// });
///
/// assert!(NODE.check(&json!({"data": "a", "next": {"data": "b"}})));
/// assert!(!NODE.check(&json!({"data": "a", "next": {"data": 1}})));
/// ```
pub fn lazy<F>(factory: F) -> Validator
where
    F: Fn() -> Validator + Send + Sync + 'static,
{
    Validator::new(NodeKind::Lazy(LazyRef::new(Box::new(factory))))
}

/// Wraps a user-defined [`Rule`].
pub fn custom<R>(rule: R) -> Validator
where
    R: Rule + 'static,
{
    Validator::new(NodeKind::Custom(Arc::new(rule)))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_primitives() {
        assert!(string().check(&json!("hello")));
        assert!(!string().check(&json!(123)));
        assert!(number().check(&json!(123)));
        assert!(!number().check(&json!("hello")));
        assert!(boolean().check(&json!(true)));
        assert!(!boolean().check(&json!("hello")));
        assert!(integer().check(&json!(123)));
        assert!(!integer().check(&json!(1.5)));
        assert!(any().check(&Value::Null));
        assert!(unknown().check_opt(None));
    }

    #[test]
    fn test_dates() {
        assert!(date().check(&json!("2024-01-15T10:30:00Z")));
        assert!(!date().check(&json!("hello")));
        assert!(!date().check(&json!(1_700_000_000)));
    }

    #[test]
    fn test_arrays() {
        assert!(!array(string()).check(&json!("hello")));
        assert!(array(string()).check(&json!(["hello", "world"])));
        assert!(!array(string()).check(&json!(["hello", 123])));
        assert!(array(number()).check(&json!([123, 456])));
        assert!(!array(number()).check(&json!([123, "hello"])));
        assert!(array(number()).check(&json!([])));
    }

    #[test]
    fn test_records() {
        assert!(record(string()).check(&json!({"hello": "world"})));
        assert!(!record(string()).check(&json!({"hello": 123})));
        assert!(record(number()).check(&json!({"hello": 123})));
        assert!(!record(number()).check(&json!({"hello": 123, "second": true})));
        assert!(!record(number()).check(&json!([1, 2])));
    }

    #[test]
    fn test_objects() {
        let schema = object([("hello", string()), ("world", number())]).unwrap();
        assert!(schema.check(&json!({"hello": "world", "world": 123})));
        assert!(!schema.check(&json!({"hello": "world", "world": "hello"})));
        assert!(!schema.check(&json!(["hello", 123])));
    }

    #[test]
    fn test_objects_ignore_extra_fields() {
        let schema = object([("id", integer())]).unwrap();
        assert!(schema.check(&json!({"id": 1, "name": "extra", "nested": {"x": []}})));
    }

    #[test]
    fn test_empty_object_schema_accepts_any_object() {
        let schema = object(Vec::<(&str, Validator)>::new()).unwrap();
        assert!(schema.check(&json!({"a": 1})));
        assert!(!schema.check(&json!(1)));
    }

    #[test]
    fn test_unions() {
        let schema = union([string(), number()]).unwrap();
        assert!(schema.check(&json!("hello")));
        assert!(schema.check(&json!(123)));
        assert!(!schema.check(&json!(true)));
    }

    #[test]
    fn test_enums() {
        let schema = enums(["hello", "world"]).unwrap();
        assert!(schema.check(&json!("hello")));
        assert!(!schema.check(&json!("other")));
        assert_eq!(schema.describe(), r#""hello" | "world""#);

        let numbers = enums([1, 2, 3]).unwrap();
        assert!(numbers.check(&json!(2.0)));
        assert!(!numbers.check(&json!("2")));
    }

    #[test]
    fn test_literals() {
        assert!(literal("on").check(&json!("on")));
        assert!(!literal("on").check(&json!("off")));
        assert!(null().check(&Value::Null));
        assert!(!null().check_opt(None));
        assert!(undefined().check_opt(None));
        assert!(!undefined().check(&Value::Null));
    }

    #[test]
    fn test_nullable_and_optional() {
        assert!(nullable(string()).check(&Value::Null));
        assert!(nullable(string()).check(&json!("x")));
        assert!(!nullable(string()).check_opt(None));
        assert!(optional(string()).check_opt(None));
        assert!(!optional(string()).check(&Value::Null));

        let schema = object([("nick", optional(string()))]).unwrap();
        assert!(schema.check(&json!({})));
        assert!(!schema.check(&json!({"nick": 3})));
    }

    #[test]
    fn test_instance() {
        assert!(instance(Container::Array).check(&json!([1, "mixed"])));
        assert!(instance(Container::Object).check(&json!({"k": null})));
        assert!(!instance(Container::Object).check(&json!([])));
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(union(Vec::new()).unwrap_err(), SchemaError::EmptyUnion);
        assert_eq!(tuple(Vec::new()).unwrap_err(), SchemaError::EmptyTuple);
        assert_eq!(
            enums(Vec::<Literal>::new()).unwrap_err(),
            SchemaError::EmptyEnum
        );
        assert_eq!(
            object([("a", string()), ("a", number())]).unwrap_err(),
            SchemaError::DuplicateField("a".into())
        );
    }

    #[test]
    fn test_combinators_do_not_mutate_arguments() {
        let base = string();
        let widened = base.clone().nullable();
        assert!(!base.check(&Value::Null));
        assert!(widened.check(&Value::Null));
        assert!(!widened.ptr_eq(&base));
    }

    #[test]
    fn test_lazy_memoizes_factory() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let schema = lazy(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            number()
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        assert!(schema.check(&json!(1)));
        assert!(!schema.check(&json!("1")));
        assert!(schema.check(&json!(2)));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
