//! The validator model and its interpreter.
//!
//! A [`Validator`] is a cheap, cloneable handle to an immutable node. Nodes
//! form a tree (or, through lazy references, a graph) built once from the
//! functions in [`combinators`](crate::combinators) and shared read-only by
//! every caller. Identity matters: two handles are the same schema only if
//! they point at the same node, and the compiled routine is cached per node.
//!
//! # Examples
//!
//! ```
//! use cito_core::{array, number, object, string};
//! use serde_json::json;
//!
//! let schema = object([
//!     ("a", string()),
//!     ("b", number()),
//!     ("items", array(string())),
//! ])
//! .unwrap();
//!
//! assert!(schema.check(&json!({"a": "x", "b": 1, "items": ["y", "z"]})));
//!
//! let err = schema.assert(&json!({"a": "x", "b": 1, "items": ["y", 2]})).unwrap_err();
//! assert_eq!(err.to_string(), "Expected string @ items[1] (got 2)");
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::combinators::{custom, literal};
use crate::compile::Routine;
use crate::config::ValidationConfig;
use crate::context::{Context, Failure, Fault};
use crate::error::{CompileError, Result, SchemaError};
use crate::rules::FnRule;
use crate::value::{Container, Literal, Primitive};

/// How many levels of nesting a description spells out before eliding.
const DESCRIBE_DEPTH: usize = 4;

/// A user-defined membership test.
///
/// Implement this to plug a check the built-in combinators cannot express
/// into a schema with [`custom`](crate::custom). A rule that returns `None`
/// from [`generate`](Rule::generate) can still be interpreted, but makes
/// every schema containing it uncompilable.
///
/// # Examples
///
/// ```
/// use cito_core::{custom, Rule};
/// use serde_json::{json, Value};
///
/// struct Even;
///
/// impl Rule for Even {
///     fn describe(&self) -> String {
///         "even number".into()
///     }
///     fn test(&self, value: &Value) -> bool {
///         value.as_i64().is_some_and(|n| n % 2 == 0)
///     }
///     fn generate(&self, reference: &str) -> Option<String> {
///         Some(format!("is_even({reference})"))
///     }
/// }
///
/// let schema = custom(Even);
/// assert!(schema.check(&json!(4)));
/// assert!(schema.compile().unwrap().check(&json!(4)));
/// ```
pub trait Rule: Send + Sync {
    /// Short description of the accepted values, used in diagnostics.
    fn describe(&self) -> String;

    /// Returns `true` if `value` is accepted. Missing values are always
    /// rejected before this is called.
    fn test(&self, value: &Value) -> bool;

    /// Renders the rule as an expression over `reference`, or `None` if the
    /// rule cannot take part in a compiled routine.
    fn generate(&self, reference: &str) -> Option<String> {
        let _ = reference;
        None
    }
}

/// Handle to an immutable validator node.
///
/// Cloning is cheap and preserves identity.
#[derive(Clone)]
pub struct Validator(Arc<Node>);

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) compiled: OnceLock<std::result::Result<Arc<Routine>, CompileError>>,
}

pub(crate) enum NodeKind {
    Primitive(Primitive),
    Literal(Literal),
    Instance(Container),
    And(Validator, Validator),
    Or(Validator, Validator),
    Array(Validator),
    Record(Validator),
    Tuple(Vec<Validator>),
    Object(Vec<(Arc<str>, Validator)>),
    Union(Vec<Validator>),
    Enum(Vec<Literal>),
    Lazy(LazyRef),
    Custom(Arc<dyn Rule>),
}

type Factory = Box<dyn Fn() -> Validator + Send + Sync>;

/// A deferred reference, resolved on first use and fixed afterwards.
pub(crate) struct LazyRef {
    factory: Factory,
    resolved: OnceLock<std::result::Result<Validator, SchemaError>>,
}

impl LazyRef {
    pub(crate) fn new(factory: Factory) -> Self {
        Self {
            factory,
            resolved: OnceLock::new(),
        }
    }

    /// The concrete validator behind this reference.
    pub(crate) fn target(&self) -> std::result::Result<&Validator, SchemaError> {
        self.resolved
            .get_or_init(|| self.resolve())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Follows a chain of lazy references down to a concrete validator.
    ///
    /// Other references in the chain are followed through their factories
    /// rather than their cells, so resolution never re-enters a cell that
    /// is still being initialized.
    fn resolve(&self) -> std::result::Result<Validator, SchemaError> {
        let mut visited: Vec<Validator> = Vec::new();
        let mut current = (self.factory)();
        loop {
            let NodeKind::Lazy(next) = current.kind() else {
                debug!(resolved = %current, "Resolved lazy reference");
                return Ok(current);
            };
            let seen = std::ptr::eq(next, self)
                || visited
                    .iter()
                    .any(|v| matches!(v.kind(), NodeKind::Lazy(l) if std::ptr::eq(l, next)));
            if seen {
                warn!("Lazy reference cycle detected");
                return Err(SchemaError::LazyCycle);
            }
            let following = match next.resolved.get() {
                Some(resolved) => resolved.clone()?,
                None => (next.factory)(),
            };
            visited.push(std::mem::replace(&mut current, following));
        }
    }
}

impl Validator {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self(Arc::new(Node {
            kind,
            compiled: OnceLock::new(),
        }))
    }

    pub(crate) fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    /// Returns `true` if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Validator) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Validator that accepts values matching both `self` and `other`.
    pub fn and(self, other: Validator) -> Validator {
        Validator::new(NodeKind::And(self, other))
    }

    /// Validator that accepts values matching `self` or, failing that,
    /// `other`.
    pub fn or(self, other: Validator) -> Validator {
        Validator::new(NodeKind::Or(self, other))
    }

    /// Also accepts `null`.
    pub fn nullable(self) -> Validator {
        literal(Literal::Null).or(self)
    }

    /// Also accepts a missing value.
    pub fn optional(self) -> Validator {
        literal(Literal::Undefined).or(self)
    }

    /// Narrows `self` with an arbitrary predicate.
    ///
    /// The predicate has no generator, so the result cannot be compiled.
    ///
    /// # Examples
    ///
    /// ```
    /// use cito_core::string;
    /// use serde_json::json;
    ///
    /// let slug = string().refine("lowercase string", |v| {
    ///     v.as_str().is_some_and(|s| s.chars().all(|c| !c.is_uppercase()))
    /// });
    /// assert!(slug.check(&json!("hello")));
    /// assert!(!slug.check(&json!("Hello")));
    /// assert!(slug.compile().is_err());
    /// ```
    pub fn refine<F>(self, description: impl Into<String>, predicate: F) -> Validator
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.and(custom(FnRule::new(description, predicate)))
    }

    /// Short human-readable description of the accepted values.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, DESCRIBE_DEPTH);
        out
    }

    fn describe_into(&self, out: &mut String, budget: usize) {
        if budget == 0 {
            out.push_str("...");
            return;
        }
        let inner = budget - 1;
        match self.kind() {
            NodeKind::Primitive(p) => out.push_str(p.name()),
            NodeKind::Literal(lit) => out.push_str(&lit.to_string()),
            NodeKind::Instance(c) => out.push_str(c.name()),
            NodeKind::And(a, b) => {
                a.describe_into(out, inner);
                out.push_str(" & ");
                b.describe_into(out, inner);
            }
            NodeKind::Or(a, b) => {
                a.describe_into(out, inner);
                out.push_str(" | ");
                b.describe_into(out, inner);
            }
            NodeKind::Array(item) => {
                out.push_str("array<");
                item.describe_into(out, inner);
                out.push('>');
            }
            NodeKind::Record(item) => {
                out.push_str("record<");
                item.describe_into(out, inner);
                out.push('>');
            }
            NodeKind::Tuple(positions) => {
                out.push('[');
                for (i, position) in positions.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    position.describe_into(out, inner);
                }
                out.push(']');
            }
            NodeKind::Object(_) => out.push_str("object"),
            NodeKind::Union(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    alternative.describe_into(out, inner);
                }
            }
            NodeKind::Enum(members) => {
                let rendered: Vec<String> = members.iter().map(Literal::to_string).collect();
                out.push_str(&rendered.join(" | "));
            }
            NodeKind::Lazy(lazy) => match lazy.target() {
                Ok(target) => target.describe_into(out, inner),
                Err(_) => out.push_str("<unresolved>"),
            },
            NodeKind::Custom(rule) => out.push_str(&rule.describe()),
        }
    }

    /// Membership test against a (possibly missing) value, recording
    /// diagnostics in `ctx`.
    ///
    /// This is the primitive every entry point is built on; most callers
    /// want [`check`](Self::check) or [`assert`](Self::assert) instead.
    pub fn test<'a>(&'a self, value: Option<&'a Value>, ctx: &mut Context<'a>) -> bool {
        if ctx.is_faulted() {
            return false;
        }
        let ok = match self.kind() {
            NodeKind::Primitive(p) => p.matches(value),
            NodeKind::Literal(lit) => lit.matches(value),
            NodeKind::Instance(c) => c.matches(value),
            NodeKind::Enum(members) => members.iter().any(|m| m.matches(value)),
            NodeKind::Custom(rule) => value.is_some_and(|v| rule.test(v)),
            NodeKind::And(a, b) => return a.test(value, ctx) && b.test(value, ctx),
            NodeKind::Or(a, b) => return a.test(value, ctx) || b.test(value, ctx),
            NodeKind::Array(item) => return self.test_array(item, value, ctx),
            NodeKind::Record(item) => return self.test_record(item, value, ctx),
            NodeKind::Tuple(positions) => return self.test_tuple(positions, value, ctx),
            NodeKind::Object(fields) => return self.test_object(fields, value, ctx),
            NodeKind::Union(alternatives) => return self.test_union(alternatives, value, ctx),
            NodeKind::Lazy(lazy) => return test_lazy(lazy, value, ctx),
        };
        if !ok {
            ctx.expect(self, value);
        }
        ok
    }

    fn test_array<'a>(
        &'a self,
        item: &'a Validator,
        value: Option<&'a Value>,
        ctx: &mut Context<'a>,
    ) -> bool {
        let Some(Value::Array(items)) = value else {
            ctx.expect(self, value);
            return false;
        };
        for (i, element) in items.iter().enumerate() {
            ctx.index(i);
            let ok = item.test(Some(element), ctx);
            ctx.back();
            if !ok {
                return false;
            }
        }
        true
    }

    fn test_record<'a>(
        &'a self,
        item: &'a Validator,
        value: Option<&'a Value>,
        ctx: &mut Context<'a>,
    ) -> bool {
        let Some(Value::Object(map)) = value else {
            ctx.expect(self, value);
            return false;
        };
        for (key, entry) in map {
            ctx.at(key);
            let ok = item.test(Some(entry), ctx);
            ctx.back();
            if !ok {
                return false;
            }
        }
        true
    }

    fn test_tuple<'a>(
        &'a self,
        positions: &'a [Validator],
        value: Option<&'a Value>,
        ctx: &mut Context<'a>,
    ) -> bool {
        let items = match value {
            Some(Value::Array(items)) if items.len() == positions.len() => items,
            _ => {
                ctx.expect(self, value);
                return false;
            }
        };
        for (i, (position, element)) in positions.iter().zip(items).enumerate() {
            ctx.index(i);
            let ok = position.test(Some(element), ctx);
            ctx.back();
            if !ok {
                return false;
            }
        }
        true
    }

    fn test_object<'a>(
        &'a self,
        fields: &'a [(Arc<str>, Validator)],
        value: Option<&'a Value>,
        ctx: &mut Context<'a>,
    ) -> bool {
        let Some(Value::Object(map)) = value else {
            ctx.expect(self, value);
            return false;
        };
        for (key, field) in fields {
            ctx.at(key);
            let ok = field.test(map.get(&**key), ctx);
            ctx.back();
            if !ok {
                return false;
            }
        }
        true
    }

    /// Tries each alternative from the same starting depth.
    ///
    /// When all fail, the failure that reached deepest is reported (the
    /// earliest one on a tie). If none got below the union itself, the
    /// union reports its own expectation.
    fn test_union<'a>(
        &'a self,
        alternatives: &'a [Validator],
        value: Option<&'a Value>,
        ctx: &mut Context<'a>,
    ) -> bool {
        let start = ctx.depth();
        let prior = ctx.take_failure();
        let mut best: Option<Failure<'a>> = None;
        for alternative in alternatives {
            if alternative.test(value, ctx) {
                ctx.set_failure(prior);
                return true;
            }
            ctx.reset_to(start);
            if ctx.is_faulted() {
                return false;
            }
            if let Some(failure) = ctx.take_failure() {
                if best.as_ref().is_none_or(|b| failure.depth() > b.depth()) {
                    best = Some(failure);
                }
            }
        }
        match best {
            Some(failure) if failure.depth() > start => ctx.set_failure(Some(failure)),
            _ => ctx.expect(self, value),
        }
        false
    }

    /// Returns `true` if `value` matches. Never fails.
    pub fn check(&self, value: &Value) -> bool {
        self.check_opt(Some(value))
    }

    /// Like [`check`](Self::check), for a value that may be missing.
    pub fn check_opt(&self, value: Option<&Value>) -> bool {
        self.check_opt_with(value, &ValidationConfig::default())
    }

    /// Like [`check`](Self::check), with explicit limits.
    pub fn check_with(&self, value: &Value, config: &ValidationConfig) -> bool {
        self.check_opt_with(Some(value), config)
    }

    fn check_opt_with(&self, value: Option<&Value>, config: &ValidationConfig) -> bool {
        let mut ctx = Context::untracked(config);
        self.test(value, &mut ctx)
    }

    /// Returns `value` unchanged if it matches, or the diagnostic for the
    /// most specific mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`CitoError::Validation`](crate::CitoError::Validation) on a
    /// mismatch, [`CitoError::DepthLimitExceeded`](crate::CitoError::DepthLimitExceeded)
    /// if recursion went too deep, or [`CitoError::Schema`](crate::CitoError::Schema)
    /// if a lazy reference cannot be resolved.
    pub fn assert<'v>(&self, value: &'v Value) -> Result<&'v Value> {
        self.assert_with(value, &ValidationConfig::default())
    }

    /// Like [`assert`](Self::assert), with explicit limits.
    pub fn assert_with<'v>(&self, value: &'v Value, config: &ValidationConfig) -> Result<&'v Value> {
        self.run(Some(value), config)?;
        Ok(value)
    }

    /// Like [`assert`](Self::assert), for a value that may be missing.
    pub fn assert_opt(&self, value: Option<&Value>) -> Result<()> {
        self.run(value, &ValidationConfig::default())
    }

    /// Validates `value` and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Everything [`assert`](Self::assert) returns, plus
    /// [`CitoError::JsonError`](crate::CitoError::JsonError) if the accepted
    /// value does not fit `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cito_core::{number, object, string};
    /// use serde::Deserialize;
    /// use serde_json::json;
    ///
    /// #[derive(Deserialize)]
    /// struct Point {
    ///     label: String,
    ///     x: f64,
    /// }
    ///
    /// let schema = object([("label", string()), ("x", number())]).unwrap();
    /// let point: Point = schema.construct(json!({"label": "p", "x": 1.5})).unwrap();
    /// assert_eq!(point.label, "p");
    /// assert_eq!(point.x, 1.5);
    /// ```
    pub fn construct<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        self.construct_with(value, &ValidationConfig::default())
    }

    /// Like [`construct`](Self::construct), with explicit limits.
    pub fn construct_with<T: DeserializeOwned>(
        &self,
        value: Value,
        config: &ValidationConfig,
    ) -> Result<T> {
        self.run(Some(&value), config)?;
        Ok(serde_json::from_value(value)?)
    }

    fn run(&self, value: Option<&Value>, config: &ValidationConfig) -> Result<()> {
        let mut ctx = Context::new(config);
        if self.test(value, &mut ctx) {
            return Ok(());
        }
        Err(ctx.into_error(self, value))
    }
}

fn test_lazy<'a>(lazy: &'a LazyRef, value: Option<&'a Value>, ctx: &mut Context<'a>) -> bool {
    let target = match lazy.target() {
        Ok(target) => target,
        Err(err) => {
            ctx.fault(Fault::Schema(err));
            return false;
        }
    };
    if !ctx.enter_lazy() {
        return false;
    }
    let ok = target.test(value, ctx);
    ctx.leave_lazy();
    ok
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.describe()).finish()
    }
}
