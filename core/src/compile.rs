//! Ahead-of-time lowering of a validator tree into one reusable routine.
//!
//! Every node contributes a fragment: a closure that answers the node's
//! membership question for "the value at this position", plus the same
//! expression rendered as text over a symbolic reference (`value`,
//! `value.items`, `v0[1]`, ...). Composite nodes nest their children's
//! closures, so the finished routine is a single closure tree that runs
//! without consulting the schema, allocating, or recording diagnostics.
//!
//! The rendered text is kept for inspection ([`Compiled::source`]) and
//! logging only; nothing ever evaluates it.
//!
//! Assembly happens once per schema node. The result (or the reason the
//! schema cannot be compiled) is cached on the node, so later calls to
//! [`Validator::compile`] on the same handle are cheap.
//!
//! # Recursive schemas
//!
//! A lazy reference whose target is a schema already being expanded (an
//! ancestor, compared by identity) is not expanded again. Its fragment
//! hands the value back to the interpreter for that sub-part, resuming at
//! the current lazy depth. Lazy references that do not point back up are
//! inlined like any other node.
//!
//! Every lazy boundary, inlined or not, counts against `max_depth` exactly
//! as it does in the interpreter. Hitting the limit faults the whole run:
//! `or` and `union` stop trying alternatives and the routine answers
//! `false`.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ValidationConfig;
use crate::context::Context;
use crate::error::{CompileError, Result};
use crate::validator::{NodeKind, Validator};

type CheckFn = Box<dyn Fn(Option<&Value>, &mut Guard) -> bool + Send + Sync>;

fn boxed<F>(check: F) -> CheckFn
where
    F: Fn(Option<&Value>, &mut Guard) -> bool + Send + Sync + 'static,
{
    Box::new(check)
}

/// Per-run state threaded through the closure tree.
struct Guard {
    config: ValidationConfig,
    lazy_depth: usize,
    faulted: bool,
}

impl Guard {
    fn new(config: &ValidationConfig) -> Self {
        Self {
            config: config.clone(),
            lazy_depth: 0,
            faulted: false,
        }
    }

    /// Enters a lazy frame; faults the run once `max_depth` frames are
    /// already active.
    fn enter(&mut self) -> bool {
        if self.lazy_depth >= self.config.max_depth {
            warn!(limit = self.config.max_depth, "Validation depth limit exceeded");
            self.faulted = true;
            return false;
        }
        self.lazy_depth += 1;
        true
    }

    fn leave(&mut self) {
        self.lazy_depth = self.lazy_depth.saturating_sub(1);
    }

    /// Runs the interpreter on a sub-part, continuing this run's depth count.
    fn interpret(&mut self, target: &Validator, value: Option<&Value>) -> bool {
        let mut ctx = Context::resumed(&self.config, self.lazy_depth);
        let ok = target.test(value, &mut ctx);
        if ctx.is_faulted() {
            self.faulted = true;
        }
        ok
    }
}

/// The assembled closure tree for one schema, cached on its root node.
pub(crate) struct Routine {
    check: CheckFn,
    source: String,
}

struct Fragment {
    check: CheckFn,
    source: String,
}

struct Compiler {
    /// Lazy targets currently being expanded, outermost first.
    expanding: Vec<Validator>,
    next_var: usize,
}

impl Compiler {
    fn fresh_var(&mut self) -> String {
        let var = format!("v{}", self.next_var);
        self.next_var += 1;
        var
    }

    fn fragment(&mut self, node: &Validator, reference: &str) -> std::result::Result<Fragment, CompileError> {
        let fragment = match node.kind() {
            NodeKind::Primitive(primitive) => {
                let primitive = *primitive;
                Fragment {
                    check: boxed(move |v: Option<&Value>, _: &mut Guard| primitive.matches(v)),
                    source: format!("is_{}({reference})", primitive.name()),
                }
            }
            NodeKind::Literal(literal) => {
                let source = format!("{reference} == {literal}");
                let literal = literal.clone();
                Fragment {
                    check: boxed(move |v: Option<&Value>, _: &mut Guard| literal.matches(v)),
                    source,
                }
            }
            NodeKind::Instance(container) => {
                let container = *container;
                Fragment {
                    check: boxed(move |v: Option<&Value>, _: &mut Guard| container.matches(v)),
                    source: format!("is_{}({reference})", container.name()),
                }
            }
            NodeKind::Enum(members) => {
                let rendered: Vec<String> = members.iter().map(ToString::to_string).collect();
                let members = members.clone();
                Fragment {
                    check: boxed(move |v: Option<&Value>, _: &mut Guard| {
                        members.iter().any(|m| m.matches(v))
                    }),
                    source: format!("[{}].contains({reference})", rendered.join(", ")),
                }
            }
            NodeKind::Custom(rule) => {
                let Some(source) = rule.generate(reference) else {
                    return Err(CompileError::MissingGenerator {
                        description: rule.describe(),
                    });
                };
                let rule = Arc::clone(rule);
                Fragment {
                    check: boxed(move |v: Option<&Value>, _: &mut Guard| {
                        v.is_some_and(|v| rule.test(v))
                    }),
                    source,
                }
            }
            NodeKind::And(a, b) => {
                let a = self.fragment(a, reference)?;
                let b = self.fragment(b, reference)?;
                let (check_a, check_b) = (a.check, b.check);
                Fragment {
                    check: boxed(move |v: Option<&Value>, guard: &mut Guard| {
                        check_a(v, guard) && check_b(v, guard)
                    }),
                    source: format!("({} && {})", a.source, b.source),
                }
            }
            NodeKind::Or(a, b) => {
                let a = self.fragment(a, reference)?;
                let b = self.fragment(b, reference)?;
                let (check_a, check_b) = (a.check, b.check);
                Fragment {
                    check: boxed(move |v: Option<&Value>, guard: &mut Guard| {
                        check_a(v, guard) || (!guard.faulted && check_b(v, guard))
                    }),
                    source: format!("({} || {})", a.source, b.source),
                }
            }
            NodeKind::Array(item) => {
                let var = self.fresh_var();
                let item = self.fragment(item, &var)?;
                let check = item.check;
                Fragment {
                    check: boxed(move |v: Option<&Value>, guard: &mut Guard| match v {
                        Some(Value::Array(items)) => {
                            items.iter().all(|element| check(Some(element), guard))
                        }
                        _ => false,
                    }),
                    source: format!(
                        "(is_array({reference}) && {reference}.iter().all(|{var}| {}))",
                        item.source
                    ),
                }
            }
            NodeKind::Record(item) => {
                let var = self.fresh_var();
                let item = self.fragment(item, &var)?;
                let check = item.check;
                Fragment {
                    check: boxed(move |v: Option<&Value>, guard: &mut Guard| match v {
                        Some(Value::Object(map)) => {
                            map.values().all(|entry| check(Some(entry), guard))
                        }
                        _ => false,
                    }),
                    source: format!(
                        "(is_object({reference}) && {reference}.values().all(|{var}| {}))",
                        item.source
                    ),
                }
            }
            NodeKind::Tuple(positions) => {
                let mut checks = Vec::with_capacity(positions.len());
                let mut source = format!("(len({reference}) == {}", positions.len());
                for (i, position) in positions.iter().enumerate() {
                    let fragment = self.fragment(position, &format!("{reference}[{i}]"))?;
                    source.push_str(" && ");
                    source.push_str(&fragment.source);
                    checks.push(fragment.check);
                }
                source.push(')');
                Fragment {
                    check: boxed(move |v: Option<&Value>, guard: &mut Guard| match v {
                        Some(Value::Array(items)) if items.len() == checks.len() => items
                            .iter()
                            .zip(&checks)
                            .all(|(element, check)| check(Some(element), guard)),
                        _ => false,
                    }),
                    source,
                }
            }
            NodeKind::Object(fields) => {
                let mut checks = Vec::with_capacity(fields.len());
                let mut source = format!("(is_object({reference})");
                for (key, field) in fields {
                    let fragment = self.fragment(field, &field_reference(reference, key))?;
                    source.push_str(" && ");
                    source.push_str(&fragment.source);
                    checks.push((Arc::clone(key), fragment.check));
                }
                source.push(')');
                Fragment {
                    check: boxed(move |v: Option<&Value>, guard: &mut Guard| match v {
                        Some(Value::Object(map)) => checks
                            .iter()
                            .all(|(key, check)| check(map.get(&**key), guard)),
                        _ => false,
                    }),
                    source,
                }
            }
            NodeKind::Union(alternatives) => {
                let mut checks = Vec::with_capacity(alternatives.len());
                let mut sources = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    let fragment = self.fragment(alternative, reference)?;
                    sources.push(fragment.source);
                    checks.push(fragment.check);
                }
                Fragment {
                    check: boxed(move |v: Option<&Value>, guard: &mut Guard| {
                        for check in &checks {
                            if check(v, guard) {
                                return true;
                            }
                            if guard.faulted {
                                return false;
                            }
                        }
                        false
                    }),
                    source: format!("({})", sources.join(" || ")),
                }
            }
            NodeKind::Lazy(lazy) => {
                let target = lazy.target().map_err(CompileError::UnresolvedLazy)?;
                if self.expanding.iter().any(|open| open.ptr_eq(target)) {
                    let source = format!("interpret({target}, {reference})");
                    let target = target.clone();
                    Fragment {
                        check: boxed(move |v: Option<&Value>, guard: &mut Guard| {
                            if !guard.enter() {
                                return false;
                            }
                            let ok = guard.interpret(&target, v);
                            guard.leave();
                            ok
                        }),
                        source,
                    }
                } else {
                    self.expanding.push(target.clone());
                    let fragment = self.fragment(target, reference);
                    self.expanding.pop();
                    let fragment = fragment?;
                    let check = fragment.check;
                    Fragment {
                        check: boxed(move |v: Option<&Value>, guard: &mut Guard| {
                            if !guard.enter() {
                                return false;
                            }
                            let ok = check(v, guard);
                            guard.leave();
                            ok
                        }),
                        source: fragment.source,
                    }
                }
            }
        };
        Ok(fragment)
    }
}

/// `base.key` for identifier-like keys, `base["key"]` otherwise.
fn field_reference(base: &str, key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if identifier {
        format!("{base}.{key}")
    } else {
        format!("{base}[{}]", Value::String(key.to_string()))
    }
}

fn assemble(schema: &Validator) -> std::result::Result<Arc<Routine>, CompileError> {
    let started = Instant::now();
    let mut compiler = Compiler {
        expanding: vec![schema.clone()],
        next_var: 0,
    };
    match compiler.fragment(schema, "value") {
        Ok(fragment) => {
            debug!(
                schema = %schema,
                elapsed = ?started.elapsed(),
                source_len = fragment.source.len(),
                "Compiled validator"
            );
            Ok(Arc::new(Routine {
                check: fragment.check,
                source: fragment.source,
            }))
        }
        Err(err) => {
            debug!(schema = %schema, error = %err, "Schema is not compilable");
            Err(err)
        }
    }
}

impl Validator {
    /// Lowers this schema into a [`Compiled`] routine.
    ///
    /// The routine is assembled on the first call for this handle (and any
    /// clone of it) and reused afterwards. A separately constructed but
    /// structurally identical schema compiles on its own.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingGenerator`] if any node supplies no
    /// generator, or [`CompileError::UnresolvedLazy`] if a lazy reference
    /// cannot be resolved. The same error is returned on every call.
    ///
    /// # Examples
    ///
    /// ```
    /// use cito_core::{array, object, string};
    /// use serde_json::json;
    ///
    /// let schema = object([("tags", array(string()))]).unwrap();
    /// let compiled = schema.compile().unwrap();
    /// assert!(compiled.check(&json!({"tags": ["a"]})));
    /// assert!(!compiled.check(&json!({"tags": [1]})));
    /// assert_eq!(
    ///     compiled.source(),
    ///     "(is_object(value) && (is_array(value.tags) && value.tags.iter().all(|v0| is_string(v0))))"
    /// );
    /// ```
    pub fn compile(&self) -> std::result::Result<Compiled, CompileError> {
        let routine = self
            .node()
            .compiled
            .get_or_init(|| assemble(self))
            .clone()?;
        Ok(Compiled {
            routine,
            schema: self.clone(),
        })
    }
}

/// A schema lowered into a single checking routine.
///
/// Accepts and rejects exactly the values the interpreted schema does.
/// Rejections can be explained with [`assert`](Self::assert), which reruns
/// the interpreter once to build the diagnostic.
#[derive(Clone)]
pub struct Compiled {
    routine: Arc<Routine>,
    schema: Validator,
}

impl Compiled {
    /// Returns `true` if `value` matches.
    pub fn check(&self, value: &Value) -> bool {
        self.run(Some(value), &ValidationConfig::default())
    }

    /// Like [`check`](Self::check), for a value that may be missing.
    pub fn check_opt(&self, value: Option<&Value>) -> bool {
        self.run(value, &ValidationConfig::default())
    }

    /// Like [`check`](Self::check), with explicit limits.
    pub fn check_with(&self, value: &Value, config: &ValidationConfig) -> bool {
        self.run(Some(value), config)
    }

    fn run(&self, value: Option<&Value>, config: &ValidationConfig) -> bool {
        let mut guard = Guard::new(config);
        (self.routine.check)(value, &mut guard)
    }

    /// Returns `value` unchanged if it matches.
    ///
    /// # Errors
    ///
    /// The same diagnostic [`Validator::assert`] would return.
    pub fn assert<'v>(&self, value: &'v Value) -> Result<&'v Value> {
        self.assert_with(value, &ValidationConfig::default())
    }

    /// Like [`assert`](Self::assert), with explicit limits.
    pub fn assert_with<'v>(&self, value: &'v Value, config: &ValidationConfig) -> Result<&'v Value> {
        if self.check_with(value, config) {
            return Ok(value);
        }
        self.schema.assert_with(value, config)
    }

    /// Validates `value` and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// The same errors as [`Validator::construct`].
    pub fn construct<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        self.assert(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// The routine rendered as an expression over `value`.
    pub fn source(&self) -> &str {
        &self.routine.source
    }

    /// The schema this routine was compiled from.
    pub fn schema(&self) -> &Validator {
        &self.schema
    }

    /// Returns `true` if both handles share one assembled routine.
    pub fn ptr_eq(&self, other: &Compiled) -> bool {
        Arc::ptr_eq(&self.routine, &other.routine)
    }
}

impl fmt::Debug for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiled")
            .field("schema", &self.schema)
            .field("source", &self.routine.source)
            .finish()
    }
}
