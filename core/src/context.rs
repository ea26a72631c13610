//! Per-call diagnostic state.
//!
//! A [`Context`] is created for every top-level validation call and thrown
//! away afterwards. Composite validators push a path segment before
//! descending into a child and pop it on every way out, so siblings (the
//! next element, the next union alternative) always start from the depth at
//! which they began. Failing validators record what they expected; the
//! last record wins, which leaves the most specific mismatch on the path
//! that caused the overall failure.

use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::config::ValidationConfig;
use crate::error::{CitoError, SchemaError, ValidationError};
use crate::validator::Validator;
use crate::value::preview;

/// A borrowed path segment pushed during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Object field access.
    Field(&'a str),
    /// Array element access.
    Index(usize),
}

/// An owned path segment, as reported in a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object field access, rendered as `.name`.
    Field(String),
    /// Array element access, rendered as `[n]`.
    Index(usize),
}

impl From<Segment<'_>> for PathSegment {
    fn from(segment: Segment<'_>) -> Self {
        match segment {
            Segment::Field(name) => PathSegment::Field(name.to_string()),
            Segment::Index(i) => PathSegment::Index(i),
        }
    }
}

/// Location inside a validated value.
///
/// Renders fields as `.name` and indices as `[n]` with no separator, and
/// drops the dot in front of a leading field:
///
/// ```
/// use cito_core::{Path, PathSegment};
///
/// let path = Path::from(vec![
///     PathSegment::Field("sub".into()),
///     PathSegment::Index(0),
///     PathSegment::Field("inner".into()),
/// ]);
/// assert_eq!(path.to_string(), "sub[0].inner");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// Returns `true` for the top-level position.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The segments, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl<'a> FromIterator<Segment<'a>> for Path {
    fn from_iter<I: IntoIterator<Item = Segment<'a>>>(iter: I) -> Self {
        Self(iter.into_iter().map(PathSegment::from).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// The most recent "expected vs. actual" record.
#[derive(Debug, Clone)]
pub(crate) struct Failure<'a> {
    pub(crate) expected: &'a Validator,
    pub(crate) value: Option<&'a Value>,
    pub(crate) path: Vec<Segment<'a>>,
}

impl Failure<'_> {
    pub(crate) fn depth(&self) -> usize {
        self.path.len()
    }
}

/// A condition that aborts the whole call rather than one branch.
#[derive(Debug, Clone)]
pub(crate) enum Fault {
    DepthLimit { limit: usize, path: Path },
    Schema(SchemaError),
}

/// Mutable state for a single validation call.
///
/// Created through [`Context::new`] for diagnostic runs. `check` uses an
/// untracked context that skips path bookkeeping entirely.
#[derive(Debug)]
pub struct Context<'a> {
    path: Vec<Segment<'a>>,
    failure: Option<Failure<'a>>,
    fault: Option<Fault>,
    lazy_depth: usize,
    max_depth: usize,
    preview_len: usize,
    tracking: bool,
}

impl<'a> Context<'a> {
    /// Creates a context that records paths and expectations.
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            path: Vec::new(),
            failure: None,
            fault: None,
            lazy_depth: 0,
            max_depth: config.max_depth,
            preview_len: config.preview_len,
            tracking: true,
        }
    }

    /// Creates a context that only answers yes or no.
    pub(crate) fn untracked(config: &ValidationConfig) -> Self {
        Self {
            tracking: false,
            ..Self::new(config)
        }
    }

    /// Creates an untracked context that continues a run already
    /// `lazy_depth` lazy frames deep.
    pub(crate) fn resumed(config: &ValidationConfig, lazy_depth: usize) -> Self {
        Self {
            lazy_depth,
            ..Self::untracked(config)
        }
    }

    /// Returns `true` if paths and expectations are being recorded.
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Pushes a field segment.
    pub fn at(&mut self, name: &'a str) {
        if self.tracking {
            self.path.push(Segment::Field(name));
        }
    }

    /// Pushes an index segment.
    pub fn index(&mut self, index: usize) {
        if self.tracking {
            self.path.push(Segment::Index(index));
        }
    }

    /// Pops the most recently pushed segment.
    pub fn back(&mut self) {
        if self.tracking {
            self.path.pop();
        }
    }

    /// Current path depth.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Truncates the path back to `depth`.
    pub(crate) fn reset_to(&mut self, depth: usize) {
        self.path.truncate(depth);
    }

    /// The current path as an owned [`Path`].
    pub fn path(&self) -> Path {
        self.path.iter().copied().collect()
    }

    /// Records that `expected` rejected `value` at the current path,
    /// replacing any earlier record.
    pub fn expect(&mut self, expected: &'a Validator, value: Option<&'a Value>) {
        if self.tracking {
            self.failure = Some(Failure {
                expected,
                value,
                path: self.path.clone(),
            });
        }
    }

    pub(crate) fn take_failure(&mut self) -> Option<Failure<'a>> {
        self.failure.take()
    }

    pub(crate) fn set_failure(&mut self, failure: Option<Failure<'a>>) {
        self.failure = failure;
    }

    /// Returns `true` once the call has been aborted.
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    pub(crate) fn fault(&mut self, fault: Fault) {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }

    /// Enters a lazy frame; returns `false` (and aborts the call) once
    /// `max_depth` frames are already active.
    pub(crate) fn enter_lazy(&mut self) -> bool {
        if self.lazy_depth >= self.max_depth {
            warn!(
                limit = self.max_depth,
                path = %self.path(),
                "Validation depth limit exceeded"
            );
            self.fault(Fault::DepthLimit {
                limit: self.max_depth,
                path: self.path(),
            });
            return false;
        }
        self.lazy_depth += 1;
        true
    }

    pub(crate) fn leave_lazy(&mut self) {
        self.lazy_depth = self.lazy_depth.saturating_sub(1);
    }

    /// Converts the state of a failed call into its error.
    ///
    /// `root` and `value` describe the top-level call and are only used if
    /// nothing more specific was recorded.
    pub(crate) fn into_error(self, root: &Validator, value: Option<&Value>) -> CitoError {
        if let Some(fault) = self.fault {
            return match fault {
                Fault::DepthLimit { limit, path } => CitoError::DepthLimitExceeded { limit, path },
                Fault::Schema(err) => CitoError::Schema(err),
            };
        }
        let err = match self.failure {
            Some(failure) => ValidationError {
                path: failure.path.into_iter().collect(),
                expected: failure.expected.describe(),
                actual: preview(failure.value, self.preview_len),
            },
            None => ValidationError {
                path: Path::default(),
                expected: root.describe(),
                actual: preview(value, self.preview_len),
            },
        };
        CitoError::Validation(err)
    }
}
