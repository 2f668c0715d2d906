//! Query language: a composable pipeline of `.path(name)` / `.iter(fn)`
//! steps producing a lazy-in-spirit (eagerly realized, since records are
//! finite here) sequence of `(value, path-id)` pairs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::record::{Record, RecordError, Value};

/// Maps one value to a set of `(child, suffix)` pairs, e.g. a list iterator
/// yielding `(element, "[i]")` for each element.
pub type IterFn = Arc<dyn Fn(&Value) -> Vec<(Value, String)> + Send + Sync>;

#[derive(Clone)]
enum Step {
    Path(String),
    Iter(IterFn),
}

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(0);

/// A composable navigation pipeline over a record.
///
/// Two `Query`s compare equal iff they were built from the same `Query`
/// value (via `clone`): comparing the step closures for semantic equality
/// is undecidable in Rust, so identity is tracked with a generation id
/// assigned at construction (see `DESIGN.md`).
#[derive(Clone)]
pub struct Query {
    id: u64,
    steps: Arc<Vec<Step>>,
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Query {}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            id: NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed),
            steps: Arc::new(Vec::new()),
        }
    }

    /// Navigates one attribute on each upstream value, appending `".name"`
    /// to the path-id.
    pub fn path(self, name: impl Into<String>) -> Self {
        self.push(Step::Path(name.into()))
    }

    /// Expands one upstream value into many, via a user function returning
    /// an iterator of `(child, suffix)` pairs.
    pub fn iter(self, f: IterFn) -> Self {
        self.push(Step::Iter(f))
    }

    fn push(mut self, step: Step) -> Self {
        let id = self.id;
        let mut steps = (*self.steps).clone();
        steps.push(step);
        self.steps = Arc::new(steps);
        self.id = id;
        self
    }

    /// Evaluates the pipeline against `record`, returning the lazy (here:
    /// eagerly materialized) sequence of `(value, path-id)` pairs or
    /// per-element errors. When `include_exceptions` is `false`, failed
    /// elements are dropped from the result.
    pub fn iterable(
        &self,
        record: &dyn Record,
        include_exceptions: bool,
    ) -> Vec<Result<(Value, String), RecordError>> {
        let mut current: Vec<Result<(Value, String), RecordError>> = Vec::new();
        let mut started = false;

        for step in self.steps.iter() {
            match step {
                Step::Path(name) => {
                    if !started {
                        started = true;
                        let res = record
                            .get_attr(name)
                            .map(|v| (v, name.clone()))
                            .ok_or_else(|| RecordError::MissingAttribute {
                                record_id: record.get_id(),
                                record_class: record.class_name(),
                                path: name.clone(),
                            });
                        current = vec![res];
                    } else {
                        current = current
                            .into_iter()
                            .map(|item| match item {
                                Err(e) => Err(e),
                                Ok((value, path_id)) => match &value {
                                    Value::Map(m) => {
                                        let next_path = format!("{path_id}.{name}");
                                        m.get(name).cloned().map(|v| (v, next_path.clone())).ok_or_else(|| {
                                            RecordError::MissingAttribute {
                                                record_id: record.get_id(),
                                                record_class: record.class_name(),
                                                path: next_path,
                                            }
                                        })
                                    }
                                    _ => Err(RecordError::NotNavigable {
                                        record_id: record.get_id(),
                                        record_class: record.class_name(),
                                        path: format!("{path_id}.{name}"),
                                    }),
                                },
                            })
                            .collect();
                    }
                }
                Step::Iter(f) => {
                    let mut next = Vec::new();
                    for item in current {
                        match item {
                            Err(e) => next.push(Err(e)),
                            Ok((value, path_id)) => {
                                for (child, suffix) in f(&value) {
                                    next.push(Ok((child, format!("{path_id}{suffix}"))));
                                }
                            }
                        }
                    }
                    current = next;
                }
            }
        }

        if include_exceptions {
            current
        } else {
            current.into_iter().filter(|r| r.is_ok()).collect()
        }
    }
}

/// A typical list iterator for use with [`Query::iter`]: yields
/// `(element, "[i]")` for each element of a `Value::List`, or nothing for
/// any other value shape.
pub fn list_iter() -> IterFn {
    Arc::new(|value: &Value| match value {
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), format!("[{i}]")))
            .collect(),
        _ => Vec::new(),
    })
}
