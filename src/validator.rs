//! Validator: an immutable descriptor of a single user validation function.
//!
//! Signature introspection is replaced with an explicit builder (see
//! `DESIGN.md` / Design Note on dynamic signature inspection): each
//! parameter is declared by name, type tag, and required/optional, instead
//! of being recovered by inspecting a runtime function object.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::Arc;

use crate::error::EngineError;
use crate::error_id::RaisedError;
use crate::params::Parameters;
use crate::record::Value;

/// The declared type of a validator parameter, checked at runtime against
/// the value bound from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Bool,
    List,
    Map,
    /// Accepts any value; used for parameters whose shape genuinely varies.
    Any,
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::Any, _) => true,
            (ParamType::Str, Value::Str(_)) => true,
            (ParamType::Int, Value::Int(_)) => true,
            (ParamType::Float, Value::Float(_) | Value::Int(_)) => true,
            (ParamType::Bool, Value::Bool(_)) => true,
            (ParamType::List, Value::List(_)) => true,
            (ParamType::Map, Value::Map(_)) => true,
            _ => false,
        }
    }
}

/// A single declared parameter of a validator.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub type_tag: ParamType,
    pub required: bool,
    pub default: Option<Value>,
}

pub type ValidatorFuture = Pin<Box<dyn Future<Output = Result<(), RaisedError>> + Send>>;
pub type ValidatorFn = Arc<dyn Fn(Parameters) -> ValidatorFuture + Send + Sync>;

struct ValidatorInner {
    name: String,
    params: Vec<ParamSpec>,
    required: HashSet<String>,
    optional: HashSet<String>,
    is_async: bool,
    func: ValidatorFn,
}

/// Immutable descriptor of a single user function, wired up to invoke it.
///
/// Two validators are equal iff they wrap the same underlying function
/// (pointer identity of the boxed closure).
#[derive(Clone)]
pub struct Validator {
    inner: Arc<ValidatorInner>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.inner.name)
            .field("params", &self.inner.params)
            .field("is_async", &self.inner.is_async)
            .finish()
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl Eq for Validator {}

impl Hash for Validator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl Validator {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.inner.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.inner.params.iter().find(|p| p.name == name)
    }

    pub fn required_params(&self) -> &HashSet<String> {
        &self.inner.required
    }

    pub fn optional_params(&self) -> &HashSet<String> {
        &self.inner.optional
    }

    pub fn all_param_names(&self) -> HashSet<String> {
        self.inner.params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_async(&self) -> bool {
        self.inner.is_async
    }

    pub fn invoke(&self, params: Parameters) -> ValidatorFuture {
        (self.inner.func)(params)
    }
}

/// Builds a [`Validator`] by declaring its parameters explicitly.
pub struct ValidatorBuilder {
    name: String,
    params: Vec<ParamSpec>,
    is_async: bool,
}

impl ValidatorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            is_async: false,
        }
    }

    /// Declares a required parameter.
    pub fn param(mut self, name: impl Into<String>, type_tag: ParamType) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            type_tag,
            required: true,
            default: None,
        });
        self
    }

    /// Declares an optional parameter with its default value.
    pub fn optional_param(
        mut self,
        name: impl Into<String>,
        type_tag: ParamType,
        default: Value,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            type_tag,
            required: false,
            default: Some(default),
        });
        self
    }

    /// Marks the wrapped function as asynchronous; affects the manager's
    /// inline-vs-spawn scheduling decision.
    pub fn is_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn build<F, Fut>(self, func: F) -> Result<Validator, EngineError>
    where
        F: Fn(Parameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RaisedError>> + Send + 'static,
    {
        if self.params.is_empty() {
            return Err(EngineError::Configuration(format!(
                "validator '{}' must declare at least one parameter",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for p in &self.params {
            if !seen.insert(p.name.clone()) {
                return Err(EngineError::Configuration(format!(
                    "validator '{}' declares parameter '{}' more than once",
                    self.name, p.name
                )));
            }
            if !p.required && p.default.is_none() {
                return Err(EngineError::Configuration(format!(
                    "validator '{}' parameter '{}' is optional but has no default",
                    self.name, p.name
                )));
            }
        }

        let required = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.clone())
            .collect();
        let optional = self
            .params
            .iter()
            .filter(|p| !p.required)
            .map(|p| p.name.clone())
            .collect();

        Ok(Validator {
            inner: Arc::new(ValidatorInner {
                name: self.name,
                params: self.params,
                required,
                optional,
                is_async: self.is_async,
                func: Arc::new(move |params| Box::pin(func(params))),
            }),
        })
    }
}
