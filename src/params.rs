//! A single bound argument, and the immutable set of them handed to a
//! validator invocation.

use std::collections::HashMap;

use crate::record::Value;

/// A single bound argument.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    /// Human-readable origin, e.g. `"z.x"` or `"x[3].x"`.
    pub param_id: String,
    pub required: bool,
    /// `false` means the optional parameter was absent from the record and
    /// `value` is the validator's declared default.
    pub provided: bool,
}

/// An immutable mapping `{param_name -> Parameter}` ready to invoke a
/// specific mapped validator.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    entries: HashMap<String, Parameter>,
}

impl Parameters {
    pub fn new(entries: HashMap<String, Parameter>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.values()
    }

    /// `{name -> value}` used to invoke the user function. Rust validators
    /// always receive a concrete value per declared parameter (there is no
    /// Python-style implicit-default-on-omitted-kwarg), so unlike the
    /// conceptual model this includes defaulted-but-unprovided parameters
    /// too; `provided` on the corresponding [`Parameter`] still tells you
    /// which ones came from the record.
    pub fn param_dict(&self) -> HashMap<String, Value> {
        self.entries
            .iter()
            .map(|(k, p)| (k.clone(), p.value.clone()))
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Parameter> {
        let mut v: Vec<Parameter> = self.entries.values().cloned().collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        v
    }
}
