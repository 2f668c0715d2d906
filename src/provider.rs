//! ParameterProvider: binds a mapped validator's parameters from a record.

use std::collections::{BTreeMap, HashMap};

use crate::error::{EngineError, ProviderItemError};
use crate::params::{Parameter, Parameters};
use crate::query::Query;
use crate::record::Record;
use crate::validator::Validator;

/// Binds a mapped validator's parameters from a record. Never panics: any
/// binding failure is yielded as a value in the returned vector, not raised.
pub trait ParameterProvider: Send + Sync {
    fn provide(&self, record: &dyn Record) -> Vec<Result<Parameters, ProviderItemError>>;
}

/// One or more `{param_name -> dotted_path}` maps. Each map yields exactly
/// one `Parameters` (or one error) per record.
#[derive(Clone, PartialEq)]
pub struct PathMapProvider {
    validator: Validator,
    maps: Vec<BTreeMap<String, String>>,
}

impl PathMapProvider {
    pub fn new(
        validator: Validator,
        maps: Vec<BTreeMap<String, String>>,
    ) -> Result<Self, EngineError> {
        let all = validator.all_param_names();
        let required = validator.required_params();
        for map in &maps {
            let keys: std::collections::HashSet<String> = map.keys().cloned().collect();
            if !required.is_subset(&keys) {
                return Err(EngineError::Configuration(format!(
                    "path map for validator '{}' is missing a required parameter",
                    validator.name()
                )));
            }
            if !keys.is_subset(&all) {
                return Err(EngineError::Configuration(format!(
                    "path map for validator '{}' references an undeclared parameter",
                    validator.name()
                )));
            }
        }
        Ok(Self { validator, maps })
    }
}

impl ParameterProvider for PathMapProvider {
    fn provide(&self, record: &dyn Record) -> Vec<Result<Parameters, ProviderItemError>> {
        self.maps
            .iter()
            .map(|map| provide_one(&self.validator, map, record))
            .collect()
    }
}

fn provide_one(
    validator: &Validator,
    map: &BTreeMap<String, String>,
    record: &dyn Record,
) -> Result<Parameters, ProviderItemError> {
    let mut entries = HashMap::new();
    for (name, path) in map {
        let spec = validator
            .param(name)
            .expect("map keys were validated against the validator's declared parameters");
        match record.get_path(path) {
            Ok(value) => {
                entries.insert(
                    name.clone(),
                    Parameter {
                        name: name.clone(),
                        value,
                        param_id: path.clone(),
                        required: spec.required,
                        provided: true,
                    },
                );
            }
            Err(e) => {
                if spec.required {
                    return Err(ProviderItemError::MissingRequired {
                        param_name: name.clone(),
                        source: e,
                    });
                }
                entries.insert(
                    name.clone(),
                    Parameter {
                        name: name.clone(),
                        value: spec
                            .default
                            .clone()
                            .expect("optional parameters always carry a default"),
                        param_id: path.clone(),
                        required: false,
                        provided: false,
                    },
                );
            }
        }
    }
    Ok(Parameters::new(entries))
}

/// One `{param_name -> Query}` map. Yields the Cartesian product of the
/// per-parameter sequences produced by each `Query`.
#[derive(Clone, PartialEq)]
pub struct QueryMapProvider {
    validator: Validator,
    map: BTreeMap<String, Query>,
}

impl QueryMapProvider {
    pub fn new(validator: Validator, map: BTreeMap<String, Query>) -> Result<Self, EngineError> {
        let all = validator.all_param_names();
        let required = validator.required_params();
        let keys: std::collections::HashSet<String> = map.keys().cloned().collect();
        if !required.is_subset(&keys) {
            return Err(EngineError::Configuration(format!(
                "query map for validator '{}' is missing a required parameter",
                validator.name()
            )));
        }
        if !keys.is_subset(&all) {
            return Err(EngineError::Configuration(format!(
                "query map for validator '{}' references an undeclared parameter",
                validator.name()
            )));
        }
        Ok(Self { validator, map })
    }
}

/// One parameter's resolved slot within a single combination of the
/// Cartesian product.
enum Slot {
    Required { value: crate::record::Value, path_id: String },
    Optional(Option<(crate::record::Value, String)>),
}

impl ParameterProvider for QueryMapProvider {
    fn provide(&self, record: &dyn Record) -> Vec<Result<Parameters, ProviderItemError>> {
        let mut required_errors = Vec::new();
        // One factor per parameter: a vector of the possible slots it can
        // take across the Cartesian product.
        let mut factors: Vec<(String, Vec<Slot>)> = Vec::new();

        for (name, query) in &self.map {
            let required = self.validator.required_params().contains(name);
            let raw = query.iterable(record, true);
            if required {
                let mut slots = Vec::new();
                for item in raw {
                    match item {
                        Ok((value, path_id)) => slots.push(Slot::Required { value, path_id }),
                        Err(e) => required_errors.push((name.clone(), e)),
                    }
                }
                factors.push((name.clone(), slots));
            } else {
                let slots = raw
                    .into_iter()
                    .map(|item| Slot::Optional(item.ok()))
                    .collect();
                factors.push((name.clone(), slots));
            }
        }

        let mut combinations: Vec<HashMap<String, Parameter>> = vec![HashMap::new()];
        for (name, slots) in &factors {
            if slots.is_empty() {
                combinations.clear();
                break;
            }
            let mut next = Vec::with_capacity(combinations.len() * slots.len());
            for base in &combinations {
                for slot in slots {
                    let mut entry = base.clone();
                    let spec = self
                        .validator
                        .param(name)
                        .expect("map keys were validated against the validator's declared parameters");
                    let param = match slot {
                        Slot::Required { value, path_id } => Parameter {
                            name: name.clone(),
                            value: value.clone(),
                            param_id: path_id.clone(),
                            required: true,
                            provided: true,
                        },
                        Slot::Optional(Some((value, path_id))) => Parameter {
                            name: name.clone(),
                            value: value.clone(),
                            param_id: path_id.clone(),
                            required: false,
                            provided: true,
                        },
                        Slot::Optional(None) => Parameter {
                            name: name.clone(),
                            value: spec
                                .default
                                .clone()
                                .expect("optional parameters always carry a default"),
                            param_id: name.clone(),
                            required: false,
                            provided: false,
                        },
                    };
                    entry.insert(name.clone(), param);
                    next.push(entry);
                }
            }
            combinations = next;
        }

        let mut results: Vec<Result<Parameters, ProviderItemError>> = combinations
            .into_iter()
            .map(|entries| Ok(Parameters::new(entries)))
            .collect();

        for (param_name, source) in required_errors {
            results.push(Err(ProviderItemError::MissingRequired { param_name, source }));
        }

        results
    }
}

/// Either of the two concrete provider strategies, wired up to a validator.
#[derive(Clone, PartialEq)]
enum ProviderKind {
    PathMap(PathMapProvider),
    QueryMap(QueryMapProvider),
}

/// A `Validator` plus its parameter-binding strategy. The identity used in
/// the dependency graph: two mapped validators are equal iff their
/// validator and provider specification are both equal.
#[derive(Clone, PartialEq)]
pub struct MappedValidator {
    validator: Validator,
    kind: ProviderKind,
}

impl MappedValidator {
    pub fn path_mapped(
        validator: Validator,
        maps: Vec<BTreeMap<String, String>>,
    ) -> Result<Self, EngineError> {
        let provider = PathMapProvider::new(validator.clone(), maps)?;
        Ok(Self {
            validator,
            kind: ProviderKind::PathMap(provider),
        })
    }

    pub fn query_mapped(
        validator: Validator,
        map: BTreeMap<String, Query>,
    ) -> Result<Self, EngineError> {
        let provider = QueryMapProvider::new(validator.clone(), map)?;
        Ok(Self {
            validator,
            kind: ProviderKind::QueryMap(provider),
        })
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn provide(&self, record: &dyn Record) -> Vec<Result<Parameters, ProviderItemError>> {
        match &self.kind {
            ProviderKind::PathMap(p) => p.provide(record),
            ProviderKind::QueryMap(p) => p.provide(record),
        }
    }
}
