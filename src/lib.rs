//! A dependency-aware, concurrent validation engine for migrated records.
//!
//! Validators are plain async (or sync) functions, declared through
//! [`validator::ValidatorBuilder`] and bound to a record's fields through a
//! [`provider::ParameterProvider`]. [`manager::ValidationManager`] wires
//! mapped validators into a [`graph::DependencyGraph`] and runs each record
//! through it, spawning concurrent tasks where the dependency structure
//! allows it and running everything else inline.

pub mod config;
pub mod error;
pub mod error_handler;
pub mod error_id;
pub mod graph;
pub mod manager;
pub mod params;
pub mod provider;
pub mod query;
pub mod record;
pub mod result;
pub mod telemetry;
pub mod validator;

pub use config::ManagerConfig;
pub use error::{EngineError, ProviderItemError, ValidationError};
pub use error_id::RaisedError;
pub use graph::NodeId;
pub use manager::ValidationManager;
pub use params::{Parameter, Parameters};
pub use provider::{MappedValidator, PathMapProvider, QueryMapProvider};
pub use query::{list_iter, Query};
pub use record::{JsonRecord, Record, RecordError, Value};
pub use result::ValidationResult;
pub use validator::{ParamType, Validator, ValidatorBuilder};
