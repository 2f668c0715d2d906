//! Crate-wide error types: configuration-time failures, provider-binding
//! failures, and the `ValidationError` envelope that everything else funnels
//! into.

use std::fmt;

use thiserror::Error;

use crate::params::Parameter;
use crate::record::RecordError;

/// Fatal, registration-time errors. These are the only errors that escape
/// `register`/`validate` as a Rust `Result::Err`; nothing from the
/// validator-run path uses this type.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("dependency id {0} is not registered")]
    UnknownDependency(u64),
    #[error("registering this mapped validator would introduce a cycle")]
    WouldCycle,
}

/// A parameter set could not be produced for a given record.
#[derive(Debug, Error)]
pub enum ProviderItemError {
    #[error("{param_name} not provided ({source})")]
    MissingRequired {
        param_name: String,
        source: RecordError,
    },
}

/// Structured error wrapping an underlying cause, the unit that every
/// user-facing error output flows through.
#[derive(Debug)]
pub struct ValidationError {
    pub error_id: u32,
    pub message_detail: String,
    pub data_set_id: String,
    pub data_set_class: &'static str,
    pub validator_name: String,
    pub provided_params: Vec<Parameter>,
    pub cause: Box<dyn std::error::Error + Send + Sync>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.error_id, self.message_detail)?;
        writeln!(
            f,
            "    DataSet: {}(id={})",
            self.data_set_class, self.data_set_id
        )?;
        writeln!(f, "    Error ID: {}", self.error_id)?;
        writeln!(f, "    Validator function: {}", self.validator_name)?;
        writeln!(f, "    Parameter information:")?;
        for p in &self.provided_params {
            writeln!(
                f,
                "        {}: value='{}', id='{}', {}, {}",
                p.name,
                p.value,
                p.param_id,
                if p.required { "required" } else { "optional" },
                if p.provided { "provided" } else { "unprovided" },
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}
