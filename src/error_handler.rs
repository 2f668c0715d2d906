//! Per-record error collection.

use dashmap::DashMap;
use tracing::warn;

use crate::error::ValidationError;
use crate::error_id::ERROR_ID_TIMEOUT;
use crate::graph::NodeId;
use crate::params::Parameter;
use crate::record::Record;

/// Owns every error recorded against any node for a single record. Created
/// on entry to `validate` and discarded on return; safe to share across the
/// concurrent tasks spawned for one record.
#[derive(Default)]
pub struct ErrorHandler {
    excs: DashMap<NodeId, Vec<ValidationError>>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error against `node`. Callers resolve `error_id` up
    /// front: a reserved constant for engine-synthesized errors, or
    /// `error_id::id_for(&raised.origin)` for user-code errors.
    #[allow(clippy::too_many_arguments)]
    pub fn catch(
        &self,
        node: NodeId,
        error_id: u32,
        message: String,
        cause: Box<dyn std::error::Error + Send + Sync>,
        validator_name: &str,
        provided_params: Vec<Parameter>,
        record: &dyn Record,
    ) {
        let error = ValidationError {
            error_id,
            message_detail: message,
            data_set_id: record.get_id(),
            data_set_class: record.class_name(),
            validator_name: validator_name.to_string(),
            provided_params,
            cause,
        };

        warn!(
            error_id = error.error_id,
            validator = %error.validator_name,
            data_set_id = %error.data_set_id,
            "{}",
            error.message_detail
        );

        self.excs.entry(node).or_default().push(error);
    }

    pub fn has_errors(&self, node: NodeId) -> bool {
        self.excs.get(&node).map(|v| !v.is_empty()).unwrap_or(false)
    }

    pub fn is_timeout(error: &ValidationError) -> bool {
        error.error_id == ERROR_ID_TIMEOUT
    }

    /// Consumes the handler, yielding the flat list of every error recorded
    /// for this record (across all nodes).
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.excs.into_iter().flat_map(|(_, v)| v).collect()
    }

    pub fn total_errors(&self) -> usize {
        self.excs.iter().map(|e| e.value().len()).sum()
    }
}
