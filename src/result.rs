//! `ValidationResult`: the post-hoc analysis view handed back from
//! `validate`, closing over the per-record error handlers.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::ValidationError;
use crate::record::Record;

/// Batch-level analysis over every record passed to one `validate` call.
pub struct ValidationResult {
    succeeded: Vec<Arc<dyn Record>>,
    data_set_errors: HashMap<String, (Arc<dyn Record>, Vec<ValidationError>)>,
    total: usize,
    sorted_index: OnceLock<Vec<(String, usize)>>,
    histogram: OnceLock<HashMap<u32, usize>>,
}

impl ValidationResult {
    pub(crate) fn new(
        total: usize,
        succeeded: Vec<Arc<dyn Record>>,
        data_set_errors: HashMap<String, (Arc<dyn Record>, Vec<ValidationError>)>,
    ) -> Self {
        Self {
            succeeded,
            data_set_errors,
            total,
            sorted_index: OnceLock::new(),
            histogram: OnceLock::new(),
        }
    }

    /// Records with zero recorded errors.
    pub fn succeeded_data_sets(&self) -> &[Arc<dyn Record>] {
        &self.succeeded
    }

    /// `{record_id -> errors}` for every record with at least one error.
    pub fn data_set_errors(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.data_set_errors
            .iter()
            .map(|(id, (_, errs))| (id.as_str(), errs.as_slice()))
    }

    pub fn errors_for(&self, record_id: &str) -> Option<&[ValidationError]> {
        self.data_set_errors.get(record_id).map(|(_, e)| e.as_slice())
    }

    /// Every error across the batch, sorted by `error_id`. Memoized on
    /// first access.
    pub fn all_errors(&self) -> Vec<&ValidationError> {
        let index = self.sorted_index.get_or_init(|| {
            let mut idx: Vec<(String, usize)> = self
                .data_set_errors
                .iter()
                .flat_map(|(id, (_, errs))| (0..errs.len()).map(move |i| (id.clone(), i)))
                .collect();
            idx.sort_by_key(|(id, i)| self.data_set_errors[id].1[*i].error_id);
            idx
        });
        index
            .iter()
            .map(|(id, i)| &self.data_set_errors[id].1[*i])
            .collect()
    }

    /// Histogram of `error_id -> count`. Memoized on first access.
    pub fn num_errors_per_id(&self) -> &HashMap<u32, usize> {
        self.histogram.get_or_init(|| {
            let mut hist = HashMap::new();
            for (_, errs) in self.data_set_errors.values() {
                for e in errs {
                    *hist.entry(e.error_id).or_insert(0) += 1;
                }
            }
            hist
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn num_succeeds(&self) -> usize {
        self.succeeded.len()
    }

    pub fn num_fails(&self) -> usize {
        self.data_set_errors.len()
    }

    pub fn num_errors_total(&self) -> usize {
        self.data_set_errors.values().map(|(_, e)| e.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::JsonRecord;

    fn err(error_id: u32) -> ValidationError {
        ValidationError {
            error_id,
            message_detail: "boom".to_string(),
            data_set_id: "r".to_string(),
            data_set_class: "JsonRecord",
            validator_name: "v".to_string(),
            provided_params: vec![],
            cause: Box::from("boom"),
        }
    }

    #[test]
    fn succeeded_and_failed_partition_the_input() {
        let succeeded: Arc<dyn Record> =
            Arc::new(JsonRecord::new("ok", serde_json::json!({})));
        let failed: Arc<dyn Record> = Arc::new(JsonRecord::new("bad", serde_json::json!({})));
        let mut errors = HashMap::new();
        errors.insert("bad".to_string(), (failed.clone(), vec![err(5), err(1)]));

        let result = ValidationResult::new(2, vec![succeeded], errors);
        assert_eq!(result.num_succeeds(), 1);
        assert_eq!(result.num_fails(), 1);
        assert_eq!(result.num_errors_total(), 2);
        assert_eq!(result.total(), 2);
    }

    #[test]
    fn all_errors_sorted_by_error_id_and_memoized() {
        let mut errors = HashMap::new();
        let rec: Arc<dyn Record> = Arc::new(JsonRecord::new("bad", serde_json::json!({})));
        errors.insert("bad".to_string(), (rec, vec![err(5), err(1), err(3)]));
        let result = ValidationResult::new(1, vec![], errors);

        let ids: Vec<u32> = result.all_errors().iter().map(|e| e.error_id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        // Second call hits the memoized index and returns the same thing.
        let ids_again: Vec<u32> = result.all_errors().iter().map(|e| e.error_id).collect();
        assert_eq!(ids, ids_again);
    }

    #[test]
    fn histogram_counts_by_id() {
        let mut errors = HashMap::new();
        let rec: Arc<dyn Record> = Arc::new(JsonRecord::new("bad", serde_json::json!({})));
        errors.insert("bad".to_string(), (rec, vec![err(1), err(1), err(5)]));
        let result = ValidationResult::new(1, vec![], errors);
        let hist = result.num_errors_per_id();
        assert_eq!(hist.get(&1), Some(&2));
        assert_eq!(hist.get(&5), Some(&1));
    }
}
