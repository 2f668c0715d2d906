//! Property-based tests for the Query Cartesian product and dotted-path
//! navigation, in the style of kairei's `provider/config/tests/proptest`.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::json;

use validex::{
    list_iter, JsonRecord, ManagerConfig, MappedValidator, ParamType, Parameters, Query, Record,
    ValidationManager, ValidatorBuilder,
};

/// Arbitrary record: `x` is a list of `len_x` single-field maps, `y` is a
/// list of `len_y` strings. A `check(x: str, y: str)` validator bound via
/// `x: path("x").iter(list).path("x")` / `y: path("y").iter(list)` must be
/// invoked exactly `len_x * len_y` times.
fn record_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..6, 0usize..6)
}

fn build_record(len_x: usize, len_y: usize) -> JsonRecord {
    let xs: Vec<_> = (0..len_x).map(|i| json!({"x": format!("x{i}")})).collect();
    let ys: Vec<_> = (0..len_y).map(|i| format!("y{i}")).collect();
    JsonRecord::new("r", json!({"x": xs, "y": ys}))
}

proptest! {
    #[test]
    fn cartesian_product_size_matches_the_product_of_factor_lengths((len_x, len_y) in record_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let invoked = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let invoked_cl = invoked.clone();

        let validator = ValidatorBuilder::new("check")
            .param("x", ParamType::Str)
            .param("y", ParamType::Str)
            .build(move |_p: Parameters| {
                let invoked = invoked_cl.clone();
                async move {
                    invoked.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        let mut map = BTreeMap::new();
        map.insert("x".to_string(), Query::new().path("x").iter(list_iter()).path("x"));
        map.insert("y".to_string(), Query::new().path("y").iter(list_iter()));

        let mut manager = ValidationManager::new(ManagerConfig::default());
        manager
            .register(MappedValidator::query_mapped(validator, map).unwrap(), &[], None)
            .unwrap();

        let record: std::sync::Arc<dyn Record> = std::sync::Arc::new(build_record(len_x, len_y));
        let result = runtime.block_on(manager.validate(vec![record], None));

        prop_assert_eq!(invoked.load(std::sync::atomic::Ordering::SeqCst), len_x * len_y);
        prop_assert_eq!(result.num_succeeds(), 1);
        prop_assert_eq!(result.num_fails(), 0);
    }
}

/// Arbitrary non-empty path segments built only of ascii-lowercase
/// identifiers, nested to an arbitrary depth; navigating the path built
/// from the record's own structure must always succeed.
fn nested_path_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}", 1..5)
}

proptest! {
    #[test]
    fn navigating_a_path_built_from_the_records_own_nesting_always_succeeds(segments in nested_path_strategy()) {
        let mut value = json!("leaf");
        for segment in segments.iter().rev() {
            value = json!({ (segment.clone()): value });
        }
        let record = JsonRecord::new("r", value);

        let path = segments.join(".");
        let result = record.get_path(&path);
        prop_assert!(result.is_ok());
        prop_assert_eq!(result.unwrap(), validex::Value::Str("leaf".to_string()));
    }

    #[test]
    fn navigating_one_past_the_known_depth_always_errors(segments in nested_path_strategy()) {
        let mut value = json!("leaf");
        for segment in segments.iter().rev() {
            value = json!({ (segment.clone()): value });
        }
        let record = JsonRecord::new("r", value);

        let mut path = segments.join(".");
        path.push_str(".nonexistent");
        let result = record.get_path(&path);
        prop_assert!(result.is_err());
    }
}
