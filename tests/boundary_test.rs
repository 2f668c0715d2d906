use std::collections::BTreeMap;
use std::sync::Arc;

use validex::{
    list_iter, JsonRecord, ManagerConfig, MappedValidator, ParamType, Parameters, Query, Record,
    ValidationManager, ValidatorBuilder,
};

#[tokio::test]
async fn zero_validators_means_every_record_succeeds() {
    let manager = ValidationManager::new(ManagerConfig::default());
    let records: Vec<Arc<dyn Record>> = vec![
        Arc::new(JsonRecord::new("r1", serde_json::json!({}))),
        Arc::new(JsonRecord::new("r2", serde_json::json!({}))),
    ];
    let result = manager.validate(records, None).await;
    assert_eq!(result.num_succeeds(), 2);
    assert_eq!(result.num_fails(), 0);
}

#[tokio::test]
async fn zero_records_means_an_empty_result() {
    let manager = ValidationManager::new(ManagerConfig::default());
    let result = manager.validate(vec![], None).await;
    assert_eq!(result.total(), 0);
    assert_eq!(result.num_succeeds(), 0);
    assert_eq!(result.num_fails(), 0);
}

#[tokio::test]
async fn all_optional_validator_runs_once_with_defaults_when_the_record_has_nothing() {
    let invoked_with_provided = Arc::new(std::sync::Mutex::new(None));
    let cl = invoked_with_provided.clone();

    let validator = ValidatorBuilder::new("all_optional")
        .optional_param("x", ParamType::Str, validex::Value::Str("fallback".into()))
        .build(move |p: Parameters| {
            let cl = cl.clone();
            async move {
                *cl.lock().unwrap() = Some(p.get("x").unwrap().provided);
                Ok(())
            }
        })
        .unwrap();

    let mut map = BTreeMap::new();
    map.insert("x".to_string(), "missing".to_string());
    let mut manager = ValidationManager::new(ManagerConfig::default());
    manager
        .register(MappedValidator::path_mapped(validator, vec![map]).unwrap(), &[], None)
        .unwrap();

    let record: Arc<dyn Record> = Arc::new(JsonRecord::new("r1", serde_json::json!({})));
    let result = manager.validate(vec![record], None).await;

    assert_eq!(result.num_succeeds(), 1);
    assert_eq!(*invoked_with_provided.lock().unwrap(), Some(false));
}

#[tokio::test]
async fn empty_cartesian_product_is_not_invoked_and_records_no_error() {
    let invoked = Arc::new(std::sync::atomic::AtomicUsize::new(0));
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
    map.insert("y".to_string(), Query::new().path("y").iter(list_iter()).path("y"));

    let mut manager = ValidationManager::new(ManagerConfig::default());
    manager
        .register(MappedValidator::query_mapped(validator, map).unwrap(), &[], None)
        .unwrap();

    // "x" is a non-empty list but "y" is an empty list, so the product is empty.
    let record: Arc<dyn Record> = Arc::new(JsonRecord::new(
        "r1",
        serde_json::json!({"x": [{"x": "a"}], "y": []}),
    ));
    let result = manager.validate(vec![record], None).await;

    assert_eq!(invoked.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(result.num_succeeds(), 1);
    assert_eq!(result.num_fails(), 0);
}
