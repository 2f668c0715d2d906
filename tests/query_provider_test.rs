use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use validex::{
    list_iter, JsonRecord, ManagerConfig, MappedValidator, ParamType, Parameters, Query, Record,
    ValidationManager, ValidatorBuilder,
};

fn check_validator() -> validex::Validator {
    ValidatorBuilder::new("check")
        .param("x", ParamType::Str)
        .param("y", ParamType::Str)
        .build(|_p: Parameters| async { Ok(()) })
        .unwrap()
}

fn query_map() -> BTreeMap<String, Query> {
    let mut map = BTreeMap::new();
    map.insert("x".to_string(), Query::new().path("x").iter(list_iter()).path("x"));
    map.insert("y".to_string(), Query::new().path("y"));
    map
}

#[tokio::test]
async fn query_iteration_runs_once_per_list_element() {
    let invocations: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let invocations_cl = invocations.clone();

    let validator = ValidatorBuilder::new("check")
        .param("x", ParamType::Str)
        .param("y", ParamType::Str)
        .build(move |p: Parameters| {
            let invocations = invocations_cl.clone();
            async move {
                invocations.lock().unwrap().push(p.get("x").unwrap().param_id.clone());
                Ok(())
            }
        })
        .unwrap();

    let mut manager = ValidationManager::new(ManagerConfig::default());
    manager
        .register(MappedValidator::query_mapped(validator, query_map()).unwrap(), &[], None)
        .unwrap();

    let record: Arc<dyn Record> = Arc::new(JsonRecord::new(
        "r1",
        serde_json::json!({
            "x": [{"x": "Hello"}, {"x": "World"}, {"x": "!"}],
            "y": "lul",
        }),
    ));
    let result = manager.validate(vec![record], None).await;

    assert_eq!(result.num_succeeds(), 1);
    let path_id_pattern = Regex::new(r"^x\[\d+\]\.x$").unwrap();
    let ids = invocations.lock().unwrap().clone();
    assert_eq!(ids.len(), 3);
    for id in &ids {
        assert!(path_id_pattern.is_match(id), "unexpected param_id: {id}");
    }
}

#[tokio::test]
async fn required_missing_via_query_yields_a_single_error() {
    let validator = check_validator();
    let mut manager = ValidationManager::new(ManagerConfig::default());
    manager
        .register(MappedValidator::query_mapped(validator, query_map()).unwrap(), &[], None)
        .unwrap();

    let record: Arc<dyn Record> = Arc::new(JsonRecord::new(
        "r1",
        serde_json::json!({
            "x": [{"x": "Hello"}, {"x": "World"}, {"x": "!"}],
        }),
    ));
    let result = manager.validate(vec![record], None).await;

    let errors = result.errors_for("r1").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_id, validex::error_id::ERROR_ID_PROVIDER_FAILED);
    assert!(errors[0].message_detail.contains("y not provided"));
}
