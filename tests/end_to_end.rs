mod common;

use common::{registry_with, sqlite_store, CountingStore, ENGINE};
use serde_json::{json, Value};
use std::sync::{atomic::Ordering, Arc};
use stepfn::deploy::LocalDeployer;
use stepfn::runtime::{ExecutionEngine, SandboxLimits, ScriptSandbox};
use stepfn::workflow::{
    registration::register, token::ClientContext, types::TraceContext, RegistrationRequest,
    RoutingToken,
};
use stepfn::StepFnError;

const DEFINITION: &str = r#"{"States":{"A":{"Type":"Task","Resource":"arn:aws:states:::lambda:invoke","Parameters":{"FunctionName":"h"}}}}"#;

fn engine_over(registry: stepfn::ScriptRegistry) -> ExecutionEngine {
    ExecutionEngine::new(
        Arc::new(registry),
        Arc::new(ScriptSandbox::new(SandboxLimits::default())),
    )
}

#[tokio::test]
async fn registered_step_runs_through_the_shared_engine() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let registry = registry_with(store, Arc::new(LocalDeployer::new(common::naming())));

    let outcome = register(
        &registry,
        RegistrationRequest {
            id: None,
            script: "function h(x) return x + 1 end".into(),
            definition: DEFINITION.into(),
            input: Value::Null,
            write_key: "k1".into(),
        },
        TraceContext::default(),
    )
    .await
    .unwrap();

    let record = registry.fetch(&outcome.id).await.unwrap().unwrap();
    let definition: Value = serde_json::from_str(&record.definition).unwrap();
    let params = &definition["States"]["A"]["Parameters"];
    assert_eq!(params["FunctionName"], ENGINE);

    let encoded = params["ClientContext"].as_str().unwrap().to_string();
    let token = RoutingToken::decode(&encoded).unwrap();
    assert_eq!(token, RoutingToken::new(outcome.id.clone(), "h"));

    let engine = engine_over(registry);
    assert_eq!(engine.execute(encoded.as_str(), json!(5)).await.unwrap(), json!(6));

    let mut custom = std::collections::HashMap::new();
    custom.insert("Id".to_string(), outcome.id.clone());
    custom.insert("Handler".to_string(), "h".to_string());
    let context = ClientContext { custom };
    assert_eq!(engine.execute(&context, json!(41)).await.unwrap(), json!(42));
    assert_eq!(engine.sandbox().stats().invocations, 2);
}

#[tokio::test]
async fn engine_sees_the_latest_script_after_update() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(sqlite_store(&dir).await, Arc::new(LocalDeployer::new(common::naming())));

    let request = |id: Option<String>, script: &str| RegistrationRequest {
        id,
        script: script.into(),
        definition: DEFINITION.into(),
        input: Value::Null,
        write_key: "k1".into(),
    };
    let first = register(&registry, request(None, "function h(x) return x + 1 end"), TraceContext::default())
        .await
        .unwrap();
    let engine = engine_over(registry);
    let token = RoutingToken::new(first.id.clone(), "h").encode();
    assert_eq!(engine.execute(token.as_str(), json!(1)).await.unwrap(), json!(2));

    // Re-register through a second registry over the same database file.
    let registry = registry_with(sqlite_store(&dir).await, Arc::new(LocalDeployer::new(common::naming())));
    let again = register(
        &registry,
        request(Some(first.id.clone()), "function h(x) return x * 10 end"),
        TraceContext::default(),
    )
    .await
    .unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(engine.execute(token.as_str(), json!(3)).await.unwrap(), json!(30));
}

#[tokio::test]
async fn malformed_token_never_reaches_the_store() {
    let store = Arc::new(CountingStore::default());
    let engine = engine_over(registry_with(store.clone(), Arc::new(LocalDeployer::new(common::naming()))));

    for garbage in ["", "not base64!", "bm90IGpzb24=", "e30="] {
        let err = engine.execute(garbage, json!(1)).await.unwrap_err();
        assert!(matches!(err, StepFnError::MalformedRoutingToken(_)), "{garbage}: {err:?}");
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.sandbox().stats().invocations, 0);
}

#[tokio::test]
async fn unknown_id_is_script_not_found() {
    let store = Arc::new(CountingStore::default());
    let engine = engine_over(registry_with(store.clone(), Arc::new(LocalDeployer::new(common::naming()))));

    let token = RoutingToken::new("S01ARZ3NDEKTSV4RRFFQ69G5FAV", "h").encode();
    let err = engine.execute(token.as_str(), json!(1)).await.unwrap_err();
    assert!(matches!(err, StepFnError::ScriptNotFound(ref id) if id == "S01ARZ3NDEKTSV4RRFFQ69G5FAV"));
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_failures_are_reported_with_their_kind() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(sqlite_store(&dir).await, Arc::new(LocalDeployer::new(common::naming())));
    let outcome = register(
        &registry,
        RegistrationRequest {
            id: None,
            script: "function h(x) error('boom') end".into(),
            definition: DEFINITION.into(),
            input: Value::Null,
            write_key: "k".into(),
        },
        TraceContext::default(),
    )
    .await
    .unwrap();
    let engine = engine_over(registry);

    let err = engine
        .execute(RoutingToken::new(outcome.id.clone(), "h").encode().as_str(), json!(1))
        .await
        .unwrap_err();
    match err {
        StepFnError::ScriptExecutionFailed(failure) => assert_eq!(failure.kind(), "runtime_exception"),
        other => panic!("unexpected {other:?}"),
    }

    let err = engine
        .execute(RoutingToken::new(outcome.id, "missing").encode().as_str(), json!(1))
        .await
        .unwrap_err();
    match err {
        StepFnError::ScriptExecutionFailed(failure) => assert_eq!(failure.kind(), "handler_not_found"),
        other => panic!("unexpected {other:?}"),
    }
}
