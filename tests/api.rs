use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use stepfn::config::{Config, DatabaseConfig, DeploymentConfig, EngineConfig, ServerConfig};
use stepfn::server::{build_router, create_state};
use stepfn::workflow::RoutingToken;
use tower::ServiceExt;

const DEFINITION: &str = r#"{"States":{"A":{"Type":"Task","Resource":"arn:aws:states:::lambda:invoke","Parameters":{"FunctionName":"h"}}}}"#;

fn config(dir: &tempfile::TempDir) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig {
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
        },
        engine: EngineConfig {
            address: "arn:aws:lambda:eu-west-1:111111111111:function:engine".into(),
            script_timeout_ms: 1000,
            script_memory_mb: 16,
        },
        deployment: DeploymentConfig {
            region: "eu-west-1".into(),
            account_id: "111111111111".into(),
            role_arn: "arn:aws:iam::111111111111:role/stepfn".into(),
        },
    }
}

async fn app(dir: &tempfile::TempDir) -> Router {
    build_router(create_state(&config(dir)).await.unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthz_answers() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let (status, body) = send(&app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn register_lookup_and_invoke() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let mut request = post_json(
        "/api/registrations",
        json!({
            "script": "function h(x) return x + 1 end",
            "definition": DEFINITION,
            "input": { "start": 5 },
            "writeKey": "k1"
        }),
    );
    request
        .headers_mut()
        .insert("x-amzn-trace-id", "Root=1-5759e988-bd862e3fe1be46a994272793;Sampled=1".parse().unwrap());
    let (status, outcome) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    let id = outcome["id"].as_str().unwrap().to_string();
    assert_eq!(
        outcome["deployedResourceHandle"],
        format!("arn:aws:states:eu-west-1:111111111111:stateMachine:stepfn-{id}")
    );
    assert_eq!(outcome["traceId"], "1-5759e988-bd862e3fe1be46a994272793");

    let (status, view) = send(
        &app,
        Request::get(format!("/api/registrations/{id}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["Script"], "function h(x) return x + 1 end");
    assert_eq!(view["Input"], r#"{"start":5}"#);
    assert!(view.get("WriteKey").is_none());
    let definition: Value = serde_json::from_str(view["Definition"].as_str().unwrap()).unwrap();
    let params = &definition["States"]["A"]["Parameters"];
    assert_eq!(params["FunctionName"], "arn:aws:lambda:eu-west-1:111111111111:function:engine");

    let invoke = Request::post("/invoke")
        .header("x-client-context", params["ClientContext"].as_str().unwrap())
        .body(Body::from("5"))
        .unwrap();
    let (status, result) = send(&app, invoke).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result, json!(6));
}

#[tokio::test]
async fn wrong_write_key_registers_a_new_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let body = |id: Option<&str>, key: &str| {
        json!({ "id": id, "script": "function h(x) return x end", "definition": DEFINITION, "writeKey": key })
    };

    let (_, first) = send(&app, post_json("/api/registrations", body(None, "k1"))).await;
    let first_id = first["id"].as_str().unwrap();
    let (status, second) = send(&app, post_json("/api/registrations", body(Some(first_id), "k2"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second["id"], first["id"]);
    assert!(second.get("traceId").is_none());
}

#[tokio::test]
async fn error_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(
        &app,
        Request::get("/api/registrations/S01ARZ3NDEKTSV4RRFFQ69G5FAV").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "RecordNotFound");

    let (status, body) = send(
        &app,
        post_json(
            "/api/registrations",
            json!({ "script": "", "definition": "{\"States\":[]}", "writeKey": "k" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "MalformedDefinition");

    let (status, body) = send(
        &app,
        Request::post("/api/registrations").body(Body::from("not json")).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");
    assert!(body["error"].as_str().is_some());

    let (status, body) = send(&app, post_json("/api/registrations", json!({ "script": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");

    let (status, body) = send(
        &app,
        Request::post("/invoke").body(Body::from(vec![0xff_u8, 0xfe])).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");

    let invoke = Request::post("/invoke")
        .header("x-client-context", "%%%")
        .body(Body::from("1"))
        .unwrap();
    let (status, body) = send(&app, invoke).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "MalformedRoutingToken");

    let (status, _) = send(&app, Request::post("/invoke").body(Body::from("1")).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let token = RoutingToken::new("S01ARZ3NDEKTSV4RRFFQ69G5FAV", "h").encode();
    let invoke = Request::post("/invoke")
        .header("x-client-context", token)
        .body(Body::from("1"))
        .unwrap();
    let (status, body) = send(&app, invoke).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "ScriptNotFound");
}
