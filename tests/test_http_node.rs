use autofluo::workflow::{
    ExecutionStatus, Node, NodeKind, TriggerKind, Workflow, WorkflowEngine,
};
use axum::{
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

fn manual(name: &str) -> Node {
    Node::trigger(name, TriggerKind::Manual, Map::new())
}

fn http_get(name: &str, url: String) -> Node {
    Node::new(name, NodeKind::HttpRequest, params(json!({"url": url})))
}

fn extract(name: &str, field: &str) -> Node {
    Node::new(
        name,
        NodeKind::Transform,
        params(json!({"operation": "extract_field", "field": field})),
    )
}

fn workflow(nodes: Vec<Node>, connections: &[(&str, &[&str])], triggers: &[&str]) -> Workflow {
    let connections: HashMap<String, Vec<String>> = connections
        .iter()
        .map(|(source, targets)| {
            (
                source.to_string(),
                targets.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect();
    Workflow {
        id: "wf-http".to_string(),
        name: "http workflow".to_string(),
        nodes,
        connections,
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
    }
}

async fn spawn_test_server() -> String {
    async fn post_one() -> Json<Value> {
        Json(json!({"title": "Greetings", "author": "Ada"}))
    }

    async fn failing() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn plain() -> &'static str {
        "plain text"
    }

    async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let token = headers
            .get("x-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Json(json!({"received": body, "token": token}))
    }

    let app = Router::new()
        .route("/posts/1", get(post_one))
        .route("/fail", get(failing))
        .route("/plain", get(plain))
        .route("/echo", post(echo));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test server");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server died");
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_then_extract_happy_path() {
    let base = spawn_test_server().await;
    let engine = WorkflowEngine::new();

    let wf = workflow(
        vec![
            manual("start"),
            http_get("fetch", format!("{base}/posts/1")),
            extract("title", "title"),
        ],
        &[("start", &["fetch"]), ("fetch", &["title"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;

    assert!(context.errors.is_empty(), "errors: {:?}", context.errors);
    assert_eq!(context.history, vec!["fetch", "title"]);

    let fetch = context.get("fetch").unwrap();
    assert_eq!(fetch["status"], json!(200));
    assert_eq!(fetch["success"], json!(true));
    assert_eq!(fetch["body"]["title"], json!("Greetings"));

    // The parsed body is what flows downstream, so the field extracts directly.
    assert_eq!(context.get("title"), Some(&json!("Greetings")));
}

#[tokio::test]
async fn server_error_fails_the_branch_but_not_the_run() {
    let base = spawn_test_server().await;
    let engine = WorkflowEngine::new();

    let wf = workflow(
        vec![
            manual("start"),
            http_get("h1", format!("{base}/fail")),
            extract("t1", "title"),
            http_get("h2", format!("{base}/posts/1")),
            extract("t2", "title"),
        ],
        &[("start", &["h1", "h2"]), ("h1", &["t1"]), ("h2", &["t2"])],
        &["start"],
    );

    let (context, record) = engine.run_recorded(&wf, None).await;

    assert!(context.history.contains(&"h2".to_string()));
    assert!(context.history.contains(&"t2".to_string()));
    assert!(!context.history.contains(&"t1".to_string()));
    assert!(context.get("h1").is_none());

    let mentioning_h1: Vec<&String> = context
        .errors
        .iter()
        .filter(|e| e.contains("h1"))
        .collect();
    assert_eq!(mentioning_h1.len(), 1);
    assert!(mentioning_h1[0].contains("status 500"));

    assert_eq!(record.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn unreachable_host_surfaces_transport_error() {
    let engine = WorkflowEngine::new();

    // The discard port on loopback refuses the connection immediately.
    let wf = workflow(
        vec![
            manual("start"),
            http_get("fetch", "http://127.0.0.1:9/".to_string()),
        ],
        &[("start", &["fetch"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;

    assert!(!context.history.contains(&"fetch".to_string()));
    assert!(context
        .errors
        .iter()
        .any(|e| e.starts_with("Error in node fetch: HTTP request failed")));
}

#[tokio::test]
async fn non_json_response_keeps_raw_text() {
    let base = spawn_test_server().await;
    let engine = WorkflowEngine::new();

    let wf = workflow(
        vec![manual("start"), http_get("fetch", format!("{base}/plain"))],
        &[("start", &["fetch"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;

    assert!(context.errors.is_empty());
    let fetch = context.get("fetch").unwrap();
    assert_eq!(fetch["raw"], json!("plain text"));
    assert_eq!(fetch["body"], Value::Null);
}

#[tokio::test]
async fn post_sends_configured_body_and_headers() {
    let base = spawn_test_server().await;
    let engine = WorkflowEngine::new();

    let node = Node::new(
        "send",
        NodeKind::HttpRequest,
        params(json!({
            "url": format!("{base}/echo"),
            "method": "post",
            "headers": {"x-token": "sesame"},
            "body": {"value": 42}
        })),
    );

    let wf = workflow(
        vec![manual("start"), node],
        &[("start", &["send"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;

    assert!(context.errors.is_empty(), "errors: {:?}", context.errors);
    let send = context.get("send").unwrap();
    assert_eq!(send["body"]["received"]["value"], json!(42));
    assert_eq!(send["body"]["token"], json!("sesame"));
}

#[tokio::test]
async fn missing_url_parameter_fails_validation() {
    let engine = WorkflowEngine::new();
    let node = Node::new("fetch", NodeKind::HttpRequest, Map::new());

    let wf = workflow(
        vec![manual("start"), node],
        &[("start", &["fetch"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;
    assert_eq!(
        context.errors,
        vec!["Error in node fetch: Missing required parameter: url"]
    );
}
