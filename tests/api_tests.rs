use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use convergence::{
    api::routes::create_app,
    peers::ConnectionHandle,
    AppState, ConvergenceConfig, Coordinator, DeliberationStore, PeerRegistry, RoundId,
    ServerEvent,
};
use tokio::sync::mpsc::Receiver;

// ============= Test Helpers =============

struct TestApp {
    server: TestServer,
    coordinator: Arc<Coordinator>,
}

fn create_test_app() -> TestApp {
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(PeerRegistry::new()),
        Arc::new(DeliberationStore::new()),
    ));
    let state = AppState::with_coordinator(ConvergenceConfig::default(), coordinator.clone());
    let server = TestServer::new(create_app(state)).expect("Failed to create test server");

    TestApp {
        server,
        coordinator,
    }
}

fn join(app: &TestApp, platform: &str) -> (convergence::Peer, Receiver<Arc<ServerEvent>>) {
    let (connection, inbox) = ConnectionHandle::channel();
    (
        app.coordinator.register_peer(platform, None, connection),
        inbox,
    )
}

// ============= Service Endpoints =============

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_root_reports_service_info() {
    let app = create_test_app();
    let (_peer, _inbox) = join(&app, "alpha");

    let response = app.server.get("/").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Convergence");
    assert_eq!(body["status"], "running");
    assert_eq!(body["connectedPeers"], 1);
    assert_eq!(body["totalMessages"], 0);
}

#[tokio::test]
async fn test_status_lists_peers() {
    let app = create_test_app();
    let (_a, _inbox_a) = join(&app, "alpha");
    let (_b, _inbox_b) = join(&app, "beta");

    let response = app.server.get("/api/status").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["totalConnections"], 2);
    assert_eq!(body["activeRounds"], 0);
    let mut platforms: Vec<&str> = body["connectedPeers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["platform"].as_str().unwrap())
        .collect();
    platforms.sort();
    assert_eq!(platforms, vec!["alpha", "beta"]);
    assert!(body["fanout"]["delivered"].as_u64().unwrap() > 0);
}

// ============= Message Submission =============

#[tokio::test]
async fn test_submit_message_broadcasts_to_peers() {
    let app = create_test_app();
    let (_a, mut inbox) = join(&app, "alpha");
    let (_b, _inbox_b) = join(&app, "beta");

    let response = app
        .server
        .post("/api/message")
        .json(&json!({
            "content": "What is the capital of France?",
            "userId": "user-1",
            "conversationId": "conv-9"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "broadcast");
    assert_eq!(body["recipients"], 2);
    assert_eq!(body["requiredResponses"], 2);

    let mut saw_query = false;
    while let Ok(event) = inbox.try_recv() {
        if let ServerEvent::CollectiveQuery { query, .. } = event.as_ref() {
            assert_eq!(query.content, "What is the capital of France?");
            assert_eq!(query.platform, "api");
            assert_eq!(query.conversation_id.as_deref(), Some("conv-9"));
            saw_query = true;
        }
    }
    assert!(saw_query);
}

#[tokio::test]
async fn test_submit_message_requires_content() {
    let app = create_test_app();

    let response = app
        .server
        .post("/api/message")
        .json(&json!({ "userId": "user-1" }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("content"));
}

#[tokio::test]
async fn test_submit_message_requires_user_id() {
    let app = create_test_app();

    let response = app
        .server
        .post("/api/message")
        .json(&json!({ "content": "hello", "userId": "" }))
        .await;

    response.assert_status_bad_request();
}

// ============= Rounds =============

#[tokio::test]
async fn test_round_lifecycle_over_rest() {
    let app = create_test_app();
    let (alpha, _inbox_a) = join(&app, "alpha");
    let (beta, _inbox_b) = join(&app, "beta");

    let body: Value = app
        .server
        .post("/api/message")
        .json(&json!({ "content": "hello", "userId": "user-1" }))
        .await
        .json();
    let round_id: RoundId = serde_json::from_value(body["roundId"].clone()).unwrap();

    app.coordinator
        .submit_response(&round_id, alpha.id, "alpha", "bonjour")
        .unwrap();
    let pending: Value = app
        .server
        .get(&format!("/api/rounds/{}", round_id))
        .await
        .json();
    assert_eq!(pending["status"], "in_progress");
    assert!(pending.get("synthesis").is_none());

    app.coordinator
        .submit_response(&round_id, beta.id, "beta", "hola")
        .unwrap();
    let response = app.server.get(&format!("/api/rounds/{}", round_id)).await;

    response.assert_status_ok();
    let round: Value = response.json();
    assert_eq!(round["status"], "complete");
    assert_eq!(round["responses"].as_array().unwrap().len(), 2);
    assert_eq!(round["synthesis"]["responseCount"], 2);
    assert_eq!(round["synthesis"]["consensus"], "multiple perspectives");
}

#[tokio::test]
async fn test_unknown_round_is_not_found() {
    let app = create_test_app();

    let response = app
        .server
        .get(&format!("/api/rounds/{}", RoundId::new()))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_message_without_peers_completes_immediately() {
    let app = create_test_app();

    let body: Value = app
        .server
        .post("/api/message")
        .json(&json!({ "content": "anyone?", "userId": "user-1" }))
        .await
        .json();
    assert_eq!(body["requiredResponses"], 0);

    let round: Value = app
        .server
        .get(&format!("/api/rounds/{}", body["roundId"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(round["status"], "complete");
    assert_eq!(round["synthesis"]["responseCount"], 0);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = create_test_app();

    let response = app.server.get("/api/openapi.json").await;

    response.assert_status_ok();
    let doc: Value = response.json();
    assert!(doc["paths"]["/api/message"].is_object());
    assert!(doc["paths"]["/api/rounds/{round_id}"].is_object());
}
