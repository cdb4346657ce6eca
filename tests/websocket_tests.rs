//! End-to-end tests over a real socket.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

use convergence::{api::routes::create_app, AppState, ConvergenceConfig};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (SocketAddr, AppState) {
    let state = AppState::new(ConvergenceConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    let app = create_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

async fn connect(addr: SocketAddr) -> Socket {
    let (mut socket, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("Failed to connect");
    let welcome = next_of_type(&mut socket, "welcome").await;
    assert!(welcome["message"].is_string());
    socket
}

async fn send(socket: &mut Socket, event: Value) {
    socket
        .send(Message::Text(event.to_string().into()))
        .await
        .unwrap();
}

/// Read frames until one of type `kind` arrives, skipping everything else.
async fn next_of_type(socket: &mut Socket, kind: &str) -> Value {
    let read = async {
        loop {
            let frame = socket.next().await.expect("socket closed").unwrap();
            if let Message::Text(text) = frame {
                let event: Value = serde_json::from_str(text.as_str()).unwrap();
                if event["type"] == kind {
                    return event;
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", kind))
}

async fn register(addr: SocketAddr, platform: &str) -> Socket {
    let mut socket = connect(addr).await;
    send(&mut socket, json!({ "type": "register", "platform": platform })).await;
    let registered = next_of_type(&mut socket, "registered").await;
    assert_eq!(registered["platform"], platform);
    socket
}

#[tokio::test]
async fn test_three_agents_converge() {
    let (addr, _state) = spawn_server().await;
    let mut alpha = register(addr, "alpha").await;
    let mut beta = register(addr, "beta").await;
    let mut gamma = register(addr, "gamma").await;
    let mut user = connect(addr).await;

    send(
        &mut user,
        json!({ "type": "user_message", "content": "hello", "userId": "user-1" }),
    )
    .await;
    let received = next_of_type(&mut user, "message_received").await;
    assert_eq!(received["requiredResponses"], 3);
    assert_eq!(received["recipients"], 3);
    let round_id = received["roundId"].as_str().unwrap().to_string();

    for (socket, platform) in [
        (&mut alpha, "alpha"),
        (&mut beta, "beta"),
        (&mut gamma, "gamma"),
    ] {
        let query = next_of_type(socket, "collective_query").await;
        assert_eq!(query["roundId"], round_id.as_str());
        assert_eq!(query["query"]["content"], "hello");

        send(
            socket,
            json!({
                "type": "agent_response",
                "roundId": round_id,
                "content": format!("{} answers", platform)
            }),
        )
        .await;
        let ack = next_of_type(socket, "response_recorded").await;
        assert_eq!(ack["counted"], true);
        assert_eq!(ack["required"], 3);
    }

    let result = next_of_type(&mut alpha, "collective_response").await;
    assert_eq!(result["roundId"], round_id.as_str());
    assert_eq!(result["responses"].as_array().unwrap().len(), 3);
    assert_eq!(result["synthesis"]["responseCount"], 3);
    assert_eq!(result["synthesis"]["consensus"], "multiple perspectives");
}

#[tokio::test]
async fn test_legacy_event_names_accepted() {
    let (addr, state) = spawn_server().await;
    let mut alpha = register(addr, "manus").await;

    send(
        &mut alpha,
        json!({ "type": "user_message", "content": "ping", "userId": "u" }),
    )
    .await;
    let query = next_of_type(&mut alpha, "collective_query").await;
    let round_id = query["roundId"].as_str().unwrap().to_string();

    send(
        &mut alpha,
        json!({ "type": "ai_response", "deliberationId": round_id, "platform": "manus", "content": "pong" }),
    )
    .await;
    next_of_type(&mut alpha, "collective_response").await;

    let round = state
        .coordinator
        .round(&serde_json::from_value(json!(round_id)).unwrap())
        .unwrap();
    assert!(round.is_complete());
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let (addr, _state) = spawn_server().await;
    let mut socket = connect(addr).await;

    send(&mut socket, json!({ "type": "teleport" })).await;
    let error = next_of_type(&mut socket, "error").await;
    assert_eq!(error["code"], "malformed_event");

    send(&mut socket, json!({ "type": "status_request" })).await;
    let status = next_of_type(&mut socket, "status").await;
    assert_eq!(status["totalConnections"], 0);
}

#[tokio::test]
async fn test_closing_socket_unregisters_peer() {
    let (addr, state) = spawn_server().await;
    let mut observer = register(addr, "observer").await;
    let leaver = register(addr, "leaver").await;
    assert_eq!(state.coordinator.registry().live_count(), 2);

    drop(leaver);

    // The remaining peer is told about the new membership
    let update = loop {
        let update = next_of_type(&mut observer, "status_update").await;
        if update["totalConnections"] == 1 {
            break update;
        }
    };
    assert_eq!(update["connectedPeers"][0]["platform"], "observer");
    assert_eq!(state.coordinator.registry().live_count(), 1);
}
