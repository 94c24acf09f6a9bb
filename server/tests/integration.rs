//! Integration tests for the hockey server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const TIMEOUT: Duration = Duration::from_secs(2);

/// Start a test server on a random available port and return the WebSocket URL.
async fn start_test_server(goals_to_win: u32) -> String {
    use hockey_server::config::ServerConfig;
    use hockey_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
    use hockey_server::ws::AppState;

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener); // Release the port so the server can bind to it

    let config = ServerConfig {
        listen_addr: addr.to_string(),
        goals_to_win,
        ..Default::default()
    };

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(256);

    let app_state = AppState {
        game_tx,
        broadcast_tx: broadcast_tx.clone(),
    };

    // Start game loop
    let game_config = config.clone();
    tokio::spawn(async move {
        run_game_loop(game_rx, broadcast_tx, game_config).await;
    });

    // Start HTTP/WebSocket server
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(hockey_server::ws::ws_handler))
        .with_state(app_state);

    tokio::spawn(async move {
        let listener = TcpListener::bind(&config.listen_addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("ws://{}/ws", addr)
}

/// Connect to the server and return the WebSocket stream.
async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

/// Read the next text message as JSON.
async fn recv_msg(ws: &mut Ws) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

/// Read messages until one of type `ty` arrives, or give up after `timeout`.
async fn recv_type(ws: &mut Ws, ty: &str, timeout: Duration) -> Option<Value> {
    tokio::time::timeout(timeout, async {
        loop {
            let msg = recv_msg(ws).await;
            if msg["type"] == ty {
                return msg;
            }
        }
    })
    .await
    .ok()
}

async fn send_msg(ws: &mut Ws, msg: Value) {
    ws.send(Message::Text(msg.to_string().into()))
        .await
        .expect("Failed to send");
}

/// Connect two clients one after the other; returns them with their ids.
async fn connect_pair(url: &str) -> ((Ws, u64), (Ws, u64)) {
    let mut ws1 = connect(url).await;
    let welcome1 = recv_msg(&mut ws1).await;
    let mut ws2 = connect(url).await;
    let welcome2 = recv_msg(&mut ws2).await;
    let id1 = welcome1["selfId"].as_u64().unwrap();
    let id2 = welcome2["selfId"].as_u64().unwrap();
    ((ws1, id1), (ws2, id2))
}

fn player_x(tick: &Value, id: u64) -> f64 {
    tick["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"].as_u64() == Some(id))
        .expect("player missing from tick")["position"]["x"]
        .as_f64()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connect_and_receive_welcome() {
    let url = start_test_server(5).await;
    let mut ws = connect(&url).await;

    let msg = recv_msg(&mut ws).await;
    assert_eq!(msg["type"], "welcome");
    assert_eq!(msg["protocolVersion"], 1);
    assert!(msg["selfId"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_single_client_is_not_paired() {
    let url = start_test_server(5).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    assert!(recv_type(&mut ws, "init", Duration::from_millis(300))
        .await
        .is_none());
}

#[tokio::test]
async fn test_two_clients_are_paired() {
    let url = start_test_server(5).await;
    let ((mut ws1, id1), (mut ws2, id2)) = connect_pair(&url).await;
    assert_ne!(id1, id2, "Each client should get a unique ID");

    let init1 = recv_type(&mut ws1, "init", TIMEOUT).await.expect("init for first");
    let init2 = recv_type(&mut ws2, "init", TIMEOUT).await.expect("init for second");

    assert_eq!(init1["matchId"], init2["matchId"]);
    assert_eq!(init1["selfId"].as_u64(), Some(id1));
    assert_eq!(init2["selfId"].as_u64(), Some(id2));
    assert_eq!(init1["players"].as_array().unwrap().len(), 2);
    assert_eq!(init1["goals"].as_array().unwrap().len(), 2);
    assert_eq!(init1["gameSize"]["width"], 1200.0);
    assert_eq!(init1["players"][0]["team"], "left");
    assert_eq!(init1["players"][1]["team"], "right");
}

#[tokio::test]
async fn test_ticks_only_after_both_ready() {
    let url = start_test_server(5).await;
    let ((mut ws1, _), (mut ws2, _)) = connect_pair(&url).await;
    recv_type(&mut ws1, "init", TIMEOUT).await.unwrap();
    recv_type(&mut ws2, "init", TIMEOUT).await.unwrap();

    send_msg(&mut ws1, json!({ "type": "ready" })).await;
    assert!(recv_type(&mut ws1, "tick", Duration::from_millis(300))
        .await
        .is_none());

    send_msg(&mut ws2, json!({ "type": "ready" })).await;
    assert!(recv_type(&mut ws1, "start", TIMEOUT).await.is_some());
    assert!(recv_type(&mut ws2, "start", TIMEOUT).await.is_some());

    let tick = recv_type(&mut ws1, "tick", TIMEOUT).await.expect("tick");
    assert_eq!(tick["players"].as_array().unwrap().len(), 2);
    assert!(tick["ball"]["position"]["x"].is_number());
}

#[tokio::test]
async fn test_move_is_reflected_in_ticks() {
    let url = start_test_server(5).await;
    let ((mut ws1, id1), (mut ws2, _)) = connect_pair(&url).await;
    recv_type(&mut ws1, "init", TIMEOUT).await.unwrap();
    recv_type(&mut ws2, "init", TIMEOUT).await.unwrap();
    send_msg(&mut ws1, json!({ "type": "ready" })).await;
    send_msg(&mut ws2, json!({ "type": "ready" })).await;
    recv_type(&mut ws1, "start", TIMEOUT).await.unwrap();

    let before = player_x(&recv_type(&mut ws1, "tick", TIMEOUT).await.unwrap(), id1);

    // Move away from the ball, towards the own goal
    send_msg(
        &mut ws1,
        json!({ "type": "move", "direction": { "x": -1.0, "y": 0.0 } }),
    )
    .await;

    // Ticks already queued predate the move; wait for one that reflects it
    let moved = tokio::time::timeout(TIMEOUT, async {
        loop {
            let msg = recv_msg(&mut ws1).await;
            if msg["type"] == "tick" && player_x(&msg, id1) < before - 10.0 {
                return;
            }
        }
    })
    .await;
    assert!(moved.is_ok(), "player {} never moved left of {}", id1, before);
}

#[tokio::test]
async fn test_malformed_message_is_ignored() {
    let url = start_test_server(5).await;
    let ((mut ws1, _), (mut ws2, _)) = connect_pair(&url).await;
    recv_type(&mut ws1, "init", TIMEOUT).await.unwrap();

    send_msg(&mut ws1, json!({ "type": "teleport" })).await;
    ws1.send(Message::Text("not json".into())).await.unwrap();

    send_msg(&mut ws1, json!({ "type": "ready" })).await;
    send_msg(&mut ws2, json!({ "type": "ready" })).await;
    assert!(recv_type(&mut ws1, "start", TIMEOUT).await.is_some());
}

#[tokio::test]
async fn test_leaving_ends_match_for_opponent() {
    let url = start_test_server(5).await;
    let ((mut ws1, _), (mut ws2, _)) = connect_pair(&url).await;
    recv_type(&mut ws1, "init", TIMEOUT).await.unwrap();
    recv_type(&mut ws2, "init", TIMEOUT).await.unwrap();

    ws1.close(None).await.unwrap();

    let ended = recv_type(&mut ws2, "ended", TIMEOUT).await.expect("ended");
    assert_eq!(ended["reason"], "opponent_left");
    assert_eq!(ended["winner"], "right");
    assert_eq!(ended["score"]["left"], 0);
    assert_eq!(ended["score"]["right"], 0);
}

#[tokio::test]
async fn test_goal_limit_ends_match() {
    let url = start_test_server(1).await;
    let ((mut ws1, _), (mut ws2, _)) = connect_pair(&url).await;
    recv_type(&mut ws1, "init", TIMEOUT).await.unwrap();
    recv_type(&mut ws2, "init", TIMEOUT).await.unwrap();
    send_msg(&mut ws1, json!({ "type": "ready" })).await;
    send_msg(&mut ws2, json!({ "type": "ready" })).await;
    recv_type(&mut ws1, "start", TIMEOUT).await.unwrap();
    recv_type(&mut ws2, "start", TIMEOUT).await.unwrap();

    // Left player charges through the ball, right player steps aside
    send_msg(
        &mut ws1,
        json!({ "type": "move", "direction": { "x": 1.0, "y": 0.0 } }),
    )
    .await;
    send_msg(
        &mut ws2,
        json!({ "type": "move", "direction": { "x": 0.0, "y": 1.0 } }),
    )
    .await;

    let scored = recv_type(&mut ws1, "scored", Duration::from_secs(10))
        .await
        .expect("scored");
    assert_eq!(scored["teamThatScored"], "left");
    assert_eq!(scored["score"]["left"], 1);

    let ended = recv_type(&mut ws1, "ended", TIMEOUT).await.expect("ended");
    assert_eq!(ended["reason"], "goal_limit");
    assert_eq!(ended["winner"], "left");
}
