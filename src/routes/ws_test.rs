use super::*;
use crate::frame::CursorPos;
use crate::routes;
use crate::state::test_helpers::{assert_no_event, recv_event, test_app_state, test_app_state_with_cap};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite;

type Rx = mpsc::Receiver<Arc<ServerEvent>>;

/// Connect a participant through the socket-layer hook and consume its welcome.
async fn connect_client(state: &AppState) -> (Uuid, Rx) {
    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(64);
    connect(state, id, None, tx).await;
    let welcome = recv_event(&mut rx).await;
    assert_eq!(welcome.tag(), "welcome");
    (id, rx)
}

fn stroke_text(stroke_id: &str, is_final: bool, points: &Value) -> String {
    json!({
        "event": "stroke",
        "data": {
            "strokeId": stroke_id,
            "isFinal": is_final,
            "points": points,
            "meta": { "color": "#112233", "size": 6, "eraser": false }
        }
    })
    .to_string()
}

// =============================================================================
// HANDLER TABLE
// =============================================================================

#[tokio::test]
async fn connect_announces_new_participant_to_peers() {
    let state = test_app_state();
    let (_a, mut rx_a) = connect_client(&state).await;
    let (b, _rx_b) = connect_client(&state).await;

    let event = recv_event(&mut rx_a).await;
    assert!(matches!(event.as_ref(), ServerEvent::UserJoin(p) if p.id == b));
}

#[tokio::test]
async fn stroke_frames_preview_then_commit() {
    let state = test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;
    let (_b, mut rx_b) = connect_client(&state).await;
    recv_event(&mut rx_a).await; // user-join

    process_inbound_text(&state, a, &stroke_text("s1", false, &json!([{"x": 0.1, "y": 0.1, "t": 100}]))).await;
    let preview = recv_event(&mut rx_b).await;
    assert_eq!(preview.tag(), "op_seg");
    assert_no_event(&mut rx_a).await;

    process_inbound_text(&state, a, &stroke_text("s1", true, &json!([{"x": 0.2, "y": 0.2, "t": 150}]))).await;
    for rx in [&mut rx_a, &mut rx_b] {
        let event = recv_event(rx).await;
        let ServerEvent::OpAdd { op } = event.as_ref() else {
            panic!("expected op_add, got {event:?}");
        };
        assert_eq!(op.data.points.len(), 2);
        assert_eq!(op.data.meta.color.as_deref(), Some("#112233"));
    }

    assert_eq!(state.board.read().await.log.len(), 1);
}

#[tokio::test]
async fn point_cap_from_config_bounds_committed_strokes() {
    let state = test_app_state_with_cap(2);
    let (a, mut rx_a) = connect_client(&state).await;

    let points = json!([{"x": 0.1, "y": 0.1}, {"x": 0.2, "y": 0.2}, {"x": 0.3, "y": 0.3}]);
    process_inbound_text(&state, a, &stroke_text("s1", true, &points)).await;

    let event = recv_event(&mut rx_a).await;
    assert!(matches!(event.as_ref(), ServerEvent::OpAdd { op } if op.data.points.len() == 2));
}

#[tokio::test]
async fn cursor_is_relayed_to_others_only() {
    let state = test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;
    let (_b, mut rx_b) = connect_client(&state).await;
    recv_event(&mut rx_a).await; // user-join

    let text = json!({"event": "cursor", "data": {"x": 0.25, "y": 0.75}}).to_string();
    process_inbound_text(&state, a, &text).await;

    let event = recv_event(&mut rx_b).await;
    let ServerEvent::Cursor { id, cursor } = event.as_ref() else {
        panic!("expected cursor, got {event:?}");
    };
    assert_eq!(*id, a);
    assert_eq!(*cursor, CursorPos { x: 0.25, y: 0.75 });
    assert_no_event(&mut rx_a).await;
    assert!(state.board.read().await.log.is_empty(), "cursor is never logged");
}

#[tokio::test]
async fn undo_and_redo_without_data_are_routed() {
    let state = test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;

    process_inbound_text(&state, a, r#"{"event":"undo"}"#).await;
    assert_eq!(recv_event(&mut rx_a).await.tag(), "undo_none");

    process_inbound_text(&state, a, r#"{"event":"redo","data":null}"#).await;
    assert_eq!(recv_event(&mut rx_a).await.tag(), "redo_none");
}

#[tokio::test]
async fn clear_reaches_everyone() {
    let state = test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;
    let (_b, mut rx_b) = connect_client(&state).await;
    recv_event(&mut rx_a).await; // user-join

    process_inbound_text(&state, a, r#"{"event":"clear","data":{}}"#).await;

    assert_eq!(recv_event(&mut rx_a).await.tag(), "clear");
    assert_eq!(recv_event(&mut rx_b).await.tag(), "clear");
}

#[tokio::test]
async fn malformed_and_unknown_frames_are_dropped() {
    let state = test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;
    let (_b, mut rx_b) = connect_client(&state).await;
    recv_event(&mut rx_a).await; // user-join

    for text in [
        "not json",
        r#"{"data":{}}"#,
        r#"{"event":"teleport","data":{}}"#,
        r#"{"event":"stroke","data":{"strokeId":"s1"}}"#,
        r#"{"event":"stroke","data":{"points":[{"x":"left","y":0.1}]}}"#,
        r#"{"event":"cursor","data":{"x":0.1}}"#,
    ] {
        process_inbound_text(&state, a, text).await;
    }

    assert_no_event(&mut rx_a).await;
    assert_no_event(&mut rx_b).await;
    let board = state.board.read().await;
    assert!(board.log.is_empty());
    assert!(board.strokes.is_empty());
}

#[test]
fn unknown_event_surfaces_as_frame_error() {
    let mut board = Board::new(10);
    let frame = Frame::parse(r#"{"event":"teleport"}"#).expect("envelope");
    let result = dispatch_event(&mut board, Uuid::new_v4(), &frame);
    assert!(matches!(result, Err(FrameError::UnknownEvent(tag)) if tag == "teleport"));
}

#[tokio::test]
async fn disconnect_purges_pending_and_announces_departure() {
    let state = test_app_state();
    let (a, _rx_a) = connect_client(&state).await;
    let (_b, mut rx_b) = connect_client(&state).await;

    process_inbound_text(&state, a, &stroke_text("s1", false, &json!([{"x": 0.1, "y": 0.1}]))).await;
    assert_eq!(recv_event(&mut rx_b).await.tag(), "op_seg");

    disconnect(&state, a).await;

    let event = recv_event(&mut rx_b).await;
    assert!(matches!(event.as_ref(), ServerEvent::UserLeft { id } if *id == a));
    let board = state.board.read().await;
    assert!(board.strokes.is_empty());
    assert!(board.registry.resolve(a).is_none());
}

#[tokio::test]
async fn slow_client_is_detached_instead_of_silently_diverging() {
    let state = test_app_state();
    let (a, mut rx_a) = connect_client(&state).await;

    // Capacity one: the unread welcome fills the queue.
    let b = Uuid::new_v4();
    let (tx_b, mut rx_b) = mpsc::channel(1);
    connect(&state, b, None, tx_b).await;
    recv_event(&mut rx_a).await; // user-join

    process_inbound_text(&state, a, &stroke_text("s1", true, &json!([{"x": 0.1, "y": 0.1}]))).await;
    assert_eq!(recv_event(&mut rx_a).await.tag(), "op_add");

    assert_eq!(recv_event(&mut rx_b).await.tag(), "welcome");
    let closed = timeout(Duration::from_millis(200), rx_b.recv()).await.expect("queue should close");
    assert!(closed.is_none(), "op_add must not be skipped while the queue stays open");

    disconnect(&state, b).await;
    let left = recv_event(&mut rx_a).await;
    assert!(matches!(left.as_ref(), ServerEvent::UserLeft { id } if *id == b));

    // A reconnect bootstraps from the log.
    let (tx_again, mut rx_again) = mpsc::channel(8);
    connect(&state, Uuid::new_v4(), None, tx_again).await;
    let welcome = recv_event(&mut rx_again).await;
    assert!(matches!(welcome.as_ref(), ServerEvent::Welcome { operations, .. } if operations.len() == 1));
}

// =============================================================================
// END TO END
// =============================================================================

async fn next_json<S>(stream: &mut S) -> Value
where
    S: futures::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = timeout(Duration::from_millis(500), stream.next())
            .await
            .expect("socket receive timed out")
            .expect("socket closed")
            .expect("socket error");
        if let tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server sent json");
        }
    }
}

#[tokio::test]
async fn websocket_session_end_to_end() {
    let state = test_app_state();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, routes::app(state)).await;
    });

    let (mut alice, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?name=alice"))
        .await
        .expect("alice connects");
    let welcome = next_json(&mut alice).await;
    assert_eq!(welcome["event"], "welcome");
    assert_eq!(welcome["data"]["name"], "alice");
    assert_eq!(welcome["data"]["operations"], json!([]));

    let (mut bob, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("bob connects");
    let bob_welcome = next_json(&mut bob).await;
    assert_eq!(bob_welcome["data"]["participants"][0]["name"], "alice");
    let join = next_json(&mut alice).await;
    assert_eq!(join["event"], "user-join");
    assert_eq!(join["data"]["id"], bob_welcome["data"]["id"]);

    let stroke = stroke_text("s1", true, &json!([{"x": 0.5, "y": 0.5, "t": 1}]));
    alice.send(tungstenite::Message::Text(stroke.into())).await.expect("send stroke");

    let added = next_json(&mut bob).await;
    assert_eq!(added["event"], "op_add");
    assert_eq!(added["data"]["op"]["userId"], welcome["data"]["id"]);
    assert_eq!(added["data"]["op"]["active"], true);
    assert_eq!(added["data"]["op"]["data"]["points"][0]["x"], 0.5);
    assert_eq!(next_json(&mut alice).await["event"], "op_add");

    alice.send(tungstenite::Message::Text(r#"{"event":"undo"}"#.into())).await.expect("send undo");
    let undone = next_json(&mut bob).await;
    assert_eq!(undone["event"], "op_undo");
    assert_eq!(undone["data"]["id"], added["data"]["op"]["id"]);

    alice.close(None).await.expect("close");
    let left = next_json(&mut bob).await;
    assert_eq!(left["event"], "user-left");
    assert_eq!(left["data"]["id"], welcome["data"]["id"]);
}
