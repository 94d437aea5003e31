//! End-to-end tests over a real socket: the server is bound to an ephemeral
//! port and driven with the `teamdesk-client` crate.

mod common;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use common::{admin, build_test_app, member, test_state, token_for};
use futures::SinkExt;
use teamdesk_api::state::AppState;
use teamdesk_client::client::StaticToken;
use teamdesk_client::{
    run_session, run_with_reconnect, ClientError, LockClient, RealtimeClient, ReconnectConfig,
    ReconnectOutcome,
};
use teamdesk_core::identity::CallerIdentity;
use teamdesk_core::locks::LockKind;
use teamdesk_core::messages::ServerMessage;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = build_test_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
    addr
}

fn client_for(addr: SocketAddr, identity: &CallerIdentity) -> RealtimeClient {
    RealtimeClient::new(
        format!("ws://{addr}"),
        Arc::new(StaticToken(token_for(identity))),
    )
}

async fn wait_for_connections(state: &AppState, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while state.ws_manager.connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {expected} connections"));
}

fn fast_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        delay: Duration::from_millis(50),
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn handshake_without_token_is_refused() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws")).await;

    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP 401, got {:?}", other.map(|_| ())),
    }
    assert_eq!(state.ws_manager.connection_count().await, 0);
}

#[tokio::test]
async fn invalid_session_maps_to_refused() {
    let addr = spawn_server(test_state()).await;
    let client = RealtimeClient::new(
        format!("ws://{addr}"),
        Arc::new(StaticToken("expired".to_string())),
    );

    assert_matches!(client.connect().await, Err(ClientError::Refused));
}

#[tokio::test]
async fn admission_notifies_admins() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let mut watcher = state.ws_manager.admit("watcher".into(), Some(admin(7, "root"))).await;

    let conn = client_for(addr, &member(9, "bob")).connect().await.expect("connect");
    wait_for_connections(&state, 2).await;

    let msg = tokio::time::timeout(WAIT, watcher.receiver.recv())
        .await
        .expect("admin should be notified")
        .expect("channel open");
    assert_eq!(common::frame_json(msg)["type"], "REFRESH_ACTIVE_USERS");
    drop(conn);
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pong_refreshes_liveness() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;

    let conn = client_for(addr, &member(9, "bob")).connect().await.expect("connect");
    let session = tokio::spawn(run_session(conn, |_| {}));
    wait_for_connections(&state, 1).await;

    let before = state.ws_manager.active_connections().await[0].last_liveness;
    tokio::time::sleep(Duration::from_millis(20)).await;
    state.ws_manager.sweep(chrono::Utc::now()).await;

    tokio::time::timeout(WAIT, async {
        loop {
            let rows = state.ws_manager.active_connections().await;
            if rows.first().is_some_and(|row| row.last_liveness > before) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pong should refresh liveness");

    session.abort();
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_closing() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let token = token_for(&member(9, "bob"));

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws?token={token}"))
        .await
        .expect("connect");
    wait_for_connections(&state, 1).await;
    let before = state.ws_manager.active_connections().await[0].last_liveness;

    socket
        .send(Message::Text("not json {{".to_string()))
        .await
        .expect("send text");
    socket
        .send(Message::Binary(vec![0xff, 0xfe]))
        .await
        .expect("send binary");
    socket
        .send(Message::Text(r#"{"type":"hello"}"#.to_string()))
        .await
        .expect("send unknown type");
    tokio::time::sleep(Duration::from_millis(20)).await;
    socket
        .send(Message::Text(r#"{"type":"pong"}"#.to_string()))
        .await
        .expect("send pong");

    tokio::time::timeout(WAIT, async {
        loop {
            let rows = state.ws_manager.active_connections().await;
            if rows.first().is_some_and(|row| row.last_liveness > before) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pong after malformed frames should refresh liveness");

    assert_eq!(state.ws_manager.connection_count().await, 1);
}

#[tokio::test]
async fn evicted_client_reconnects_after_delay() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let client = client_for(addr, &member(9, "bob"));
    let cancel = CancellationToken::new();

    let loop_cancel = cancel.clone();
    let reconnect = tokio::spawn(async move {
        run_with_reconnect(&client, &fast_reconnect(), |_| {}, &loop_cancel).await
    });
    wait_for_connections(&state, 1).await;
    let first = state.ws_manager.active_connections().await[0].connection_id.clone();

    let evicted = state
        .ws_manager
        .sweep(chrono::Utc::now() + chrono::Duration::seconds(60))
        .await;
    assert_eq!(evicted, vec![first.clone()]);

    tokio::time::timeout(WAIT, async {
        loop {
            let rows = state.ws_manager.active_connections().await;
            if rows.iter().any(|row| row.connection_id != first) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client should reconnect");

    cancel.cancel();
    let outcome = reconnect.await.expect("reconnect task");
    assert_eq!(outcome, ReconnectOutcome::Cancelled);
}

// ---------------------------------------------------------------------------
// Kick
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kick_is_terminal_for_the_client() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let client = client_for(addr, &member(9, "bob"));
    let cancel = CancellationToken::new();
    let seen: Arc<Mutex<Vec<ServerMessage>>> = Arc::default();

    let sink = Arc::clone(&seen);
    let loop_cancel = cancel.clone();
    let reconnect = tokio::spawn(async move {
        run_with_reconnect(
            &client,
            &fast_reconnect(),
            move |msg| sink.lock().expect("lock").push(msg),
            &loop_cancel,
        )
        .await
    });
    wait_for_connections(&state, 1).await;

    state
        .ws_manager
        .broadcast_to_roles(&[teamdesk_core::roles::Role::Member], &ServerMessage::UpdateChart(None))
        .await;
    assert!(state.ws_manager.kick_user(9, "bye").await);

    let outcome = tokio::time::timeout(WAIT, reconnect)
        .await
        .expect("client should stop")
        .expect("reconnect task");
    assert_eq!(outcome, ReconnectOutcome::Kicked("bye".to_string()));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(state.ws_manager.connection_count().await, 0);
    assert_eq!(
        seen.lock().expect("lock").as_slice(),
        &[ServerMessage::UpdateChart(None)]
    );
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lock_client_acquires_and_releases() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let alice = LockClient::new(
        format!("http://{addr}"),
        Arc::new(StaticToken(token_for(&member(1, "alice")))),
    );
    let bob = LockClient::new(
        format!("http://{addr}"),
        Arc::new(StaticToken(token_for(&member(2, "bob")))),
    );

    assert!(alice.acquire(LockKind::Task, 5).await.expect("acquire").success);

    let denied = bob.acquire(LockKind::Task, 5).await.expect("acquire");
    assert!(!denied.success);
    assert_eq!(denied.holder.as_deref(), Some("alice"));

    alice.release(LockKind::Task, 5).await.expect("release task");
    assert!(bob.acquire(LockKind::Task, 5).await.expect("acquire").success);
}

#[tokio::test]
async fn closing_last_tab_releases_locks() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let bob = member(9, "bob");

    let tab1 = client_for(addr, &bob).connect().await.expect("connect");
    let tab2 = client_for(addr, &bob).connect().await.expect("connect");
    wait_for_connections(&state, 2).await;
    state.locks.acquire(LockKind::Team, 3, &bob).await;

    drop(tab1);
    wait_for_connections(&state, 1).await;
    assert!(state.locks.holder(LockKind::Team, 3).await.is_some());

    drop(tab2);
    wait_for_connections(&state, 0).await;
    tokio::time::timeout(WAIT, async {
        while !state.locks.is_empty().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("locks should be released");
}
