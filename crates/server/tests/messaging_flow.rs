//! End-to-end messaging flow over shared server state.
//!
//! Exercises the pieces together the way a session does: authenticate,
//! register sessions, send, read threads, mark read, and watch the
//! conversation snapshots move.

use nexus_server::config::{AppState, ServerConfig};
use nexus_server::models::{Role, ServerEvent, UserId};
use nexus_server::presence::SessionHandle;
use nexus_server::requests::RequestBox;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

struct TestApp {
    _dir: TempDir,
    state: AppState,
}

async fn spawn_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig::with_base_dir(dir.path());
    let state = AppState::init(&config).await.unwrap();
    TestApp { _dir: dir, state }
}

impl TestApp {
    async fn register(&self, name: &str, email: &str, role: Role) -> UserId {
        self.state
            .directory
            .create_user(name, email, role)
            .await
            .unwrap()
            .id
    }

    async fn open_session(&self, user: UserId) -> UnboundedReceiver<ServerEvent> {
        let (handle, rx) = SessionHandle::new(user);
        self.state.presence.register(handle).await;
        rx
    }
}

fn next_message_seq(rx: &mut UnboundedReceiver<ServerEvent>) -> i64 {
    match rx.try_recv().unwrap() {
        ServerEvent::PrivateMessage(m) => m.seq,
        other => panic!("expected a private message, got {other:?}"),
    }
}

#[tokio::test]
async fn tokens_resolve_to_their_owner() {
    let app = spawn_app().await;
    let alice = app
        .register("Alice Founder", "alice@founder.test", Role::Entrepreneur)
        .await;

    let token = app.state.auth.issue(alice).await.unwrap();
    assert_eq!(app.state.auth.verify(&token).await.unwrap(), alice);
    assert!(app.state.auth.verify("bogus").await.is_err());
}

#[tokio::test]
async fn message_reaches_every_session_and_both_sidebars() {
    let app = spawn_app().await;
    let alice = app
        .register("Alice Founder", "alice@founder.test", Role::Entrepreneur)
        .await;
    let ivy = app
        .register("Ivy Investor", "ivy@investor.test", Role::Investor)
        .await;

    let mut alice_phone = app.open_session(alice).await;
    let mut alice_laptop = app.open_session(alice).await;
    let mut ivy_phone = app.open_session(ivy).await;

    let sent = app
        .state
        .delivery
        .send_message(alice, ivy, "Would love to pitch you our product")
        .await
        .unwrap()
        .expect("message should go through");

    assert_eq!(next_message_seq(&mut ivy_phone), sent.seq);
    assert_eq!(next_message_seq(&mut alice_phone), sent.seq);
    assert_eq!(next_message_seq(&mut alice_laptop), sent.seq);

    let alice_view = app.state.conversations.list(alice).await.unwrap();
    let ivy_view = app.state.conversations.list(ivy).await.unwrap();
    assert_eq!(alice_view.len(), 1);
    assert_eq!(ivy_view.len(), 1);
    assert_eq!(alice_view[0].other_user.id, ivy);
    assert_eq!(ivy_view[0].other_user.id, alice);
    assert_eq!(alice_view[0].unread_count, 0);
    assert_eq!(ivy_view[0].unread_count, 1);
}

#[tokio::test]
async fn mark_read_clears_unread_and_refreshes_only_the_reader() {
    let app = spawn_app().await;
    let alice = app
        .register("Alice Founder", "alice@founder.test", Role::Entrepreneur)
        .await;
    let ivy = app
        .register("Ivy Investor", "ivy@investor.test", Role::Investor)
        .await;

    app.state
        .delivery
        .send_message(alice, ivy, "ping")
        .await
        .unwrap();

    let mut alice_rx = app.open_session(alice).await;
    let mut ivy_rx = app.open_session(ivy).await;

    let modified = app
        .state
        .read_state
        .mark_thread_read(ivy, alice)
        .await
        .unwrap();
    assert_eq!(modified, 1);
    app.state.delivery.push_snapshot(ivy).await.unwrap();

    match ivy_rx.try_recv().unwrap() {
        ServerEvent::Conversations(entries) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].unread_count, 0);
        }
        other => panic!("expected a conversations snapshot, got {other:?}"),
    }
    // The sender never observes read state.
    assert!(alice_rx.try_recv().is_err());

    // Marking again changes nothing.
    assert_eq!(
        app.state
            .read_state
            .mark_thread_read(ivy, alice)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn thread_history_is_ordered_and_bidirectional() {
    let app = spawn_app().await;
    let alice = app
        .register("Alice Founder", "alice@founder.test", Role::Entrepreneur)
        .await;
    let ivy = app
        .register("Ivy Investor", "ivy@investor.test", Role::Investor)
        .await;

    for (from, to, body) in [
        (alice, ivy, "hello"),
        (ivy, alice, "hi there"),
        (alice, ivy, "got a minute?"),
    ] {
        app.state
            .delivery
            .send_message(from, to, body)
            .await
            .unwrap()
            .expect("message should go through");
    }

    let thread = app.state.store.thread(alice, ivy).await.unwrap();
    assert_eq!(thread.len(), 3);
    assert!(thread.windows(2).all(|w| w[0].seq < w[1].seq));
    assert_eq!(thread[1].from, ivy);

    // Both participants see the identical thread.
    assert_eq!(app.state.store.thread(ivy, alice).await.unwrap(), thread);
}

#[tokio::test]
async fn typing_signals_reach_only_the_target() {
    let app = spawn_app().await;
    let alice = app
        .register("Alice Founder", "alice@founder.test", Role::Entrepreneur)
        .await;
    let ivy = app
        .register("Ivy Investor", "ivy@investor.test", Role::Investor)
        .await;

    let mut alice_rx = app.open_session(alice).await;
    let mut ivy_rx = app.open_session(ivy).await;

    app.state.delivery.send_typing(alice, ivy, true).await;
    app.state.delivery.send_typing(alice, ivy, false).await;

    assert!(matches!(
        ivy_rx.try_recv().unwrap(),
        ServerEvent::Typing { from } if from == alice
    ));
    assert!(matches!(
        ivy_rx.try_recv().unwrap(),
        ServerEvent::StopTyping { from } if from == alice
    ));
    assert!(alice_rx.try_recv().is_err());
}

#[tokio::test]
async fn connection_requests_flow_between_roles() {
    let app = spawn_app().await;
    let alice = app
        .register("Alice Founder", "alice@founder.test", Role::Entrepreneur)
        .await;
    let ivy = app
        .register("Ivy Investor", "ivy@investor.test", Role::Investor)
        .await;

    let request = app
        .state
        .requests
        .send(ivy, alice, Some("Interested in your round".into()))
        .await
        .unwrap();

    let inbox = app
        .state
        .requests
        .list(alice, RequestBox::Inbox)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].from_name, "Ivy Investor");

    let accepted = app
        .state
        .requests
        .respond(request.id, alice, true)
        .await
        .unwrap();
    assert_eq!(
        accepted.status,
        nexus_server::requests::RequestStatus::Accepted
    );
}
