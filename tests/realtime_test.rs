//! Realtime session integration tests
//!
//! Sessions are driven directly: frames go in through `handle_frame` and
//! whatever the session emits is read back from its outbound queue.

mod common;

use std::sync::Arc;
use std::time::Duration;

use collabris::backend::auth::principal::{Principal, Role};
use collabris::backend::auth::users::set_enabled;
use collabris::backend::notifications::db::list_for_user;
use collabris::backend::notifications::{EntityRef, NotificationKind};
use collabris::backend::realtime::{
    ConnectionSession, DeliveryOutcome, Flow, HandshakePolicy, RealtimeContext,
};
use collabris::shared::{BroadcastEvent, Command, Destination, Frame};
use common::{create_test_project, create_test_user, TestApp, TestUser};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn context(app: &TestApp) -> Arc<RealtimeContext> {
    Arc::new(RealtimeContext::from_state(&app.state))
}

fn open(ctx: &Arc<RealtimeContext>) -> (ConnectionSession, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel(64);
    (ConnectionSession::new(ctx.clone(), tx), rx)
}

fn connect_frame(token: Option<&str>) -> Frame {
    let frame = Frame::new(Command::Connect)
        .header("accept-version", "1.2")
        .header("host", "collabris");
    match token {
        Some(token) => frame.header("Authorization", format!("Bearer {}", token)),
        None => frame,
    }
}

fn subscribe_frame(id: &str, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", destination)
        .header("receipt", format!("sub-{}", id))
}

async fn next_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("outbound queue closed")
}

/// Handshake as `user` and expect CONNECTED
async fn connect_as(
    ctx: &Arc<RealtimeContext>,
    user: &TestUser,
) -> (ConnectionSession, mpsc::Receiver<Frame>) {
    let (mut session, mut rx) = open(ctx);
    let flow = session.handle_frame(connect_frame(Some(&user.token))).await;
    assert_eq!(flow, Flow::Continue);
    let connected = next_frame(&mut rx).await;
    assert_eq!(connected.command, Command::Connected);
    assert_eq!(connected.get("user-name"), Some(user.username.as_str()));
    (session, rx)
}

/// Subscribe and wait for the receipt
async fn subscribe(
    session: &mut ConnectionSession,
    rx: &mut mpsc::Receiver<Frame>,
    id: &str,
    destination: &str,
) {
    let flow = session.handle_frame(subscribe_frame(id, destination)).await;
    assert_eq!(flow, Flow::Continue);
    let receipt = next_frame(rx).await;
    assert_eq!(receipt.command, Command::Receipt, "{:?}", receipt);
    assert_eq!(receipt.get("receipt-id"), Some(format!("sub-{}", id).as_str()));
}

async fn expect_error(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    let frame = next_frame(rx).await;
    assert_eq!(frame.command, Command::Error, "{:?}", frame);
    frame
}

#[tokio::test]
async fn test_valid_token_binds_principal() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let user = create_test_user(&app.state, "amy", &[Role::Member]).await;

    let (session, _rx) = connect_as(&ctx, &user).await;
    assert_eq!(session.principal(), Some(&user.principal));
    assert_eq!(app.state.registry().live_sessions(user.id), 1);
}

#[tokio::test]
async fn test_reject_policy_closes_on_bad_token() {
    let app = TestApp::new().await;
    let ctx = context(&app);

    let (mut session, mut rx) = open(&ctx);
    let flow = session.handle_frame(connect_frame(Some("not-a-token"))).await;
    assert_eq!(flow, Flow::Close);
    let error = expect_error(&mut rx).await;
    assert_eq!(error.get("message"), Some("Authentication failed"));

    let (mut session, mut rx) = open(&ctx);
    assert_eq!(session.handle_frame(connect_frame(None)).await, Flow::Close);
    expect_error(&mut rx).await;
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let user = create_test_user(&app.state, "bo", &[Role::Member]).await;

    let long_ago = chrono::Utc::now().timestamp() - app.state.tokens.ttl_secs() - 60;
    let expired = app.state.tokens.issue_at(&user.principal, long_ago).unwrap();

    let (mut session, mut rx) = open(&ctx);
    let flow = session.handle_frame(connect_frame(Some(&expired))).await;
    assert_eq!(flow, Flow::Close);
    expect_error(&mut rx).await;
    assert_eq!(app.state.registry().live_sessions(user.id), 0);
}

#[tokio::test]
async fn test_disabled_account_is_rejected_despite_valid_token() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let user = create_test_user(&app.state, "pete", &[Role::Member]).await;
    set_enabled(app.pool(), user.id, false).await.unwrap();

    let (mut session, mut rx) = open(&ctx);
    let flow = session.handle_frame(connect_frame(Some(&user.token))).await;
    assert_eq!(flow, Flow::Close);
    let error = expect_error(&mut rx).await;
    assert_eq!(error.get("message"), Some("Authentication failed"));
    assert_eq!(session.principal(), None);
    assert_eq!(app.state.registry().live_sessions(user.id), 0);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let ghost = Principal::new(4242, "ghost", [Role::Admin]);
    let token = app.state.tokens.issue(&ghost).unwrap();

    let (mut session, mut rx) = open(&ctx);
    assert_eq!(session.handle_frame(connect_frame(Some(&token))).await, Flow::Close);
    expect_error(&mut rx).await;
}

#[tokio::test]
async fn test_disabled_account_stays_anonymous_and_cannot_chat() {
    let app = TestApp::with_policy(HandshakePolicy::Anonymous).await;
    let ctx = context(&app);
    let owner = create_test_user(&app.state, "pete", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;
    set_enabled(app.pool(), owner.id, false).await.unwrap();

    let (mut session, mut rx) = open(&ctx);
    let flow = session.handle_frame(connect_frame(Some(&owner.token))).await;
    assert_eq!(flow, Flow::Continue);
    let connected = next_frame(&mut rx).await;
    assert_eq!(connected.command, Command::Connected);
    assert_eq!(connected.get("user-name"), None);
    assert_eq!(session.principal(), None);

    let send = Frame::new(Command::Send)
        .header("destination", format!("app.chat.{}.send", project))
        .header("receipt", "m1")
        .with_body(r#"{"content":"still here?"}"#);
    assert_eq!(session.handle_frame(send).await, Flow::Continue);
    expect_error(&mut rx).await;
}

#[tokio::test]
async fn test_anonymous_policy_accepts_but_cannot_subscribe() {
    let app = TestApp::with_policy(HandshakePolicy::Anonymous).await;
    let ctx = context(&app);

    let (mut session, mut rx) = open(&ctx);
    let flow = session.handle_frame(connect_frame(Some("garbage"))).await;
    assert_eq!(flow, Flow::Continue);
    let connected = next_frame(&mut rx).await;
    assert_eq!(connected.command, Command::Connected);
    assert_eq!(connected.get("user-name"), None);
    assert!(session.principal().is_none());

    let flow = session
        .handle_frame(subscribe_frame("s1", "stats.dashboard"))
        .await;
    assert_eq!(flow, Flow::Continue);
    expect_error(&mut rx).await;
    assert_eq!(session.subscription_count(), 0);
}

#[tokio::test]
async fn test_frame_before_connect_closes() {
    let app = TestApp::new().await;
    let ctx = context(&app);

    let (mut session, mut rx) = open(&ctx);
    let flow = session
        .handle_frame(subscribe_frame("s1", "stats.dashboard"))
        .await;
    assert_eq!(flow, Flow::Close);
    let error = expect_error(&mut rx).await;
    assert_eq!(error.get("message"), Some("Expected CONNECT"));

    let (mut session, mut rx) = open(&ctx);
    assert_eq!(session.handle_text("NOT A FRAME\n\n\0").await, Flow::Close);
    expect_error(&mut rx).await;
}

#[tokio::test]
async fn test_denials_keep_connection_open() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let owner = create_test_user(&app.state, "cal", &[Role::Manager]).await;
    let outsider = create_test_user(&app.state, "dee", &[Role::Member]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;

    let (mut session, mut rx) = connect_as(&ctx, &outsider).await;

    let room = format!("room.{}", project);
    assert_eq!(
        session.handle_frame(subscribe_frame("s1", &room)).await,
        Flow::Continue
    );
    let error = expect_error(&mut rx).await;
    assert_eq!(error.get("receipt-id"), Some("sub-s1"));

    let queue = format!("user.{}.notifications", owner.id);
    session.handle_frame(subscribe_frame("s2", &queue)).await;
    expect_error(&mut rx).await;

    let unsubscribe = Frame::new(Command::Unsubscribe).header("id", "s1");
    assert_eq!(session.handle_frame(unsubscribe).await, Flow::Continue);
    expect_error(&mut rx).await;

    let send = Frame::new(Command::Send)
        .header("destination", room.as_str())
        .with_body(r#"{"content":"hi"}"#);
    assert_eq!(session.handle_frame(send).await, Flow::Continue);
    expect_error(&mut rx).await;

    session.handle_frame(subscribe_frame("s3", "room.bogus")).await;
    expect_error(&mut rx).await;

    assert_eq!(session.subscription_count(), 0);
    subscribe(&mut session, &mut rx, "s4", "stats.dashboard").await;
    assert_eq!(session.subscription_count(), 1);
    assert!(!session.is_closed());
}

#[tokio::test]
async fn test_duplicate_subscription_id_is_rejected() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let user = create_test_user(&app.state, "eli", &[Role::Member]).await;

    let (mut session, mut rx) = connect_as(&ctx, &user).await;
    subscribe(&mut session, &mut rx, "s1", "stats.dashboard").await;

    let queue = format!("user.{}.notifications", user.id);
    session.handle_frame(subscribe_frame("s1", &queue)).await;
    expect_error(&mut rx).await;
    assert_eq!(session.subscription_count(), 1);
}

#[tokio::test]
async fn test_notification_without_session_is_persisted() {
    let app = TestApp::new().await;
    let source = create_test_user(&app.state, "fay", &[Role::Manager]).await;
    let target = create_test_user(&app.state, "gil", &[Role::Member]).await;
    let service = app.state.notification_service();

    let dispatched = service
        .create_and_send(
            Some(source.id),
            target.id,
            NotificationKind::TaskAssigned,
            "You were assigned a task",
            Some(EntityRef::task(7)),
        )
        .await
        .unwrap()
        .expect("stored");
    assert_eq!(dispatched.delivery, DeliveryOutcome::Miss);

    let stored = list_for_user(app.pool(), target.id, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, "TASK_ASSIGNED");
    assert!(!stored[0].is_read);

    let skipped = service
        .create_and_send(
            Some(target.id),
            target.id,
            NotificationKind::TaskAssigned,
            "self",
            None,
        )
        .await
        .unwrap();
    assert!(skipped.is_none());
}

#[tokio::test]
async fn test_notification_reaches_live_subscriber() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let source = create_test_user(&app.state, "hal", &[Role::Manager]).await;
    let target = create_test_user(&app.state, "ida", &[Role::Member]).await;

    let (mut session, mut rx) = connect_as(&ctx, &target).await;
    let queue = format!("user.{}.notifications", target.id);
    subscribe(&mut session, &mut rx, "n1", &queue).await;

    let dispatched = app
        .state
        .notification_service()
        .create_and_send(
            Some(source.id),
            target.id,
            NotificationKind::ProjectMemberAdded,
            "You were added to Apollo",
            Some(EntityRef::project(3)),
        )
        .await
        .unwrap()
        .expect("stored");
    assert_eq!(dispatched.delivery, DeliveryOutcome::Delivered(1));

    let message = next_frame(&mut rx).await;
    assert_eq!(message.command, Command::Message);
    assert_eq!(message.get("subscription"), Some("n1"));
    assert_eq!(message.destination(), Some(queue.as_str()));
    let body: serde_json::Value = serde_json::from_str(&message.body).unwrap();
    assert_eq!(body["id"], serde_json::json!(dispatched.notification.id));
    assert_eq!(body["message"], "You were added to Apollo");
}

#[tokio::test]
async fn test_room_events_arrive_in_publish_order() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let owner = create_test_user(&app.state, "jon", &[Role::Manager]).await;
    let project = create_test_project(app.pool(), &owner, &[]).await;

    let (mut session, mut rx) = connect_as(&ctx, &owner).await;
    subscribe(&mut session, &mut rx, "r1", &format!("room.{}", project)).await;

    for seq in 0..25 {
        let outcome = app
            .state
            .router
            .publish(BroadcastEvent::chat(project, serde_json::json!({ "seq": seq })));
        assert_eq!(outcome, DeliveryOutcome::Delivered(1));
    }

    for seq in 0..25 {
        let message = next_frame(&mut rx).await;
        let body: serde_json::Value = serde_json::from_str(&message.body).unwrap();
        assert_eq!(body["seq"], seq);
    }
}

#[tokio::test]
async fn test_closing_one_session_leaves_others_untouched() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let owner = create_test_user(&app.state, "kai", &[Role::Manager]).await;
    let member = create_test_user(&app.state, "lea", &[Role::Member]).await;
    let project = create_test_project(app.pool(), &owner, &[&member]).await;
    let room = format!("room.{}", project);

    let (mut first, mut first_rx) = connect_as(&ctx, &owner).await;
    let (mut second, mut second_rx) = connect_as(&ctx, &member).await;
    subscribe(&mut first, &mut first_rx, "a", &room).await;
    subscribe(&mut second, &mut second_rx, "b", &room).await;
    assert_eq!(
        app.state.registry().subscriber_count(&Destination::Room(project)),
        2
    );

    first.close().await;
    assert!(first.is_closed());
    drop(first);
    assert_eq!(app.state.registry().live_sessions(owner.id), 0);
    assert_eq!(
        app.state.registry().subscriber_count(&Destination::Room(project)),
        1
    );

    let outcome = app
        .state
        .router
        .publish(BroadcastEvent::chat(project, serde_json::json!({"content": "still here"})));
    assert_eq!(outcome, DeliveryOutcome::Delivered(1));

    let message = next_frame(&mut second_rx).await;
    assert_eq!(message.get("subscription"), Some("b"));

    let closed = tokio::time::timeout(RECV_TIMEOUT, first_rx.recv())
        .await
        .expect("closed queue resolves");
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_chat_send_reaches_room() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let owner = create_test_user(&app.state, "max", &[Role::Manager]).await;
    let member = create_test_user(&app.state, "nia", &[Role::Member]).await;
    let project = create_test_project(app.pool(), &owner, &[&member]).await;

    let (mut listener, mut listener_rx) = connect_as(&ctx, &member).await;
    subscribe(&mut listener, &mut listener_rx, "room", &format!("room.{}", project)).await;

    let (mut sender, mut sender_rx) = connect_as(&ctx, &owner).await;
    let send = Frame::new(Command::Send)
        .header("destination", format!("app.chat.{}.send", project))
        .header("receipt", "m1")
        .with_body(r#"{"content":"  standup in 5  "}"#);
    assert_eq!(sender.handle_frame(send).await, Flow::Continue);

    let receipt = next_frame(&mut sender_rx).await;
    assert_eq!(receipt.command, Command::Receipt);
    assert_eq!(receipt.get("receipt-id"), Some("m1"));

    let message = next_frame(&mut listener_rx).await;
    assert_eq!(message.command, Command::Message);
    let body: serde_json::Value = serde_json::from_str(&message.body).unwrap();
    assert_eq!(body["content"], "standup in 5");
    assert_eq!(body["senderUsername"], "max");

    let empty = Frame::new(Command::Send)
        .header("destination", format!("app.chat.{}.send", project))
        .with_body(r#"{"content":"   "}"#);
    assert_eq!(sender.handle_frame(empty).await, Flow::Continue);
    expect_error(&mut sender_rx).await;
}

#[tokio::test]
async fn test_join_announcement_reaches_room() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let owner = create_test_user(&app.state, "jo", &[Role::Manager]).await;
    let member = create_test_user(&app.state, "ken", &[Role::Member]).await;
    let outsider = create_test_user(&app.state, "lou", &[Role::Member]).await;
    let project = create_test_project(app.pool(), &owner, &[&member]).await;

    let (mut listener, mut listener_rx) = connect_as(&ctx, &owner).await;
    subscribe(&mut listener, &mut listener_rx, "room", &format!("room.{}", project)).await;

    let (mut joiner, mut joiner_rx) = connect_as(&ctx, &member).await;
    let join = Frame::new(Command::Send)
        .header("destination", format!("app.chat.{}.join", project))
        .header("receipt", "j1");
    assert_eq!(joiner.handle_frame(join).await, Flow::Continue);
    let receipt = next_frame(&mut joiner_rx).await;
    assert_eq!(receipt.get("receipt-id"), Some("j1"));

    let message = next_frame(&mut listener_rx).await;
    let body: serde_json::Value = serde_json::from_str(&message.body).unwrap();
    assert_eq!(body["type"], "JOIN");
    assert_eq!(body["content"], "ken joined the chat");
    assert_eq!(body["senderUsername"], "ken");

    let (mut stranger, mut stranger_rx) = connect_as(&ctx, &outsider).await;
    let join = Frame::new(Command::Send).header("destination", format!("app.chat.{}.join", project));
    assert_eq!(stranger.handle_frame(join).await, Flow::Continue);
    expect_error(&mut stranger_rx).await;

    let subscribe_join = subscribe_frame("bad", &format!("app.chat.{}.join", project));
    assert_eq!(listener.handle_frame(subscribe_join).await, Flow::Continue);
    expect_error(&mut listener_rx).await;
}

#[tokio::test]
async fn test_disconnect_sends_receipt_and_closes() {
    let app = TestApp::new().await;
    let ctx = context(&app);
    let user = create_test_user(&app.state, "ola", &[Role::Member]).await;

    let (mut session, mut rx) = connect_as(&ctx, &user).await;

    let again = session.handle_frame(connect_frame(Some(&user.token))).await;
    assert_eq!(again, Flow::Continue);
    let error = expect_error(&mut rx).await;
    assert_eq!(error.get("message"), Some("Already connected"));

    let disconnect = Frame::new(Command::Disconnect).header("receipt", "bye");
    assert_eq!(session.handle_frame(disconnect).await, Flow::Close);
    let receipt = next_frame(&mut rx).await;
    assert_eq!(receipt.command, Command::Receipt);
    assert_eq!(receipt.get("receipt-id"), Some("bye"));

    session.close().await;
    assert_eq!(app.state.registry().connection_count(), 0);
}
