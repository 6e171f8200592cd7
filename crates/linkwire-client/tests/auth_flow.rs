#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::sync::Arc;

use tokio::sync::mpsc;

use linkwire_client::auth::{AuthError, AuthKind, AuthResult};
use linkwire_client::config::ClientConfig;
use linkwire_client::AppContext;
use linkwire_core::protocol::{Envelope, MessageType};

use support::{settle, MockConnector};

fn context() -> (AppContext, Arc<MockConnector>) {
    let conn = Arc::new(MockConnector::default());
    let ctx = AppContext::with_connector(ClientConfig::default(), conn.clone()).unwrap();
    (ctx, conn)
}

async fn connected() -> (AppContext, Arc<MockConnector>) {
    let (ctx, conn) = context();
    ctx.manager().connect("ws://host:9000");
    conn.last().open().await;
    (ctx, conn)
}

fn outcomes() -> (
    impl FnOnce(AuthResult) + Send + 'static,
    mpsc::UnboundedReceiver<AuthResult>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (move |r| {
        let _ = tx.send(r);
    }, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<AuthResult>) -> Vec<AuthResult> {
    let mut out = Vec::new();
    while let Ok(r) = rx.try_recv() {
        out.push(r);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn login_offline_fails_without_traffic() {
    let (ctx, conn) = context();
    let (cb, mut rx) = outcomes();

    ctx.auth().login("alice", "secret", cb);
    settle().await;

    let got = drain(&mut rx);
    assert_eq!(got, vec![Err(AuthError::NotConnected)]);
    assert!(got[0]
        .as_ref()
        .unwrap_err()
        .to_string()
        .contains("not connected"));
    assert_eq!(conn.open_count(), 0);
    assert!(!ctx.auth().has_pending());
}

#[tokio::test(start_paused = true)]
async fn blank_credentials_are_rejected_in_order() {
    let (ctx, conn) = connected().await;

    let (cb, mut rx) = outcomes();
    ctx.auth().login("  ", "", cb);
    let (cb2, mut rx2) = outcomes();
    ctx.auth().register("bob", " ", cb2);
    settle().await;

    assert_eq!(drain(&mut rx), vec![Err(AuthError::BlankUsername)]);
    assert_eq!(drain(&mut rx2), vec![Err(AuthError::BlankPassword)]);
    assert!(conn.last().sent.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_success_resolves_once_and_adopts_token() {
    let (ctx, conn) = connected().await;
    let link = conn.last();
    let (cb, mut rx) = outcomes();

    ctx.auth().login("alice", "secret", cb);
    assert!(ctx.auth().has_pending());

    let sent = link.sent_envelopes();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].msg_type, MessageType::Login);
    let creds: serde_json::Value = serde_json::from_str(&sent[0].data).unwrap();
    assert_eq!(creds["username"], "alice");
    assert_eq!(creds["password"], "secret");

    link.envelope(&Envelope::new(MessageType::Login, "登录成功").with_token("tok-1"))
        .await;
    // nothing pending any more: dropped
    link.envelope(&Envelope::new(MessageType::Login, "登录成功")).await;

    let got = drain(&mut rx);
    assert_eq!(got.len(), 1);
    let ok = got[0].as_ref().unwrap();
    assert_eq!(ok.kind, AuthKind::Login);
    assert_eq!(ok.username, "alice");
    assert_eq!(ok.message, "登录成功");

    assert!(!ctx.auth().has_pending());
    assert!(ctx.auth().is_logged_in());
    assert_eq!(ctx.auth().current_username().as_deref(), Some("alice"));
    assert_eq!(ctx.manager().token().as_deref(), Some("tok-1"));
}

#[tokio::test(start_paused = true)]
async fn english_marker_counts_as_success() {
    let (ctx, conn) = connected().await;
    let (cb, mut rx) = outcomes();

    ctx.auth().register("carol", "pw", cb);
    conn.last()
        .envelope(&Envelope::new(MessageType::Register, "register success"))
        .await;

    let got = drain(&mut rx);
    assert_eq!(got.len(), 1);
    assert!(got[0].is_ok());
    // register does not log anyone in
    assert!(!ctx.auth().is_logged_in());
}

#[tokio::test(start_paused = true)]
async fn response_without_marker_is_a_rejection() {
    let (ctx, conn) = connected().await;
    let link = conn.last();

    let (cb, mut rx) = outcomes();
    ctx.auth().login("alice", "wrong", cb);
    link.envelope(&Envelope::new(MessageType::Login, "invalid password"))
        .await;
    assert_eq!(
        drain(&mut rx),
        vec![Err(AuthError::Rejected("invalid password".into()))]
    );

    let (cb, mut rx) = outcomes();
    ctx.auth().register("alice", "pw", cb);
    link.envelope(&Envelope::new(MessageType::Register, "")).await;
    assert_eq!(
        drain(&mut rx),
        vec![Err(AuthError::Rejected("register failed".into()))]
    );
    assert!(!ctx.auth().is_logged_in());
}

#[tokio::test(start_paused = true)]
async fn response_of_other_kind_leaves_request_pending() {
    let (ctx, conn) = connected().await;
    let link = conn.last();
    let (cb, mut rx) = outcomes();

    ctx.auth().login("alice", "secret", cb);
    link.envelope(&Envelope::new(MessageType::Register, "注册成功"))
        .await;
    assert!(drain(&mut rx).is_empty());
    assert!(ctx.auth().has_pending());

    link.envelope(&Envelope::new(MessageType::Login, "登录成功"))
        .await;
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_request_replaces_the_first() {
    let (ctx, conn) = connected().await;
    let (first, mut rx1) = outcomes();
    let (second, mut rx2) = outcomes();

    ctx.auth().login("alice", "secret", first);
    ctx.auth().login("bob", "secret", second);
    conn.last()
        .envelope(&Envelope::new(MessageType::Login, "登录成功"))
        .await;

    assert!(drain(&mut rx1).is_empty());
    let got = drain(&mut rx2);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].as_ref().unwrap().username, "bob");
}

#[tokio::test(start_paused = true)]
async fn send_failure_clears_pending_and_reports() {
    let (ctx, conn) = connected().await;
    conn.last().refuse_sends();
    let (cb, mut rx) = outcomes();

    ctx.auth().login("alice", "secret", cb);
    settle().await;

    assert_eq!(drain(&mut rx), vec![Err(AuthError::SendFailed(AuthKind::Login))]);
    assert!(!ctx.auth().has_pending());
}

#[tokio::test(start_paused = true)]
async fn logout_sends_notice_and_forgets_credentials() {
    let (ctx, conn) = connected().await;
    let link = conn.last();
    let (cb, _rx) = outcomes();
    ctx.auth().login("alice", "secret", cb);
    link.envelope(&Envelope::new(MessageType::Login, "登录成功").with_token("tok-1"))
        .await;

    ctx.auth().logout();

    let sent = link.sent_envelopes();
    let logout = sent.last().unwrap();
    assert_eq!(logout.msg_type, MessageType::Logout);
    assert_eq!(logout.data, "alice");
    assert_eq!(logout.token.as_deref(), Some("tok-1"));
    assert!(!ctx.auth().is_logged_in());
    assert_eq!(ctx.manager().token(), None);
}

#[tokio::test(start_paused = true)]
async fn connect_default_needs_server_url() {
    let (ctx, conn) = context();
    let err = ctx.connect_default().unwrap_err();
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");

    let cfg = linkwire_client::config::load_from_str("serverUrl: ws://example:9000\n").unwrap();
    let ctx = AppContext::with_connector(cfg, conn.clone()).unwrap();
    ctx.connect_default().unwrap();
    assert_eq!(conn.last().address, "ws://example:9000");
}
