//! One echo session per WebSocket.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use linkwire_core::protocol::{codec, Envelope, MessageType};

use crate::TEST_TOKEN;

const PING_EVERY: Duration = Duration::from_secs(20);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn ws_upgrade(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(run_session)
}

/// Reply for one inbound text frame. `None` means nothing is sent back.
pub fn reply_to(text: &str) -> Option<Envelope> {
    let env = match codec::decode(text) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable frame");
            return Some(Envelope::new(
                MessageType::Other("error".into()),
                format!("invalid message: {e}"),
            ));
        }
    };

    let reply = match &env.msg_type {
        MessageType::Chat => Envelope::new(
            MessageType::Chat,
            format!("server received your message: {}", env.data),
        ),
        MessageType::AiRequest => Envelope::new(
            MessageType::AiResponse,
            format!("simulated AI reply to \"{}\"", env.data),
        ),
        MessageType::Location => Envelope::new(
            MessageType::Location,
            format!("location received: {}", env.data),
        ),
        MessageType::Heartbeat => Envelope::new(MessageType::Heartbeat, "pong"),
        MessageType::Login => {
            return Some(Envelope::new(MessageType::Login, "登录成功！").with_token(TEST_TOKEN))
        }
        MessageType::Register => {
            return Some(Envelope::new(MessageType::Register, "注册成功！"))
        }
        other => Envelope::new(
            other.clone(),
            format!("server received a {other} message"),
        ),
    };

    // echo the caller's token back on ordinary replies
    Some(match env.token {
        Some(token) => reply.with_token(token),
        None => reply,
    })
}

async fn run_session(socket: WebSocket) {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(256);
    let (mut ws_tx, mut ws_rx) = socket.split();

    tracing::info!("echo session opened");
    push(&out_tx, &Envelope::new(MessageType::Connect, "welcome to the linkwire echo server")).await;

    let mut ping_tick = tokio::time::interval_at(Instant::now() + PING_EVERY, PING_EVERY);
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break };
                if ws_tx.send(m).await.is_err() {
                    break;
                }
            }

            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break };
                last_activity = Instant::now();

                match msg {
                    Message::Text(text) => {
                        tracing::debug!(frame = %text, "received");
                        if let Some(reply) = reply_to(&text) {
                            push(&out_tx, &reply).await;
                        }
                    }
                    Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            if let Some(reply) = reply_to(text) {
                                push(&out_tx, &reply).await;
                            }
                        }
                        Err(_) => tracing::warn!(len = bytes.len(), "non-utf8 binary frame ignored"),
                    },
                    Message::Ping(payload) => {
                        let _ = out_tx.send(Message::Pong(payload)).await;
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }

            _ = ping_tick.tick() => {
                let _ = out_tx.send(Message::Ping(Vec::new())).await;
            }

            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= IDLE_TIMEOUT {
                    tracing::info!("idle timeout");
                    break;
                }
            }
        }
    }

    tracing::info!("echo session closed");
}

async fn push(out: &mpsc::Sender<Message>, env: &Envelope) {
    match codec::encode(env) {
        Ok(text) => {
            let _ = out.send(Message::Text(text)).await;
        }
        Err(e) => tracing::error!(error = %e, "reply encoding failed"),
    }
}
