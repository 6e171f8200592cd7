//! Wire envelope and its message-type tag.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

/// Current time in millis since Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Envelope type tag.
///
/// Unknown tags survive a decode/encode cycle as `Other`, so newer servers can
/// introduce types without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageType {
    Connect,
    Disconnect,
    Heartbeat,
    Login,
    Register,
    Logout,
    Chat,
    ChatHistory,
    AiRequest,
    AiResponse,
    Location,
    LocationUpdate,
    VideoStart,
    VideoStop,
    VideoFrame,
    Community,
    Notification,
    Other(String),
}

impl MessageType {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Connect => "connect",
            MessageType::Disconnect => "disconnect",
            MessageType::Heartbeat => "heartbeat",
            MessageType::Login => "login",
            MessageType::Register => "register",
            MessageType::Logout => "logout",
            MessageType::Chat => "chat",
            MessageType::ChatHistory => "chat_history",
            MessageType::AiRequest => "ai_request",
            MessageType::AiResponse => "ai_response",
            MessageType::Location => "location",
            MessageType::LocationUpdate => "location_update",
            MessageType::VideoStart => "video_start",
            MessageType::VideoStop => "video_stop",
            MessageType::VideoFrame => "video_frame",
            MessageType::Community => "community",
            MessageType::Notification => "notification",
            MessageType::Other(s) => s,
        }
    }

    /// Parse a tag. Returns `None` only for the empty string.
    pub fn parse(tag: &str) -> Option<Self> {
        let ty = match tag {
            "" => return None,
            "connect" => MessageType::Connect,
            "disconnect" => MessageType::Disconnect,
            "heartbeat" => MessageType::Heartbeat,
            "login" => MessageType::Login,
            "register" => MessageType::Register,
            "logout" => MessageType::Logout,
            "chat" => MessageType::Chat,
            "chat_history" => MessageType::ChatHistory,
            "ai_request" => MessageType::AiRequest,
            "ai_response" => MessageType::AiResponse,
            "location" => MessageType::Location,
            "location_update" => MessageType::LocationUpdate,
            "video_start" => MessageType::VideoStart,
            "video_stop" => MessageType::VideoStop,
            "video_frame" => MessageType::VideoFrame,
            "community" => MessageType::Community,
            "notification" => MessageType::Notification,
            other => MessageType::Other(other.to_owned()),
        };
        Some(ty)
    }
}

impl TryFrom<String> for MessageType {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        MessageType::parse(&s).ok_or_else(|| "message type must not be empty".to_string())
    }
}

impl From<MessageType> for String {
    fn from(ty: MessageType) -> Self {
        match ty {
            MessageType::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform message wrapper carried over the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Message type (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    /// Opaque payload; often JSON-encoded text. `null` decodes as empty.
    #[serde(default, deserialize_with = "string_or_null")]
    pub data: String,
    /// Capture time in millis since epoch.
    #[serde(default = "now_millis")]
    pub timestamp: i64,
    /// Optional bearer credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Reserved correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl Envelope {
    /// Build an envelope stamped with the current time.
    pub fn new(msg_type: MessageType, data: impl Into<String>) -> Self {
        Self {
            msg_type,
            data: data.into(),
            timestamp: now_millis(),
            token: None,
            message_id: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn is_heartbeat(&self) -> bool {
        self.msg_type == MessageType::Heartbeat
    }

    /// True when more than `timeout` has elapsed since `timestamp`.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        now_millis().saturating_sub(self.timestamp) > timeout.as_millis() as i64
    }
}

fn string_or_null<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
