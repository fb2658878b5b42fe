//! Typed Messages API stream events.
//!
//! Every `data:` frame decodes into one [`ProtocolEvent`]. Event kinds this
//! crate does not know about are kept as [`ProtocolEvent::Unknown`] instead of
//! failing the stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorInfo;

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// Message envelope sent with `message_start`.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageStart {
    pub message: StreamMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentBlockStart {
    #[serde(default)]
    pub index: usize,
    /// Opaque; only deltas are interpreted.
    #[serde(default)]
    pub content_block: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentBlockDelta {
    #[serde(default)]
    pub index: usize,
    pub delta: ContentDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentBlockStop {
    #[serde(default)]
    pub index: usize,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<String>,
    pub stop_sequence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDelta {
    #[serde(default)]
    pub delta: MessageDeltaBody,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamErrorEvent {
    pub error: ErrorInfo,
}

/// One decoded stream frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum ProtocolEvent {
    MessageStart(MessageStart),
    ContentBlockStart(ContentBlockStart),
    ContentBlockDelta(ContentBlockDelta),
    ContentBlockStop(ContentBlockStop),
    MessageDelta(MessageDelta),
    MessageStop,
    Ping,
    Error(StreamErrorEvent),
    /// Forward-compatible fallback for kinds added by the API later.
    Unknown { kind: String, payload: Value },
}

impl ProtocolEvent {
    /// The wire `type` of this event.
    pub fn kind(&self) -> &str {
        match self {
            Self::MessageStart(_) => "message_start",
            Self::ContentBlockStart(_) => "content_block_start",
            Self::ContentBlockDelta(_) => "content_block_delta",
            Self::ContentBlockStop(_) => "content_block_stop",
            Self::MessageDelta(_) => "message_delta",
            Self::MessageStop => "message_stop",
            Self::Ping => "ping",
            Self::Error(_) => "error",
            Self::Unknown { kind, .. } => kind,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MessageStop | Self::Error(_))
    }
}

impl TryFrom<Value> for ProtocolEvent {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, serde_json::Error> {
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Err(serde::de::Error::missing_field("type"));
        };

        let event = match kind.as_str() {
            "message_start" => ProtocolEvent::MessageStart(serde_json::from_value(value)?),
            "content_block_start" => ProtocolEvent::ContentBlockStart(serde_json::from_value(value)?),
            "content_block_delta" => ProtocolEvent::ContentBlockDelta(serde_json::from_value(value)?),
            "content_block_stop" => ProtocolEvent::ContentBlockStop(serde_json::from_value(value)?),
            "message_delta" => ProtocolEvent::MessageDelta(serde_json::from_value(value)?),
            "message_stop" => ProtocolEvent::MessageStop,
            "ping" => ProtocolEvent::Ping,
            "error" => ProtocolEvent::Error(serde_json::from_value(value)?),
            _ => ProtocolEvent::Unknown {
                kind,
                payload: value,
            },
        };
        Ok(event)
    }
}
