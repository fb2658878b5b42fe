use crate::event::{ContentBlockDelta, ContentDelta, ProtocolEvent};
use crate::stream::StreamOutcome;

/// Incremental assistant text carried by a `text_delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    pub text: String,
}

/// What a single event means for the text pipeline.
#[derive(Debug)]
pub enum EventSignal {
    Text(TextDelta),
    Terminal(StreamOutcome),
    Ignore,
}

/// Returns the text fragment of a `content_block_delta` / `text_delta` event.
/// Every other event, including tool-input deltas, yields `None`.
pub fn extract_text_delta(event: &ProtocolEvent) -> Option<TextDelta> {
    match event {
        ProtocolEvent::ContentBlockDelta(ContentBlockDelta {
            delta: ContentDelta::TextDelta { text },
            ..
        }) => Some(TextDelta { text: text.clone() }),
        _ => None,
    }
}

/// `message_stop` completes the stream, an `error` event fails it.
pub fn terminal_outcome(event: &ProtocolEvent) -> Option<StreamOutcome> {
    match event {
        ProtocolEvent::MessageStop => Some(StreamOutcome::Completed),
        ProtocolEvent::Error(payload) => Some(StreamOutcome::Failed(payload.error.clone().into())),
        _ => None,
    }
}

pub fn classify(event: &ProtocolEvent) -> EventSignal {
    if let Some(delta) = extract_text_delta(event) {
        return EventSignal::Text(delta);
    }
    match terminal_outcome(event) {
        Some(outcome) => EventSignal::Terminal(outcome),
        None => EventSignal::Ignore,
    }
}
