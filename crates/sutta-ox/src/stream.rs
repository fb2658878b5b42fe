//! The decode pipeline: line source → SSE frames → text deltas → block buffer.

use std::collections::VecDeque;

use futures_util::stream::BoxStream;
use sutta_ox_common::{LineSource, SseReader};
use tokio_util::sync::CancellationToken;

use crate::buffer::{BlockBuffer, BufferConfig, ReleaseUnit, UnterminatedBlock};
use crate::delta::{self, EventSignal};
use crate::error::StreamError;
use crate::event::ProtocolEvent;

/// How a stream ended. Exactly one is produced per stream.
#[derive(Debug)]
pub enum StreamOutcome {
    Completed,
    Failed(StreamError),
    Cancelled,
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn error(&self) -> Option<&StreamError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum StreamItem {
    Release(ReleaseUnit),
    /// Warning: emitted just before `Finished` when a block never closed.
    Unterminated(UnterminatedBlock),
    Finished(StreamOutcome),
}

/// A single-consumer stream of release units for one message.
///
/// Not restartable. Once [`StreamItem::Finished`] has been returned,
/// [`MessageStream::next`] yields `None` forever.
pub struct MessageStream<L> {
    reader: Option<SseReader<L>>,
    buffer: BlockBuffer,
    queue: VecDeque<StreamItem>,
    cancel: CancellationToken,
    /// Set when the stream failed before any frame could be read.
    early_outcome: Option<StreamOutcome>,
    finished: bool,
}

impl<L: LineSource> MessageStream<L> {
    pub fn new(source: L) -> Self {
        Self::with_config(source, BufferConfig::default())
    }

    pub fn with_config(source: L, config: BufferConfig) -> Self {
        Self {
            reader: Some(SseReader::new(source)),
            buffer: BlockBuffer::with_config(config),
            queue: VecDeque::new(),
            cancel: CancellationToken::new(),
            early_outcome: None,
            finished: false,
        }
    }

    /// A stream that ends with `outcome` without reading anything.
    pub fn terminated(outcome: StreamOutcome) -> Self {
        Self {
            reader: None,
            buffer: BlockBuffer::new(),
            queue: VecDeque::new(),
            cancel: CancellationToken::new(),
            early_outcome: Some(outcome),
            finished: false,
        }
    }

    /// Ties the stream to an externally owned token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this stream; clone it to cancel from another task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.finished && self.queue.is_empty()
    }

    pub async fn next(&mut self) -> Option<StreamItem> {
        loop {
            // Units queued by an earlier delta are dropped once cancelled.
            if !self.finished && self.early_outcome.is_none() && self.cancel.is_cancelled() {
                self.queue.clear();
                self.abort();
            }
            if let Some(item) = self.queue.pop_front() {
                return Some(item);
            }
            if self.finished {
                return None;
            }
            self.advance().await;
        }
    }

    /// Reads at most one frame and queues whatever it produced.
    async fn advance(&mut self) {
        if let Some(outcome) = self.early_outcome.take() {
            self.finish(outcome);
            return;
        }
        if self.cancel.is_cancelled() {
            self.abort();
            return;
        }
        let Some(reader) = self.reader.as_mut() else {
            self.finish(StreamOutcome::Completed);
            return;
        };

        let read = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            event = reader.next_event::<ProtocolEvent>() => Some(event),
        };

        match read {
            None => self.abort(),
            Some(Ok(Some(event))) => self.handle_event(&event),
            Some(Ok(None)) => {
                log::debug!("stream ended without message_stop");
                self.finish(StreamOutcome::Completed);
            }
            Some(Err(err)) => self.finish(StreamOutcome::Failed(err.into())),
        }
    }

    fn handle_event(&mut self, event: &ProtocolEvent) {
        match delta::classify(event) {
            EventSignal::Text(delta) => {
                self.queue
                    .extend(self.buffer.push(&delta.text).into_iter().map(StreamItem::Release));
            }
            EventSignal::Terminal(outcome) => self.finish(outcome),
            EventSignal::Ignore => {
                if let ProtocolEvent::Unknown { kind, .. } = event {
                    log::debug!("ignoring unknown event kind {kind}");
                }
            }
        }
    }

    /// Completed or failed: flush what the buffer still holds, then close.
    fn finish(&mut self, outcome: StreamOutcome) {
        match self.buffer.finish() {
            Ok(Some(unit)) => self.queue.push_back(StreamItem::Release(unit)),
            Ok(None) => {}
            Err(unterminated) => {
                log::warn!("{unterminated}");
                self.queue.push_back(StreamItem::Unterminated(unterminated));
            }
        }
        if let StreamOutcome::Failed(err) = &outcome {
            log::debug!("stream failed: {err}");
        }
        self.close(outcome);
    }

    /// Cancelled: the partial block is discarded, nothing more is released.
    fn abort(&mut self) {
        self.buffer.cancel();
        self.close(StreamOutcome::Cancelled);
    }

    fn close(&mut self, outcome: StreamOutcome) {
        self.queue.push_back(StreamItem::Finished(outcome));
        self.reader = None;
        self.finished = true;
    }
}

impl<L: LineSource + 'static> MessageStream<L> {
    /// Adapts the pull API to a `futures` stream.
    pub fn into_stream(mut self) -> BoxStream<'static, StreamItem> {
        Box::pin(async_stream::stream! {
            while let Some(item) = self.next().await {
                yield item;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sutta_ox_common::VecLineSource;

    fn text_frame(text: &str) -> String {
        let event = serde_json::json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": { "type": "text_delta", "text": text },
        });
        format!("data: {event}")
    }

    async fn drain<L: LineSource>(mut stream: MessageStream<L>) -> Vec<StreamItem> {
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_item() {
        let lines = vec![
            text_frame("a"),
            "data: {\"type\":\"message_stop\"}".to_string(),
            text_frame("never read"),
        ];
        let items = drain(MessageStream::new(VecLineSource::new(lines))).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], StreamItem::Release(ReleaseUnit::PlainText(t)) if t == "a"));
        assert!(matches!(
            &items[1],
            StreamItem::Finished(StreamOutcome::Completed)
        ));
    }

    #[tokio::test]
    async fn test_terminated_stream_reads_nothing() {
        let stream: MessageStream<VecLineSource> = MessageStream::terminated(
            StreamOutcome::Failed(StreamError::AuthenticationMissing),
        );
        let items = drain(stream).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            StreamItem::Finished(StreamOutcome::Failed(StreamError::AuthenticationMissing))
        ));
    }

    #[tokio::test]
    async fn test_cancel_drops_units_already_queued() {
        let lines = vec![text_frame("a<citation>x</citation>b"), text_frame("c")];
        let mut stream = MessageStream::new(VecLineSource::new(lines));

        let first = stream.next().await;
        assert!(matches!(first, Some(StreamItem::Release(ReleaseUnit::PlainText(t))) if t == "a"));

        stream.cancel();
        assert!(matches!(
            stream.next().await,
            Some(StreamItem::Finished(StreamOutcome::Cancelled))
        ));
        assert!(stream.next().await.is_none());
        assert!(stream.is_finished());
    }

    #[tokio::test]
    async fn test_cancel_before_first_read() {
        let stream = MessageStream::new(VecLineSource::new([text_frame("x")]));
        stream.cancel();
        let items = drain(stream).await;
        assert!(matches!(
            items.as_slice(),
            [StreamItem::Finished(StreamOutcome::Cancelled)]
        ));
    }
}
