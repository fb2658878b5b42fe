use sutta_ox_common::LineSource;

use crate::buffer::{ReleaseUnit, UnterminatedBlock};
use crate::segment::{Line, segment_message};
use crate::stream::{MessageStream, StreamItem, StreamOutcome};

/// Accumulates release units into the full message text.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    text: String,
    blocks: usize,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: &ReleaseUnit) {
        if unit.block_kind().is_some() {
            self.blocks += 1;
        }
        self.text.push_str(unit.as_str());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Completed blocks seen so far.
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    /// An unterminated block is kept as best-effort plain text unless the
    /// stream was cancelled.
    pub fn finish(
        mut self,
        outcome: StreamOutcome,
        unterminated: Option<UnterminatedBlock>,
    ) -> AssembledMessage {
        if let Some(block) = &unterminated {
            if !outcome.is_cancelled() {
                self.text.push_str(&block.partial);
            }
        }
        AssembledMessage {
            text: self.text,
            outcome,
            unterminated,
        }
    }
}

#[derive(Debug)]
pub struct AssembledMessage {
    pub text: String,
    pub outcome: StreamOutcome,
    pub unterminated: Option<UnterminatedBlock>,
}

impl AssembledMessage {
    pub fn lines(&self) -> Vec<Line> {
        segment_message(&self.text)
    }

    /// Completed with every block closed.
    pub fn is_clean(&self) -> bool {
        self.outcome.is_completed() && self.unterminated.is_none()
    }
}

/// Drives `stream` to its end and assembles the message.
pub async fn collect_message<L: LineSource>(mut stream: MessageStream<L>) -> AssembledMessage {
    let mut assembler = MessageAssembler::new();
    let mut unterminated = None;

    while let Some(item) = stream.next().await {
        match item {
            StreamItem::Release(unit) => assembler.push(&unit),
            StreamItem::Unterminated(block) => unterminated = Some(block),
            StreamItem::Finished(outcome) => return assembler.finish(outcome, unterminated),
        }
    }

    // `next` always yields `Finished` before `None`.
    assembler.finish(StreamOutcome::Completed, unterminated)
}
