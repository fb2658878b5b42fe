//! Block-aware chunk buffer.
//!
//! Text deltas arrive in arbitrary pieces, and a `<citation>` or `<pause>`
//! marker can be torn across any number of them. [`BlockBuffer`] sits between
//! the delta extractor and the consumer and releases text only when it is safe:
//! plain text outside any block, or a block span once its closing marker has
//! been seen in full.
//!
//! ```
//! use sutta_ox::buffer::{BlockBuffer, BlockKind, ReleaseUnit};
//!
//! let mut buffer = BlockBuffer::new();
//! let mut units = Vec::new();
//! for fragment in ["Hello ", "<cita", "tion>Snp 4.2</cita", "tion> world"] {
//!     units.extend(buffer.push(fragment));
//! }
//! assert_eq!(units[0], ReleaseUnit::PlainText("Hello ".into()));
//! assert_eq!(units[1].block_kind(), Some(BlockKind::Citation));
//! assert_eq!(units[2], ReleaseUnit::PlainText(" world".into()));
//! ```

use std::fmt;

use bon::Builder;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Citation,
    Pause,
}

impl BlockKind {
    pub const ALL: [BlockKind; 2] = [BlockKind::Citation, BlockKind::Pause];

    pub const fn open_tag(self) -> &'static str {
        match self {
            Self::Citation => "<citation>",
            Self::Pause => "<pause>",
        }
    }

    pub const fn close_tag(self) -> &'static str {
        match self {
            Self::Citation => "</citation>",
            Self::Pause => "</pause>",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Citation => "citation",
            Self::Pause => "pause",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferMode {
    #[default]
    Plain,
    InCitation,
    InPause,
}

impl BufferMode {
    pub fn block(self) -> Option<BlockKind> {
        match self {
            Self::Plain => None,
            Self::InCitation => Some(BlockKind::Citation),
            Self::InPause => Some(BlockKind::Pause),
        }
    }
}

impl From<BlockKind> for BufferMode {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Citation => Self::InCitation,
            BlockKind::Pause => Self::InPause,
        }
    }
}

/// A piece of output that is safe to hand to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseUnit {
    PlainText(String),
    /// Full span, opening and closing markers included.
    CompletedBlock { kind: BlockKind, raw: String },
}

impl ReleaseUnit {
    pub fn as_str(&self) -> &str {
        match self {
            Self::PlainText(text) => text,
            Self::CompletedBlock { raw, .. } => raw,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::PlainText(text) => text,
            Self::CompletedBlock { raw, .. } => raw,
        }
    }

    pub fn block_kind(&self) -> Option<BlockKind> {
        match self {
            Self::PlainText(_) => None,
            Self::CompletedBlock { kind, .. } => Some(*kind),
        }
    }
}

/// The stream ended while a block was still open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream ended inside an unterminated {kind} block ({} bytes buffered)", .partial.len())]
pub struct UnterminatedBlock {
    pub kind: BlockKind,
    /// Everything absorbed since the opening marker, marker included.
    pub partial: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct BufferConfig {
    /// Guard `<pause>` spans in the live path as well as `<citation>` spans.
    #[builder(default = true)]
    pub track_pause: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { track_pause: true }
    }
}

/// Forward-only scanner for citation and pause spans.
///
/// One buffer belongs to one stream. Create a new one per send, or call
/// [`BlockBuffer::reset`] before reusing it for a retry.
#[derive(Debug, Clone, Default)]
pub struct BlockBuffer {
    config: BufferConfig,
    mode: BufferMode,
    /// Open block text; empty whenever `mode` is `Plain`.
    accumulated: String,
    /// Plain-mode tail that may be the start of a torn opening marker.
    held: String,
    cancelled: bool,
}

impl BlockBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BufferConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Bytes withheld in plain mode because they could begin a marker.
    pub fn held(&self) -> &str {
        &self.held
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn tracked(&self) -> impl Iterator<Item = BlockKind> + '_ {
        BlockKind::ALL
            .into_iter()
            .filter(|kind| *kind == BlockKind::Citation || self.config.track_pause)
    }

    /// Feeds one fragment and returns whatever became safe to release, in order.
    pub fn push(&mut self, fragment: &str) -> Vec<ReleaseUnit> {
        let mut releases = Vec::new();
        if self.cancelled || fragment.is_empty() {
            return releases;
        }

        let mut pending = std::mem::take(&mut self.held);
        pending.push_str(fragment);

        while !pending.is_empty() {
            pending = match self.mode.block() {
                None => match self.find_open(&pending) {
                    Some((pos, kind)) => {
                        if pos > 0 {
                            releases.push(ReleaseUnit::PlainText(pending[..pos].to_string()));
                        }
                        log::debug!("{kind} block opened");
                        self.mode = kind.into();
                        pending.split_off(pos)
                    }
                    None => {
                        let keep = self.torn_open_len(&pending);
                        self.held = pending.split_off(pending.len() - keep);
                        if !pending.is_empty() {
                            releases.push(ReleaseUnit::PlainText(pending));
                        }
                        String::new()
                    }
                },
                Some(kind) => match self.absorb(kind, &pending) {
                    Some((raw, rest)) => {
                        log::debug!("{kind} block closed ({} bytes)", raw.len());
                        releases.push(ReleaseUnit::CompletedBlock { kind, raw });
                        rest
                    }
                    None => String::new(),
                },
            };
        }

        for unit in &releases {
            log::trace!("release {:?}", unit);
        }
        releases
    }

    /// Ends the stream. Returns any withheld plain text, or the open block as
    /// an [`UnterminatedBlock`]. The buffer is back in `Plain` afterwards.
    pub fn finish(&mut self) -> Result<Option<ReleaseUnit>, UnterminatedBlock> {
        if self.cancelled {
            return Ok(None);
        }

        let held = std::mem::take(&mut self.held);
        match std::mem::take(&mut self.mode).block() {
            Some(kind) => Err(UnterminatedBlock {
                kind,
                partial: std::mem::take(&mut self.accumulated),
            }),
            None if held.is_empty() => Ok(None),
            None => Ok(Some(ReleaseUnit::PlainText(held))),
        }
    }

    /// Terminal: discards any partial block. Later pushes release nothing.
    pub fn cancel(&mut self) {
        if !self.accumulated.is_empty() {
            log::debug!(
                "discarding {} bytes of an open block on cancellation",
                self.accumulated.len()
            );
        }
        self.clear();
        self.cancelled = true;
    }

    pub fn reset(&mut self) {
        self.clear();
        self.cancelled = false;
    }

    fn clear(&mut self) {
        self.mode = BufferMode::Plain;
        self.accumulated.clear();
        self.held.clear();
    }

    /// Earliest opening marker in `text`.
    fn find_open(&self, text: &str) -> Option<(usize, BlockKind)> {
        self.tracked()
            .filter_map(|kind| text.find(kind.open_tag()).map(|pos| (pos, kind)))
            .min_by_key(|(pos, _)| *pos)
    }

    /// Length of the longest suffix of `text` that is a proper prefix of an
    /// opening marker.
    fn torn_open_len(&self, text: &str) -> usize {
        self.tracked()
            .filter_map(|kind| {
                let tag = kind.open_tag();
                (1..tag.len())
                    .rev()
                    .find(|&len| text.ends_with(&tag[..len]))
            })
            .max()
            .unwrap_or(0)
    }

    /// Appends to the open block. On close, returns the finished span and
    /// the text that followed the closing marker.
    fn absorb(&mut self, kind: BlockKind, text: &str) -> Option<(String, String)> {
        let close = kind.close_tag();
        // A closing marker may straddle the old end of the buffer.
        let from = floor_char_boundary(
            &self.accumulated,
            self.accumulated.len().saturating_sub(close.len() - 1),
        )
        .max(kind.open_tag().len());
        self.accumulated.push_str(text);

        let end = from + self.accumulated[from..].find(close)? + close.len();
        let rest = self.accumulated.split_off(end);
        let raw = std::mem::take(&mut self.accumulated);
        self.mode = BufferMode::Plain;
        Some((raw, rest))
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(buffer: &mut BlockBuffer, fragments: &[&str]) -> Vec<ReleaseUnit> {
        fragments.iter().flat_map(|f| buffer.push(f)).collect()
    }

    fn citation(raw: &str) -> ReleaseUnit {
        ReleaseUnit::CompletedBlock {
            kind: BlockKind::Citation,
            raw: raw.to_string(),
        }
    }

    fn plain(text: &str) -> ReleaseUnit {
        ReleaseUnit::PlainText(text.to_string())
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut buffer = BlockBuffer::new();
        assert_eq!(buffer.push("Breathe in."), vec![plain("Breathe in.")]);
        assert_eq!(buffer.mode(), BufferMode::Plain);
        assert_eq!(buffer.finish(), Ok(None));
    }

    #[test]
    fn test_torn_markers_scenario() {
        let mut buffer = BlockBuffer::new();
        let units = feed(
            &mut buffer,
            &["Hello ", "<cita", "tion><verse>Snp 4.2</verse></cita", "tion> world"],
        );
        assert_eq!(
            units,
            vec![
                plain("Hello "),
                citation("<citation><verse>Snp 4.2</verse></citation>"),
                plain(" world"),
            ]
        );
    }

    #[test]
    fn test_every_split_point_yields_one_block() {
        let source = "<citation>A</citation>";
        for split in 0..=source.len() {
            let mut buffer = BlockBuffer::new();
            let mut units = feed(&mut buffer, &[&source[..split], &source[split..]]);
            units.extend(buffer.finish().unwrap());
            assert_eq!(units, vec![citation(source)], "split at {split}");
        }
    }

    #[test]
    fn test_open_and_close_in_one_fragment_with_surrounding_text() {
        let mut buffer = BlockBuffer::new();
        let units = buffer.push("a<citation>x</citation>b<pause>5 seconds</pause>c");
        assert_eq!(
            units,
            vec![
                plain("a"),
                citation("<citation>x</citation>"),
                plain("b"),
                ReleaseUnit::CompletedBlock {
                    kind: BlockKind::Pause,
                    raw: "<pause>5 seconds</pause>".to_string(),
                },
                plain("c"),
            ]
        );
    }

    #[test]
    fn test_nothing_released_until_close() {
        let mut buffer = BlockBuffer::new();
        assert!(buffer.push("<citation>").is_empty());
        assert!(buffer.push("<verse>Dhp 1</verse>").is_empty());
        assert!(buffer.push("</citation").is_empty());
        assert_eq!(buffer.mode(), BufferMode::InCitation);
        assert_eq!(buffer.accumulated(), "<citation><verse>Dhp 1</verse></citation");
        assert_eq!(
            buffer.push(">"),
            vec![citation("<citation><verse>Dhp 1</verse></citation>")]
        );
        assert!(buffer.accumulated().is_empty());
    }

    #[test]
    fn test_lone_angle_bracket_is_held_then_released() {
        let mut buffer = BlockBuffer::new();
        assert_eq!(buffer.push("1 <"), vec![plain("1 ")]);
        assert_eq!(buffer.held(), "<");
        assert_eq!(buffer.push(" 2"), vec![plain("< 2")]);
        assert!(buffer.held().is_empty());
    }

    #[test]
    fn test_held_tail_flushed_on_finish() {
        let mut buffer = BlockBuffer::new();
        assert_eq!(buffer.push("end <cit"), vec![plain("end ")]);
        assert_eq!(buffer.finish(), Ok(Some(plain("<cit"))));
    }

    #[test]
    fn test_unterminated_block_is_reported() {
        let mut buffer = BlockBuffer::new();
        feed(&mut buffer, &["intro ", "<citation><verse>Snp"]);
        let err = buffer.finish().unwrap_err();
        assert_eq!(err.kind, BlockKind::Citation);
        assert_eq!(err.partial, "<citation><verse>Snp");
        assert_eq!(buffer.mode(), BufferMode::Plain);
        assert!(buffer.accumulated().is_empty());
    }

    #[test]
    fn test_cancel_discards_and_stops_releases() {
        let mut buffer = BlockBuffer::new();
        feed(&mut buffer, &["<citation>partial"]);
        buffer.cancel();
        assert!(buffer.is_cancelled());
        assert!(buffer.accumulated().is_empty());
        assert!(buffer.push("</citation> more").is_empty());
        assert_eq!(buffer.finish(), Ok(None));
    }

    #[test]
    fn test_reset_matches_fresh_buffer() {
        let mut used = BlockBuffer::new();
        feed(&mut used, &["x <pau", "se>1 minute"]);
        used.cancel();
        used.reset();

        let mut fresh = BlockBuffer::new();
        for fragment in ["a <citation>", "b</citation> c"] {
            assert_eq!(used.push(fragment), fresh.push(fragment));
        }
        assert_eq!(used.finish(), fresh.finish());
    }

    #[test]
    fn test_pause_passthrough_when_not_tracked() {
        let config = BufferConfig::builder().track_pause(false).build();
        let mut buffer = BlockBuffer::with_config(config);
        assert_eq!(
            buffer.push("<pause>30 seconds</pause>"),
            vec![plain("<pause>30 seconds</pause>")]
        );
    }

    #[test]
    fn test_multibyte_text_near_markers() {
        let mut buffer = BlockBuffer::new();
        let units = feed(
            &mut buffer,
            &["Ānanda <citation><pali>bhikkhave ", "ñāṇa</pali></citat", "ion>ṁ"],
        );
        assert_eq!(
            units,
            vec![
                plain("Ānanda "),
                citation("<citation><pali>bhikkhave ñāṇa</pali></citation>"),
                plain("ṁ"),
            ]
        );
    }

    #[test]
    fn test_close_marker_requires_open_first() {
        let mut buffer = BlockBuffer::new();
        assert_eq!(buffer.push("</citation> stray"), vec![plain("</citation> stray")]);
    }
}
