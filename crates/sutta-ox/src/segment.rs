//! Line segmentation of a complete message.
//!
//! [`segment_message`] runs once the full text is known (after a stream ends,
//! or for a stored message). It groups code fences, citation and pause spans
//! into single [`Line`]s and classifies the rest for rendering.

use serde::{Deserialize, Serialize};

use crate::buffer::BlockKind;
use crate::citation::CitationFields;
use crate::pause::PauseDuration;

const CODE_FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Text,
    EmptyLine,
    Code,
    Citation,
    Pause,
    UnorderedList,
    OrderedList(u32),
    StyleIndicator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub content: String,
    pub kind: LineKind,
    /// Source line of the first line this item was built from.
    pub index: usize,
    pub indent_level: usize,
}

impl Line {
    fn new(content: impl Into<String>, kind: LineKind, index: usize, indent_level: usize) -> Self {
        Self {
            content: content.into(),
            kind,
            index,
            indent_level,
        }
    }

    pub fn citation_fields(&self) -> Option<CitationFields> {
        (self.kind == LineKind::Citation).then(|| CitationFields::parse(&self.content))
    }

    pub fn pause_duration(&self) -> Option<PauseDuration> {
        (self.kind == LineKind::Pause).then(|| PauseDuration::from_block(&self.content))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Code,
    Block(BlockKind),
}

/// A multi-line item still waiting for its closing line.
#[derive(Debug)]
struct OpenSpan {
    kind: SpanKind,
    start: usize,
    indent_level: usize,
    lines: Vec<String>,
}

impl OpenSpan {
    fn into_line(self) -> Line {
        let kind = match self.kind {
            SpanKind::Code => LineKind::Code,
            SpanKind::Block(BlockKind::Citation) => LineKind::Citation,
            SpanKind::Block(BlockKind::Pause) => LineKind::Pause,
        };
        Line::new(self.lines.join("\n"), kind, self.start, self.indent_level)
    }
}

/// Splits a complete message into ordered lines.
///
/// Spans still open at the end of the message are flushed as a line of their
/// own kind with whatever they collected.
pub fn segment_message(message: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut open: Option<OpenSpan> = None;

    for (index, raw) in message.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let indent_level = indent_of(raw);
        let trimmed = raw.trim();

        if let Some(span) = open.as_mut() {
            let closed = match span.kind {
                SpanKind::Code => {
                    if trimmed.starts_with(CODE_FENCE) {
                        true
                    } else {
                        span.lines.push(raw.to_string());
                        false
                    }
                }
                SpanKind::Block(kind) => {
                    span.lines.push(trimmed.to_string());
                    trimmed == kind.close_tag()
                }
            };
            if closed {
                lines.extend(open.take().map(OpenSpan::into_line));
            }
            continue;
        }

        if trimmed.is_empty() {
            lines.push(Line::new("", LineKind::EmptyLine, index, 0));
            continue;
        }

        if index == 0 && is_style_indicator(trimmed) {
            let content = trimmed.trim_matches('*').trim();
            lines.push(Line::new(content, LineKind::StyleIndicator, index, indent_level));
            continue;
        }

        if let Some(kind) = single_line_block(trimmed) {
            let line_kind = match kind {
                BlockKind::Citation => LineKind::Citation,
                BlockKind::Pause => LineKind::Pause,
            };
            lines.push(Line::new(trimmed, line_kind, index, indent_level));
            continue;
        }

        let span_kind = if trimmed.starts_with(CODE_FENCE) {
            Some(SpanKind::Code)
        } else {
            BlockKind::ALL
                .into_iter()
                .find(|kind| trimmed == kind.open_tag())
                .map(SpanKind::Block)
        };

        if let Some(kind) = span_kind {
            let first = match kind {
                SpanKind::Code => Vec::new(),
                SpanKind::Block(_) => vec![trimmed.to_string()],
            };
            open = Some(OpenSpan {
                kind,
                start: index,
                indent_level,
                lines: first,
            });
            continue;
        }

        lines.push(Line::new(trimmed, LineKind::Text, index, indent_level));
    }

    if let Some(span) = open {
        log::debug!("flushing unclosed {:?} span from line {}", span.kind, span.start);
        lines.push(span.into_line());
    }

    classify_list_items(&mut lines);
    lines
}

/// Turns `Text` lines with list markers into list items.
///
/// `- `, `* ` and `• ` mark unordered items, `N. ` ordered ones; the marker is
/// stripped from the content. An unordered item that directly follows an
/// ordered item (or another nested item) is nested one level under it.
pub fn classify_list_items(lines: &mut [Line]) {
    let mut previous: Option<(LineKind, usize)> = None;

    for line in lines.iter_mut() {
        if line.kind == LineKind::EmptyLine {
            continue;
        }

        if line.kind == LineKind::Text {
            if let Some(rest) = unordered_item(&line.content) {
                line.content = rest.to_string();
                line.kind = LineKind::UnorderedList;
                let nested = match previous {
                    Some((LineKind::OrderedList(_), _)) => true,
                    Some((LineKind::UnorderedList, indent)) => indent > 0,
                    _ => false,
                };
                if nested {
                    line.indent_level = line.indent_level.max(1);
                }
            } else if let Some((number, rest)) = ordered_item(&line.content) {
                line.content = rest.to_string();
                line.kind = LineKind::OrderedList(number);
            }
        }

        previous = Some((line.kind, line.indent_level));
    }
}

/// Leading pairs of spaces.
fn indent_of(raw: &str) -> usize {
    raw.bytes().take_while(|b| *b == b' ').count() / 2
}

fn is_style_indicator(trimmed: &str) -> bool {
    trimmed.len() >= 2 && trimmed.starts_with('*') && trimmed.ends_with('*')
}

fn single_line_block(trimmed: &str) -> Option<BlockKind> {
    BlockKind::ALL.into_iter().find(|kind| {
        trimmed.len() >= kind.open_tag().len() + kind.close_tag().len()
            && trimmed.starts_with(kind.open_tag())
            && trimmed.ends_with(kind.close_tag())
    })
}

fn unordered_item(content: &str) -> Option<&str> {
    ["- ", "* ", "• "]
        .into_iter()
        .find_map(|marker| content.strip_prefix(marker))
        .map(str::trim_start)
}

fn ordered_item(content: &str) -> Option<(u32, &str)> {
    let digits = content.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = content[digits..].strip_prefix('.')?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let number = content[..digits].parse().ok()?;
    Some((number, rest.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(lines: &[Line]) -> Vec<LineKind> {
        lines.iter().map(|l| l.kind).collect()
    }

    #[test]
    fn test_segmentation_scenario() {
        let lines = segment_message("*smiling*\n\nHello\n\n<pause>30 seconds</pause>\n\nDone");
        assert_eq!(
            kinds(&lines),
            vec![
                LineKind::StyleIndicator,
                LineKind::EmptyLine,
                LineKind::Text,
                LineKind::EmptyLine,
                LineKind::Pause,
                LineKind::EmptyLine,
                LineKind::Text,
            ]
        );
        assert_eq!(lines[0].content, "smiling");
        assert_eq!(lines[2].content, "Hello");
        assert_eq!(lines[4].content, "<pause>30 seconds</pause>");
        assert_eq!(lines[4].index, 4);
        assert_eq!(lines[6].content, "Done");
        assert_eq!(lines[4].pause_duration().unwrap().seconds(), 30.0);
    }

    #[test]
    fn test_style_indicator_only_on_first_line() {
        let lines = segment_message("Hi\n*bows*");
        assert_eq!(kinds(&lines), vec![LineKind::Text, LineKind::Text]);
        assert_eq!(lines[1].content, "*bows*");
    }

    #[test]
    fn test_multiline_citation_keeps_tags_and_blank_lines() {
        let message = "Consider:\n<citation>\n<verse>Snp 4.2</verse>\n\n<pali>X</pali>\n</citation>\nAfter";
        let lines = segment_message(message);
        assert_eq!(
            kinds(&lines),
            vec![LineKind::Text, LineKind::Citation, LineKind::Text]
        );
        assert_eq!(
            lines[1].content,
            "<citation>\n<verse>Snp 4.2</verse>\n\n<pali>X</pali>\n</citation>"
        );
        assert_eq!(lines[1].index, 1);
        assert_eq!(lines[2].index, 6);
        assert!(lines[1].citation_fields().unwrap().is_valid());
    }

    #[test]
    fn test_single_line_citation() {
        let lines = segment_message("<citation><verse>Dhp 1</verse><pali>Mano</pali></citation>");
        assert_eq!(kinds(&lines), vec![LineKind::Citation]);
    }

    #[test]
    fn test_multiline_pause() {
        let lines = segment_message("<pause>\n2 minutes\n</pause>");
        assert_eq!(kinds(&lines), vec![LineKind::Pause]);
        assert_eq!(lines[0].content, "<pause>\n2 minutes\n</pause>");
        assert_eq!(lines[0].pause_duration().unwrap().seconds(), 120.0);
    }

    #[test]
    fn test_code_block_verbatim_without_fences() {
        let message = "Run:\n```sh\n  echo hi\n\n<citation>\n```\nok";
        let lines = segment_message(message);
        assert_eq!(kinds(&lines), vec![LineKind::Text, LineKind::Code, LineKind::Text]);
        assert_eq!(lines[1].content, "  echo hi\n\n<citation>");
        assert_eq!(lines[1].index, 1);
    }

    #[test]
    fn test_unclosed_spans_are_flushed() {
        let code = segment_message("```\nlet x = 1;");
        assert_eq!(kinds(&code), vec![LineKind::Code]);
        assert_eq!(code[0].content, "let x = 1;");

        let citation = segment_message("<citation>\n<verse>Snp 4.2</verse>");
        assert_eq!(kinds(&citation), vec![LineKind::Citation]);
        assert_eq!(citation[0].content, "<citation>\n<verse>Snp 4.2</verse>");
    }

    #[test]
    fn test_indent_and_lists() {
        let message = "1. Sit comfortably\n- relax the shoulders\n2. Breathe\n  - slowly\n- Walk\n10.5 is not a list";
        let lines = segment_message(message);
        assert_eq!(
            kinds(&lines),
            vec![
                LineKind::OrderedList(1),
                LineKind::UnorderedList,
                LineKind::OrderedList(2),
                LineKind::UnorderedList,
                LineKind::UnorderedList,
                LineKind::Text,
            ]
        );
        assert_eq!(lines[0].content, "Sit comfortably");
        assert_eq!(lines[1].content, "relax the shoulders");
        assert_eq!(lines[1].indent_level, 1);
        assert_eq!(lines[3].indent_level, 1);
        assert_eq!(lines[4].indent_level, 1);
    }

    #[test]
    fn test_indent_counts_space_pairs_only() {
        let lines = segment_message("    deep\n   three\n\ttabbed");
        let indents: Vec<usize> = lines.iter().map(|l| l.indent_level).collect();
        assert_eq!(indents, vec![2, 1, 0]);
        assert_eq!(lines[2].content, "tabbed");
    }

    #[test]
    fn test_list_after_plain_text_is_not_nested() {
        let lines = segment_message("Notes:\n- one\n- two");
        assert_eq!(lines[1].kind, LineKind::UnorderedList);
        assert_eq!(lines[1].indent_level, 0);
        assert_eq!(lines[2].indent_level, 0);
    }

    #[test]
    fn test_empty_message_and_trailing_newline() {
        assert_eq!(kinds(&segment_message("")), vec![LineKind::EmptyLine]);
        assert_eq!(
            kinds(&segment_message("Done\n")),
            vec![LineKind::Text, LineKind::EmptyLine]
        );
    }
}
