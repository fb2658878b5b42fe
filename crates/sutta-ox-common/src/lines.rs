//! Line sources for line-oriented streaming bodies.
//!
//! A [`LineSource`] hands out one text line per call, suspending only while
//! waiting on the network. Line terminators (`\n` or `\r\n`) are stripped.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::CommonRequestError;

/// Boxed byte stream as produced by `reqwest::Response::bytes_stream`.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// A pull-based source of text lines.
#[async_trait]
pub trait LineSource: Send {
    /// Returns the next line, or `None` once the source is exhausted.
    async fn next_line(&mut self) -> Result<Option<String>, CommonRequestError>;
}

/// Splits a chunked byte stream into lines.
///
/// Chunks may end anywhere, including inside a multi-byte UTF-8 sequence:
/// bytes are only decoded once a full line has been buffered.
pub struct ByteLineSource {
    byte_stream: ByteStream,
    buffer: Vec<u8>,
    /// Start of the first line not yet handed out.
    start: usize,
    /// Bytes before this offset are known to hold no `\n` past `start`.
    scanned: usize,
    finished: bool,
}

impl ByteLineSource {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            byte_stream: Box::pin(stream),
            buffer: Vec::new(),
            start: 0,
            scanned: 0,
            finished: false,
        }
    }

    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    fn take_line(&mut self) -> Result<Option<String>, CommonRequestError> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return Ok(None);
        };
        let end = self.scanned + offset;
        let line = line_text(&self.buffer[self.start..end]);
        self.start = end + 1;
        self.scanned = self.start;
        line.map(Some)
    }

    /// Drops consumed lines once per chunk instead of once per line.
    fn append(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }
}

#[async_trait]
impl LineSource for ByteLineSource {
    async fn next_line(&mut self) -> Result<Option<String>, CommonRequestError> {
        loop {
            if let Some(line) = self.take_line()? {
                return Ok(Some(line));
            }
            if self.finished {
                return Ok(None);
            }

            match self.byte_stream.next().await {
                Some(chunk) => self.append(&chunk?),
                None => {
                    self.finished = true;
                    let rest = std::mem::take(&mut self.buffer);
                    let rest = &rest[self.start..];
                    self.start = 0;
                    self.scanned = 0;
                    // Trailing line without a terminator
                    if rest.is_empty() {
                        return Ok(None);
                    }
                    return line_text(rest).map(Some);
                }
            }
        }
    }
}

fn line_text(bytes: &[u8]) -> Result<String, CommonRequestError> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// In-memory line source, mostly useful for replaying captured streams.
#[derive(Debug, Clone, Default)]
pub struct VecLineSource {
    lines: VecDeque<String>,
}

impl VecLineSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a complete body into lines.
    pub fn from_body(body: &str) -> Self {
        Self::new(body.lines())
    }
}

#[async_trait]
impl LineSource for VecLineSource {
    async fn next_line(&mut self) -> Result<Option<String>, CommonRequestError> {
        Ok(self.lines.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: &[&'static [u8]]) -> ByteLineSource {
        let items: Vec<Result<Bytes, reqwest::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p)))
            .collect();
        ByteLineSource::new(stream::iter(items))
    }

    async fn drain(mut source: impl LineSource) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = source.next_line().await.unwrap() {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let source = chunks(&[b"data: {\"a\"", b":1}\n\nda", b"ta: 2\r\n"]);
        assert_eq!(drain(source).await, vec!["data: {\"a\":1}", "", "data: 2"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let source = chunks(&[b"first\nsecond"]);
        assert_eq!(drain(source).await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_utf8_sequence_split_across_chunks() {
        // "ā" is 0xC4 0x81
        let source = chunks(&[b"p\xC4", b"\x81li\n"]);
        assert_eq!(drain(source).await, vec!["pāli"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_error() {
        let mut source = chunks(&[b"\xFF\xFE\n"]);
        let err = source.next_line().await.unwrap_err();
        assert!(matches!(err, CommonRequestError::Utf8Error(_)));
    }

    #[tokio::test]
    async fn test_exhausted_source_stays_exhausted() {
        let mut source = chunks(&[b"only\n"]);
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("only"));
        assert!(source.next_line().await.unwrap().is_none());
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_long_line_over_many_chunks() {
        let mut parts: Vec<Result<Bytes, reqwest::Error>> =
            (0..500).map(|_| Ok(Bytes::from_static(b"abcdefgh"))).collect();
        parts.push(Ok(Bytes::from_static(b"\r\nnext\nlast")));
        let source = ByteLineSource::new(stream::iter(parts));

        let lines = drain(source).await;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "abcdefgh".repeat(500));
        assert_eq!(lines[1], "next");
        assert_eq!(lines[2], "last");
    }

    #[tokio::test]
    async fn test_many_lines_in_one_chunk_then_more() {
        let source = chunks(&[b"a\nb\nc", b"d\ne\n"]);
        assert_eq!(drain(source).await, vec!["a", "b", "cd", "e"]);
    }

    #[tokio::test]
    async fn test_vec_line_source_from_body() {
        let source = VecLineSource::from_body("a\r\nb\n\nc");
        assert_eq!(drain(source).await, vec!["a", "b", "", "c"]);
    }
}
