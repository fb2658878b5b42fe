use serde::de::DeserializeOwned;

use crate::error::CommonRequestError;
use crate::lines::LineSource;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Decodes a single SSE line.
///
/// Every `data:` line carries one complete JSON payload. Blank lines, comments
/// and other SSE fields (`event:`, `id:`, `retry:`) yield `Ok(None)`, as do
/// empty payloads and the `[DONE]` sentinel.
pub fn decode_data_line<T: DeserializeOwned>(line: &str) -> Result<Option<T>, CommonRequestError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };

    let payload = rest.trim_start();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return Ok(None);
    }

    serde_json::from_str(payload)
        .map(Some)
        .map_err(|source| CommonRequestError::MalformedPayload {
            source,
            payload: payload.to_string(),
        })
}

/// Server-Sent Events reader over any [`LineSource`].
///
/// The reader is single-use: once the source is exhausted or an error has
/// been returned, every further call yields `Ok(None)`.
pub struct SseReader<L> {
    source: L,
    lines_read: usize,
    done: bool,
}

impl<L: LineSource> SseReader<L> {
    pub fn new(source: L) -> Self {
        Self {
            source,
            lines_read: 0,
            done: false,
        }
    }

    /// Number of raw lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Get the next parsed event from the stream
    pub async fn next_event<T: DeserializeOwned>(&mut self) -> Result<Option<T>, CommonRequestError> {
        while !self.done {
            let line = match self.source.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(err) => {
                    self.done = true;
                    return Err(err);
                }
            };
            self.lines_read += 1;

            match decode_data_line::<T>(&line) {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {
                    if !line.trim().is_empty() {
                        log::trace!("skipping non-data SSE line {}", self.lines_read);
                    }
                }
                Err(err) => {
                    self.done = true;
                    return Err(err);
                }
            }
        }
        Ok(None)
    }
}

/// Utility function to parse SSE events from a complete body
pub fn parse_sse_events<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, CommonRequestError> {
    let mut events = Vec::new();
    for line in body.lines() {
        if let Some(event) = decode_data_line(line)? {
            events.push(event);
        }
    }
    Ok(events)
}
