#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Shared streaming plumbing for the sutta-ox crates
//!
//! Provides line sources over chunked HTTP bodies and a line-level SSE frame
//! decoder. Nothing here knows about the events or blocks carried inside the
//! frames.

pub mod error;
pub mod lines;
pub mod streaming;

pub use error::CommonRequestError;
pub use lines::{ByteLineSource, ByteStream, LineSource, VecLineSource};
pub use streaming::{SseReader, decode_data_line, parse_sse_events};

/// Re-export common types for convenience
pub use async_trait::async_trait;
