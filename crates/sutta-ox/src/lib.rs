#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Streaming decode and block extraction for guided meditation replies.
//!
//! A reply arrives as Server-Sent Events carrying text deltas. The pipeline
//! turns those deltas into [`ReleaseUnit`]s that never split a `<citation>` or
//! `<pause>` block, and [`segment_message`] turns the finished text into
//! classified lines for rendering.

pub mod assemble;
pub mod buffer;
pub mod citation;
pub mod client;
pub mod delta;
pub mod error;
pub mod event;
mod internal;
pub mod pause;
pub mod prelude;
pub mod request;
pub mod segment;
pub mod stream;


pub use assemble::{AssembledMessage, MessageAssembler, collect_message};
pub use buffer::{BlockBuffer, BlockKind, BufferConfig, ReleaseUnit, UnterminatedBlock};
pub use citation::CitationFields;
pub use client::Sutta;
pub use error::StreamError;
pub use event::ProtocolEvent;
pub use pause::{PauseDuration, parse_pause_duration};
pub use request::{ChatMessage, MessageRequest};
pub use segment::{Line, LineKind, segment_message};
pub use stream::{MessageStream, StreamItem, StreamOutcome};
