//! Common imports for streaming and rendering a reply.
//!
//! ```rust,no_run
//! use sutta_ox::prelude::*;
//!
//! # async fn example() {
//! let client = Sutta::new("your-api-key");
//! let request = MessageRequest::builder()
//!     .model("claude-sonnet-4-20250514")
//!     .messages(vec![ChatMessage::user("A short breathing practice, please.")])
//!     .build();
//!
//! let mut stream = client.stream_message(&request).await;
//! while let Some(item) = stream.next().await {
//!     if let StreamItem::Release(unit) = item {
//!         print!("{}", unit.as_str());
//!     }
//! }
//! # }
//! ```

pub use crate::{
    AssembledMessage,
    BlockKind,
    ChatMessage,
    CitationFields,
    Line,
    LineKind,
    MessageRequest,
    MessageStream,
    PauseDuration,
    ReleaseUnit,
    StreamError,
    StreamItem,
    StreamOutcome,
    Sutta,
    collect_message,
    segment_message,
};
