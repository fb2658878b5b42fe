use std::collections::HashMap;

use bon::Builder;
use core::fmt;
use sutta_ox_common::ByteLineSource;
use tokio_util::sync::CancellationToken;

use crate::{
    assemble::{AssembledMessage, collect_message},
    buffer::BufferConfig,
    error::{self, StreamError},
    internal::RequestBuilder,
    request::MessageRequest,
    stream::{MessageStream, StreamOutcome},
};

const BASE_URL: &str = "https://api.anthropic.com";
const CHAT_URL: &str = "v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Streaming Messages API client.
///
/// Cheap to clone; pass it explicitly to whatever needs to send messages.
#[derive(Clone, Default, Builder)]
pub struct Sutta {
    #[builder(into)]
    pub(crate) api_key: Option<String>,
    #[builder(default)]
    pub(crate) client: reqwest::Client,
    #[builder(default = BASE_URL.to_string(), into)]
    pub(crate) base_url: String,
    #[builder(default = API_VERSION.to_string(), into)]
    pub(crate) api_version: String,
    #[builder(default)]
    pub(crate) headers: HashMap<String, String>,
    #[builder(default)]
    pub(crate) buffer: BufferConfig,
}

impl Sutta {
    /// Create a new client with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            api_version: API_VERSION.to_string(),
            headers: HashMap::new(),
            buffer: BufferConfig::default(),
        }
    }

    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")?;
        Ok(Sutta::builder().api_key(api_key).build())
    }

    /// Add a custom header to the client
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    fn request_builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(
            &self.client,
            &self.base_url,
            self.api_key.as_deref(),
            &self.api_version,
            &self.headers,
        )
    }

    /// Sends `request` with streaming enabled.
    ///
    /// Connection failures and non-success statuses do not return an error
    /// here; they become the stream's single `Failed` outcome.
    pub async fn stream_message(&self, request: &MessageRequest) -> MessageStream<ByteLineSource> {
        self.stream_message_with_cancel(request, CancellationToken::new())
            .await
    }

    pub async fn stream_message_with_cancel(
        &self,
        request: &MessageRequest,
        token: CancellationToken,
    ) -> MessageStream<ByteLineSource> {
        let req = match self
            .request_builder()
            .post_json(CHAT_URL, &request.streaming())
        {
            Ok(req) => req,
            Err(err) => return failed(err).with_cancellation(token),
        };

        let sent = tokio::select! {
            biased;
            () = token.cancelled() => None,
            sent = req.send() => Some(sent),
        };

        let response = match sent {
            None => {
                return MessageStream::terminated(StreamOutcome::Cancelled)
                    .with_cancellation(token);
            }
            Some(Err(err)) => return failed(err.into()).with_cancellation(token),
            Some(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            let err = match response.bytes().await {
                Ok(bytes) => error::parse_error_response(status, &bytes),
                Err(err) => err.into(),
            };
            log::debug!("request rejected with status {status}");
            return failed(err).with_cancellation(token);
        }

        MessageStream::with_config(ByteLineSource::from_response(response), self.buffer)
            .with_cancellation(token)
    }

    /// Streams `request` to completion and returns the assembled message.
    pub async fn send_message(&self, request: &MessageRequest) -> AssembledMessage {
        collect_message(self.stream_message(request).await).await
    }
}

fn failed(err: StreamError) -> MessageStream<ByteLineSource> {
    MessageStream::terminated(StreamOutcome::Failed(err))
}

impl fmt::Debug for Sutta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sutta")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
