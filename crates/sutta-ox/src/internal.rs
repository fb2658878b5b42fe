use std::collections::HashMap;

use reqwest::RequestBuilder as ReqwestRequestBuilder;
use serde::Serialize;

use crate::error::StreamError;

/// Builds authenticated POST requests against the Messages API.
pub struct RequestBuilder<'a> {
    client: &'a reqwest::Client,
    base_url: &'a str,
    api_key: Option<&'a str>,
    api_version: &'a str,
    headers: &'a HashMap<String, String>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        client: &'a reqwest::Client,
        base_url: &'a str,
        api_key: Option<&'a str>,
        api_version: &'a str,
        headers: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            api_version,
            headers,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ReqwestRequestBuilder, StreamError> {
        let Some(api_key) = self.api_key else {
            return Err(StreamError::AuthenticationMissing);
        };

        let mut req = self
            .client
            .post(self.url(path))
            .header("x-api-key", api_key)
            .header("anthropic-version", self.api_version)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream");

        for (key, value) in self.headers {
            req = req.header(key, value);
        }

        Ok(req.json(body))
    }
}
