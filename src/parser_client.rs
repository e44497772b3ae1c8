//! Narrow client for the remote natural-language availability parser.
//!
//! The parser itself is an external collaborator; this module only owns
//! the request/response shape and the HTTP plumbing to reach it.

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PARSE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct ParseRequest<'a> {
    pub message: &'a str,
    pub timezone: &'a str,
    #[serde(rename = "previousMessages")]
    pub previous_messages: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseResponse {
    #[serde(rename = "parseResult")]
    pub parse_result: serde_json::Value,
    #[serde(rename = "systemMessage")]
    pub system_message: String,
}

/// Client for the Gemini-compatible text-to-structured-availability endpoint.
#[derive(Clone)]
pub struct ParserClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ParserClient {
    pub fn new(endpoint: String, api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(PARSE_TIMEOUT)
            .build()
            .context("building parser HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub async fn parse(
        &self,
        message: &str,
        timezone: &str,
        previous_messages: &[String],
    ) -> anyhow::Result<ParseResponse> {
        let request = ParseRequest {
            message,
            timezone,
            previous_messages,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("sending request to parser")?
            .error_for_status()
            .context("parser returned an error status")?;

        response
            .json::<ParseResponse>()
            .await
            .context("decoding parser response")
    }
}
