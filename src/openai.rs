//! Chat Completions client.
//!
//! Sends the prompt as a single user message, no system prompt and no
//! history. Failures are returned as-is: no retry, no backoff.

use crate::{
    config::Config,
    error::{Error, Result},
    generator::{CompletionRequest, TextGenerator},
};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const SERVICE: &str = "openai";

/// Blocking client for an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiClient {
    http: Client,
    url: String,
}

impl OpenAiClient {
    /// Creates a client from configuration. No network traffic happens here.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::http(SERVICE, &e))?;

        Ok(Self {
            http,
            url: config.openai_url.clone(),
        })
    }
}

impl TextGenerator for OpenAiClient {
    #[instrument(skip(self, request), fields(model = request.model))]
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = ChatCompletionRequest::from(request);

        debug!("POST {}", self.url);

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(request.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::http(SERVICE, &e))?;

        let status = response.status();
        let text = response.text().map_err(|e| Error::http(SERVICE, &e))?;

        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| Error::api(SERVICE, None, format!("Failed to parse response: {e}")))?;

        if let Some(usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        extract_text_response(parsed.choices)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&CompletionRequest<'a>> for ChatCompletionRequest<'a> {
    fn from(request: &CompletionRequest<'a>) -> Self {
        Self {
            model: request.model,
            messages: [ChatMessage {
                role: "user",
                content: request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(choices: Vec<Choice>) -> Result<String> {
    choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::api(SERVICE, None, "Response contained no message content"))
}

fn map_http_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    Error::api(SERVICE, Some(status.as_u16()), message)
}
