//! [`ChatBackend`] implementation for the Google Gemini REST API.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use memchr::memchr;
use tracing::{debug, warn};

use crate::api::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ResponseSchema,
    ThinkingConfig,
};
use crate::core::config::Config;
use crate::core::llm::{BackendError, ChatBackend, ChatSession, ReplyStream};

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Budget used when fast replies are off; `None` leaves it to the model.
    pub thinking_budget: Option<u32>,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temperature: config.temperature(),
            top_p: config.top_p(),
            top_k: config.top_k(),
            thinking_budget: config.thinking_budget,
        }
    }

    fn for_session(&self, session: &ChatSession) -> GenerationConfig {
        let budget = if session.fast_reply {
            Some(0)
        } else {
            self.thinking_budget
        };
        GenerationConfig {
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
            top_k: Some(self.top_k),
            thinking_config: budget.map(|thinking_budget| ThinkingConfig { thinking_budget }),
            ..Default::default()
        }
    }
}

pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    settings: GenerationSettings,
}

impl GeminiBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            settings,
        }
    }

    pub fn from_config(config: &Config, api_key: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vulcan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(
            client,
            config.base_url(),
            api_key,
            config.model(),
            GenerationSettings::from_config(config),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    fn reply_request(&self, session: &ChatSession, prompt: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = session
            .turns
            .iter()
            .map(|turn| Content::new(turn.role, turn.text.clone()))
            .collect();
        contents.push(Content::new("user", prompt));

        GenerateContentRequest {
            system_instruction: Some(Content::instruction(session.system_instruction.clone())),
            contents,
            generation_config: self.settings.for_session(session),
        }
    }

    fn suggestion_request(prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content::new("user", prompt)],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(ResponseSchema::string_array()),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn stream_reply(&self, session: &ChatSession, prompt: &str) -> ReplyStream {
        let request = self
            .client
            .post(format!("{}?alt=sse", self.endpoint("streamGenerateContent")))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.reply_request(session, prompt));
        debug!(model = %self.model, turns = session.turns.len(), "opening reply stream");

        stream::unfold(SseState::Connect(request), next_event).boxed()
    }

    async fn generate_suggestions(&self, prompt: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint("generateContent"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&Self::suggestion_request(prompt))
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(api_error(Some(status.as_u16()), &body));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|err| BackendError::Decode(err.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(BackendError::Api {
                status: error.code,
                message: error.message.unwrap_or_default(),
            });
        }
        Ok(parsed.text())
    }
}

enum SseState {
    Connect(reqwest::RequestBuilder),
    Reading {
        body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
        decoder: SseDecoder,
    },
    Draining(SseDecoder),
    Done,
}

async fn next_event(
    mut state: SseState,
) -> Option<(Result<String, BackendError>, SseState)> {
    loop {
        state = match state {
            SseState::Connect(request) => match request.send().await {
                Err(err) => {
                    return Some((Err(BackendError::Transport(err.to_string())), SseState::Done))
                }
                Ok(response) if !response.status().is_success() => {
                    let status = response.status().as_u16();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<no body>".to_string());
                    return Some((Err(api_error(Some(status), &body)), SseState::Done));
                }
                Ok(response) => SseState::Reading {
                    body: response
                        .bytes_stream()
                        .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                        .boxed(),
                    decoder: SseDecoder::default(),
                },
            },
            SseState::Reading {
                mut body,
                mut decoder,
            } => {
                if let Some(item) = decoder.next_item() {
                    return Some(emit(item, SseState::Reading { body, decoder }));
                }
                match body.next().await {
                    Some(Ok(bytes)) => {
                        decoder.push(&bytes);
                        SseState::Reading { body, decoder }
                    }
                    Some(Err(err)) => {
                        return Some((
                            Err(BackendError::Transport(err.to_string())),
                            SseState::Done,
                        ))
                    }
                    None => {
                        decoder.finish();
                        SseState::Draining(decoder)
                    }
                }
            }
            SseState::Draining(mut decoder) => {
                return decoder
                    .next_item()
                    .map(|item| emit(item, SseState::Draining(decoder)));
            }
            SseState::Done => return None,
        };
    }
}

/// An error ends the stream; the item itself is still delivered.
fn emit(
    item: Result<String, BackendError>,
    next: SseState,
) -> (Result<String, BackendError>, SseState) {
    if item.is_err() {
        (item, SseState::Done)
    } else {
        (item, next)
    }
}

/// Splits a byte stream into server-sent-event lines and turns `data:`
/// payloads into reply fragments.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    ready: VecDeque<Result<String, BackendError>>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => {
                    if let Some(item) = parse_sse_line(line.trim()) {
                        self.ready.push_back(item);
                    }
                }
                Err(err) => warn!(error = %err, "invalid UTF-8 in reply stream"),
            }
            self.buffer.drain(..=newline_pos);
        }
    }

    /// Flush a final line that arrived without a trailing newline.
    fn finish(&mut self) {
        if !self.buffer.is_empty() {
            self.push(b"\n");
        }
    }

    fn next_item(&mut self) -> Option<Result<String, BackendError>> {
        self.ready.pop_front()
    }
}

/// One SSE line to at most one reply item. Blank text and non-data lines
/// produce nothing.
fn parse_sse_line(line: &str) -> Option<Result<String, BackendError>> {
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<GenerateContentResponse>(payload) {
        Ok(response) => {
            if let Some(error) = response.error {
                return Some(Err(BackendError::Api {
                    status: error.code,
                    message: error
                        .message
                        .or(error.status)
                        .unwrap_or_else(|| "unknown error".to_string()),
                }));
            }
            let text = response.text();
            (!text.is_empty()).then_some(Ok(text))
        }
        Err(_) => Some(Err(api_error(None, payload))),
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .or_else(|| value.pointer("/0/error/message"))
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str())
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn api_error(status: Option<u16>, body: &str) -> BackendError {
    let trimmed = body.trim();
    let message = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => extract_error_summary(&value).unwrap_or_else(|| trimmed.to_string()),
        Err(_) if trimmed.is_empty() => "<empty>".to_string(),
        Err(_) => trimmed.to_string(),
    };
    BackendError::Api {
        status,
        message: truncate_chars(&message, MAX_ERROR_CHARS),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
