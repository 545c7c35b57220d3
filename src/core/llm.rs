//! Adapter between the chat controller and a remote generative-text service.
//!
//! The controller owns an [`LlmClient`], which owns the current
//! [`ChatSession`] and a shared [`ChatBackend`]. Backends only see plain
//! values (a session snapshot and prompt text), so tests can swap in a
//! scripted fake while the real client talks to Gemini.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::core::message::Message;
use crate::core::persona::PersonaConfig;

pub const MAX_SUGGESTIONS: usize = 3;
pub const FALLBACK_SUGGESTIONS: [&str; MAX_SUGGESTIONS] =
    ["Do better.", "Next please.", "Is that it?"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    Transport(String),
    /// The service answered with an error status or an error payload.
    Api {
        status: Option<u16>,
        message: String,
    },
    /// The response could not be decoded.
    Decode(String),
    /// No data arrived within the configured window.
    Timeout,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport(message) => write!(f, "Request failed: {message}"),
            BackendError::Api {
                status: Some(status),
                message,
            } => write!(f, "API error {status}: {message}"),
            BackendError::Api {
                status: None,
                message,
            } => write!(f, "API error: {message}"),
            BackendError::Decode(message) => write!(f, "Unreadable response: {message}"),
            BackendError::Timeout => write!(f, "Timed out waiting for the model"),
        }
    }
}

impl StdError for BackendError {}

/// Lazy, ordered, single-use sequence of reply text fragments.
pub type ReplyStream = BoxStream<'static, Result<String, BackendError>>;

/// Detached suggestion fetch; always resolves, falling back on failure.
pub type SuggestionTask = BoxFuture<'static, Vec<String>>;

/// One prior turn as the remote service labels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTurn {
    pub role: &'static str,
    pub text: String,
}

/// Conversation context a reply is generated against. A pure function of
/// the persona and the prior history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub system_instruction: String,
    pub turns: Vec<SessionTurn>,
    pub fast_reply: bool,
}

impl ChatSession {
    pub fn new(persona: &PersonaConfig, history: &[Message]) -> Self {
        Self {
            system_instruction: persona.system_instruction(),
            turns: history
                .iter()
                .map(|message| SessionTurn {
                    role: message.role.to_api_role(),
                    text: message.text.clone(),
                })
                .collect(),
            fast_reply: persona.fast_reply,
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a reply stream for `prompt` on top of `session`. Nothing is sent
    /// until the stream is first polled; setup failures arrive as the first
    /// item.
    fn stream_reply(&self, session: &ChatSession, prompt: &str) -> ReplyStream;

    /// One-shot request for follow-up suggestions. Returns the raw model
    /// text, which should be a JSON array of strings.
    async fn generate_suggestions(&self, prompt: &str) -> Result<String, BackendError>;
}

pub struct LlmClient {
    backend: Arc<dyn ChatBackend>,
    session: ChatSession,
    generation: u64,
    request_timeout: Option<Duration>,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            session: ChatSession::new(&PersonaConfig::default(), &[]),
            generation: 0,
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replace the session wholesale. Safe to call any number of times.
    pub fn init_session(&mut self, persona: &PersonaConfig, prior_history: &[Message]) {
        self.session = ChatSession::new(persona, prior_history);
        self.generation += 1;
        debug!(
            generation = self.generation,
            turns = prior_history.len(),
            "session initialized"
        );
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Number of times the session has been (re)built.
    pub fn session_generation(&self) -> u64 {
        self.generation
    }

    pub fn stream_reply(&self, prompt: &str) -> ReplyStream {
        self.backend.stream_reply(&self.session, prompt)
    }

    /// Build a detached suggestion fetch from the tail of the conversation.
    pub fn suggestion_task(&self, recent_history: &[Message]) -> SuggestionTask {
        let backend = Arc::clone(&self.backend);
        let prompt = suggestion_prompt(&suggestion_context(recent_history));
        let timeout = self.request_timeout;

        async move {
            let request = backend.generate_suggestions(&prompt);
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, request)
                    .await
                    .unwrap_or(Err(BackendError::Timeout)),
                None => request.await,
            };

            match outcome {
                Ok(raw) => parse_suggestions(&raw).unwrap_or_else(|| {
                    warn!("suggestion payload malformed; using fallback");
                    fallback_suggestions()
                }),
                Err(err) => {
                    warn!(error = %err, "suggestion request failed; using fallback");
                    fallback_suggestions()
                }
            }
        }
        .boxed()
    }

    pub async fn fetch_suggestions(&self, recent_history: &[Message]) -> Vec<String> {
        self.suggestion_task(recent_history).await
    }
}

pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

/// Texts of the last two entries, oldest first, joined by a space.
pub fn suggestion_context(history: &[Message]) -> String {
    let start = history.len().saturating_sub(2);
    history[start..]
        .iter()
        .map(|message| message.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn suggestion_prompt(context: &str) -> String {
    format!(
        "Generate 3 ultra-short (max 4 words) funny follow-ups for: {context}. Output JSON array of strings only."
    )
}

/// Parse a JSON array of strings, keeping at most three non-blank entries.
/// Returns `None` for anything that is not an array of strings.
pub fn parse_suggestions(raw: &str) -> Option<Vec<String>> {
    let trimmed = strip_code_fence(raw.trim());
    let trimmed = if trimmed.is_empty() { "[]" } else { trimmed };
    let values: Vec<String> = serde_json::from_str(trimmed).ok()?;
    Some(
        values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .take(MAX_SUGGESTIONS)
            .collect(),
    )
}

fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
