#[cfg(test)]
use crate::core::app::App;
#[cfg(test)]
use crate::core::chat::ChatController;
#[cfg(test)]
use crate::core::dictation::NoDictation;
#[cfg(test)]
use crate::core::llm::{BackendError, ChatBackend, ChatSession, LlmClient, ReplyStream};
#[cfg(test)]
use crate::core::storage::Storage;
#[cfg(test)]
use crate::ui::theme::ThemeKind;
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

/// A reply stream request as the fake backend saw it.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StreamCall {
    pub session: ChatSession,
    pub prompt: String,
}

/// Scripted [`ChatBackend`]: replays the same reply items for every stream
/// and records what it was asked.
#[cfg(test)]
pub struct FakeBackend {
    stream_items: Vec<Result<String, BackendError>>,
    suggestions: Result<String, BackendError>,
    suggestion_delay: Option<Duration>,
    stream_calls: Arc<Mutex<Vec<StreamCall>>>,
    suggestion_prompts: Mutex<Vec<String>>,
}

#[cfg(test)]
impl FakeBackend {
    pub fn new() -> Self {
        Self {
            stream_items: Vec::new(),
            suggestions: Ok(r#"["Cry more.","Sit down.","Try again."]"#.to_string()),
            suggestion_delay: None,
            stream_calls: Arc::new(Mutex::new(Vec::new())),
            suggestion_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_stream_items(chunks.into_iter().map(|chunk| Ok(chunk.into())).collect())
    }

    pub fn with_stream_items(mut self, items: Vec<Result<String, BackendError>>) -> Self {
        self.stream_items = items;
        self
    }

    pub fn with_suggestions(mut self, outcome: Result<String, BackendError>) -> Self {
        self.suggestions = outcome;
        self
    }

    pub fn with_suggestion_delay(mut self, delay: Duration) -> Self {
        self.suggestion_delay = Some(delay);
        self
    }

    /// Calls are recorded when the stream is first polled.
    pub fn stream_calls(&self) -> Vec<StreamCall> {
        self.stream_calls.lock().unwrap().clone()
    }

    pub fn suggestion_prompts(&self) -> Vec<String> {
        self.suggestion_prompts.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl ChatBackend for FakeBackend {
    fn stream_reply(&self, session: &ChatSession, prompt: &str) -> ReplyStream {
        use futures_util::{stream, StreamExt};

        let call = StreamCall {
            session: session.clone(),
            prompt: prompt.to_string(),
        };
        let calls = Arc::clone(&self.stream_calls);
        let items = self.stream_items.clone();
        stream::once(async move {
            calls.lock().unwrap().push(call);
            stream::iter(items)
        })
        .flatten()
        .boxed()
    }

    async fn generate_suggestions(&self, prompt: &str) -> Result<String, BackendError> {
        self.suggestion_prompts
            .lock()
            .unwrap()
            .push(prompt.to_string());
        if let Some(delay) = self.suggestion_delay {
            tokio::time::sleep(delay).await;
        }
        self.suggestions.clone()
    }
}

#[cfg(test)]
pub fn controller_with(
    backend: FakeBackend,
    storage: Storage,
) -> (ChatController, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let llm = LlmClient::new(backend.clone());
    (ChatController::new(llm, storage), backend)
}

#[cfg(test)]
pub fn create_test_app() -> App {
    create_test_app_with(FakeBackend::new()).0
}

#[cfg(test)]
pub fn create_test_app_with(backend: FakeBackend) -> (App, Arc<FakeBackend>) {
    let (chat, backend) = controller_with(backend, Storage::in_memory());
    let app = App::new(chat, ThemeKind::Neon, Box::new(NoDictation));
    (app, backend)
}
