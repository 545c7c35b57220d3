//! Conversation state machine.
//!
//! [`ChatController`] owns the message list and the turn lifecycle
//! (`Idle → Sending → Streaming → Suggesting → Idle`). It never awaits
//! anything itself: operations that start network work return a request
//! value, and the caller feeds the results back in tagged with the stream
//! id they were issued under. Results for a superseded stream id are
//! ignored.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::chat_stream::{ReplyRequest, SuggestionRequest};
use crate::core::llm::{LlmClient, MAX_SUGGESTIONS};
use crate::core::message::{Message, MessageId};
use crate::core::persona::PersonaConfig;
use crate::core::storage::Storage;

pub const STALLED_BANNER: &str = "ROAST ENGINE STALLED. CHECK CONNECTION.";

/// Canned prompts offered while there are no suggestions.
pub const STARTER_PROMPTS: [(&str, &str); 4] = [
    ("Roast Me", "Annihilate my fragile ego. Go hard."),
    ("Judge My Taste", "I like pineapples on pizza. Judge me."),
    ("Cold Truth", "Tell me a funny, brutal truth about humans."),
    ("Check Fit", "I'm wearing socks with sandals. Roast it."),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Sending,
    Streaming,
    Suggesting,
}

/// A quick-reply button: what it shows and what it sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pill {
    pub label: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

pub struct ChatController {
    messages: Vec<Message>,
    phase: TurnPhase,
    cancelled: bool,
    error: Option<String>,
    suggestions: Vec<String>,
    edit_target: Option<MessageId>,
    stream_id: u64,
    cancel_token: Option<CancellationToken>,
    placeholder_id: Option<MessageId>,
    accumulator: String,
    persona: PersonaConfig,
    llm: LlmClient,
    storage: Storage,
    suggest_after_cancel: bool,
}

impl ChatController {
    /// Restore history and persona from storage and open the initial session.
    pub fn new(mut llm: LlmClient, storage: Storage) -> Self {
        let messages = storage.load_history();
        let persona = storage.load_persona();
        llm.init_session(&persona, &messages);
        info!(messages = messages.len(), "conversation restored");

        Self {
            messages,
            phase: TurnPhase::Idle,
            cancelled: false,
            error: None,
            suggestions: Vec::new(),
            edit_target: None,
            stream_id: 0,
            cancel_token: None,
            placeholder_id: None,
            accumulator: String::new(),
            persona,
            llm,
            storage,
            suggest_after_cancel: true,
        }
    }

    pub fn with_suggest_after_cancel(mut self, enabled: bool) -> Self {
        self.suggest_after_cancel = enabled;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn edit_target(&self) -> Option<&MessageId> {
        self.edit_target.as_ref()
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn current_stream_id(&self) -> u64 {
        self.stream_id
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.stream_id == stream_id
    }

    /// Suggestions when there are any, starter prompts otherwise.
    pub fn pills(&self) -> Vec<Pill> {
        if self.suggestions.is_empty() {
            STARTER_PROMPTS
                .iter()
                .map(|(label, prompt)| Pill {
                    label: label.to_string(),
                    prompt: prompt.to_string(),
                })
                .collect()
        } else {
            self.suggestions
                .iter()
                .map(|text| Pill {
                    label: text.clone(),
                    prompt: text.clone(),
                })
                .collect()
        }
    }

    /// Text of the most recent non-empty model reply.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.is_model() && !message.text.is_empty())
            .map(|message| message.text.as_str())
    }

    /// Append a user turn and start generating the reply. Returns `None`
    /// without touching any state for blank text or while a reply is in
    /// flight.
    pub fn send_message(&mut self, text: &str) -> Option<ReplyRequest> {
        if text.trim().is_empty() || self.is_in_flight() {
            return None;
        }

        let mut history = self.messages.clone();
        history.push(Message::user(text));
        self.generate_reply(history)
    }

    /// Generate a reply to the last message of `history`, which becomes the
    /// conversation. Earlier entries form the session context.
    pub fn generate_reply(&mut self, history: Vec<Message>) -> Option<ReplyRequest> {
        let (prompt, prior) = history.split_last()?;
        let prompt = prompt.text.clone();

        self.phase = TurnPhase::Sending;
        self.error = None;
        self.suggestions.clear();
        self.cancelled = false;
        self.llm.init_session(&self.persona, prior);

        let placeholder = Message::model("");
        self.placeholder_id = Some(placeholder.id.clone());
        self.accumulator.clear();
        self.messages = history;
        self.messages.push(placeholder);
        self.persist_history();

        let cancel_token = self.begin_stream();
        let stream = self.llm.stream_reply(&prompt);
        self.phase = TurnPhase::Streaming;
        debug!(stream_id = self.stream_id, "reply requested");

        Some(ReplyRequest {
            stream_id: self.stream_id,
            stream,
            cancel_token,
        })
    }

    /// Apply one reply fragment. Returns whether it changed the transcript.
    pub fn apply_chunk(&mut self, stream_id: u64, chunk: &str) -> bool {
        if !self.is_current_stream(stream_id)
            || self.phase != TurnPhase::Streaming
            || self.cancelled
        {
            return false;
        }

        self.accumulator.push_str(chunk);
        let Some(placeholder_id) = self.placeholder_id.as_ref() else {
            return false;
        };
        match self
            .messages
            .iter_mut()
            .rev()
            .find(|message| &message.id == placeholder_id)
        {
            Some(message) => message.text.clone_from(&self.accumulator),
            None => return false,
        }
        self.persist_history();
        true
    }

    /// The reply stream ended normally.
    pub fn finish_stream(&mut self, stream_id: u64) -> Option<SuggestionRequest> {
        if !self.is_current_stream(stream_id) || self.phase != TurnPhase::Streaming {
            return None;
        }

        self.cancel_token = None;
        self.persist_history();
        info!(stream_id, chars = self.accumulator.len(), "reply complete");
        self.phase = TurnPhase::Suggesting;
        Some(self.suggestion_request())
    }

    /// The reply stream failed. Partial text stays in place.
    pub fn fail_stream(&mut self, stream_id: u64, detail: &str) -> bool {
        if !self.is_current_stream(stream_id) || self.phase != TurnPhase::Streaming {
            return false;
        }

        warn!(stream_id, error = %detail, "reply stream failed");
        self.cancel_token = None;
        self.error = Some(STALLED_BANNER.to_string());
        self.persist_history();
        self.phase = TurnPhase::Idle;
        self.cancelled = false;
        true
    }

    /// Stop the reply being streamed. Text received so far is kept.
    pub fn cancel_in_flight(&mut self) -> Option<SuggestionRequest> {
        if self.phase != TurnPhase::Streaming {
            return None;
        }

        self.cancelled = true;
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.persist_history();
        info!(stream_id = self.stream_id, "reply stopped by user");

        if self.suggest_after_cancel {
            self.phase = TurnPhase::Suggesting;
            Some(self.suggestion_request())
        } else {
            self.phase = TurnPhase::Idle;
            self.cancelled = false;
            None
        }
    }

    pub fn apply_suggestions(&mut self, stream_id: u64, suggestions: Vec<String>) -> bool {
        if !self.is_current_stream(stream_id) || self.phase != TurnPhase::Suggesting {
            return false;
        }

        self.suggestions = suggestions.into_iter().take(MAX_SUGGESTIONS).collect();
        self.phase = TurnPhase::Idle;
        self.cancelled = false;
        true
    }

    /// Mark a user message as the edit target.
    pub fn begin_edit(&mut self, id: &MessageId) -> bool {
        if self.is_in_flight() {
            return false;
        }
        let editable = self
            .messages
            .iter()
            .any(|message| &message.id == id && message.is_user());
        if editable {
            self.edit_target = Some(id.clone());
        }
        editable
    }

    pub fn cancel_edit(&mut self) {
        self.edit_target = None;
    }

    /// Replace a user message's text, drop everything after it and generate
    /// a fresh reply. Blank or unchanged text leaves the history alone. The
    /// edited message keeps its id, role and timestamp.
    pub fn edit_and_regenerate(&mut self, id: &MessageId, new_text: &str) -> Option<ReplyRequest> {
        if self.is_in_flight() {
            return None;
        }
        self.edit_target = None;

        let index = self.messages.iter().position(|message| &message.id == id)?;
        let original = &self.messages[index];
        if !original.is_user() || original.text == new_text || new_text.trim().is_empty() {
            return None;
        }

        let mut edited = original.clone();
        edited.text = new_text.to_string();
        let mut history = self.messages[..index].to_vec();
        history.push(edited);
        debug!(index, "regenerating from edited message");
        self.generate_reply(history)
    }

    /// Forget the whole conversation, aborting any reply in progress.
    pub fn clear_all(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.stream_id += 1;
        self.messages.clear();
        self.suggestions.clear();
        self.error = None;
        self.edit_target = None;
        self.placeholder_id = None;
        self.accumulator.clear();
        self.phase = TurnPhase::Idle;
        self.cancelled = false;

        if let Err(err) = self.storage.clear_history() {
            warn!(error = %err, "failed to clear stored history");
        }
        self.llm.init_session(&self.persona, &[]);
        info!("conversation cleared");
    }

    /// Store a new persona. The session is rebuilt once, with the full
    /// history, and only when something actually changed.
    pub fn set_persona(&mut self, persona: PersonaConfig) -> bool {
        let persona = persona.normalized();
        if persona == self.persona {
            return false;
        }

        self.persona = persona;
        if let Err(err) = self.storage.save_persona(&self.persona) {
            warn!(error = %err, "failed to persist persona");
        }
        self.llm.init_session(&self.persona, &self.messages);
        true
    }

    pub fn set_language(&mut self, language: &str) -> bool {
        let persona = self.persona.with_language(language);
        self.set_persona(persona)
    }

    /// Run one turn to completion without an event loop.
    pub async fn drive_reply(&mut self, request: ReplyRequest) -> TurnOutcome {
        self.drive_reply_with(request, |_| {}).await
    }

    /// Like [`drive_reply`](Self::drive_reply), reporting each applied
    /// fragment to `on_chunk`.
    pub async fn drive_reply_with<F>(&mut self, request: ReplyRequest, mut on_chunk: F) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        let ReplyRequest {
            stream_id,
            mut stream,
            cancel_token,
        } = request;

        let suggestion_request = loop {
            if cancel_token.is_cancelled() {
                break self.cancel_in_flight();
            }
            match stream.next().await {
                Some(Ok(chunk)) => {
                    if self.apply_chunk(stream_id, &chunk) {
                        on_chunk(&chunk);
                    }
                }
                Some(Err(err)) => {
                    let detail = err.to_string();
                    self.fail_stream(stream_id, &detail);
                    return TurnOutcome::Failed(detail);
                }
                None => break self.finish_stream(stream_id),
            }
        };

        if let Some(SuggestionRequest { stream_id, task }) = suggestion_request {
            let suggestions = task.await;
            self.apply_suggestions(stream_id, suggestions);
        }

        if cancel_token.is_cancelled() {
            TurnOutcome::Cancelled
        } else {
            TurnOutcome::Completed
        }
    }

    fn begin_stream(&mut self) -> CancellationToken {
        if let Some(previous) = self.cancel_token.take() {
            previous.cancel();
        }
        self.stream_id += 1;
        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        token
    }

    fn suggestion_request(&self) -> SuggestionRequest {
        let start = self.messages.len().saturating_sub(2);
        SuggestionRequest {
            stream_id: self.stream_id,
            task: self.llm.suggestion_task(&self.messages[start..]),
        }
    }

    fn persist_history(&self) {
        if let Err(err) = self.storage.save_history(&self.messages) {
            warn!(error = %err, "failed to persist history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::{fallback_suggestions, BackendError};
    use crate::core::message::Role;
    use crate::utils::test_utils::{controller_with, FakeBackend};
    use std::sync::Arc;

    fn controller() -> (ChatController, Arc<FakeBackend>) {
        controller_with(FakeBackend::new(), Storage::in_memory())
    }

    #[test]
    fn send_appends_user_and_placeholder() {
        let (mut chat, backend) = controller();
        let request = chat.send_message("roast me").expect("accepted");

        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[0].role, Role::User);
        assert_eq!(chat.messages()[0].text, "roast me");
        assert_eq!(chat.messages()[1].role, Role::Model);
        assert_eq!(chat.messages()[1].text, "");
        assert_eq!(chat.phase(), TurnPhase::Streaming);
        assert_eq!(request.stream_id, chat.current_stream_id());

        let calls = backend.stream_calls();
        assert!(calls.is_empty(), "stream is lazy until polled");
        assert_eq!(chat.storage().load_history(), chat.messages());
    }

    #[test]
    fn blank_or_busy_sends_are_rejected() {
        let (mut chat, _) = controller();
        assert!(chat.send_message("   \n\t").is_none());
        assert!(chat.messages().is_empty());
        assert_eq!(chat.phase(), TurnPhase::Idle);

        let _request = chat.send_message("first").expect("accepted");
        let generation = chat.llm().session_generation();
        assert!(chat.send_message("second").is_none());
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.llm().session_generation(), generation);
    }

    #[test]
    fn session_context_excludes_the_prompt() {
        let (mut chat, _) = controller();
        let request = chat.send_message("one").expect("accepted");
        chat.apply_chunk(request.stream_id, "burn");
        let suggestions = chat.finish_stream(request.stream_id).expect("suggest");
        chat.apply_suggestions(suggestions.stream_id, vec![]);

        let _second = chat.send_message("two").expect("accepted");
        let turns = &chat.llm().session().turns;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "one");
        assert_eq!(turns[1].text, "burn");
    }

    #[test]
    fn chunks_accumulate_into_placeholder() {
        let (mut chat, _) = controller();
        let request = chat.send_message("go").expect("accepted");
        assert!(chat.apply_chunk(request.stream_id, "Nice "));
        assert!(chat.apply_chunk(request.stream_id, "try."));
        assert_eq!(chat.messages()[1].text, "Nice try.");
    }

    #[test]
    fn each_applied_chunk_is_persisted() {
        let (mut chat, _) = controller();
        let request = chat.send_message("go").expect("accepted");
        assert!(chat.apply_chunk(request.stream_id, "Nice "));
        assert_eq!(chat.storage().load_history()[1].text, "Nice ");

        assert!(chat.apply_chunk(request.stream_id, "try."));
        assert_eq!(chat.storage().load_history()[1].text, "Nice try.");
    }

    #[test]
    fn stale_stream_ids_are_ignored() {
        let (mut chat, _) = controller();
        let request = chat.send_message("go").expect("accepted");
        let stale = request.stream_id - 1;

        assert!(!chat.apply_chunk(stale, "ghost"));
        assert!(chat.finish_stream(stale).is_none());
        assert!(!chat.fail_stream(stale, "boom"));
        assert_eq!(chat.messages()[1].text, "");
        assert_eq!(chat.phase(), TurnPhase::Streaming);
    }

    #[test]
    fn finish_persists_and_requests_suggestions() {
        let (mut chat, _) = controller();
        let request = chat.send_message("go").expect("accepted");
        chat.apply_chunk(request.stream_id, "Done.");

        let suggestion = chat.finish_stream(request.stream_id).expect("suggestions");
        assert_eq!(chat.phase(), TurnPhase::Suggesting);
        assert!(chat.is_in_flight());
        assert_eq!(chat.storage().load_history()[1].text, "Done.");

        assert!(chat.apply_suggestions(
            suggestion.stream_id,
            vec!["a".into(), "b".into(), "c".into(), "d".into()]
        ));
        assert_eq!(chat.suggestions(), ["a", "b", "c"]);
        assert_eq!(chat.phase(), TurnPhase::Idle);
    }

    #[test]
    fn failure_sets_banner_and_keeps_partial_text() {
        let (mut chat, _) = controller();
        let request = chat.send_message("go").expect("accepted");
        chat.apply_chunk(request.stream_id, "partial");

        assert!(chat.fail_stream(request.stream_id, "connection reset"));
        assert_eq!(chat.error(), Some(STALLED_BANNER));
        assert_eq!(chat.messages()[1].text, "partial");
        assert_eq!(chat.phase(), TurnPhase::Idle);
        assert!(chat.suggestions().is_empty());
        assert_eq!(chat.storage().load_history()[1].text, "partial");

        // The End that trails an Error is a no-op.
        assert!(chat.finish_stream(request.stream_id).is_none());
    }

    #[test]
    fn next_send_clears_error_and_suggestions() {
        let (mut chat, _) = controller();
        let request = chat.send_message("go").expect("accepted");
        chat.fail_stream(request.stream_id, "down");
        assert!(chat.error().is_some());

        let _request = chat.send_message("again").expect("accepted");
        assert!(chat.error().is_none());
        assert!(chat.suggestions().is_empty());
    }

    #[test]
    fn cancel_keeps_applied_chunks_and_drops_later_ones() {
        let (mut chat, _) = controller();
        let request = chat.send_message("go").expect("accepted");
        chat.apply_chunk(request.stream_id, "Nice ");

        let suggestion = chat.cancel_in_flight().expect("suggest after cancel");
        assert!(request.cancel_token.is_cancelled());
        assert!(chat.is_cancelled());
        assert!(!chat.apply_chunk(request.stream_id, "try."));
        assert_eq!(chat.messages()[1].text, "Nice ");
        assert_eq!(chat.phase(), TurnPhase::Suggesting);

        chat.apply_suggestions(suggestion.stream_id, vec!["x".into()]);
        assert_eq!(chat.phase(), TurnPhase::Idle);
        assert!(!chat.is_cancelled());
        assert_eq!(chat.messages().len(), 2);
    }

    #[test]
    fn cancel_without_suggestions_goes_idle() {
        let (chat, _) = controller();
        let mut chat = chat.with_suggest_after_cancel(false);
        let _request = chat.send_message("go").expect("accepted");

        assert!(chat.cancel_in_flight().is_none());
        assert_eq!(chat.phase(), TurnPhase::Idle);
        assert!(!chat.is_cancelled());
    }

    #[test]
    fn cancel_is_ignored_outside_streaming() {
        let (mut chat, _) = controller();
        assert!(chat.cancel_in_flight().is_none());

        let request = chat.send_message("go").expect("accepted");
        chat.finish_stream(request.stream_id);
        assert!(chat.cancel_in_flight().is_none());
        assert_eq!(chat.phase(), TurnPhase::Suggesting);
    }

    #[test]
    fn editing_with_same_text_is_a_noop() {
        let (mut chat, _) = controller();
        let request = chat.send_message("original").expect("accepted");
        chat.finish_stream(request.stream_id);
        chat.apply_suggestions(chat.current_stream_id(), vec![]);

        let id = chat.messages()[0].id.clone();
        let before = chat.messages().to_vec();
        let generation = chat.llm().session_generation();
        assert!(chat.edit_and_regenerate(&id, "original").is_none());
        assert_eq!(chat.messages(), before.as_slice());
        assert_eq!(chat.llm().session_generation(), generation);
    }

    #[test]
    fn editing_to_blank_text_keeps_history() {
        let (mut chat, _) = controller();
        let request = chat.send_message("original").expect("accepted");
        chat.apply_chunk(request.stream_id, "burn");
        chat.finish_stream(request.stream_id);
        chat.apply_suggestions(request.stream_id, vec![]);

        let id = chat.messages()[0].id.clone();
        let before = chat.messages().to_vec();
        assert!(chat.begin_edit(&id));
        assert!(chat.edit_and_regenerate(&id, "").is_none());
        assert!(chat.edit_and_regenerate(&id, "  \n ").is_none());
        assert_eq!(chat.messages(), before.as_slice());
        assert_eq!(chat.storage().load_history(), before);
        assert!(chat.edit_target().is_none());
    }

    #[test]
    fn editing_truncates_and_regenerates() {
        let (mut chat, _) = controller();
        for text in ["one", "two", "three"] {
            let request = chat.send_message(text).expect("accepted");
            chat.apply_chunk(request.stream_id, "reply");
            chat.finish_stream(request.stream_id);
            chat.apply_suggestions(request.stream_id, vec![]);
        }
        assert_eq!(chat.messages().len(), 6);

        let target = chat.messages()[2].clone();
        assert!(chat.begin_edit(&target.id));
        let request = chat
            .edit_and_regenerate(&target.id, "TWO")
            .expect("regenerating");

        assert_eq!(chat.messages().len(), 4);
        let edited = &chat.messages()[2];
        assert_eq!(edited.text, "TWO");
        assert_eq!(edited.id, target.id);
        assert_eq!(edited.timestamp, target.timestamp);
        assert_eq!(chat.messages()[3].text, "");
        assert_eq!(chat.llm().session().turns.len(), 2);
        assert!(chat.edit_target().is_none());
        assert_eq!(request.stream_id, chat.current_stream_id());
    }

    #[test]
    fn editing_rejects_model_and_unknown_messages() {
        let (mut chat, _) = controller();
        let request = chat.send_message("hi").expect("accepted");
        let user_id = chat.messages()[0].id.clone();
        assert!(!chat.begin_edit(&user_id), "busy");
        chat.finish_stream(request.stream_id);
        chat.apply_suggestions(request.stream_id, vec![]);

        let model_id = chat.messages()[1].id.clone();
        assert!(!chat.begin_edit(&model_id));
        assert!(chat.edit_and_regenerate(&model_id, "changed").is_none());
        assert!(chat
            .edit_and_regenerate(&MessageId::from("missing"), "changed")
            .is_none());
        assert_eq!(chat.messages().len(), 2);
    }

    #[test]
    fn clear_all_resets_everything() {
        let (mut chat, _) = controller();
        let request = chat.send_message("hi").expect("accepted");
        chat.finish_stream(request.stream_id);
        chat.apply_suggestions(request.stream_id, vec!["more".into()]);

        chat.clear_all();
        assert!(chat.messages().is_empty());
        assert!(chat.suggestions().is_empty());
        assert!(chat.storage().load_history().is_empty());
        assert!(chat.llm().session().turns.is_empty());
        assert_eq!(chat.pills().len(), STARTER_PROMPTS.len());
    }

    #[test]
    fn clear_all_aborts_inflight_reply() {
        let (mut chat, _) = controller();
        let request = chat.send_message("hi").expect("accepted");
        chat.clear_all();

        assert!(request.cancel_token.is_cancelled());
        assert_eq!(chat.phase(), TurnPhase::Idle);
        assert!(!chat.apply_chunk(request.stream_id, "late"));
        assert!(chat.finish_stream(request.stream_id).is_none());
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn persona_change_reinitializes_exactly_once() {
        let (mut chat, _) = controller();
        let request = chat.send_message("hi").expect("accepted");
        chat.apply_chunk(request.stream_id, "no");
        chat.finish_stream(request.stream_id);
        chat.apply_suggestions(request.stream_id, vec![]);

        let generation = chat.llm().session_generation();
        let persona = PersonaConfig {
            sarcasm: 10,
            ..chat.persona().clone()
        };
        assert!(chat.set_persona(persona.clone()));
        assert_eq!(chat.llm().session_generation(), generation + 1);
        assert_eq!(chat.llm().session().turns.len(), 2);
        assert_eq!(chat.storage().load_persona(), persona);

        assert!(!chat.set_persona(persona));
        assert_eq!(chat.llm().session_generation(), generation + 1);
    }

    #[test]
    fn language_switch_updates_instruction() {
        let (mut chat, _) = controller();
        assert!(chat.set_language("Bengali"));
        assert!(chat
            .llm()
            .session()
            .system_instruction
            .contains("Speak ONLY in Bengali."));
        assert!(!chat.set_language("Bengali"));
    }

    #[test]
    fn restores_persisted_state_on_start() {
        let storage = Storage::in_memory();
        storage
            .save_history(&[Message::user("old"), Message::model("burn")])
            .expect("save");
        let persona = PersonaConfig {
            edge: 1,
            ..PersonaConfig::default()
        };
        storage.save_persona(&persona).expect("save");

        let (chat, _) = controller_with(FakeBackend::new(), storage);
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.persona(), &persona);
        assert_eq!(chat.llm().session().turns.len(), 2);
        assert_eq!(chat.last_reply(), Some("burn"));
    }

    #[test]
    fn pills_prefer_suggestions() {
        let (mut chat, _) = controller();
        assert_eq!(chat.pills()[0].label, "Roast Me");
        assert_eq!(chat.pills()[0].prompt, "Annihilate my fragile ego. Go hard.");

        let request = chat.send_message("hi").expect("accepted");
        chat.finish_stream(request.stream_id);
        chat.apply_suggestions(request.stream_id, vec!["Try harder".into()]);
        assert_eq!(
            chat.pills(),
            vec![Pill {
                label: "Try harder".into(),
                prompt: "Try harder".into()
            }]
        );
    }

    #[tokio::test]
    async fn drive_reply_runs_full_turn() {
        let backend = FakeBackend::new()
            .with_chunks(["Nice ", "try."])
            .with_suggestions(Ok(r#"["Again?","Weak.","Next."]"#.to_string()));
        let (mut chat, backend) = controller_with(backend, Storage::in_memory());

        let request = chat.send_message("judge me").expect("accepted");
        let mut seen = Vec::new();
        let outcome = chat
            .drive_reply_with(request, |chunk| seen.push(chunk.to_string()))
            .await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(seen, vec!["Nice ", "try."]);
        assert_eq!(chat.messages()[1].text, "Nice try.");
        assert_eq!(chat.suggestions(), ["Again?", "Weak.", "Next."]);
        assert_eq!(chat.phase(), TurnPhase::Idle);
        assert_eq!(backend.stream_calls()[0].prompt, "judge me");
        assert!(backend.suggestion_prompts()[0].contains("judge me Nice try."));
    }

    #[tokio::test]
    async fn drive_reply_reports_failure() {
        let backend = FakeBackend::new().with_stream_items(vec![
            Ok("half".to_string()),
            Err(BackendError::Transport("reset".to_string())),
        ]);
        let (mut chat, backend) = controller_with(backend, Storage::in_memory());

        let request = chat.send_message("go").expect("accepted");
        let outcome = chat.drive_reply(request).await;

        assert_eq!(outcome, TurnOutcome::Failed("Request failed: reset".to_string()));
        assert_eq!(chat.messages()[1].text, "half");
        assert_eq!(chat.error(), Some(STALLED_BANNER));
        assert!(backend.suggestion_prompts().is_empty());
    }

    #[tokio::test]
    async fn drive_reply_falls_back_on_bad_suggestions() {
        let backend = FakeBackend::new()
            .with_chunks(["ok"])
            .with_suggestions(Ok("nope".to_string()));
        let (mut chat, _) = controller_with(backend, Storage::in_memory());

        let request = chat.send_message("go").expect("accepted");
        chat.drive_reply(request).await;
        assert_eq!(chat.suggestions(), fallback_suggestions().as_slice());
    }

    #[tokio::test]
    async fn drive_reply_stops_on_cancelled_token() {
        let backend = FakeBackend::new().with_chunks(["never"]);
        let (mut chat, _) = controller_with(backend, Storage::in_memory());

        let request = chat.send_message("go").expect("accepted");
        request.cancel_token.cancel();
        let outcome = chat.drive_reply(request).await;

        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(chat.messages()[1].text, "");
        assert_eq!(chat.phase(), TurnPhase::Idle);
    }
}
