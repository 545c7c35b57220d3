mod input;
mod settings;
mod streaming;

use tokio::sync::mpsc;

use super::App;
use crate::core::chat_stream::{ReplyRequest, SuggestionRequest};

#[derive(Debug)]
pub enum AppAction {
    AppendResponseChunk {
        content: String,
        stream_id: u64,
    },
    StreamErrored {
        message: String,
        stream_id: u64,
    },
    StreamCompleted {
        stream_id: u64,
    },
    SuggestionsReady {
        suggestions: Vec<String>,
        stream_id: u64,
    },
    CancelStreaming,
    /// Enter in the composer: send, stop the stream, or save an edit.
    SubmitComposer,
    SubmitMessage {
        message: String,
    },
    UsePill {
        index: usize,
    },
    InsertIntoInput {
        text: String,
    },
    ClearInput,
    SetStatus {
        message: String,
    },
    ClearStatus,
    ToggleTheme,
    CycleLanguage,
    ClearConversation,
    ScrollTranscript {
        lines: i32,
    },
    CopyLastReply,
    ToggleDictation,
    DictationTranscript {
        text: String,
    },
    DictationEnded,
    EnterEditSelect,
    EditSelectMove {
        delta: i32,
    },
    EditSelectConfirm,
    CancelEdit,
    OpenSettings,
    CloseSettings,
    SettingsFocus {
        delta: i32,
    },
    SettingsAdjust {
        delta: i16,
    },
    SettingsActivate,
    RequestExit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppActionContext {
    pub term_width: u16,
    pub term_height: u16,
}

pub struct AppActionEnvelope {
    pub action: AppAction,
    pub context: AppActionContext,
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppActionEnvelope>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppActionEnvelope>) -> Self {
        Self { tx }
    }

    pub fn dispatch(&self, action: AppAction, ctx: AppActionContext) {
        self.dispatch_many([action], ctx);
    }

    pub fn dispatch_many<I>(&self, actions: I, ctx: AppActionContext)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions.into_iter() {
            let _ = self.tx.send(AppActionEnvelope {
                action,
                context: ctx,
            });
        }
    }
}

/// Side effects the event loop performs on behalf of an action.
pub enum AppCommand {
    SpawnStream(ReplyRequest),
    FetchSuggestions(SuggestionRequest),
    StartDictation,
    CopyToClipboard(String),
}

pub fn apply_actions(
    app: &mut App,
    envelopes: impl IntoIterator<Item = AppActionEnvelope>,
) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for envelope in envelopes {
        if let Some(cmd) = apply_action(app, envelope.action, envelope.context) {
            commands.push(cmd);
        }
    }
    app.refresh_placeholder();
    commands
}

pub fn apply_action(app: &mut App, action: AppAction, ctx: AppActionContext) -> Option<AppCommand> {
    match action {
        AppAction::AppendResponseChunk { .. }
        | AppAction::StreamErrored { .. }
        | AppAction::StreamCompleted { .. }
        | AppAction::SuggestionsReady { .. }
        | AppAction::CancelStreaming
        | AppAction::SubmitComposer
        | AppAction::SubmitMessage { .. }
        | AppAction::UsePill { .. } => streaming::handle_streaming_action(app, action, ctx),

        AppAction::InsertIntoInput { .. }
        | AppAction::ClearInput
        | AppAction::SetStatus { .. }
        | AppAction::ClearStatus
        | AppAction::ToggleTheme
        | AppAction::ClearConversation
        | AppAction::ScrollTranscript { .. }
        | AppAction::CopyLastReply
        | AppAction::ToggleDictation
        | AppAction::DictationTranscript { .. }
        | AppAction::DictationEnded
        | AppAction::EnterEditSelect
        | AppAction::EditSelectMove { .. }
        | AppAction::EditSelectConfirm
        | AppAction::CancelEdit
        | AppAction::RequestExit => input::handle_input_action(app, action, ctx),

        AppAction::CycleLanguage
        | AppAction::OpenSettings
        | AppAction::CloseSettings
        | AppAction::SettingsFocus { .. }
        | AppAction::SettingsAdjust { .. }
        | AppAction::SettingsActivate => settings::handle_settings_action(app, action, ctx),
    }
}
