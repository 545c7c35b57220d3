//! Application state shared by the event loop and the renderer.

pub mod actions;
pub mod ui_state;

pub use actions::{
    apply_action, apply_actions, AppAction, AppActionContext, AppActionDispatcher,
    AppActionEnvelope, AppCommand,
};
pub use ui_state::{SettingsField, UiMode, UiState};

use tracing::warn;

use crate::core::chat::ChatController;
use crate::core::dictation::Dictation;
use crate::ui::theme::ThemeKind;

pub struct App {
    pub chat: ChatController,
    pub ui: UiState,
    pub dictation: Box<dyn Dictation>,
}

impl App {
    pub fn new(chat: ChatController, theme: ThemeKind, dictation: Box<dyn Dictation>) -> Self {
        let mut app = Self {
            chat,
            ui: UiState::new(theme),
            dictation,
        };
        app.refresh_placeholder();
        app
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.chat.is_current_stream(stream_id)
    }

    /// Composer placeholder for the current turn phase.
    pub fn refresh_placeholder(&mut self) {
        let text = if self.chat.is_in_flight() {
            ui_state::PLACEHOLDER_BUSY
        } else {
            ui_state::PLACEHOLDER_IDLE
        };
        self.ui.set_placeholder(text);
    }

    pub fn set_theme(&mut self, kind: ThemeKind) {
        self.ui.set_theme(kind);
        if let Err(err) = self.chat.storage().save_theme(kind) {
            warn!(error = %err, "failed to persist theme");
        }
    }

    /// Transcript indices of the messages that can be edited.
    pub fn editable_indices(&self) -> Vec<usize> {
        self.chat
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, message)| message.is_user())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn selected_edit_index(&self) -> Option<usize> {
        match self.ui.mode {
            UiMode::EditSelect { selected_index } => Some(selected_index),
            _ => None,
        }
    }
}
