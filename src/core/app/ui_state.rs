use crate::core::message::MessageId;
use crate::core::persona::PersonaField;
use crate::ui::theme::{Theme, ThemeKind};
use tui_textarea::{CursorMove, TextArea};

pub const PLACEHOLDER_IDLE: &str = "Drop a burn...";
pub const PLACEHOLDER_BUSY: &str = "Engine is cooking...";

/// Row of the calibration overlay that has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Sarcasm,
    Edge,
    FastReply,
    Confirm,
}

impl SettingsField {
    pub const ALL: [SettingsField; 4] = [
        SettingsField::Sarcasm,
        SettingsField::Edge,
        SettingsField::FastReply,
        SettingsField::Confirm,
    ];

    /// Move focus by `delta` rows, clamped to the first and last row.
    pub fn shifted(self, delta: i32) -> Self {
        let index = Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0) as i32;
        let next = (index + delta).clamp(0, Self::ALL.len() as i32 - 1);
        Self::ALL[next as usize]
    }

    pub fn persona_field(self) -> Option<PersonaField> {
        match self {
            SettingsField::Sarcasm => Some(PersonaField::Sarcasm),
            SettingsField::Edge => Some(PersonaField::Edge),
            SettingsField::FastReply | SettingsField::Confirm => None,
        }
    }
}

/// Current UI interaction mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMode {
    /// Default typing mode for composing new messages.
    Typing,

    /// Picking a user message to edit.
    EditSelect {
        /// Transcript index of the highlighted message.
        selected_index: usize,
    },

    /// The composer holds the text of a user message being edited.
    InPlaceEdit { id: MessageId },

    /// Calibration overlay is open.
    Settings { field: SettingsField },
}

impl UiMode {
    /// Picking or editing an earlier message.
    pub fn is_editing(&self) -> bool {
        matches!(self, UiMode::EditSelect { .. } | UiMode::InPlaceEdit { .. })
    }
}

pub struct UiState {
    pub theme_kind: ThemeKind,
    pub theme: Theme,
    pub mode: UiMode,
    /// Lines scrolled up from the bottom of the transcript; 0 follows output.
    pub scroll_from_bottom: u16,
    pub status: Option<String>,
    pub exit_requested: bool,
    textarea: TextArea<'static>,
    /// Composer contents stashed while an edit borrows the composer.
    stashed_draft: Option<String>,
}

impl UiState {
    pub fn new(theme_kind: ThemeKind) -> Self {
        let mut state = Self {
            theme_kind,
            theme: theme_kind.theme(),
            mode: UiMode::Typing,
            scroll_from_bottom: 0,
            status: None,
            exit_requested: false,
            textarea: TextArea::default(),
            stashed_draft: None,
        };
        state.configure_textarea();
        state
    }

    pub fn set_theme(&mut self, kind: ThemeKind) {
        self.theme_kind = kind;
        self.theme = kind.theme();
        self.configure_textarea();
    }

    fn configure_textarea(&mut self) {
        self.textarea.set_style(self.theme.input_text_style);
        self.textarea
            .set_cursor_style(self.theme.input_cursor_style);
        self.textarea
            .set_cursor_line_style(ratatui::style::Style::default());
        self.textarea
            .set_placeholder_style(self.theme.input_placeholder_style);
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn apply_textarea_edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut TextArea<'static>),
    {
        f(&mut self.textarea);
    }

    pub fn get_input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn set_input_text(&mut self, text: &str) {
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        self.textarea = TextArea::from(lines);
        self.textarea.move_cursor(CursorMove::Bottom);
        self.textarea.move_cursor(CursorMove::End);
        self.configure_textarea();
    }

    pub fn clear_input(&mut self) {
        self.set_input_text("");
    }

    pub fn set_placeholder(&mut self, text: &str) {
        if self.textarea.placeholder_text() != text {
            self.textarea.set_placeholder_text(text);
        }
    }

    /// Load `text` into the composer, keeping the current draft for later.
    pub fn borrow_composer(&mut self, text: &str) {
        if self.stashed_draft.is_none() {
            self.stashed_draft = Some(self.get_input_text());
        }
        self.set_input_text(text);
    }

    /// Put back the draft that [`borrow_composer`](Self::borrow_composer) saved.
    pub fn restore_composer(&mut self) {
        let draft = self.stashed_draft.take().unwrap_or_default();
        self.set_input_text(&draft);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn in_edit_select(&self) -> bool {
        matches!(self.mode, UiMode::EditSelect { .. })
    }

    pub fn settings_field(&self) -> Option<SettingsField> {
        match self.mode {
            UiMode::Settings { field } => Some(field),
            _ => None,
        }
    }
}
