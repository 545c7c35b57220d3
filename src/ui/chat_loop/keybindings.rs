//! Key resolution for the chat screen.
//!
//! Keys are resolved against the current [`UiMode`] into high-level
//! [`AppAction`]s. Anything that is not a shortcut falls through to the
//! composer's textarea.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::app::{App, AppAction, UiMode};

const SLIDER_STEP: i16 = 1;
const SLIDER_FAST_STEP: i16 = 10;

#[derive(Debug)]
pub enum KeyResult {
    Actions(Vec<AppAction>),
    /// Forward the key to the textarea.
    Textarea,
    Ignored,
}

fn single(action: AppAction) -> KeyResult {
    KeyResult::Actions(vec![action])
}

pub fn resolve_key(app: &App, key: &KeyEvent, term_height: u16) -> KeyResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return single(AppAction::RequestExit);
    }

    match &app.ui.mode {
        UiMode::Settings { .. } => resolve_settings_key(key),
        UiMode::EditSelect { .. } => resolve_edit_select_key(key),
        UiMode::Typing | UiMode::InPlaceEdit { .. } => resolve_composer_key(app, key, term_height),
    }
}

fn resolve_settings_key(key: &KeyEvent) -> KeyResult {
    let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
        SLIDER_FAST_STEP
    } else {
        SLIDER_STEP
    };
    match key.code {
        KeyCode::Esc => single(AppAction::CloseSettings),
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            single(AppAction::CloseSettings)
        }
        KeyCode::Up | KeyCode::BackTab => single(AppAction::SettingsFocus { delta: -1 }),
        KeyCode::Down | KeyCode::Tab => single(AppAction::SettingsFocus { delta: 1 }),
        KeyCode::Left => single(AppAction::SettingsAdjust { delta: -step }),
        KeyCode::Right => single(AppAction::SettingsAdjust { delta: step }),
        KeyCode::Enter | KeyCode::Char(' ') => single(AppAction::SettingsActivate),
        _ => KeyResult::Ignored,
    }
}

fn resolve_edit_select_key(key: &KeyEvent) -> KeyResult {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => single(AppAction::EditSelectMove { delta: -1 }),
        KeyCode::Down | KeyCode::Char('j') => single(AppAction::EditSelectMove { delta: 1 }),
        KeyCode::Enter => single(AppAction::EditSelectConfirm),
        KeyCode::Esc => single(AppAction::CancelEdit),
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            single(AppAction::CancelEdit)
        }
        _ => KeyResult::Ignored,
    }
}

fn resolve_composer_key(app: &App, key: &KeyEvent, term_height: u16) -> KeyResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let editing = matches!(app.ui.mode, UiMode::InPlaceEdit { .. });
    let page = i32::from(term_height.saturating_sub(10).max(1));

    match key.code {
        KeyCode::Char(c) if ctrl => match c {
            't' => single(AppAction::ToggleTheme),
            'g' => single(AppAction::CycleLanguage),
            'o' => single(AppAction::OpenSettings),
            'l' => single(AppAction::ClearConversation),
            'e' if !editing => single(AppAction::EnterEditSelect),
            'y' => single(AppAction::CopyLastReply),
            'd' => single(AppAction::ToggleDictation),
            _ => KeyResult::Textarea,
        },
        KeyCode::Char(c @ '1'..='4') if alt && !editing => single(AppAction::UsePill {
            index: (c as usize) - ('1' as usize),
        }),
        KeyCode::Char('1'..='4') if alt => KeyResult::Ignored,
        KeyCode::Enter if alt || shift => single(AppAction::InsertIntoInput {
            text: "\n".to_string(),
        }),
        KeyCode::Enter => single(AppAction::SubmitComposer),
        KeyCode::Esc => {
            if editing {
                single(AppAction::CancelEdit)
            } else if app.chat.is_in_flight() {
                single(AppAction::CancelStreaming)
            } else if app.ui.status.is_some() || app.chat.error().is_some() {
                single(AppAction::ClearStatus)
            } else {
                KeyResult::Ignored
            }
        }
        KeyCode::PageUp => single(AppAction::ScrollTranscript { lines: page }),
        KeyCode::PageDown => single(AppAction::ScrollTranscript { lines: -page }),
        KeyCode::Up if shift => single(AppAction::ScrollTranscript { lines: 1 }),
        KeyCode::Down if shift => single(AppAction::ScrollTranscript { lines: -1 }),
        _ => KeyResult::Textarea,
    }
}
