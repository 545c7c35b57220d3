use super::{App, AppAction, AppActionContext, AppCommand};
use crate::core::app::ui_state::UiMode;
use crate::core::dictation::append_transcript;
use crate::ui::renderer::transcript_max_scroll;
use tracing::info;

pub(super) fn handle_input_action(
    app: &mut App,
    action: AppAction,
    ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::InsertIntoInput { text } => {
            app.ui.apply_textarea_edit(|textarea| {
                textarea.insert_str(&text);
            });
            None
        }
        AppAction::ClearInput => {
            app.ui.clear_input();
            None
        }
        AppAction::SetStatus { message } => {
            app.ui.set_status(message);
            None
        }
        AppAction::ClearStatus => {
            app.ui.clear_status();
            app.chat.dismiss_error();
            None
        }
        AppAction::ToggleTheme => {
            let next = app.ui.theme_kind.toggle();
            app.set_theme(next);
            None
        }
        AppAction::ClearConversation => {
            if app.chat.messages().is_empty() {
                return None;
            }
            if matches!(app.ui.mode, UiMode::EditSelect { .. } | UiMode::InPlaceEdit { .. }) {
                app.ui.mode = UiMode::Typing;
                app.ui.restore_composer();
            }
            app.chat.clear_all();
            app.ui.scroll_to_bottom();
            app.ui.set_status("Chat cleared");
            None
        }
        AppAction::ScrollTranscript { lines } => {
            let max = transcript_max_scroll(app, ctx.term_width, ctx.term_height);
            let current = i32::from(app.ui.scroll_from_bottom.min(max));
            app.ui.scroll_from_bottom = (current + lines).clamp(0, i32::from(max)) as u16;
            None
        }
        AppAction::CopyLastReply => match app.chat.last_reply() {
            Some(text) => Some(AppCommand::CopyToClipboard(text.to_string())),
            None => {
                app.ui.set_status("Nothing to copy yet");
                None
            }
        },
        AppAction::ToggleDictation => toggle_dictation(app),
        AppAction::DictationTranscript { text } => {
            let current = app.ui.get_input_text();
            app.ui.set_input_text(&append_transcript(&current, &text));
            None
        }
        AppAction::DictationEnded => {
            info!("dictation finished");
            None
        }
        AppAction::EnterEditSelect => {
            enter_edit_select(app);
            None
        }
        AppAction::EditSelectMove { delta } => {
            move_edit_selection(app, delta);
            None
        }
        AppAction::EditSelectConfirm => {
            confirm_edit_selection(app);
            None
        }
        AppAction::CancelEdit => {
            if matches!(app.ui.mode, UiMode::InPlaceEdit { .. }) {
                app.ui.restore_composer();
            }
            app.ui.mode = UiMode::Typing;
            app.chat.cancel_edit();
            None
        }
        AppAction::RequestExit => {
            if app.dictation.is_listening() {
                app.dictation.stop();
            }
            app.ui.exit_requested = true;
            None
        }
        _ => unreachable!("non-input action routed to input handler"),
    }
}

fn toggle_dictation(app: &mut App) -> Option<AppCommand> {
    if !app.dictation.is_available() {
        app.ui
            .set_status("Dictation unavailable: set dictation_command in config.toml");
        return None;
    }
    if app.dictation.is_listening() {
        app.dictation.stop();
        app.ui.clear_status();
        None
    } else {
        app.ui.set_status("Listening...");
        Some(AppCommand::StartDictation)
    }
}

fn enter_edit_select(app: &mut App) {
    if app.chat.is_in_flight() {
        app.ui.set_status("Wait for the roast to finish");
        return;
    }
    match app.editable_indices().last() {
        Some(&selected_index) => {
            app.ui.mode = UiMode::EditSelect { selected_index };
            app.ui.set_status("Select a message (Up/Down, Enter=edit, Esc=cancel)");
        }
        None => app.ui.set_status("No messages to edit"),
    }
}

fn move_edit_selection(app: &mut App, delta: i32) {
    let Some(current) = app.selected_edit_index() else {
        return;
    };
    let candidates = app.editable_indices();
    let Some(position) = candidates.iter().position(|index| *index == current) else {
        return;
    };
    let next = (position as i32 + delta).clamp(0, candidates.len() as i32 - 1) as usize;
    app.ui.mode = UiMode::EditSelect {
        selected_index: candidates[next],
    };
}

fn confirm_edit_selection(app: &mut App) {
    let Some(index) = app.selected_edit_index() else {
        return;
    };
    let Some(message) = app.chat.messages().get(index).cloned() else {
        app.ui.mode = UiMode::Typing;
        return;
    };
    if !app.chat.begin_edit(&message.id) {
        app.ui.mode = UiMode::Typing;
        return;
    }
    app.ui.borrow_composer(&message.text);
    app.ui.mode = UiMode::InPlaceEdit { id: message.id };
    app.ui.set_status("Editing: Enter=re-sync, Esc=discard");
}

#[cfg(test)]
mod tests {
    use super::super::apply_action;
    use super::*;
    use crate::core::app::ui_state::UiMode;
    use crate::ui::theme::ThemeKind;
    use crate::utils::test_utils::create_test_app;

    fn ctx() -> AppActionContext {
        AppActionContext {
            term_width: 80,
            term_height: 24,
        }
    }

    fn complete_turn(app: &mut App, text: &str, reply: &str) {
        let Some(AppCommand::SpawnStream(request)) = apply_action(
            app,
            AppAction::SubmitMessage {
                message: text.into(),
            },
            ctx(),
        ) else {
            panic!("expected stream");
        };
        let stream_id = request.stream_id;
        apply_action(
            app,
            AppAction::AppendResponseChunk {
                content: reply.into(),
                stream_id,
            },
            ctx(),
        );
        apply_action(app, AppAction::StreamCompleted { stream_id }, ctx());
        apply_action(
            app,
            AppAction::SuggestionsReady {
                suggestions: vec![],
                stream_id,
            },
            ctx(),
        );
    }

    #[test]
    fn theme_toggle_persists() {
        let mut app = create_test_app();
        apply_action(&mut app, AppAction::ToggleTheme, ctx());
        assert_eq!(app.ui.theme_kind, ThemeKind::Obsidian);
        assert_eq!(app.chat.storage().load_theme(), ThemeKind::Obsidian);

        apply_action(&mut app, AppAction::ToggleTheme, ctx());
        assert_eq!(app.chat.storage().load_theme(), ThemeKind::Neon);
    }

    #[test]
    fn clear_requires_messages() {
        let mut app = create_test_app();
        apply_action(&mut app, AppAction::ClearConversation, ctx());
        assert!(app.ui.status.is_none());

        complete_turn(&mut app, "hi", "no");
        apply_action(&mut app, AppAction::ClearConversation, ctx());
        assert!(app.chat.messages().is_empty());
        assert_eq!(app.ui.status.as_deref(), Some("Chat cleared"));
    }

    #[test]
    fn edit_select_walks_user_messages_only() {
        let mut app = create_test_app();
        complete_turn(&mut app, "one", "r1");
        complete_turn(&mut app, "two", "r2");
        complete_turn(&mut app, "three", "r3");

        apply_action(&mut app, AppAction::EnterEditSelect, ctx());
        assert_eq!(app.selected_edit_index(), Some(4));

        apply_action(&mut app, AppAction::EditSelectMove { delta: -1 }, ctx());
        assert_eq!(app.selected_edit_index(), Some(2));
        apply_action(&mut app, AppAction::EditSelectMove { delta: -5 }, ctx());
        assert_eq!(app.selected_edit_index(), Some(0));
        apply_action(&mut app, AppAction::EditSelectMove { delta: 1 }, ctx());
        assert_eq!(app.selected_edit_index(), Some(2));
    }

    #[test]
    fn confirming_selection_loads_composer_and_cancel_restores_draft() {
        let mut app = create_test_app();
        complete_turn(&mut app, "original", "burn");
        app.ui.set_input_text("draft");

        apply_action(&mut app, AppAction::EnterEditSelect, ctx());
        apply_action(&mut app, AppAction::EditSelectConfirm, ctx());
        let id = app.chat.messages()[0].id.clone();
        assert_eq!(app.ui.mode, UiMode::InPlaceEdit { id: id.clone() });
        assert_eq!(app.chat.edit_target(), Some(&id));
        assert_eq!(app.ui.get_input_text(), "original");

        apply_action(&mut app, AppAction::CancelEdit, ctx());
        assert_eq!(app.ui.mode, UiMode::Typing);
        assert!(app.chat.edit_target().is_none());
        assert_eq!(app.ui.get_input_text(), "draft");
    }

    #[test]
    fn edit_select_needs_idle_conversation() {
        let mut app = create_test_app();
        apply_action(&mut app, AppAction::EnterEditSelect, ctx());
        assert_eq!(app.ui.status.as_deref(), Some("No messages to edit"));

        apply_action(
            &mut app,
            AppAction::SubmitMessage {
                message: "hi".into(),
            },
            ctx(),
        );
        apply_action(&mut app, AppAction::EnterEditSelect, ctx());
        assert_eq!(app.ui.mode, UiMode::Typing);
    }

    #[test]
    fn transcripts_append_with_single_space() {
        let mut app = create_test_app();
        apply_action(
            &mut app,
            AppAction::DictationTranscript {
                text: "roast".into(),
            },
            ctx(),
        );
        apply_action(
            &mut app,
            AppAction::DictationTranscript { text: "me".into() },
            ctx(),
        );
        assert_eq!(app.ui.get_input_text(), "roast me");
    }

    #[test]
    fn dictation_without_recognizer_sets_status() {
        let mut app = create_test_app();
        assert!(apply_action(&mut app, AppAction::ToggleDictation, ctx()).is_none());
        assert!(app
            .ui
            .status
            .as_deref()
            .is_some_and(|status| status.starts_with("Dictation unavailable")));
    }

    #[test]
    fn copy_uses_latest_reply() {
        let mut app = create_test_app();
        assert!(apply_action(&mut app, AppAction::CopyLastReply, ctx()).is_none());

        complete_turn(&mut app, "hi", "You again?");
        match apply_action(&mut app, AppAction::CopyLastReply, ctx()) {
            Some(AppCommand::CopyToClipboard(text)) => assert_eq!(text, "You again?"),
            _ => panic!("expected clipboard command"),
        }
    }

    #[test]
    fn scrolling_is_clamped_to_transcript() {
        let mut app = create_test_app();
        for index in 0..20 {
            complete_turn(&mut app, &format!("message {index}"), "reply");
        }

        apply_action(&mut app, AppAction::ScrollTranscript { lines: 5 }, ctx());
        assert_eq!(app.ui.scroll_from_bottom, 5);
        apply_action(&mut app, AppAction::ScrollTranscript { lines: 10_000 }, ctx());
        let max = transcript_max_scroll(&app, 80, 24);
        assert!(max > 5);
        assert_eq!(app.ui.scroll_from_bottom, max);
        apply_action(&mut app, AppAction::ScrollTranscript { lines: -10_000 }, ctx());
        assert_eq!(app.ui.scroll_from_bottom, 0);
    }

    #[test]
    fn exit_sets_flag() {
        let mut app = create_test_app();
        apply_action(&mut app, AppAction::RequestExit, ctx());
        assert!(app.ui.exit_requested);
    }
}
