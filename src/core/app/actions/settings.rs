use super::{App, AppAction, AppActionContext, AppCommand};
use crate::core::app::ui_state::{SettingsField, UiMode};

pub(super) fn handle_settings_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::CycleLanguage => {
            let next = app.chat.persona().next_language();
            if app.chat.set_language(next) {
                app.ui.set_status(format!("Language: {next}"));
            }
        }
        AppAction::OpenSettings => {
            if matches!(app.ui.mode, UiMode::InPlaceEdit { .. }) {
                app.ui.restore_composer();
                app.chat.cancel_edit();
            }
            app.ui.mode = UiMode::Settings {
                field: SettingsField::Sarcasm,
            };
        }
        AppAction::CloseSettings => close(app),
        AppAction::SettingsFocus { delta } => {
            if let Some(field) = app.ui.settings_field() {
                app.ui.mode = UiMode::Settings {
                    field: field.shifted(delta),
                };
            }
        }
        AppAction::SettingsAdjust { delta } => match app.ui.settings_field() {
            Some(SettingsField::FastReply) => toggle_fast_reply(app),
            Some(field) => {
                if let Some(persona_field) = field.persona_field() {
                    let persona = app.chat.persona().adjusted(persona_field, delta);
                    app.chat.set_persona(persona);
                }
            }
            None => {}
        },
        AppAction::SettingsActivate => match app.ui.settings_field() {
            Some(SettingsField::FastReply) => toggle_fast_reply(app),
            Some(_) => close(app),
            None => {}
        },
        _ => unreachable!("non-settings action routed to settings handler"),
    }
    None
}

fn toggle_fast_reply(app: &mut App) {
    let mut persona = app.chat.persona().clone();
    persona.fast_reply = !persona.fast_reply;
    app.chat.set_persona(persona);
}

fn close(app: &mut App) {
    if app.ui.settings_field().is_some() {
        app.ui.mode = UiMode::Typing;
    }
}
