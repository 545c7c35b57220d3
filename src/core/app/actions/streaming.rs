use super::{App, AppAction, AppActionContext, AppCommand};
use crate::core::app::ui_state::UiMode;
use crate::core::chat::TurnPhase;
use crate::core::message::MessageId;
use tracing::debug;

pub(super) fn handle_streaming_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::AppendResponseChunk { content, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            if app.chat.apply_chunk(stream_id, &content) {
                app.ui.scroll_to_bottom();
            }
            None
        }
        AppAction::StreamErrored { message, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            app.chat.fail_stream(stream_id, &message);
            None
        }
        AppAction::StreamCompleted { stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            app.chat
                .finish_stream(stream_id)
                .map(AppCommand::FetchSuggestions)
        }
        AppAction::SuggestionsReady {
            suggestions,
            stream_id,
        } => {
            if app.chat.apply_suggestions(stream_id, suggestions) {
                app.ui.scroll_to_bottom();
            }
            None
        }
        AppAction::CancelStreaming => app
            .chat
            .cancel_in_flight()
            .map(AppCommand::FetchSuggestions),
        AppAction::SubmitComposer => submit_composer(app),
        AppAction::SubmitMessage { message } => send_message(app, &message),
        AppAction::UsePill { index } => {
            if app.ui.mode.is_editing() {
                return None;
            }
            let pill = app.chat.pills().into_iter().nth(index)?;
            send_message(app, &pill.prompt)
        }
        _ => unreachable!("non-streaming action routed to streaming handler"),
    }
}

fn submit_composer(app: &mut App) -> Option<AppCommand> {
    if let UiMode::InPlaceEdit { id } = app.ui.mode.clone() {
        return save_edit(app, &id);
    }

    match app.chat.phase() {
        TurnPhase::Streaming => app
            .chat
            .cancel_in_flight()
            .map(AppCommand::FetchSuggestions),
        TurnPhase::Sending | TurnPhase::Suggesting => None,
        TurnPhase::Idle => {
            let text = app.ui.get_input_text();
            send_message(app, &text)
        }
    }
}

fn send_message(app: &mut App, text: &str) -> Option<AppCommand> {
    // The composer belongs to the edit while one is open.
    if app.ui.mode.is_editing() {
        return None;
    }
    let request = app.chat.send_message(text)?;
    app.ui.clear_input();
    app.ui.clear_status();
    app.ui.scroll_to_bottom();
    debug!(stream_id = request.stream_id, "message submitted");
    Some(AppCommand::SpawnStream(request))
}

fn save_edit(app: &mut App, id: &MessageId) -> Option<AppCommand> {
    let new_text = app.ui.get_input_text();
    app.ui.mode = UiMode::Typing;
    app.ui.restore_composer();

    let request = app.chat.edit_and_regenerate(id, &new_text);
    if request.is_none() {
        app.chat.cancel_edit();
        return None;
    }
    app.ui.scroll_to_bottom();
    request.map(AppCommand::SpawnStream)
}
