//! Event polling, dispatching, and UI rendering loop.
//!
//! The loop owns the [`App`]. Keyboard input is resolved and applied
//! immediately; results from background work (reply streams, suggestion
//! fetches, dictation, clipboard) arrive on channels and are turned into
//! [`AppAction`]s before being applied in batches. Redraws are throttled.

use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tui_textarea::Input as TAInput;

use crate::core::app::{
    apply_actions, App, AppAction, AppActionContext, AppActionDispatcher, AppActionEnvelope,
    AppCommand,
};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::dictation::DictationEvent;
use crate::ui::renderer::ui;
use crate::utils::clipboard::copy_to_clipboard;

use super::keybindings::{resolve_key, KeyResult};
use super::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

const MAX_FPS: u64 = 60;

/// Handles the loop hands background work to.
struct LoopServices {
    stream_service: ChatStreamService,
    dispatcher: AppActionDispatcher,
    dictation_tx: mpsc::UnboundedSender<DictationEvent>,
}

fn try_draw_frame(
    app: &App,
    terminal: &mut ChatTerminal,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> io::Result<()> {
    if !*request_redraw {
        return Ok(());
    }

    let now = Instant::now();
    if now.duration_since(*last_draw) < frame_duration {
        return Ok(());
    }

    terminal.draw(|f| ui(f, app))?;
    *last_draw = now;
    *request_redraw = false;
    Ok(())
}

fn current_context(terminal: &ChatTerminal) -> AppActionContext {
    let size = terminal.size().unwrap_or_default();
    AppActionContext {
        term_width: size.width,
        term_height: size.height,
    }
}

fn process_ui_events(
    app: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    services: &LoopServices,
    ctx: AppActionContext,
) -> bool {
    let mut events_processed = false;
    while let Ok(ev) = event_rx.try_recv() {
        events_processed = true;
        match ev {
            UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                route_keyboard_event(app, services, key, ctx);
                if app.ui.exit_requested {
                    break;
                }
            }
            UiEvent::Crossterm(Event::Paste(text)) => {
                handle_paste_event(app, services, text, ctx);
            }
            UiEvent::Crossterm(_) => {}
        }
    }
    events_processed
}

fn route_keyboard_event(
    app: &mut App,
    services: &LoopServices,
    key: KeyEvent,
    ctx: AppActionContext,
) {
    match resolve_key(app, &key, ctx.term_height) {
        KeyResult::Actions(actions) => apply_now(app, services, actions, ctx),
        KeyResult::Textarea => app.ui.apply_textarea_edit(|textarea| {
            textarea.input(TAInput::from(key));
        }),
        KeyResult::Ignored => {}
    }
}

/// Apply actions synchronously so they observe every earlier keystroke.
fn apply_now(
    app: &mut App,
    services: &LoopServices,
    actions: Vec<AppAction>,
    ctx: AppActionContext,
) {
    let envelopes = actions.into_iter().map(|action| AppActionEnvelope {
        action,
        context: ctx,
    });
    let commands = apply_actions(app, envelopes);
    execute_commands(app, services, commands);
}

pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

fn handle_paste_event(app: &mut App, services: &LoopServices, text: String, ctx: AppActionContext) {
    let sanitized_text = sanitize_pasted_text(&text);
    if sanitized_text.is_empty() {
        return;
    }
    apply_now(
        app,
        services,
        vec![AppAction::InsertIntoInput {
            text: sanitized_text,
        }],
        ctx,
    );
}

fn process_stream_updates(
    dispatcher: &AppActionDispatcher,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ctx: AppActionContext,
    current_stream_id: u64,
) -> bool {
    let mut received_any = false;
    let mut coalesced_chunks = String::new();
    let mut followup_actions = Vec::new();

    while let Ok((message, msg_stream_id)) = rx.try_recv() {
        if msg_stream_id != current_stream_id {
            continue;
        }

        match message {
            StreamMessage::Chunk(content) => coalesced_chunks.push_str(&content),
            StreamMessage::Error(err) => followup_actions.push(AppAction::StreamErrored {
                message: err,
                stream_id: msg_stream_id,
            }),
            StreamMessage::End => followup_actions.push(AppAction::StreamCompleted {
                stream_id: msg_stream_id,
            }),
            StreamMessage::Suggestions(suggestions) => {
                followup_actions.push(AppAction::SuggestionsReady {
                    suggestions,
                    stream_id: msg_stream_id,
                })
            }
        }

        received_any = true;
    }

    if !received_any {
        return false;
    }

    let mut actions = Vec::with_capacity(1 + followup_actions.len());
    if !coalesced_chunks.is_empty() {
        actions.push(AppAction::AppendResponseChunk {
            content: coalesced_chunks,
            stream_id: current_stream_id,
        });
    }
    actions.extend(followup_actions);

    if !actions.is_empty() {
        dispatcher.dispatch_many(actions, ctx);
    }

    true
}

fn process_dictation_events(
    dispatcher: &AppActionDispatcher,
    rx: &mut mpsc::UnboundedReceiver<DictationEvent>,
    ctx: AppActionContext,
) -> bool {
    let mut received_any = false;
    while let Ok(event) = rx.try_recv() {
        received_any = true;
        let action = match event {
            DictationEvent::Transcript(text) => AppAction::DictationTranscript { text },
            DictationEvent::Ended => AppAction::DictationEnded,
        };
        dispatcher.dispatch(action, ctx);
    }
    received_any
}

fn drain_action_queue(
    app: &mut App,
    services: &LoopServices,
    action_rx: &mut mpsc::UnboundedReceiver<AppActionEnvelope>,
) -> bool {
    let mut pending = Vec::new();
    while let Ok(envelope) = action_rx.try_recv() {
        pending.push(envelope);
    }

    if pending.is_empty() {
        return false;
    }

    let commands = apply_actions(app, pending);
    execute_commands(app, services, commands);
    true
}

fn execute_commands(app: &mut App, services: &LoopServices, commands: Vec<AppCommand>) {
    for cmd in commands {
        match cmd {
            AppCommand::SpawnStream(request) => {
                debug!(stream_id = request.stream_id, "spawning reply stream");
                services.stream_service.spawn_stream(request);
            }
            AppCommand::FetchSuggestions(request) => {
                services.stream_service.spawn_suggestions(request);
            }
            AppCommand::StartDictation => {
                if let Err(err) = app.dictation.start(services.dictation_tx.clone()) {
                    warn!(error = %err, "dictation failed to start");
                    app.ui.set_status(err.to_string());
                }
            }
            AppCommand::CopyToClipboard(text) => spawn_clipboard_copy(services, text),
        }
    }
}

fn spawn_clipboard_copy(services: &LoopServices, text: String) {
    let dispatcher = services.dispatcher.clone();
    tokio::task::spawn_blocking(move || {
        let message = match copy_to_clipboard(&text) {
            Ok(()) => "Copied last roast".to_string(),
            Err(err) => {
                warn!(error = %err, "clipboard copy failed");
                err.to_string()
            }
        };
        dispatcher.dispatch(AppAction::SetStatus { message }, AppActionContext::default());
    });
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

/// Run the interactive chat screen until the user quits.
pub async fn run_chat(
    mut app: App,
    stream_idle_timeout: Option<Duration>,
) -> Result<(), Box<dyn Error>> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AppActionEnvelope>();
    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let (dictation_tx, mut dictation_rx) = mpsc::unbounded_channel::<DictationEvent>();
    let services = LoopServices {
        stream_service: stream_service.with_idle_timeout(stream_idle_timeout),
        dispatcher: AppActionDispatcher::new(action_tx),
        dictation_tx,
    };

    let mut terminal = setup_terminal()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);
    info!(messages = app.chat.messages().len(), "chat screen started");

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;
    let mut listening = app.dictation.is_listening();

    let result: Result<(), Box<dyn Error>> = loop {
        if app.ui.exit_requested {
            break Ok(());
        }

        if let Err(err) = try_draw_frame(
            &app,
            &mut terminal,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        ) {
            break Err(err.into());
        }

        let ctx = current_context(&terminal);
        let events_processed = process_ui_events(&mut app, &mut event_rx, &services, ctx);
        if events_processed {
            request_redraw = true;
        }

        let received_any = process_stream_updates(
            &services.dispatcher,
            &mut stream_rx,
            ctx,
            app.chat.current_stream_id(),
        );
        let dictated = process_dictation_events(&services.dispatcher, &mut dictation_rx, ctx);
        let actions_applied = drain_action_queue(&mut app, &services, &mut action_rx);
        if received_any || dictated || actions_applied {
            request_redraw = true;
        }

        let listening_now = app.dictation.is_listening();
        if listening_now != listening {
            listening = listening_now;
            request_redraw = true;
        }

        if !events_processed && !received_any && !dictated && !request_redraw {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    if app.dictation.is_listening() {
        app.dictation.stop();
    }
    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;
    info!("chat screen closed");

    result
}
