use crate::core::app::ui_state::{SettingsField, UiMode};
use crate::core::app::App;
use crate::core::markup::{render_inline, FragmentKind};
use crate::core::message::Message;
use crate::core::persona::{PersonaField, LANGUAGE_TABS};
use crate::ui::layout::{centered_rect, wrap_spans};
use crate::ui::theme::Theme;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub const USER_LABEL: &str = "OPERATOR_LOG";
pub const MODEL_LABEL: &str = "VULCAN_OUT";
pub const COOKING_LABEL: &str = "VULCAN_COOKING...";
const MAX_COMPOSER_LINES: u16 = 5;

struct Areas {
    header: Rect,
    transcript: Rect,
    pills: Rect,
    status: Rect,
    composer: Rect,
}

fn split_areas(app: &App, area: Rect) -> Areas {
    let input_lines = (app.ui.textarea().lines().len() as u16).clamp(1, MAX_COMPOSER_LINES);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(input_lines + 2), // +2 for borders
        ])
        .split(area);

    Areas {
        header: chunks[0],
        transcript: chunks[1],
        pills: chunks[2],
        status: chunks[3],
        composer: chunks[4],
    }
}

pub fn ui(f: &mut Frame, app: &App) {
    let theme = &app.ui.theme;
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(theme.background_color)),
        area,
    );

    let areas = split_areas(app, area);
    render_header(f, app, areas.header);
    render_transcript(f, app, areas.transcript);
    render_pills(f, app, areas.pills);
    render_status(f, app, areas.status);
    render_composer(f, app, areas.composer);

    if let UiMode::Settings { field } = app.ui.mode {
        render_settings(f, app, field, area);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let persona = app.chat.persona();

    let mut title = vec![
        Span::styled(" VULCAN ", theme.title_style),
        Span::styled(
            format!(" Roast Engine v{} ", env!("CARGO_PKG_VERSION")),
            theme.subtitle_style,
        ),
        Span::raw("  "),
    ];
    for (name, label) in LANGUAGE_TABS {
        let style = if persona.language.eq_ignore_ascii_case(name) {
            theme.tab_active_style
        } else {
            theme.tab_style
        };
        title.push(Span::styled(format!(" {label} "), style));
        title.push(Span::raw(" "));
    }
    title.push(Span::styled(
        format!(" ◐ {}", app.ui.theme_kind.as_str().to_uppercase()),
        theme.hint_style,
    ));
    if app.dictation.is_listening() {
        title.push(Span::styled("  ● REC", theme.error_style));
    }

    let mut hints = vec!["^T theme", "^G lang", "^O calibrate", "^E edit", "^Y copy"];
    if !app.chat.messages().is_empty() {
        hints.push("^L clear");
    }
    if app.dictation.is_available() {
        hints.push("^D mic");
    }
    hints.push("^C quit");

    let header = Paragraph::new(vec![
        Line::from(title),
        Line::from(Span::styled(format!(" {}", hints.join("  ")), theme.hint_style)),
    ])
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(theme.border_style),
    );
    f.render_widget(header, area);
}

/// Styled, pre-wrapped transcript lines for a viewport `width` columns wide.
pub fn transcript_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let theme = &app.ui.theme;
    let width = width.max(8) as usize;
    let content_width = width.saturating_sub(2);
    let mut lines: Vec<Line<'static>> = Vec::new();

    if app.chat.messages().is_empty() {
        lines.push(Line::default());
        lines.push(Line::default());
        lines.push(
            Line::from(Span::styled("V U L C A N", theme.banner_style))
                .alignment(Alignment::Center),
        );
        lines.push(
            Line::from(Span::styled("────────", theme.border_style)).alignment(Alignment::Center),
        );
    }

    let selected = app.selected_edit_index();
    let editing = app.chat.edit_target();
    for (index, message) in app.chat.messages().iter().enumerate() {
        let start = lines.len();
        let is_editing = editing == Some(&message.id);
        push_message_lines(&mut lines, message, theme, content_width, is_editing);
        if selected == Some(index) {
            for line in &mut lines[start..] {
                *line = std::mem::take(line).patch_style(theme.selection_style);
            }
        }
        lines.push(Line::default());
    }

    if app.chat.is_in_flight() {
        lines.push(Line::from(vec![
            Span::styled(" ◉ ", theme.streaming_indicator_style),
            Span::styled(COOKING_LABEL, theme.streaming_indicator_style),
        ]));
    }

    if let Some(error) = app.chat.error() {
        lines.push(Line::default());
        lines.push(
            Line::from(Span::styled(format!(" {error} "), theme.error_style))
                .alignment(Alignment::Center),
        );
    }

    lines
}

fn push_message_lines(
    lines: &mut Vec<Line<'static>>,
    message: &Message,
    theme: &Theme,
    width: usize,
    is_editing: bool,
) {
    let is_user = message.is_user();
    let (label, label_style, base_style, alignment) = if is_user {
        (
            USER_LABEL,
            theme.user_label_style,
            theme.user_text_style,
            Alignment::Right,
        )
    } else {
        (
            MODEL_LABEL,
            theme.model_label_style,
            theme.model_text_style,
            Alignment::Left,
        )
    };

    let label = if is_editing {
        format!("{label} · EDITING")
    } else {
        label.to_string()
    };
    lines.push(Line::from(Span::styled(format!(" {label} "), label_style)).alignment(alignment));

    let spans: Vec<(String, Style)> = render_inline(&message.text)
        .into_iter()
        .map(|fragment| {
            let style = match fragment.kind {
                FragmentKind::Text => base_style,
                FragmentKind::Code => base_style.patch(theme.code_style),
                FragmentKind::Bold => base_style
                    .patch(theme.bold_style)
                    .remove_modifier(Modifier::ITALIC),
            };
            (fragment.content, style)
        })
        .collect();

    for wrapped in wrap_spans(&spans, width) {
        let mut content = vec![Span::raw(" ")];
        content.extend(wrapped);
        content.push(Span::raw(" "));
        lines.push(Line::from(content).alignment(alignment));
    }
}

/// Largest useful `scroll_from_bottom` for a terminal of the given size.
pub fn transcript_max_scroll(app: &App, term_width: u16, term_height: u16) -> u16 {
    let areas = split_areas(app, Rect::new(0, 0, term_width, term_height));
    let total = transcript_lines(app, areas.transcript.width).len();
    let total = u16::try_from(total).unwrap_or(u16::MAX);
    total.saturating_sub(areas.transcript.height)
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let lines = transcript_lines(app, area.width);
    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let max_offset = total.saturating_sub(area.height);
    let from_bottom = app.ui.scroll_from_bottom.min(max_offset);

    let transcript = Paragraph::new(lines).scroll((max_offset - from_bottom, 0));
    f.render_widget(transcript, area);
}

fn render_pills(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let dimmed = app.chat.is_in_flight();
    let mut spans = vec![Span::raw(" ")];
    for (index, pill) in app.chat.pills().iter().enumerate() {
        let mut style = theme.pill_style;
        if dimmed {
            style = style.add_modifier(Modifier::DIM);
        }
        spans.push(Span::styled(format!("M-{} ", index + 1), theme.pill_key_style));
        spans.push(Span::styled(
            format!("[{}]", pill.label.to_uppercase()),
            style,
        ));
        spans.push(Span::raw("  "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let text = match &app.ui.status {
        Some(status) => format!(" {status}"),
        None => String::new(),
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(text, theme.status_style))),
        area,
    );
}

fn render_composer(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.ui.theme;
    let title = match &app.ui.mode {
        UiMode::InPlaceEdit { .. } => " Editing message · Enter re-sync · Esc discard ",
        UiMode::EditSelect { .. } => " ↑/↓ pick a message · Enter edit · Esc cancel ",
        _ if app.chat.is_in_flight() => " Enter/Esc stop ",
        _ => " Enter send · Alt+Enter newline ",
    };

    let mut textarea = app.ui.textarea().clone();
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.input_border_style)
            .title(Span::styled(title, theme.input_title_style)),
    );
    f.render_widget(&textarea, area);
}

fn render_settings(f: &mut Frame, app: &App, focused: SettingsField, area: Rect) {
    let theme = &app.ui.theme;
    let persona = app.chat.persona();
    let popup = centered_rect(46, 13, area);
    let inner_width = popup.width.saturating_sub(4) as usize;

    let marker = |field: SettingsField| if field == focused { "▸ " } else { "  " };
    let mut lines = vec![Line::default()];

    for (field, persona_field) in [
        (SettingsField::Sarcasm, PersonaField::Sarcasm),
        (SettingsField::Edge, PersonaField::Edge),
    ] {
        let value = persona_field.value(persona);
        let label = format!("{}{}", marker(field), persona_field.label().to_uppercase());
        let percent = format!("{value}%");
        let padding = inner_width.saturating_sub(label.chars().count() + percent.len());
        lines.push(Line::from(vec![
            Span::styled(label, theme.hint_style),
            Span::raw(" ".repeat(padding)),
            Span::styled(percent, theme.overlay_title_style),
        ]));

        let bar_width = inner_width.saturating_sub(2);
        let filled = bar_width * usize::from(value) / 100;
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled("█".repeat(filled), theme.slider_filled_style),
            Span::styled("░".repeat(bar_width - filled), theme.slider_empty_style),
        ]));
        lines.push(Line::default());
    }

    let fast = if persona.fast_reply { "[ON]" } else { "[OFF]" };
    lines.push(Line::from(vec![
        Span::styled(
            format!("{}FAST REPLY ", marker(SettingsField::FastReply)),
            theme.hint_style,
        ),
        Span::styled(fast, theme.overlay_title_style),
    ]));
    lines.push(Line::default());

    let mut confirm_style = theme.button_style;
    if focused != SettingsField::Confirm {
        confirm_style = confirm_style.add_modifier(Modifier::DIM);
    }
    lines.push(Line::from(Span::styled("  CONFIRM  ", confirm_style)).alignment(Alignment::Center));

    let overlay = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.overlay_title_style)
            .style(Style::default().bg(theme.background_color))
            .title(Span::styled(" CALIBRATE ", theme.overlay_title_style)),
    );
    f.render_widget(Clear, popup);
    f.render_widget(overlay, popup);
}
