use ratatui::style::{Color, Modifier, Style};

/// The two selectable color schemes. Stored by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeKind {
    #[default]
    Neon,
    Obsidian,
}

impl ThemeKind {
    pub const ALL: [ThemeKind; 2] = [ThemeKind::Neon, ThemeKind::Obsidian];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeKind::Neon => "neon",
            ThemeKind::Obsidian => "obsidian",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "neon" => Some(ThemeKind::Neon),
            "obsidian" => Some(ThemeKind::Obsidian),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ThemeKind::Neon => ThemeKind::Obsidian,
            ThemeKind::Obsidian => ThemeKind::Neon,
        }
    }

    pub fn theme(self) -> Theme {
        match self {
            ThemeKind::Neon => Theme::neon(),
            ThemeKind::Obsidian => Theme::obsidian(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    // Overall background color to paint the full frame
    pub background_color: Color,
    pub border_style: Style,

    // Header
    pub title_style: Style,
    pub subtitle_style: Style,
    pub tab_style: Style,
    pub tab_active_style: Style,
    pub hint_style: Style,

    // Transcript
    pub user_label_style: Style,
    pub user_text_style: Style,
    pub model_label_style: Style,
    pub model_text_style: Style,
    pub code_style: Style,
    pub bold_style: Style,
    pub selection_style: Style,
    pub banner_style: Style,
    pub streaming_indicator_style: Style,
    pub error_style: Style,

    // Pills and composer
    pub pill_style: Style,
    pub pill_key_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub input_text_style: Style,
    pub input_placeholder_style: Style,
    pub input_cursor_style: Style,
    pub status_style: Style,

    // Settings overlay
    pub overlay_title_style: Style,
    pub slider_filled_style: Style,
    pub slider_empty_style: Style,
    pub button_style: Style,
}

impl Theme {
    /// Purple and cyan on near-black.
    pub fn neon() -> Self {
        let purple = Color::Rgb(168, 85, 247);
        let cyan = Color::Rgb(103, 232, 249);
        let text = Color::Rgb(240, 240, 245);
        let muted = Color::Rgb(110, 110, 125);

        Theme {
            background_color: Color::Rgb(5, 5, 10),
            border_style: Style::default().fg(Color::Rgb(60, 40, 90)),

            title_style: Style::default().fg(purple).add_modifier(Modifier::BOLD),
            subtitle_style: Style::default().fg(purple),
            tab_style: Style::default().fg(muted),
            tab_active_style: Style::default()
                .fg(Color::Rgb(5, 5, 10))
                .bg(purple)
                .add_modifier(Modifier::BOLD),
            hint_style: Style::default().fg(muted),

            user_label_style: Style::default().fg(Color::Rgb(90, 60, 130)),
            user_text_style: Style::default().fg(muted).add_modifier(Modifier::ITALIC),
            model_label_style: Style::default().fg(purple).add_modifier(Modifier::BOLD),
            model_text_style: Style::default().fg(text),
            code_style: Style::default().fg(cyan).bg(Color::Rgb(12, 30, 36)),
            bold_style: Style::default().fg(purple).add_modifier(Modifier::BOLD),
            selection_style: Style::default().bg(Color::Rgb(40, 20, 60)),
            banner_style: Style::default().fg(purple).add_modifier(Modifier::BOLD),
            streaming_indicator_style: Style::default()
                .fg(purple)
                .add_modifier(Modifier::ITALIC | Modifier::BOLD),
            error_style: Style::default()
                .fg(purple)
                .bg(Color::Rgb(30, 10, 45))
                .add_modifier(Modifier::BOLD),

            pill_style: Style::default().fg(purple),
            pill_key_style: Style::default().fg(muted),
            input_border_style: Style::default().fg(Color::Rgb(90, 50, 140)),
            input_title_style: Style::default().fg(purple),
            input_text_style: Style::default().fg(text),
            input_placeholder_style: Style::default().fg(muted),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            status_style: Style::default().fg(cyan),

            overlay_title_style: Style::default().fg(purple).add_modifier(Modifier::BOLD),
            slider_filled_style: Style::default().fg(purple),
            slider_empty_style: Style::default().fg(Color::Rgb(40, 40, 50)),
            button_style: Style::default()
                .fg(Color::White)
                .bg(Color::Rgb(147, 51, 234))
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Graphite with a violet accent.
    pub fn obsidian() -> Self {
        let violet = Color::Rgb(139, 92, 246);
        let steel = Color::Rgb(148, 163, 184);
        let text = Color::Rgb(226, 232, 240);
        let muted = Color::Rgb(100, 106, 120);

        Theme {
            background_color: Color::Rgb(17, 17, 20),
            border_style: Style::default().fg(Color::Rgb(52, 52, 60)),

            title_style: Style::default().fg(text).add_modifier(Modifier::BOLD),
            subtitle_style: Style::default().fg(violet),
            tab_style: Style::default().fg(muted),
            tab_active_style: Style::default()
                .fg(Color::Rgb(17, 17, 20))
                .bg(violet)
                .add_modifier(Modifier::BOLD),
            hint_style: Style::default().fg(muted),

            user_label_style: Style::default().fg(Color::Rgb(90, 80, 120)),
            user_text_style: Style::default().fg(muted).add_modifier(Modifier::ITALIC),
            model_label_style: Style::default().fg(violet).add_modifier(Modifier::BOLD),
            model_text_style: Style::default().fg(text),
            code_style: Style::default().fg(steel).bg(Color::Rgb(30, 32, 38)),
            bold_style: Style::default().fg(violet).add_modifier(Modifier::BOLD),
            selection_style: Style::default().bg(Color::Rgb(38, 36, 52)),
            banner_style: Style::default().fg(text).add_modifier(Modifier::BOLD),
            streaming_indicator_style: Style::default()
                .fg(violet)
                .add_modifier(Modifier::ITALIC | Modifier::BOLD),
            error_style: Style::default()
                .fg(violet)
                .bg(Color::Rgb(32, 28, 44))
                .add_modifier(Modifier::BOLD),

            pill_style: Style::default().fg(violet),
            pill_key_style: Style::default().fg(muted),
            input_border_style: Style::default().fg(Color::Rgb(70, 70, 82)),
            input_title_style: Style::default().fg(violet),
            input_text_style: Style::default().fg(text),
            input_placeholder_style: Style::default().fg(muted),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            status_style: Style::default().fg(steel),

            overlay_title_style: Style::default().fg(violet).add_modifier(Modifier::BOLD),
            slider_filled_style: Style::default().fg(violet),
            slider_empty_style: Style::default().fg(Color::Rgb(45, 45, 52)),
            button_style: Style::default()
                .fg(Color::White)
                .bg(Color::Rgb(109, 40, 217))
                .add_modifier(Modifier::BOLD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_default_is_neon() {
        for kind in ThemeKind::ALL {
            assert_eq!(ThemeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ThemeKind::parse(" Obsidian "), Some(ThemeKind::Obsidian));
        assert_eq!(ThemeKind::parse("solarized"), None);
        assert_eq!(ThemeKind::default(), ThemeKind::Neon);
    }

    #[test]
    fn toggle_alternates() {
        assert_eq!(ThemeKind::Neon.toggle(), ThemeKind::Obsidian);
        assert_eq!(ThemeKind::Obsidian.toggle(), ThemeKind::Neon);
    }

    #[test]
    fn palettes_differ() {
        assert_ne!(
            ThemeKind::Neon.theme().background_color,
            ThemeKind::Obsidian.theme().background_color
        );
    }
}
