//! Width-aware wrapping shared by the renderer and the scroll math.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

enum Token<'a> {
    Word(&'a str),
    Space(&'a str),
    Newline,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (index, ch) in text.char_indices() {
        if ch == '\n' {
            if start < index {
                tokens.push(token_for(&text[start..index], in_space));
            }
            tokens.push(Token::Newline);
            start = index + ch.len_utf8();
            in_space = None;
            continue;
        }
        let is_space = ch.is_whitespace();
        if in_space.is_some_and(|previous| previous != is_space) {
            tokens.push(token_for(&text[start..index], in_space));
            start = index;
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        tokens.push(token_for(&text[start..], in_space));
    }
    tokens
}

fn token_for(text: &str, in_space: Option<bool>) -> Token<'_> {
    if in_space == Some(true) {
        Token::Space(text)
    } else {
        Token::Word(text)
    }
}

struct LineBuilder {
    width: usize,
    lines: Vec<Vec<Span<'static>>>,
    current: Vec<Span<'static>>,
    current_len: usize,
}

impl LineBuilder {
    fn push(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.current_len += text.width();
        if let Some(last) = self.current.last_mut() {
            if last.style == style {
                last.content.to_mut().push_str(text);
                return;
            }
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn emit(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
        self.current_len = 0;
    }

    fn push_long_word(&mut self, word: &str, style: Style) {
        let mut chunk = String::new();
        let mut chunk_len = 0;
        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if self.current_len + chunk_len + ch_width > self.width {
                self.push(&chunk, style);
                chunk.clear();
                chunk_len = 0;
                self.emit();
            }
            chunk.push(ch);
            chunk_len += ch_width;
        }
        self.push(&chunk, style);
    }
}

/// Greedy word wrap over styled runs. Hard newlines always break; words wider
/// than `width` are split by character. Always yields at least one line.
pub fn wrap_spans(runs: &[(String, Style)], width: usize) -> Vec<Vec<Span<'static>>> {
    let mut builder = LineBuilder {
        width: width.max(1),
        lines: Vec::new(),
        current: Vec::new(),
        current_len: 0,
    };
    let mut soft_wrapped = false;

    for (text, style) in runs {
        for token in tokenize(text) {
            match token {
                Token::Newline => {
                    builder.emit();
                    soft_wrapped = false;
                }
                Token::Space(space) => {
                    if builder.current_len == 0 && soft_wrapped {
                        continue;
                    }
                    if builder.current_len + space.width() > builder.width {
                        builder.emit();
                        soft_wrapped = true;
                    } else {
                        builder.push(space, *style);
                    }
                }
                Token::Word(word) => {
                    let word_len = word.width();
                    if builder.current_len > 0 && builder.current_len + word_len > builder.width {
                        builder.emit();
                        soft_wrapped = true;
                    }
                    if word_len > builder.width {
                        builder.push_long_word(word, *style);
                    } else {
                        builder.push(word, *style);
                    }
                }
            }
        }
    }
    builder.emit();
    builder.lines
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Vec<Span<'static>>]) -> Vec<String> {
        lines
            .iter()
            .map(|spans| spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let runs = vec![("you call that code".to_string(), Style::default())];
        assert_eq!(
            plain(&wrap_spans(&runs, 10)),
            vec!["you call ", "that code"]
        );
    }

    #[test]
    fn hard_newlines_and_empty_text() {
        let runs = vec![("a\n\nb".to_string(), Style::default())];
        assert_eq!(plain(&wrap_spans(&runs, 10)), vec!["a", "", "b"]);
        assert_eq!(wrap_spans(&[], 10).len(), 1);
    }

    #[test]
    fn long_words_are_split() {
        let runs = vec![("abcdefghij".to_string(), Style::default())];
        assert_eq!(plain(&wrap_spans(&runs, 4)), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn styles_survive_wrapping() {
        let bold = Style::default().add_modifier(ratatui::style::Modifier::BOLD);
        let runs = vec![
            ("plain ".to_string(), Style::default()),
            ("loud".to_string(), bold),
        ];
        let lines = wrap_spans(&runs, 20);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[0][1].style, bold);
    }

    #[test]
    fn wide_characters_count_double() {
        let runs = vec![("界界界".to_string(), Style::default())];
        assert_eq!(plain(&wrap_spans(&runs, 4)), vec!["界界", "界"]);
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(10, 4, area), Rect::new(5, 3, 10, 4));
        assert_eq!(centered_rect(50, 50, area), area);
    }
}
