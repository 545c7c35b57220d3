//! Inline micro-markup used in chat bubbles.
//!
//! Three delimiters are recognised on a single line: `` `code` ``,
//! `**bold**` and `*italic*`. Scanning is left to right and the first
//! complete pair wins, so spans never nest. Italic spans are consumed as a
//! unit but keep their asterisks and render as plain text. Anything that does
//! not close on the same line is ordinary text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Text,
    Code,
    Bold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub content: String,
}

impl Fragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Text,
            content: content.into(),
        }
    }

    pub fn code(content: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Code,
            content: content.into(),
        }
    }

    pub fn bold(content: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Bold,
            content: content.into(),
        }
    }
}

/// Split `text` into styled fragments.
pub fn render_inline(text: &str) -> Vec<Fragment> {
    let mut fragments = FragmentBuilder::default();
    let mut cursor = 0;

    while cursor < text.len() {
        let rest = &text[cursor..];
        match match_span(rest) {
            Some(Span { kind, content, len }) => {
                match kind {
                    SpanKind::Code => fragments.push(Fragment::code(content)),
                    SpanKind::Bold => fragments.push(Fragment::bold(content)),
                    SpanKind::Italic => fragments.push_text(&rest[..len]),
                }
                cursor += len;
            }
            None => {
                let ch_len = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                fragments.push_text(&rest[..ch_len]);
                cursor += ch_len;
            }
        }
    }

    fragments.finish()
}

/// Concatenate fragment contents back into display text, without delimiters.
pub fn plain_text(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.content.as_str())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Code,
    Bold,
    Italic,
}

struct Span<'a> {
    kind: SpanKind,
    content: &'a str,
    len: usize,
}

fn match_span(rest: &str) -> Option<Span<'_>> {
    if rest.starts_with('`') {
        if let Some(span) = paired(rest, "`", SpanKind::Code) {
            return Some(span);
        }
    }
    if rest.starts_with("**") {
        if let Some(span) = paired(rest, "**", SpanKind::Bold) {
            return Some(span);
        }
    }
    if rest.starts_with('*') {
        return paired(rest, "*", SpanKind::Italic);
    }
    None
}

/// Shortest `delim … delim` match at the start of `rest` that stays on one line.
fn paired<'a>(rest: &'a str, delim: &str, kind: SpanKind) -> Option<Span<'a>> {
    let body = &rest[delim.len()..];
    let line = match body.find('\n') {
        Some(end) => &body[..end],
        None => body,
    };
    let close = line.find(delim)?;
    Some(Span {
        kind,
        content: &body[..close],
        len: delim.len() * 2 + close,
    })
}

#[derive(Default)]
struct FragmentBuilder {
    fragments: Vec<Fragment>,
}

impl FragmentBuilder {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.fragments.last_mut() {
            if last.kind == FragmentKind::Text {
                last.content.push_str(text);
                return;
            }
        }
        self.fragments.push(Fragment::text(text));
    }

    fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    fn finish(self) -> Vec<Fragment> {
        self.fragments
    }
}
