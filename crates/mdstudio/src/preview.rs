use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::highlight::Highlighter;
use crate::layout::Palette;

/// Renders the document into styled terminal lines for the preview pane.
///
/// This is a line-oriented rendering of the same source the exporters
/// consume: headings, lists, quotes, rules, tables and fenced code blocks
/// get structure and color, paragraph text is word-wrapped to the pane.
pub struct PreviewRenderer {
    highlighter: Highlighter,
}

impl PreviewRenderer {
    pub fn new(dark: bool) -> Self {
        Self {
            highlighter: Highlighter::new(dark),
        }
    }

    pub fn set_dark(&mut self, dark: bool) {
        self.highlighter.set_dark(dark);
    }

    pub fn render(&self, source: &str, width: u16, palette: &Palette) -> Vec<Line<'static>> {
        let width = width.max(10) as usize;
        let mut out: Vec<Line<'static>> = Vec::new();
        let mut code_lines: Vec<&str> = Vec::new();
        let mut code_token = String::new();
        let mut in_code = false;

        for raw in source.lines() {
            let line = raw.trim_end();

            if let Some(fence) = line.trim_start().strip_prefix("```") {
                if in_code {
                    out.extend(self.highlighter.highlight_code(&code_lines, &code_token));
                    code_lines.clear();
                    in_code = false;
                } else {
                    in_code = true;
                    code_token = fence.trim().to_string();
                }
                out.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(palette.dim),
                )));
                continue;
            }

            if in_code {
                code_lines.push(raw);
                continue;
            }

            if let Some(text) = heading_text(line) {
                let level = line.chars().take_while(|c| *c == '#').count();
                let style = Style::default()
                    .fg(palette.heading)
                    .add_modifier(Modifier::BOLD);
                out.push(Line::from(Span::styled(text.to_string(), style)));
                if level <= 2 {
                    out.push(Line::from(Span::styled(
                        "─".repeat(width.min(text.width().max(4))),
                        Style::default().fg(palette.border),
                    )));
                }
                continue;
            }

            if is_rule(line) {
                out.push(Line::from(Span::styled(
                    "─".repeat(width),
                    Style::default().fg(palette.border),
                )));
                continue;
            }

            if let Some(rest) = line.trim_start().strip_prefix('>') {
                out.push(Line::from(vec![
                    Span::styled("┃ ", Style::default().fg(palette.border)),
                    Span::styled(
                        rest.trim_start().to_string(),
                        Style::default()
                            .fg(palette.quote)
                            .add_modifier(Modifier::ITALIC),
                    ),
                ]));
                continue;
            }

            if line.trim_start().starts_with('|') {
                out.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(palette.text),
                )));
                continue;
            }

            if let Some((indent, marker, rest)) = list_item(line) {
                let mut spans = vec![
                    Span::raw(" ".repeat(indent)),
                    Span::styled(marker, Style::default().fg(palette.accent)),
                ];
                spans.extend(inline_spans(rest, palette));
                out.push(Line::from(spans));
                continue;
            }

            if line.is_empty() {
                out.push(Line::from(""));
                continue;
            }

            for wrapped in wrap_text(line, width) {
                out.push(Line::from(inline_spans(&wrapped, palette)));
            }
        }

        if in_code && !code_lines.is_empty() {
            // Unterminated fence at end of input.
            out.extend(self.highlighter.highlight_code(&code_lines, &code_token));
        }

        out
    }
}

fn heading_text(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &line[hashes..];
        if rest.starts_with(' ') {
            return Some(rest.trim_start());
        }
    }
    None
}

fn is_rule(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && (t.chars().all(|c| c == '-') || t.chars().all(|c| c == '*'))
}

/// `- item`, `* item`, `12. item` with leading indentation.
fn list_item(line: &str) -> Option<(usize, String, &str)> {
    let indent = line.len() - line.trim_start().len();
    let t = line.trim_start();

    if let Some(rest) = t.strip_prefix("- ").or_else(|| t.strip_prefix("* ")) {
        if let Some(task) = rest.strip_prefix("[ ] ") {
            return Some((indent, String::from("☐ "), task));
        }
        if let Some(task) = rest.strip_prefix("[x] ").or_else(|| rest.strip_prefix("[X] ")) {
            return Some((indent, String::from("☑ "), task));
        }
        return Some((indent, String::from("• "), rest));
    }

    let digits = t.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = t[digits..].strip_prefix(". ") {
            return Some((indent, format!("{}. ", &t[..digits]), rest));
        }
    }
    None
}

/// Minimal inline markup: `code` spans and **bold** runs get their own
/// style, everything else passes through.
fn inline_spans(text: &str, palette: &Palette) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('`') {
        if let Some(len) = rest[start + 1..].find('`') {
            if start > 0 {
                spans.extend(bold_spans(&rest[..start], palette));
            }
            spans.push(Span::styled(
                rest[start + 1..start + 1 + len].to_string(),
                Style::default().fg(palette.code),
            ));
            rest = &rest[start + len + 2..];
        } else {
            break;
        }
    }
    if !rest.is_empty() {
        spans.extend(bold_spans(rest, palette));
    }
    if spans.is_empty() {
        spans.push(Span::raw(String::new()));
    }
    spans
}

fn bold_spans(text: &str, palette: &Palette) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = text;
    let base = Style::default().fg(palette.text);
    let bold = base.add_modifier(Modifier::BOLD);

    while let Some(start) = rest.find("**") {
        if let Some(len) = rest[start + 2..].find("**") {
            if start > 0 {
                spans.push(Span::styled(rest[..start].to_string(), base));
            }
            spans.push(Span::styled(
                rest[start + 2..start + 2 + len].to_string(),
                bold,
            ));
            rest = &rest[start + len + 4..];
        } else {
            break;
        }
    }
    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }
    spans
}

/// Greedy word wrap on unicode word boundaries.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_word_bounds() {
        let word_width = word.width();
        if current_width + word_width > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
            if word.trim().is_empty() {
                continue;
            }
        }
        current.push_str(word);
        current_width += word_width;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
