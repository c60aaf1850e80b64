use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style as SynStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

/// Syntax highlighting for fenced code blocks in the preview pane.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

const LIGHT_THEME: &str = "InspiredGitHub";
const DARK_THEME: &str = "base16-ocean.dark";

impl Highlighter {
    pub fn new(dark: bool) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = Self::pick_theme(&theme_set, dark);
        Self { syntax_set, theme }
    }

    pub fn set_dark(&mut self, dark: bool) {
        let theme_set = ThemeSet::load_defaults();
        self.theme = Self::pick_theme(&theme_set, dark);
    }

    fn pick_theme(theme_set: &ThemeSet, dark: bool) -> Theme {
        let name = if dark { DARK_THEME } else { LIGHT_THEME };
        theme_set
            .themes
            .get(name)
            .or_else(|| theme_set.themes.get(DARK_THEME))
            .or_else(|| theme_set.themes.values().next())
            .cloned()
            .unwrap_or_default()
    }

    fn syntax_for_token<'a>(&'a self, token: &str) -> &'a SyntaxReference {
        self.syntax_set
            .find_syntax_by_token(token)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    /// Highlight the lines of a fenced block tagged with `token`
    /// (the fence info string, e.g. `rust`).
    pub fn highlight_code<'b>(&self, lines: &[&str], token: &str) -> Vec<Line<'b>> {
        let syntax = self.syntax_for_token(token);
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        lines
            .iter()
            .map(|line| {
                let regions = highlighter
                    .highlight_line(line, &self.syntax_set)
                    .unwrap_or_else(|_| vec![(SynStyle::default(), *line)]);

                let spans: Vec<Span> = regions
                    .into_iter()
                    .map(|(style, text)| {
                        Span::styled(text.to_string(), syn_style_to_ratatui(style))
                    })
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

fn syn_style_to_ratatui(style: SynStyle) -> Style {
    let fg = style.foreground;
    Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_known_language() {
        let highlighter = Highlighter::new(true);
        let lines = highlighter.highlight_code(&["fn main() {}"], "rust");
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].spans.is_empty());
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain() {
        let highlighter = Highlighter::new(false);
        let lines = highlighter.highlight_code(&["plain text"], "no-such-lang");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_theme_switch() {
        let mut highlighter = Highlighter::new(false);
        highlighter.set_dark(true);
        let lines = highlighter.highlight_code(&["x"], "");
        assert_eq!(lines.len(), 1);
    }
}
