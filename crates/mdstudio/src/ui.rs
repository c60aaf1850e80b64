use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Mode};
use crate::status_manager::MessageType;
use crate::ui_state::ViewMode;

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Panes
            Constraint::Length(2), // Status bar
        ])
        .split(f.size());

    draw_title_bar(f, app, chunks[0]);

    if app.show_help() {
        draw_help(f, chunks[1]);
    } else {
        draw_panes(f, app, chunks[1]);
    }

    draw_status_bar(f, app, chunks[2]);
}

fn draw_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let layout = app.active_layout();
    let focus = if app.config.focus_mode { " [Focus]" } else { "" };
    let modified = if app.is_modified() { " [Modified]" } else { "" };
    let title = format!(
        "  mdstudio -- {}{}{}  ({} · {})",
        app.exports.filename,
        modified,
        focus,
        layout.name,
        app.config.language.tag()
    );

    let title_bar = Paragraph::new(title)
        .style(
            Style::default()
                .bg(layout.palette.bar_bg)
                .fg(layout.palette.bar_fg),
        )
        .alignment(Alignment::Left);

    f.render_widget(title_bar, area);
}

fn draw_panes(f: &mut Frame, app: &mut App, area: Rect) {
    // Focus mode always shows both panes.
    let view = if app.config.focus_mode {
        ViewMode::Both
    } else {
        app.ui_state.view
    };

    match view {
        ViewMode::Both => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            draw_editor_pane(f, app, chunks[0]);
            draw_preview_pane(f, app, chunks[1]);
        }
        ViewMode::Editor => draw_editor_pane(f, app, area),
        ViewMode::Preview => draw_preview_pane(f, app, area),
    }
}

fn draw_editor_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let palette = app.active_layout().palette;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(" Editor ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = if app.config.editor.line_numbers {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(inner)
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(0), Constraint::Min(0)])
            .split(inner)
    };

    app.editor.set_viewport_height(inner.height as usize);

    let viewport_lines = app.editor.get_viewport_lines();
    let start_line = app.editor.get_viewport_offset();
    let (cursor_line, _) = app.editor.cursor_position();

    if app.config.editor.line_numbers {
        let line_numbers: Vec<String> = (0..viewport_lines.len())
            .map(|i| format!("{:4}", start_line + i + 1))
            .collect();
        let widget =
            Paragraph::new(line_numbers.join("\n")).style(Style::default().fg(palette.dim));
        f.render_widget(widget, chunks[0]);
    }

    let mut text_lines = Vec::new();
    for (i, line) in viewport_lines.iter().enumerate() {
        let line_str = line.trim_end_matches('\n').to_string();
        if app.config.editor.highlight_current_line && start_line + i == cursor_line {
            text_lines.push(Line::from(Span::styled(
                line_str,
                Style::default().add_modifier(Modifier::BOLD),
            )));
        } else {
            text_lines.push(Line::from(Span::styled(
                line_str,
                Style::default().fg(palette.text),
            )));
        }
    }

    let content = Paragraph::new(text_lines).block(Block::default().borders(Borders::NONE));
    f.render_widget(content, chunks[1]);

    // Cursor only lives in the editor pane.
    if !matches!(app.mode(), Mode::Command) {
        let viewport_offset = app.editor.get_viewport_offset();
        if cursor_line >= viewport_offset {
            let screen_line = cursor_line - viewport_offset;
            let x = chunks[1].x + app.editor.cursor_display_col() as u16;
            let y = chunks[1].y + screen_line as u16;
            if x < chunks[1].x + chunks[1].width && y < chunks[1].y + chunks[1].height {
                f.set_cursor(x, y);
            }
        }
    }
}

fn draw_preview_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let palette = app.active_layout().palette;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(" Preview ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let source = app.editor.get_content();
    let lines = app
        .preview
        .render(&source, inner.width.saturating_sub(1), &palette);

    // Follow the editor viewport, clamped to the rendered length.
    let max_scroll = lines.len().saturating_sub(inner.height as usize) as u16;
    let scroll = (app.editor.get_viewport_offset() as u16).min(max_scroll);

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(widget, inner);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let palette = app.active_layout().palette;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    match app.mode() {
        Mode::Command => {
            let input = Paragraph::new(format!(":{}", app.command_buffer()))
                .style(Style::default().fg(palette.accent));
            f.render_widget(input, chunks[0]);
        }
        _ => {
            let bold = Style::default()
                .fg(palette.bar_fg)
                .add_modifier(Modifier::BOLD);
            let shortcuts = if app.config.focus_mode {
                vec![
                    Span::styled(":focus", bold),
                    Span::raw(" Leave focus mode  "),
                    Span::styled("?", bold),
                    Span::raw(" Help"),
                ]
            } else if app.config.advanced_options {
                vec![
                    Span::styled(":cat", bold),
                    Span::raw(" add/del  "),
                    Span::styled(":item", bold),
                    Span::raw(" add/del  "),
                    Span::styled(":examples", bold),
                    Span::raw(" list/reset/clear  "),
                    Span::styled(":random", bold),
                    Span::raw(" <category>  "),
                    Span::styled(":advanced", bold),
                    Span::raw(" back"),
                ]
            } else {
                vec![
                    Span::styled(":", bold),
                    Span::raw(" Command  "),
                    Span::styled("i", bold),
                    Span::raw(" Insert  "),
                    Span::styled("u", bold),
                    Span::raw(" Undo  "),
                    Span::styled("^r", bold),
                    Span::raw(" Redo  "),
                    Span::styled(":github", bold),
                    Span::raw(" Import  "),
                    Span::styled(":export", bold),
                    Span::raw(" html/pdf  "),
                    Span::styled("?", bold),
                    Span::raw(" Help"),
                ]
            };

            let shortcut_bar =
                Paragraph::new(Line::from(shortcuts)).style(Style::default().bg(palette.bar_bg));
            f.render_widget(shortcut_bar, chunks[0]);
        }
    }

    let message_style = match app
        .ui_state
        .status_manager
        .get_current_message()
        .map(|m| &m.message_type)
    {
        Some(MessageType::Error) => Style::default().fg(ratatui::style::Color::Red),
        Some(MessageType::Warning) => Style::default().fg(ratatui::style::Color::Yellow),
        Some(MessageType::Success) => Style::default().fg(ratatui::style::Color::Green),
        _ => Style::default().fg(palette.accent),
    };
    let status = Paragraph::new(app.status_message().to_string()).style(message_style);
    f.render_widget(status, chunks[1]);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            " HELP -- mdstudio",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(" Modes:"),
        Line::from("  i       Insert mode    - Start typing Markdown"),
        Line::from("  Esc     Normal mode    - Back to navigation"),
        Line::from("  :       Command mode   - Run a command"),
        Line::from(""),
        Line::from(" Editing (Normal mode):"),
        Line::from("  h j k l / arrows       - Move the cursor"),
        Line::from("  x       Delete char      dd  Delete line"),
        Line::from("  u       Undo             Ctrl-r  Redo"),
        Line::from(""),
        Line::from(" Document:"),
        Line::from("  :w [name]       Save the Markdown file"),
        Line::from("  :name <file>    Set the working filename"),
        Line::from("  :clear          Clear the document (undoable)"),
        Line::from("  :e <file.md>    Import a local Markdown file"),
        Line::from("  :github <user>  Import a GitHub profile README"),
        Line::from(""),
        Line::from(" Export:"),
        Line::from("  :export html    Standalone HTML document"),
        Line::from("  :export pdf     PDF next to your document"),
        Line::from("  :pdf            PDF opened in the system viewer"),
        Line::from("  :css <file>     Custom export stylesheet"),
        Line::from(""),
        Line::from(" Examples:"),
        Line::from("  :examples             List the catalog"),
        Line::from("  :example <cat> <id>   Load a snippet"),
        Line::from("  :random <category>    Load a random snippet"),
        Line::from("  :cat / :item          Edit the custom catalog"),
        Line::from(""),
        Line::from(" Appearance:"),
        Line::from("  :view both|editor|preview   Pane selection"),
        Line::from("  :layout [id] / :dark        Color layout"),
        Line::from("  :lang en|pt|es              Display language"),
        Line::from("  :focus / :advanced          Toggles"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Press ? to close help",
            Style::default().add_modifier(Modifier::ITALIC),
        )]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(ratatui::style::Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(help, area);
}
