use ropey::Rope;
use std::cmp;
use unicode_width::UnicodeWidthStr;

/// The document buffer: a rope with a cursor and a viewport.
///
/// Snapshot history lives outside the editor (see `history::History`); the
/// application checkpoints the buffer after every mutating operation.
#[derive(Clone)]
pub struct Editor {
    rope: Rope,
    cursor_line: usize,
    cursor_col: usize,
    viewport_offset: usize,
    viewport_height: usize,
    modified: bool,
    tab_size: usize,
    use_spaces: bool,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            cursor_line: 0,
            cursor_col: 0,
            viewport_offset: 0,
            viewport_height: 24, // Default, will be updated
            modified: false,
            tab_size: 4,
            use_spaces: true,
        }
    }

    /// Replace the whole buffer and reset the cursor, leaving the modified
    /// flag untouched by the caller's choice.
    pub fn set_content(&mut self, content: &str) {
        self.rope = Rope::from_str(content);
        self.cursor_line = 0;
        self.cursor_col = 0;
        self.viewport_offset = 0;
        self.modified = false;
    }

    /// Replace the buffer as part of undo/redo or an import: the cursor is
    /// clamped into the new content and the buffer counts as modified.
    pub fn replace_content(&mut self, content: &str) {
        let (line, col) = (self.cursor_line, self.cursor_col);
        self.rope = Rope::from_str(content);
        self.modified = true;
        self.set_cursor_position(line, col);
    }

    pub fn get_content(&self) -> String {
        self.rope.to_string()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn is_blank(&self) -> bool {
        self.rope.chars().all(char::is_whitespace)
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn cursor_position(&self) -> (usize, usize) {
        (self.cursor_line, self.cursor_col)
    }

    pub fn set_cursor_position(&mut self, line: usize, col: usize) {
        let max_line = self.rope.len_lines().saturating_sub(1);
        self.cursor_line = line.min(max_line);
        self.cursor_col = col.min(self.line_len(self.cursor_line));
        self.adjust_viewport();
    }

    /// Terminal column of the cursor, accounting for wide characters.
    pub fn cursor_display_col(&self) -> usize {
        if let Some(line) = self.rope.get_line(self.cursor_line) {
            let prefix: String = line.chars().take(self.cursor_col).collect();
            UnicodeWidthStr::width(prefix.as_str())
        } else {
            0
        }
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
    }

    pub fn get_viewport_offset(&self) -> usize {
        self.viewport_offset
    }

    pub fn get_viewport_lines(&self) -> Vec<String> {
        let end_line = cmp::min(
            self.viewport_offset + self.viewport_height,
            self.rope.len_lines(),
        );
        (self.viewport_offset..end_line)
            .filter_map(|i| self.rope.get_line(i).map(|l| l.to_string()))
            .collect()
    }

    /// Characters on `line` excluding the trailing newline.
    fn line_len(&self, line: usize) -> usize {
        match self.rope.get_line(line) {
            Some(slice) => {
                let len = slice.len_chars();
                if len > 0 && slice.char(len - 1) == '\n' {
                    len - 1
                } else {
                    len
                }
            }
            None => 0,
        }
    }

    fn char_idx(&self) -> usize {
        self.rope.line_to_char(self.cursor_line) + self.cursor_col
    }

    pub fn insert_char(&mut self, c: char) {
        if self.rope.len_chars() > 1_000_000 {
            log::warn!("Document size approaching limit, insert may be slow");
        }
        self.rope.insert_char(self.char_idx(), c);
        self.cursor_col += 1;
        self.modified = true;
    }

    pub fn insert_newline(&mut self) {
        self.rope.insert_char(self.char_idx(), '\n');
        self.cursor_line += 1;
        self.cursor_col = 0;
        self.modified = true;
        self.adjust_viewport();
    }

    pub fn insert_tab(&mut self) {
        if self.use_spaces {
            for _ in 0..self.tab_size {
                self.insert_char(' ');
            }
        } else {
            self.insert_char('\t');
        }
    }

    pub fn set_tab_config(&mut self, tab_size: usize, use_spaces: bool) {
        self.tab_size = tab_size;
        self.use_spaces = use_spaces;
    }

    pub fn delete_char_backward(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
            let idx = self.char_idx();
            self.rope.remove(idx..idx + 1);
            self.modified = true;
        } else if self.cursor_line > 0 {
            let prev_len = self.line_len(self.cursor_line - 1);
            let idx = self.rope.line_to_char(self.cursor_line) - 1;
            self.rope.remove(idx..idx + 1);
            self.cursor_line -= 1;
            self.cursor_col = prev_len;
            self.modified = true;
            self.adjust_viewport();
        }
    }

    pub fn delete_char_forward(&mut self) {
        let idx = self.char_idx();
        if idx < self.rope.len_chars() {
            self.rope.remove(idx..idx + 1);
            self.modified = true;
        }
    }

    pub fn delete_line(&mut self) {
        if self.cursor_line < self.rope.len_lines() {
            let start = self.rope.line_to_char(self.cursor_line);
            let end = if self.cursor_line + 1 < self.rope.len_lines() {
                self.rope.line_to_char(self.cursor_line + 1)
            } else {
                self.rope.len_chars()
            };
            self.rope.remove(start..end);
            let max_line = self.rope.len_lines().saturating_sub(1);
            self.cursor_line = self.cursor_line.min(max_line);
            self.cursor_col = 0;
            self.modified = true;
            self.adjust_viewport();
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.clamp_cursor_col();
            self.adjust_viewport();
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_line + 1 < self.rope.len_lines() {
            self.cursor_line += 1;
            self.clamp_cursor_col();
            self.adjust_viewport();
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.line_len(self.cursor_line);
            self.adjust_viewport();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.line_len(self.cursor_line) {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.rope.len_lines() {
            self.cursor_line += 1;
            self.cursor_col = 0;
            self.adjust_viewport();
        }
    }

    pub fn move_to_line_start(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_to_line_end(&mut self) {
        self.cursor_col = self.line_len(self.cursor_line);
    }

    pub fn page_up(&mut self) {
        self.cursor_line = self.cursor_line.saturating_sub(self.viewport_height);
        self.viewport_offset = self.viewport_offset.saturating_sub(self.viewport_height);
        self.clamp_cursor_col();
    }

    pub fn page_down(&mut self) {
        let max_line = self.rope.len_lines().saturating_sub(1);
        self.cursor_line = cmp::min(self.cursor_line + self.viewport_height, max_line);
        self.viewport_offset = cmp::min(
            self.viewport_offset + self.viewport_height,
            max_line.saturating_sub(self.viewport_height.saturating_sub(1)),
        );
        self.clamp_cursor_col();
    }

    pub fn search(&mut self, query: &str) -> bool {
        let content = self.rope.to_string();
        let byte_start = self
            .rope
            .char_to_byte((self.char_idx() + 1).min(self.rope.len_chars()));
        let found = content[byte_start..]
            .find(query)
            .map(|pos| byte_start + pos)
            .or_else(|| content.find(query));

        if let Some(byte_pos) = found {
            let char_pos = self.rope.byte_to_char(byte_pos);
            self.cursor_line = self.rope.char_to_line(char_pos);
            self.cursor_col = char_pos - self.rope.line_to_char(self.cursor_line);
            self.adjust_viewport();
            true
        } else {
            false
        }
    }

    fn clamp_cursor_col(&mut self) {
        self.cursor_col = cmp::min(self.cursor_col, self.line_len(self.cursor_line));
    }

    fn adjust_viewport(&mut self) {
        if self.cursor_line < self.viewport_offset {
            self.viewport_offset = self.cursor_line;
        } else if self.cursor_line >= self.viewport_offset + self.viewport_height {
            self.viewport_offset = self.cursor_line - (self.viewport_height - 1);
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}
