use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::catalog::{builtin_catalog, default_document, Catalog, CatalogStore};
use crate::command_processor::{CommandContext, CommandError, CommandProcessor};
use crate::config::Config;
use crate::editor::Editor;
use crate::export::ExportPipeline;
use crate::history::History;
use crate::import::GithubImporter;
use crate::layout::{self, Layout};
use crate::preview::PreviewRenderer;
use crate::ui_state::UIState;

#[derive(Clone)]
pub enum Mode {
    Normal,
    Insert,
    Command,
    Help,
    SavePrompt,
}

pub struct App {
    pub editor: Editor,
    pub history: History,
    pub config: Config,
    pub ui_state: UIState,
    pub custom_catalog: Catalog,
    pub catalog_store: CatalogStore,
    pub github: GithubImporter,
    pub exports: ExportPipeline,
    pub preview: PreviewRenderer,
    pub command_processor: CommandProcessor,
    last_key: Option<char>, // For handling multi-key commands like dd
}

impl App {
    pub async fn new() -> Result<Self> {
        let config = Config::load().await?;
        let language = config.language;
        let dark = layout::layout_by_id(&config.layout_id)
            .map(|l| l.dark)
            .unwrap_or(false);

        let catalog_store = CatalogStore::new()?;
        let custom_catalog = catalog_store
            .load()
            .unwrap_or_else(|| builtin_catalog(language));

        let initial = default_document(language);
        let mut editor = Editor::new();
        editor.set_content(&initial);
        editor.set_tab_config(config.editor.tab_size, config.editor.use_spaces);

        let history = History::seeded(&initial);

        let output_dir = std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir());
        let mut ui_state = UIState::new();
        if config.focus_mode {
            ui_state.view = crate::ui_state::ViewMode::Both;
        }

        Ok(Self {
            editor,
            history,
            config,
            ui_state,
            custom_catalog,
            catalog_store,
            github: GithubImporter::new(),
            exports: ExportPipeline::new(output_dir),
            preview: PreviewRenderer::new(dark),
            command_processor: CommandProcessor::new(),
            last_key: None,
        })
    }

    pub fn active_layout(&self) -> &'static Layout {
        layout::layout_by_id(&self.config.layout_id)
            .unwrap_or_else(|| &layout::layouts()[0])
    }

    pub fn is_modified(&self) -> bool {
        self.editor.is_modified()
    }

    pub fn should_quit(&self) -> bool {
        self.ui_state.should_quit()
    }

    pub fn show_help(&self) -> bool {
        self.ui_state.is_help_shown()
    }

    pub fn mode(&self) -> &Mode {
        self.ui_state.get_mode()
    }

    pub fn status_message(&self) -> &str {
        self.ui_state.get_status_message()
    }

    pub fn command_buffer(&self) -> &str {
        self.ui_state.get_command_buffer()
    }

    pub fn quit(&mut self) {
        self.ui_state.quit();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.ui_state.set_mode(mode);
    }

    pub fn set_status_message(&mut self, message: &str) {
        self.ui_state.status_message = message.to_string();
    }

    pub fn update_status(&mut self) {
        self.ui_state.update_status();
    }

    /// Checkpoint the buffer after a mutating edit.
    fn checkpoint(&mut self) {
        let content = self.editor.get_content();
        self.history.record(&content);
    }

    /// One accepted edit event: the buffer takes the new value and the
    /// history records it, exactly like typing does.
    pub fn replace_document_text(&mut self, content: &str) {
        self.editor.replace_content(content);
        self.checkpoint();
    }

    pub async fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        match self.ui_state.get_mode() {
            Mode::Normal => self.handle_normal_mode_key(key),
            Mode::Insert => self.handle_insert_mode_key(key),
            Mode::Command => self.handle_command_key(key).await?,
            Mode::Help => self.handle_help_key(key),
            Mode::SavePrompt => self.handle_save_prompt_key(key).await?,
        }
        Ok(())
    }

    fn handle_normal_mode_key(&mut self, key: KeyEvent) {
        // Clear last_key unless a dd sequence is in progress.
        if key.code != KeyCode::Char('d') && self.last_key.is_some() {
            self.last_key = None;
        }

        match key.code {
            // Vim-style movement
            KeyCode::Char('h') | KeyCode::Left => self.editor.move_cursor_left(),
            KeyCode::Char('j') | KeyCode::Down => self.editor.move_cursor_down(),
            KeyCode::Char('k') | KeyCode::Up => self.editor.move_cursor_up(),
            KeyCode::Char('l') | KeyCode::Right => self.editor.move_cursor_right(),

            KeyCode::Home => self.editor.move_to_line_start(),
            KeyCode::End => self.editor.move_to_line_end(),
            KeyCode::PageUp => self.editor.page_up(),
            KeyCode::PageDown => self.editor.page_down(),

            // Insert mode transitions
            KeyCode::Char('i') => self.ui_state.enter_insert_mode(),
            KeyCode::Char('a') => {
                self.editor.move_cursor_right();
                self.ui_state.enter_insert_mode();
            }
            KeyCode::Char('o') => {
                self.editor.move_to_line_end();
                self.editor.insert_newline();
                self.checkpoint();
                self.ui_state.enter_insert_mode();
            }
            KeyCode::Char('O') => {
                self.editor.move_to_line_start();
                self.editor.insert_newline();
                self.editor.move_cursor_up();
                self.checkpoint();
                self.ui_state.enter_insert_mode();
            }

            // Delete operations
            KeyCode::Char('x') => {
                self.editor.delete_char_forward();
                self.checkpoint();
            }
            KeyCode::Char('d') => self.handle_delete_command(),

            // Undo/Redo
            KeyCode::Char('u') => self.handle_undo(),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.handle_redo()
            }

            // Mode switches
            KeyCode::Char(':') => self.ui_state.enter_command_mode(),
            KeyCode::Char('/') => self.ui_state.enter_search_mode(),
            KeyCode::Char('?') => self.ui_state.toggle_help(),

            _ => {}
        }
    }

    fn handle_insert_mode_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.ui_state.enter_normal_mode(),
            KeyCode::Char(c) => {
                self.editor.insert_char(c);
                self.checkpoint();
            }
            KeyCode::Enter => {
                self.editor.insert_newline();
                self.checkpoint();
            }
            KeyCode::Backspace => {
                self.editor.delete_char_backward();
                self.checkpoint();
            }
            KeyCode::Delete => {
                self.editor.delete_char_forward();
                self.checkpoint();
            }
            KeyCode::Tab => {
                self.editor.insert_tab();
                self.checkpoint();
            }

            KeyCode::Left => self.editor.move_cursor_left(),
            KeyCode::Right => self.editor.move_cursor_right(),
            KeyCode::Up => self.editor.move_cursor_up(),
            KeyCode::Down => self.editor.move_cursor_down(),

            _ => {}
        }
    }

    fn handle_delete_command(&mut self) {
        // Vim dd command: delete line (second d press)
        if self.last_key == Some('d') {
            self.editor.delete_line();
            self.checkpoint();
            self.ui_state
                .set_success_message("Line deleted".to_string());
            self.last_key = None;
        } else {
            self.last_key = Some('d');
        }
    }

    fn handle_undo(&mut self) {
        if let Some(content) = self.history.undo() {
            let content = content.to_string();
            self.editor.replace_content(&content);
            self.ui_state.set_success_message("Undone".to_string());
        } else {
            self.ui_state
                .set_warning_message("Nothing to undo".to_string());
        }
    }

    fn handle_redo(&mut self) {
        if let Some(content) = self.history.redo() {
            let content = content.to_string();
            self.editor.replace_content(&content);
            self.ui_state.set_success_message("Redone".to_string());
        } else {
            self.ui_state
                .set_warning_message("Nothing to redo".to_string());
        }
    }

    async fn handle_command_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => {
                let command = self.ui_state.get_command_buffer().to_string();
                self.ui_state.add_to_history(command.clone());
                self.execute_command(&command).await;
                self.ui_state.enter_normal_mode();
                self.ui_state.clear_command_buffer();
            }
            KeyCode::Esc => {
                self.ui_state.clear_command_buffer();
                self.ui_state.enter_normal_mode();
                self.ui_state.set_info_message("Cancelled".to_string());
            }
            KeyCode::Up => self.ui_state.history_up(),
            KeyCode::Down => self.ui_state.history_down(),
            KeyCode::Tab => {
                let current = self.ui_state.get_command_buffer();
                let suggestions = self.ui_state.get_command_suggestions(current);
                if suggestions.len() == 1 {
                    self.ui_state.set_command_buffer(suggestions[0].clone());
                } else if suggestions.len() > 1 {
                    let msg = format!("Suggestions: {}", suggestions.join(", "));
                    self.ui_state.set_info_message(msg);
                }
            }
            KeyCode::Char(c) => self.ui_state.push_to_command_buffer(c),
            KeyCode::Backspace => self.ui_state.pop_from_command_buffer(),
            _ => {}
        }
        Ok(())
    }

    pub async fn execute_command(&mut self, command: &str) {
        let mut ctx = CommandContext {
            editor: &mut self.editor,
            history: &mut self.history,
            config: &mut self.config,
            catalog: &mut self.custom_catalog,
            store: &self.catalog_store,
            github: &self.github,
            exports: &mut self.exports,
            preview: &mut self.preview,
            view: &mut self.ui_state.view,
            should_quit: &mut self.ui_state.should_quit,
        };

        match self.command_processor.execute_command(command, &mut ctx).await {
            Ok(message) => {
                if !message.is_empty() {
                    if message.contains("Wrote") || message.contains("Exported") {
                        self.ui_state.set_success_message(message);
                    } else {
                        self.ui_state.set_info_message(message);
                    }
                }
            }
            Err(CommandError::Transient(message)) => {
                self.ui_state.set_transient_error(message);
            }
            Err(CommandError::Failed(e)) => {
                self.ui_state.set_error_message(e.to_string());
            }
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                self.ui_state.hide_help();
            }
            _ => {}
        }
    }

    async fn handle_save_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let content = self.editor.get_content();
                match self.exports.export_markdown(&content).await {
                    Ok(_) => {
                        self.editor.mark_saved();
                        self.ui_state.quit();
                    }
                    Err(e) => {
                        self.ui_state
                            .set_error_message(format!("Error saving: {}", e));
                        self.ui_state.enter_normal_mode();
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.ui_state.quit();
            }
            KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Esc => {
                self.ui_state.enter_normal_mode();
                self.ui_state.clear_status_message();
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui_state::ViewMode;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn create_key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// An app isolated into a temp config/catalog directory.
    async fn test_app() -> (App, TempDir) {
        let temp_dir = {
            let _guard = env_lock().lock().unwrap();
            let temp_dir = TempDir::new().unwrap();
            std::env::set_var("MDSTUDIO_CONFIG_DIR", temp_dir.path());
            std::env::remove_var("MDSTUDIO_CONFIG_PATH");
            temp_dir
        };
        let app = App::new().await.unwrap();
        (app, temp_dir)
    }

    #[tokio::test]
    async fn test_app_creation() {
        let (app, _dir) = test_app().await;
        assert!(matches!(app.mode(), &Mode::Normal));
        assert!(!app.should_quit());
        // Seeded with the language-dependent default document.
        assert!(!app.editor.get_content().is_empty());
        assert_eq!(app.history.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_mode_typing_is_recorded() {
        let (mut app, _dir) = test_app().await;
        app.ui_state.enter_insert_mode();
        app.handle_key_event(create_key_event(KeyCode::Char('H')))
            .await
            .unwrap();
        app.handle_key_event(create_key_event(KeyCode::Char('i')))
            .await
            .unwrap();

        assert!(app.editor.get_content().starts_with("Hi"));
        assert!(app.history.len() >= 3);

        app.handle_key_event(create_key_event(KeyCode::Esc))
            .await
            .unwrap();
        assert!(matches!(app.mode(), &Mode::Normal));
    }

    #[tokio::test]
    async fn test_undo_redo_keys() {
        let (mut app, _dir) = test_app().await;
        let initial = app.editor.get_content();

        app.replace_document_text("changed");
        assert_eq!(app.editor.get_content(), "changed");

        app.handle_key_event(create_key_event(KeyCode::Char('u')))
            .await
            .unwrap();
        assert_eq!(app.editor.get_content(), initial);

        let redo = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        app.handle_key_event(redo).await.unwrap();
        assert_eq!(app.editor.get_content(), "changed");
    }

    #[tokio::test]
    async fn test_edit_undo_redo_scenario() {
        // Load default document, edit three times, undo twice, redo once.
        let (mut app, _dir) = test_app().await;

        app.replace_document_text("first edit");
        app.replace_document_text("second edit");
        app.replace_document_text("third edit");

        app.handle_key_event(create_key_event(KeyCode::Char('u')))
            .await
            .unwrap();
        app.handle_key_event(create_key_event(KeyCode::Char('u')))
            .await
            .unwrap();
        assert_eq!(app.editor.get_content(), "first edit");

        let redo = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        app.handle_key_event(redo).await.unwrap();
        assert_eq!(app.editor.get_content(), "second edit");
    }

    #[tokio::test]
    async fn test_clear_command_is_undoable() {
        let (mut app, _dir) = test_app().await;
        let initial = app.editor.get_content();

        app.execute_command("clear").await;
        assert_eq!(app.editor.get_content(), "");

        app.handle_key_event(create_key_event(KeyCode::Char('u')))
            .await
            .unwrap();
        assert_eq!(app.editor.get_content(), initial);
    }

    #[tokio::test]
    async fn test_view_command() {
        let (mut app, _dir) = test_app().await;
        app.execute_command("view preview").await;
        assert_eq!(app.ui_state.view, ViewMode::Preview);
        app.execute_command("view both").await;
        assert_eq!(app.ui_state.view, ViewMode::Both);
    }

    #[tokio::test]
    async fn test_unknown_command_is_transient() {
        let (mut app, _dir) = test_app().await;
        app.execute_command("frobnicate").await;
        let message = app
            .ui_state
            .status_manager
            .get_current_message()
            .unwrap();
        assert_eq!(
            message.auto_clear_duration,
            Some(crate::status_manager::TRANSIENT_DURATION)
        );
    }

    #[tokio::test]
    async fn test_empty_github_username_is_transient() {
        let (mut app, _dir) = test_app().await;
        app.execute_command("github").await;
        let message = app
            .ui_state
            .status_manager
            .get_current_message()
            .unwrap();
        assert!(message.content.contains("username"));
        assert_eq!(
            message.auto_clear_duration,
            Some(crate::status_manager::TRANSIENT_DURATION)
        );
    }

    #[tokio::test]
    async fn test_random_not_found_leaves_document_untouched() {
        let (mut app, _dir) = test_app().await;
        let before = app.editor.get_content();
        app.execute_command("random no-such-category").await;
        assert_eq!(app.editor.get_content(), before);
    }

    #[tokio::test]
    async fn test_example_selection_is_undoable() {
        let (mut app, _dir) = test_app().await;
        let before = app.editor.get_content();

        // Category 2 is Tables in the built-in catalog.
        app.execute_command("example 2 0").await;
        let loaded = app.editor.get_content();
        assert!(loaded.contains('|'));
        assert_ne!(loaded, before);

        app.handle_key_event(create_key_event(KeyCode::Char('u')))
            .await
            .unwrap();
        assert_eq!(app.editor.get_content(), before);
    }

    #[tokio::test]
    async fn test_catalog_mutations_persist() {
        let (mut app, _dir) = test_app().await;
        app.execute_command("cat add My Snippets").await;
        let id = app.custom_catalog.categories.last().unwrap().id;
        app.execute_command(&format!("item add {} Current doc", id))
            .await;

        let persisted = app.catalog_store.load().unwrap();
        assert_eq!(persisted, app.custom_catalog);

        app.execute_command("examples clear").await;
        assert!(app.custom_catalog.categories.is_empty());
        assert!(app.catalog_store.load().is_none());

        app.execute_command("examples reset").await;
        assert!(!app.custom_catalog.categories.is_empty());
    }

    #[tokio::test]
    async fn test_dd_deletes_line() {
        let (mut app, _dir) = test_app().await;
        app.replace_document_text("Line 1\nLine 2");

        app.handle_key_event(create_key_event(KeyCode::Char('d')))
            .await
            .unwrap();
        assert_eq!(app.editor.get_content(), "Line 1\nLine 2");

        app.handle_key_event(create_key_event(KeyCode::Char('d')))
            .await
            .unwrap();
        assert_eq!(app.editor.get_content(), "Line 2");
    }

    #[tokio::test]
    async fn test_quit_guard_when_modified() {
        let (mut app, _dir) = test_app().await;
        app.replace_document_text("unsaved");
        app.execute_command("q").await;
        assert!(!app.should_quit());

        app.execute_command("q!").await;
        assert!(app.should_quit());
    }
}
