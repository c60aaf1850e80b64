use std::path::PathBuf;

use crate::catalog::{builtin_catalog, Catalog, CatalogStore, ExampleBody};
use crate::config::{Config, Language};
use crate::editor::Editor;
use crate::export::{ExportPipeline, PdfMode};
use crate::history::History;
use crate::import::{read_markdown_file, GithubImporter, ImportError};
use crate::layout;
use crate::preview::PreviewRenderer;
use crate::ui_state::ViewMode;

/// Everything a command may touch, borrowed from the application for the
/// duration of one execution.
pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
    pub history: &'a mut History,
    pub config: &'a mut Config,
    pub catalog: &'a mut Catalog,
    pub store: &'a CatalogStore,
    pub github: &'a GithubImporter,
    pub exports: &'a mut ExportPipeline,
    pub preview: &'a mut PreviewRenderer,
    pub view: &'a mut ViewMode,
    pub should_quit: &'a mut bool,
}

/// How a failed command should reach the user.
#[derive(Debug)]
pub enum CommandError {
    /// Validation and fetch failures: 2-second transient banner.
    Transient(String),
    /// Everything else: regular error message.
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> Self {
        CommandError::Failed(e)
    }
}

impl From<ImportError> for CommandError {
    fn from(e: ImportError) -> Self {
        // Both user-input and network failures share the transient channel.
        CommandError::Transient(e.to_string())
    }
}

pub type CommandResult = Result<String, CommandError>;

pub struct CommandProcessor;

impl CommandProcessor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute_command(&self, command: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        let cmd = command.trim();
        if cmd.is_empty() {
            return Ok(String::new());
        }

        if let Some(query) = cmd.strip_prefix("search ") {
            let query = query.trim();
            if query.is_empty() {
                return Ok(String::new());
            }
            return if ctx.editor.search(query) {
                Ok(format!("Found: {}", query))
            } else {
                Ok(format!("Pattern not found: {}", query))
            };
        }

        let parts: Vec<&str> = cmd.split_whitespace().collect();
        match parts[0] {
            "w" => self.save_markdown(ctx, parts.get(1)).await,
            "q" => {
                if ctx.editor.is_modified() {
                    Ok("No write since last change (use :q! to override)".to_string())
                } else {
                    *ctx.should_quit = true;
                    Ok("Quitting".to_string())
                }
            }
            "q!" => {
                *ctx.should_quit = true;
                Ok("Force quitting".to_string())
            }
            "wq" => {
                let message = self.save_markdown(ctx, None).await?;
                *ctx.should_quit = true;
                Ok(format!("{} - Quitting", message))
            }
            "e" | "upload" => {
                let Some(path) = parts.get(1) else {
                    return Err(CommandError::Transient("E471: Argument required".into()));
                };
                self.import_file(ctx, PathBuf::from(*path)).await
            }
            "github" => {
                let username = parts.get(1).copied().unwrap_or("");
                let content = ctx.github.fetch_profile_readme(username).await?;
                apply_document(ctx, &content);
                Ok(format!("Imported profile README of {}", username))
            }
            "name" => {
                let Some(name) = parts.get(1) else {
                    return Ok(format!("Filename: {}", ctx.exports.filename));
                };
                ctx.exports.filename = name.to_string();
                Ok(format!("Filename set to {}", ctx.exports.filename))
            }
            "export" => match parts.get(1).copied() {
                Some("html") => self.export_html(ctx).await,
                Some("pdf") => self.export_pdf(ctx, PdfMode::Download).await,
                _ => Err(CommandError::Transient(
                    "Usage: export html | export pdf".into(),
                )),
            },
            "pdf" => self.export_pdf(ctx, PdfMode::Open).await,
            "css" => self.set_custom_css(ctx, parts.get(1).copied()).await,
            "clear" => {
                apply_document(ctx, "");
                Ok("Document cleared".to_string())
            }
            "view" => {
                let Some(mode) = parts.get(1).copied().and_then(ViewMode::parse) else {
                    return Err(CommandError::Transient(
                        "Usage: view both | editor | preview".into(),
                    ));
                };
                *ctx.view = mode;
                Ok(String::new())
            }
            "focus" => {
                ctx.config.focus_mode = !ctx.config.focus_mode;
                if ctx.config.focus_mode {
                    // Focus mode always shows both panes.
                    *ctx.view = ViewMode::Both;
                }
                self.persist_config(ctx).await;
                Ok(format!(
                    "Focus mode {}",
                    if ctx.config.focus_mode { "on" } else { "off" }
                ))
            }
            "advanced" => {
                ctx.config.advanced_options = !ctx.config.advanced_options;
                self.persist_config(ctx).await;
                Ok(format!(
                    "Advanced options {}",
                    if ctx.config.advanced_options { "on" } else { "off" }
                ))
            }
            "lang" => {
                let Some(language) = parts.get(1).and_then(|tag| Language::parse(tag)) else {
                    return Err(CommandError::Transient("Usage: lang en | pt | es".into()));
                };
                ctx.config.language = language;
                self.persist_config(ctx).await;
                Ok(format!("Language set to {}", language.tag()))
            }
            "layout" => self.switch_layout(ctx, parts.get(1).copied()).await,
            "dark" => {
                let current_dark = layout::layout_by_id(&ctx.config.layout_id)
                    .map(|l| l.dark)
                    .unwrap_or(false);
                let next = layout::counterpart_for_mode(&ctx.config.layout_id, !current_dark);
                ctx.config.layout_id = next.to_string();
                ctx.preview.set_dark(!current_dark);
                self.persist_config(ctx).await;
                Ok(format!("Layout switched to {}", next))
            }
            "example" => self.select_example(ctx, &parts).await,
            "random" => self.random_example(ctx, cmd.strip_prefix("random").unwrap_or("")).await,
            "examples" => self.manage_examples(ctx, parts.get(1).copied()),
            "cat" => self.manage_category(ctx, &parts),
            "item" => self.manage_item(ctx, &parts),
            "help" => Ok("Press ? to toggle the help screen".to_string()),
            _ => Err(CommandError::Transient(format!(
                "Not a command: {}",
                parts[0]
            ))),
        }
    }

    async fn save_markdown(
        &self,
        ctx: &mut CommandContext<'_>,
        filename: Option<&&str>,
    ) -> CommandResult {
        if let Some(name) = filename {
            ctx.exports.filename = name.to_string();
        }
        let content = ctx.editor.get_content();
        let path = ctx
            .exports
            .export_markdown(&content)
            .await
            .map_err(CommandError::Failed)?;
        ctx.editor.mark_saved();
        Ok(format!("Wrote {}", path.display()))
    }

    async fn export_html(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        if ctx.editor.is_blank() {
            return Ok("Document is empty".to_string());
        }
        let content = ctx.editor.get_content();
        match ctx.exports.export_html(&content).await {
            Ok(path) => Ok(format!("Exported {}", path.display())),
            Err(e) => {
                // Export failures are diagnostics, not user errors.
                log::error!("HTML export failed: {:#}", e);
                Ok(String::new())
            }
        }
    }

    async fn export_pdf(&self, ctx: &mut CommandContext<'_>, mode: PdfMode) -> CommandResult {
        if ctx.editor.is_blank() {
            return Ok("Document is empty".to_string());
        }
        let content = ctx.editor.get_content();
        match ctx.exports.export_pdf(&content, mode).await {
            Ok(path) => Ok(format!("Exported {}", path.display())),
            Err(e) => {
                log::error!("PDF export failed: {:#}", e);
                Ok(String::new())
            }
        }
    }

    async fn set_custom_css(
        &self,
        ctx: &mut CommandContext<'_>,
        arg: Option<&str>,
    ) -> CommandResult {
        match arg {
            None => Ok(match &ctx.exports.custom_css {
                Some(_) => "Custom export CSS is active (css clear to remove)".to_string(),
                None => "No custom export CSS".to_string(),
            }),
            Some("clear") => {
                ctx.exports.custom_css = None;
                Ok("Custom export CSS cleared".to_string())
            }
            Some(path) => {
                let css = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| CommandError::Transient(format!("{}: {}", path, e)))?;
                ctx.exports.custom_css = Some(css);
                Ok(format!("Custom export CSS loaded from {}", path))
            }
        }
    }

    async fn import_file(&self, ctx: &mut CommandContext<'_>, path: PathBuf) -> CommandResult {
        let content = read_markdown_file(&path).await?;
        apply_document(ctx, &content);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            ctx.exports.filename = name.to_string();
        }
        Ok(format!("Imported {}", path.display()))
    }

    async fn switch_layout(
        &self,
        ctx: &mut CommandContext<'_>,
        arg: Option<&str>,
    ) -> CommandResult {
        match arg {
            None | Some("list") => {
                let names: Vec<&str> = layout::layouts().iter().map(|l| l.id).collect();
                Ok(format!("Layouts: {}", names.join(", ")))
            }
            Some(id) => {
                let Some(chosen) = layout::layout_by_id(id) else {
                    return Err(CommandError::Transient(format!("Unknown layout: {}", id)));
                };
                ctx.config.layout_id = chosen.id.to_string();
                ctx.preview.set_dark(chosen.dark);
                self.persist_config(ctx).await;
                Ok(format!("Layout switched to {}", chosen.id))
            }
        }
    }

    async fn select_example(
        &self,
        ctx: &mut CommandContext<'_>,
        parts: &[&str],
    ) -> CommandResult {
        let (Some(category_id), Some(item_id)) = (
            parts.get(1).and_then(|p| p.parse::<u32>().ok()),
            parts.get(2).and_then(|p| p.parse::<u32>().ok()),
        ) else {
            return Err(CommandError::Transient(
                "Usage: example <category-id> <item-id>".into(),
            ));
        };

        let Some(example) = ctx
            .catalog
            .find_category(category_id)
            .and_then(|c| c.items.iter().find(|i| i.id == item_id))
        else {
            return Err(CommandError::Transient(format!(
                "No example {}/{}",
                category_id, item_id
            )));
        };

        let title = example.title.clone();
        let content = match example.body.clone() {
            ExampleBody::Text(text) => mdkit::sanitize::clean_markdown(&text),
            ExampleBody::File(url) => ctx.github.fetch_markdown(&url).await?,
        };
        apply_document(ctx, &content);
        Ok(format!("Loaded example: {}", title))
    }

    async fn random_example(&self, ctx: &mut CommandContext<'_>, fragment: &str) -> CommandResult {
        let picked = match ctx.catalog.pick_random(fragment) {
            Ok((category, item)) => (category.name.clone(), item.title.clone(), item.body.clone()),
            // Not-found and empty-category outcomes never touch the document.
            Err(e) => return Err(CommandError::Transient(e.to_string())),
        };

        let (category_name, title, body) = picked;
        let content = match body {
            ExampleBody::Text(text) => mdkit::sanitize::clean_markdown(&text),
            ExampleBody::File(url) => ctx.github.fetch_markdown(&url).await?,
        };
        apply_document(ctx, &content);
        Ok(format!("Random example '{}' from {}", title, category_name))
    }

    fn manage_examples(&self, ctx: &mut CommandContext<'_>, arg: Option<&str>) -> CommandResult {
        match arg {
            None | Some("list") => {
                if ctx.catalog.categories.is_empty() {
                    return Ok("Custom catalog is empty".to_string());
                }
                let mut out = String::new();
                for category in &ctx.catalog.categories {
                    out.push_str(&format!("[{}] {}\n", category.id, category.name));
                    for item in &category.items {
                        out.push_str(&format!("    [{}] {}\n", item.id, item.title));
                    }
                }
                Ok(out.trim_end().to_string())
            }
            Some("reset") => {
                *ctx.catalog = builtin_catalog(ctx.config.language);
                if let Err(e) = ctx.store.clear() {
                    log::warn!("Failed to clear persisted catalog: {}", e);
                }
                Ok("Custom catalog reset to the built-in examples".to_string())
            }
            Some("clear") => {
                ctx.catalog.categories.clear();
                if let Err(e) = ctx.store.clear() {
                    log::warn!("Failed to clear persisted catalog: {}", e);
                }
                Ok("Custom catalog cleared".to_string())
            }
            Some(other) => Err(CommandError::Transient(format!(
                "Usage: examples [list|reset|clear], got {}",
                other
            ))),
        }
    }

    fn manage_category(&self, ctx: &mut CommandContext<'_>, parts: &[&str]) -> CommandResult {
        match parts.get(1).copied() {
            Some("add") if parts.len() > 2 => {
                let name = parts[2..].join(" ");
                let Some(id) = ctx.catalog.add_category(&name) else {
                    return Err(CommandError::Transient("Category name is empty".into()));
                };
                self.persist_catalog(ctx);
                Ok(format!("Category [{}] added", id))
            }
            Some("del") => {
                let Some(id) = parts.get(2).and_then(|p| p.parse::<u32>().ok()) else {
                    return Err(CommandError::Transient("Usage: cat del <id>".into()));
                };
                if !ctx.catalog.delete_category(id) {
                    return Err(CommandError::Transient(format!("No category {}", id)));
                }
                self.persist_catalog(ctx);
                Ok(format!("Category [{}] deleted", id))
            }
            _ => Err(CommandError::Transient(
                "Usage: cat add <name> | cat del <id>".into(),
            )),
        }
    }

    fn manage_item(&self, ctx: &mut CommandContext<'_>, parts: &[&str]) -> CommandResult {
        match parts.get(1).copied() {
            Some("add") if parts.len() > 3 => {
                let Some(category_id) = parts.get(2).and_then(|p| p.parse::<u32>().ok()) else {
                    return Err(CommandError::Transient(
                        "Usage: item add <category-id> <title>".into(),
                    ));
                };
                let title = parts[3..].join(" ");
                // The new item captures the current editor content.
                let body = ExampleBody::Text(ctx.editor.get_content());
                let Some(id) = ctx.catalog.add_item(category_id, &title, body) else {
                    return Err(CommandError::Transient(format!(
                        "No category {} (or empty title)",
                        category_id
                    )));
                };
                self.persist_catalog(ctx);
                Ok(format!("Item [{}] added to category [{}]", id, category_id))
            }
            Some("del") => {
                let (Some(category_id), Some(item_id)) = (
                    parts.get(2).and_then(|p| p.parse::<u32>().ok()),
                    parts.get(3).and_then(|p| p.parse::<u32>().ok()),
                ) else {
                    return Err(CommandError::Transient(
                        "Usage: item del <category-id> <item-id>".into(),
                    ));
                };
                if !ctx.catalog.delete_item(category_id, item_id) {
                    return Err(CommandError::Transient(format!(
                        "No item {}/{}",
                        category_id, item_id
                    )));
                }
                self.persist_catalog(ctx);
                Ok(format!("Item [{}] deleted", item_id))
            }
            _ => Err(CommandError::Transient(
                "Usage: item add <category-id> <title> | item del <category-id> <item-id>".into(),
            )),
        }
    }

    /// Every catalog mutation rewrites the whole persisted catalog.
    fn persist_catalog(&self, ctx: &mut CommandContext<'_>) {
        if let Err(e) = ctx.store.save(ctx.catalog) {
            log::warn!("Failed to persist custom catalog: {}", e);
        }
    }

    async fn persist_config(&self, ctx: &mut CommandContext<'_>) {
        if let Err(e) = ctx.config.save().await {
            log::warn!("Failed to save config: {}", e);
        }
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// The shared record-then-set funnel: imports, example selection, and the
/// clear action all go through the same sequence as manual edits, so the
/// change is immediately undoable.
pub fn apply_document(ctx: &mut CommandContext<'_>, content: &str) {
    ctx.history.record(content);
    ctx.editor.replace_content(content);
    ctx.editor.set_cursor_position(0, 0);
}
