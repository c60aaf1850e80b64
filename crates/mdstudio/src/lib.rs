// Mdstudio library exports

pub mod app;
pub mod catalog;
pub mod command_processor;
pub mod config;
pub mod editor;
pub mod export;
pub mod highlight;
pub mod history;
pub mod import;
pub mod layout;
pub mod preview;
pub mod status_manager;
pub mod ui;
pub mod ui_state;

pub use app::{App, Mode};
pub use catalog::{Catalog, CatalogStore, Example, ExampleBody};
pub use config::{Config, Language};
pub use editor::Editor;
pub use export::{ExportPipeline, PdfMode};
pub use history::History;
pub use ui_state::{UIState, ViewMode};
