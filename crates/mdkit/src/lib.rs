pub mod export;
pub mod markdown;
pub mod pdf;
pub mod sanitize;
pub mod stylesheet;

pub use export::html_document;
pub use markdown::to_html;
pub use sanitize::{clean_markdown, sanitize_html, sanitize_title};

#[cfg(test)]
mod tests;
