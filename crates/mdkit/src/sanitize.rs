use ammonia::Builder;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>")
        .expect("Invalid SCRIPT_BLOCK regex pattern");
    static ref STYLE_BLOCK: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>")
        .expect("Invalid STYLE_BLOCK regex pattern");
    static ref IFRAME_BLOCK: Regex = Regex::new(r"(?is)<iframe\b[^>]*>.*?</iframe\s*>")
        .expect("Invalid IFRAME_BLOCK regex pattern");
    static ref DANGLING_EMBED: Regex =
        Regex::new(r"(?i)</?(script|style|iframe|object|embed|form)\b[^>]*>")
            .expect("Invalid DANGLING_EMBED regex pattern");
    static ref EVENT_ATTR: Regex = Regex::new(r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("Invalid EVENT_ATTR regex pattern");
    static ref JS_URL_ATTR: Regex =
        Regex::new(r#"(?i)\s(href|src)\s*=\s*("javascript:[^"]*"|'javascript:[^']*')"#)
            .expect("Invalid JS_URL_ATTR regex pattern");
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]*>").expect("Invalid ANY_TAG regex pattern");
    static ref EXTENSION: Regex =
        Regex::new(r"(?i)\.(md|html)$").expect("Invalid EXTENSION regex pattern");
}

/// Sanitize rendered HTML with ammonia's safe defaults - no script tags allowed.
pub fn sanitize_html(html: &str) -> String {
    Builder::new().clean(html).to_string()
}

/// Sanitize Markdown *source* before it reaches the document store.
///
/// Imported text (GitHub READMEs, uploaded files, example bodies) may carry
/// raw HTML. Markdown syntax itself must survive untouched, so this strips
/// only active raw-HTML content: script/style/iframe elements with their
/// bodies, stray embed-ish tags, inline event handlers, and javascript:
/// URLs. Rendering still escapes whatever remains.
pub fn clean_markdown(src: &str) -> String {
    let cleaned = SCRIPT_BLOCK.replace_all(src, "");
    let cleaned = STYLE_BLOCK.replace_all(&cleaned, "");
    let cleaned = IFRAME_BLOCK.replace_all(&cleaned, "");
    let cleaned = DANGLING_EMBED.replace_all(&cleaned, "");
    let cleaned = EVENT_ATTR.replace_all(&cleaned, "");
    JS_URL_ATTR.replace_all(&cleaned, "").into_owned()
}

/// Sanitize a short free-text field (catalog titles, category names,
/// search fragments): drop every tag, collapse whitespace.
pub fn clean_inline(text: &str) -> String {
    let stripped = ANY_TAG.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive a safe artifact title from the configured filename: strip a
/// trailing `.md`/`.html` extension, strip `\ / : * ? " < > |`, trim
/// whitespace, fall back to `document`.
pub fn sanitize_title(filename: &str) -> String {
    let stem = EXTENSION.replace(filename, "");
    let cleaned: String = stem
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        String::from("document")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_html_removes_scripts() {
        let html = r#"<p>Hello</p><script>alert('XSS')</script><p>World</p>"#;
        let sanitized = sanitize_html(html);
        assert!(!sanitized.contains("<script"));
        assert!(!sanitized.contains("alert"));
        assert!(sanitized.contains("Hello"));
        assert!(sanitized.contains("World"));
    }

    #[test]
    fn test_sanitize_html_removes_dangerous_attributes() {
        let html = r#"<a href="javascript:alert('XSS')">Click me</a>"#;
        let sanitized = sanitize_html(html);
        assert!(!sanitized.contains("javascript:"));
    }

    #[test]
    fn test_clean_markdown_keeps_markdown_syntax() {
        let src = "# Title\n\n- a < b\n- **bold**\n";
        assert_eq!(clean_markdown(src), src);
    }

    #[test]
    fn test_clean_markdown_strips_script_blocks() {
        let src = "before\n<script>fetch('/steal')</script>\nafter";
        let cleaned = clean_markdown(src);
        assert!(!cleaned.contains("script"));
        assert!(cleaned.contains("before"));
        assert!(cleaned.contains("after"));
    }

    #[test]
    fn test_clean_markdown_strips_event_handlers() {
        let src = r#"<img src="x.png" onerror="alert(1)">"#;
        let cleaned = clean_markdown(src);
        assert!(!cleaned.contains("onerror"));
        assert!(cleaned.contains("x.png"));
    }

    #[test]
    fn test_clean_inline_strips_tags() {
        assert_eq!(clean_inline("<b>Tables</b>  and\tmore"), "Tables and more");
    }

    #[test]
    fn test_sanitize_title_strips_invalid_characters() {
        assert_eq!(sanitize_title("My:File*Name?.md"), "MyFileName");
    }

    #[test]
    fn test_sanitize_title_strips_html_extension() {
        assert_eq!(sanitize_title("notes.HTML"), "notes");
    }

    #[test]
    fn test_sanitize_title_falls_back_to_document() {
        assert_eq!(sanitize_title(""), "document");
        assert_eq!(sanitize_title("\\/:*?\"<>|"), "document");
        assert_eq!(sanitize_title("   .md"), "document");
    }

    #[test]
    fn test_sanitize_title_only_trailing_extension() {
        assert_eq!(sanitize_title("md.notes"), "md.notes");
    }
}
