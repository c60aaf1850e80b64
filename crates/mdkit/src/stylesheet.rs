//! Export stylesheet handling.
//!
//! Exported documents carry their styles inline, scoped under a fixed
//! wrapper class so they can neither leak into nor be polluted by whatever
//! page later hosts the markup.

/// Wrapper class every export is rendered under.
pub const SCOPE_CLASS: &str = "markdown-export";

/// Rewrite a stylesheet so every selector is prefixed with `scope`.
///
/// `html`, `body` and `:root` selectors are remapped to the scope itself.
/// Conditional at-rules (`@media`, `@supports`) are scoped recursively;
/// other at-rules (`@page`, `@keyframes`, `@font-face`, ...) pass through
/// untouched.
pub fn scope_css(css: &str, scope: &str) -> String {
    let mut out = String::with_capacity(css.len() + css.len() / 4);
    scope_block(css, scope, &mut out);
    out
}

fn scope_block(css: &str, scope: &str, out: &mut String) {
    let bytes = css.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let rest = &css[pos..];
        let Some(brace) = rest.find('{') else {
            out.push_str(rest.trim_end());
            break;
        };
        let header = &rest[..brace];
        let Some(body_len) = matching_block_len(&rest[brace..]) else {
            // Unbalanced braces: emit the remainder untouched.
            out.push_str(rest);
            break;
        };
        let body = &rest[brace + 1..brace + body_len - 1];
        let header_trimmed = header.trim();

        if let Some(at_rule) = header_trimmed.strip_prefix('@') {
            if at_rule.starts_with("media") || at_rule.starts_with("supports") {
                out.push_str(header_trimmed);
                out.push_str(" {\n");
                scope_block(body, scope, out);
                out.push_str("\n}\n");
            } else {
                out.push_str(header_trimmed);
                out.push_str(" {");
                out.push_str(body);
                out.push_str("}\n");
            }
        } else if !header_trimmed.is_empty() {
            out.push_str(&scope_selector_list(header_trimmed, scope));
            out.push_str(" {");
            out.push_str(body);
            out.push_str("}\n");
        }

        pos += brace + body_len;
    }
}

/// Length of a `{...}` block (including both braces) starting at the
/// opening brace, or `None` when unbalanced.
fn matching_block_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn scope_selector_list(selectors: &str, scope: &str) -> String {
    selectors
        .split(',')
        .map(|s| scope_selector(s.trim(), scope))
        .collect::<Vec<_>>()
        .join(",\n")
}

fn scope_selector(selector: &str, scope: &str) -> String {
    if selector.is_empty() || selector.starts_with(scope) {
        return selector.to_string();
    }
    match selector {
        "html" | "body" | ":root" => scope.to_string(),
        _ => format!("{} {}", scope, selector),
    }
}

/// Built-in stylesheet applied when the user supplies no CSS override.
pub const DEFAULT_EXPORT_CSS: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
    font-size: 16px;
    line-height: 1.6;
    color: #24292f;
    background: #ffffff;
}

h1, h2, h3, h4, h5, h6 {
    margin-top: 24px;
    margin-bottom: 16px;
    font-weight: 600;
    line-height: 1.25;
}

h1 { font-size: 2em; border-bottom: 1px solid #d0d7de; padding-bottom: 0.3em; }
h2 { font-size: 1.5em; border-bottom: 1px solid #d0d7de; padding-bottom: 0.3em; }
h3 { font-size: 1.25em; }
h4 { font-size: 1em; }

p {
    margin-top: 0;
    margin-bottom: 16px;
}

a {
    color: #0969da;
    text-decoration: none;
}

a:hover {
    text-decoration: underline;
}

ul, ol {
    margin-top: 0;
    margin-bottom: 16px;
    padding-left: 2em;
}

li + li {
    margin-top: 4px;
}

blockquote {
    margin: 0 0 16px 0;
    padding: 0 1em;
    color: #57606a;
    border-left: 0.25em solid #d0d7de;
}

code {
    font-family: SFMono-Regular, Consolas, 'Liberation Mono', Menlo, monospace;
    font-size: 90%;
    padding: 0.2em 0.4em;
    background-color: #f6f8fa;
    border-radius: 4px;
}

pre {
    margin-top: 0;
    margin-bottom: 16px;
    padding: 16px;
    overflow: auto;
    background-color: #f6f8fa;
    border-radius: 6px;
    line-height: 1.45;
    white-space: pre-wrap;
    word-wrap: break-word;
}

pre code {
    padding: 0;
    background: transparent;
    border-radius: 0;
    font-size: 85%;
}

table {
    width: 100%;
    margin-bottom: 16px;
    border-collapse: collapse;
    border-spacing: 0;
}

th, td {
    padding: 8px 12px;
    border: 1px solid #d0d7de;
    text-align: left;
    vertical-align: top;
}

th {
    font-weight: 600;
    background-color: #f6f8fa;
}

tr:nth-child(2n) td {
    background-color: #f6f8fa;
}

hr {
    height: 2px;
    margin: 24px 0;
    border: none;
    background-color: #d0d7de;
}

img {
    max-width: 100%;
    height: auto;
}

del {
    text-decoration: line-through;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_simple_rule() {
        let css = "p { margin: 0; }";
        let scoped = scope_css(css, ".markdown-export");
        assert!(scoped.contains(".markdown-export p {"));
    }

    #[test]
    fn test_scope_selector_groups() {
        let css = "h1, h2 { font-weight: 600; }";
        let scoped = scope_css(css, ".wrap");
        assert!(scoped.contains(".wrap h1"));
        assert!(scoped.contains(".wrap h2"));
    }

    #[test]
    fn test_scope_remaps_body_and_root() {
        let css = "body { color: red; }\n:root { --x: 1; }";
        let scoped = scope_css(css, ".wrap");
        assert!(scoped.contains(".wrap {"));
        assert!(!scoped.contains(".wrap body"));
        assert!(!scoped.contains(".wrap :root"));
    }

    #[test]
    fn test_scope_recurses_into_media_queries() {
        let css = "@media (max-width: 768px) { p { font-size: 13px; } }";
        let scoped = scope_css(css, ".wrap");
        assert!(scoped.contains("@media (max-width: 768px)"));
        assert!(scoped.contains(".wrap p {"));
    }

    #[test]
    fn test_scope_leaves_page_rule_untouched() {
        let css = "@page { size: A4; }";
        let scoped = scope_css(css, ".wrap");
        assert!(scoped.contains("@page {"));
        assert!(!scoped.contains(".wrap"));
    }

    #[test]
    fn test_scope_already_scoped_selector() {
        let css = ".wrap h1 { color: blue; }";
        let scoped = scope_css(css, ".wrap");
        assert!(scoped.contains(".wrap h1 {"));
        assert!(!scoped.contains(".wrap .wrap"));
    }

    #[test]
    fn test_default_css_scopes_cleanly() {
        let scoped = scope_css(DEFAULT_EXPORT_CSS, ".markdown-export");
        assert!(scoped.contains(".markdown-export h1"));
        assert!(scoped.contains(".markdown-export pre code"));
        // body rules must target the wrapper, not a nested body element
        assert!(!scoped.contains(".markdown-export body"));
    }
}
