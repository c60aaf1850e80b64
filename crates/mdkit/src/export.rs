//! Standalone HTML document assembly.
//!
//! Both the HTML artifact and the PDF pipeline's print view share this
//! shape: sanitized body markup under a fixed wrapper class, scoped styles
//! inlined, A4 page geometry, and page-break avoidance on block elements.

use crate::markdown;
use crate::sanitize::{sanitize_html, sanitize_title};
use crate::stylesheet::{scope_css, DEFAULT_EXPORT_CSS, SCOPE_CLASS};

/// Render a complete, self-contained HTML document for the given Markdown
/// source. `filename` is reduced to a safe title; `custom_css` overrides
/// the built-in stylesheet when present.
pub fn html_document(src: &str, filename: &str, custom_css: Option<&str>) -> String {
    let title = sanitize_title(filename);
    let body = sanitize_html(&markdown::to_html(src));
    let scope = format!(".{}", SCOPE_CLASS);
    let scoped_css = scope_css(custom_css.unwrap_or(DEFAULT_EXPORT_CSS), &scope);

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <style>
    @page {{ size: A4; margin: 12mm; }}
    html, body {{
      margin: 0;
      padding: 0;
      background: #ffffff;
    }}
    .{scope_class} {{
      box-sizing: border-box;
      width: 100%;
      max-width: 190mm;
      margin: 0 auto;
    }}
{scoped_css}
    .{scope_class} h1, .{scope_class} h2, .{scope_class} h3,
    .{scope_class} h4, .{scope_class} h5, .{scope_class} h6 {{
      page-break-after: avoid;
      break-after: avoid-page;
      page-break-inside: avoid;
      break-inside: avoid-page;
    }}
    .{scope_class} li, .{scope_class} pre, .{scope_class} blockquote,
    .{scope_class} table, .{scope_class} img {{
      page-break-inside: avoid;
      break-inside: avoid-page;
    }}
  </style>
</head>
<body>
  <div class="{scope_class}">
{body}
  </div>
</body>
</html>
"#,
        title = html_escape(&title),
        scope_class = SCOPE_CLASS,
        scoped_css = scoped_css,
        body = body,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
