use comrak::nodes::{AstNode, NodeValue};
use comrak::{markdown_to_html, parse_document, Arena, ComrakOptions};

pub fn to_html(src: &str) -> String {
    let opt = create_comrak_options();
    markdown_to_html(src, &opt)
}

pub(crate) fn create_comrak_options() -> ComrakOptions<'static> {
    let mut opt = ComrakOptions::default();

    // Extension options
    opt.extension.strikethrough = true;
    opt.extension.table = true;
    opt.extension.autolink = true;
    opt.extension.tasklist = true;
    opt.extension.superscript = true;
    opt.extension.footnotes = true;
    opt.extension.description_lists = true;

    // Parse options
    opt.parse.smart = true;

    // Render options - SECURITY: Enable safe HTML rendering
    opt.render.unsafe_ = false;
    opt.render.escape = true;

    opt
}

/// Collect every image URL referenced by the document, in document order,
/// without duplicates.
pub fn image_refs(src: &str) -> Vec<String> {
    let arena = Arena::new();
    let opt = create_comrak_options();
    let root = parse_document(&arena, src, &opt);

    let mut refs: Vec<String> = Vec::new();
    for node in root.descendants() {
        if let NodeValue::Image(link) = &node.data.borrow().value {
            if !link.url.is_empty() && !refs.iter().any(|u| u == &link.url) {
                refs.push(link.url.clone());
            }
        }
    }
    refs
}

/// Plain text of a node's inline children. Soft breaks collapse to spaces.
pub(crate) fn inline_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    collect_inline_text(node, &mut out);
    out
}

fn collect_inline_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(text) => out.push_str(text),
            NodeValue::Code(code) => out.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            NodeValue::Image(link) => {
                let alt = inline_text(child);
                if alt.is_empty() {
                    out.push_str(&link.url);
                } else {
                    out.push_str(&alt);
                }
            }
            _ => collect_inline_text(child, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let md = "# Hello\n\nThis is **bold** and *italic*.";
        let html = to_html(md);
        assert!(html.contains("<h1>"));
        assert!(html.contains("<strong>"));
        assert!(html.contains("<em>"));
    }

    #[test]
    fn test_gfm_table() {
        let md = "| Header 1 | Header 2 |\n|----------|----------|\n| Cell 1   | Cell 2   |";
        let html = to_html(md);
        assert!(html.contains("<table>"));
        assert!(html.contains("<thead>"));
        assert!(html.contains("<tbody>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let md = "hello <script>alert(1)</script>";
        let html = to_html(md);
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_image_refs_in_order() {
        let md = "![a](https://a.example/one.png)\n\ntext ![b](assets/two.jpg)";
        let refs = image_refs(md);
        assert_eq!(refs, vec!["https://a.example/one.png", "assets/two.jpg"]);
    }

    #[test]
    fn test_image_refs_deduplicated() {
        let md = "![a](x.png) ![b](x.png)";
        assert_eq!(image_refs(md).len(), 1);
    }

    #[test]
    fn test_image_refs_empty_document() {
        assert!(image_refs("no images here").is_empty());
    }
}
