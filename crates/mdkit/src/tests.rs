#[cfg(test)]
mod unit_tests {
    use super::super::*;

    #[test]
    fn test_render_then_sanitize_pipeline() {
        let md = "# Hello\n\nThis is **bold** text with <script>alert(1)</script> inline.";
        let html = sanitize::sanitize_html(&markdown::to_html(md));
        assert!(html.contains("<h1>"));
        assert!(html.contains("<strong>"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_imported_source_survives_render() {
        let imported = sanitize::clean_markdown("# Title\n\n<script>x()</script>\n\n- item\n");
        let html = markdown::to_html(&imported);
        assert!(html.contains("<h1>"));
        assert!(html.contains("<li>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_html_document_round_trip_of_title_rule() {
        // The shared title rule applies to both artifact kinds.
        let html = export::html_document("body", "My:File*Name?.md", None);
        assert!(html.contains("<title>MyFileName</title>"));
    }

    #[test]
    fn test_export_and_pdf_agree_on_content() {
        let src = "# Report\n\nNumbers below.\n\n| A | B |\n|---|---|\n| 1 | 2 |\n";
        let html = export::html_document(src, "report.md", None);
        assert!(html.contains("<table>"));

        let bytes = pdf::render(src, &pdf::ImageStore::new(), &pdf::PdfOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_custom_css_is_scoped_not_inlined_raw() {
        let html = export::html_document("text", "doc.md", Some("h1 { color: red; }\n"));
        assert!(html.contains(".markdown-export h1"));
    }
}
