use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use mdkit::pdf::{ImageStore, PdfOptions, ResolvedImage};
use mdkit::sanitize::sanitize_title;

/// Upper bound on resolving any single image during PDF export.
const IMAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfMode {
    /// Write the PDF next to the other artifacts.
    Download,
    /// Hand the PDF to the system viewer.
    Open,
}

/// Turns the current document into portable artifacts. Reads document
/// state, never mutates it. Invocations are serialized: a second export
/// while one is in flight is rejected.
pub struct ExportPipeline {
    pub filename: String,
    pub custom_css: Option<String>,
    output_dir: PathBuf,
    http: reqwest::Client,
    in_flight: bool,
}

impl ExportPipeline {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            filename: String::from("README.md"),
            custom_css: None,
            output_dir,
            http: reqwest::Client::new(),
            in_flight: false,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Safe artifact stem for the configured filename.
    pub fn title(&self) -> String {
        sanitize_title(&self.filename)
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_flight {
            anyhow::bail!("An export is already in flight");
        }
        self.in_flight = true;
        Ok(())
    }

    fn finish(&mut self) {
        self.in_flight = false;
    }

    /// Write the raw document text under the configured filename.
    pub async fn export_markdown(&mut self, content: &str) -> Result<PathBuf> {
        self.begin()?;
        let result = self.write_markdown(content).await;
        self.finish();
        result
    }

    async fn write_markdown(&self, content: &str) -> Result<PathBuf> {
        let name = if self.filename.trim().is_empty() {
            String::from("document.md")
        } else {
            self.filename.clone()
        };
        let path = self.output_dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Markdown written to {}", path.display());
        Ok(path)
    }

    /// Standalone HTML document: rendered, sanitized, scope-styled.
    pub async fn export_html(&mut self, content: &str) -> Result<PathBuf> {
        self.begin()?;
        let result = self.write_html(content).await;
        self.finish();
        result
    }

    async fn write_html(&self, content: &str) -> Result<PathBuf> {
        let html = mdkit::export::html_document(content, &self.filename, self.custom_css.as_deref());
        let path = self.output_dir.join(format!("{}.html", self.title()));
        tokio::fs::write(&path, html)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("HTML written to {}", path.display());
        Ok(path)
    }

    /// Rasterize to PDF. In `Open` mode the target file is created up
    /// front and removed again if anything later fails.
    pub async fn export_pdf(&mut self, content: &str, mode: PdfMode) -> Result<PathBuf> {
        self.begin()?;
        let result = self.write_pdf(content, mode).await;
        self.finish();
        result
    }

    async fn write_pdf(&self, content: &str, mode: PdfMode) -> Result<PathBuf> {
        let path = match mode {
            PdfMode::Download => self.output_dir.join(format!("{}.pdf", self.title())),
            PdfMode::Open => std::env::temp_dir().join(format!("{}.pdf", self.title())),
        };

        if mode == PdfMode::Open {
            // Claim the destination before any slow work, so a failure has
            // something concrete to clean up.
            tokio::fs::write(&path, b"")
                .await
                .with_context(|| format!("creating {}", path.display()))?;
        }

        match self.render_pdf(content).await {
            Ok(bytes) => {
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                log::info!("PDF written to {}", path.display());
                if mode == PdfMode::Open {
                    open::that(&path).with_context(|| format!("opening {}", path.display()))?;
                }
                Ok(path)
            }
            Err(e) => {
                if mode == PdfMode::Open {
                    if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                        log::debug!("Cleanup of {} failed: {}", path.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    async fn render_pdf(&self, content: &str) -> Result<Vec<u8>> {
        let images = self.resolve_images(content).await;
        mdkit::pdf::render(content, &images, &PdfOptions::default())
    }

    /// Resolve every referenced image, each attempt bounded by
    /// [`IMAGE_TIMEOUT`]. Failures degrade that image to alt text.
    async fn resolve_images(&self, content: &str) -> ImageStore {
        let mut store = ImageStore::new();
        for url in mdkit::markdown::image_refs(content) {
            match tokio::time::timeout(IMAGE_TIMEOUT, self.fetch_image(&url)).await {
                Ok(Ok(image)) => store.insert(url, image),
                Ok(Err(e)) => log::debug!("Image {} skipped: {}", url, e),
                Err(_) => log::debug!("Image {} skipped: timed out", url),
            }
        }
        store
    }

    async fn fetch_image(&self, url: &str) -> Result<ResolvedImage> {
        let bytes: Vec<u8> = if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.http.get(url).send().await?;
            if !response.status().is_success() {
                anyhow::bail!("status {}", response.status());
            }
            response.bytes().await?.to_vec()
        } else {
            tokio::fs::read(self.output_dir.join(url)).await?
        };
        ResolvedImage::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(dir: &Path) -> ExportPipeline {
        ExportPipeline::new(dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_export_markdown_writes_filename() {
        let dir = tempfile::tempdir().unwrap();
        let mut exports = pipeline(dir.path());
        exports.filename = String::from("notes.md");

        let path = exports.export_markdown("# hi").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "notes.md");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hi");
    }

    #[tokio::test]
    async fn test_export_html_uses_sanitized_title() {
        let dir = tempfile::tempdir().unwrap();
        let mut exports = pipeline(dir.path());
        exports.filename = String::from("My:Doc?.md");

        let path = exports.export_html("# Title").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "MyDoc.html");
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("<title>MyDoc</title>"));
        assert!(html.contains("markdown-export"));
    }

    #[tokio::test]
    async fn test_export_pdf_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut exports = pipeline(dir.path());
        exports.filename = String::from("report.md");

        let path = exports
            .export_pdf("# Report\n\nBody.", PdfMode::Download)
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "report.pdf");
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_custom_css_flows_into_html() {
        let dir = tempfile::tempdir().unwrap();
        let mut exports = pipeline(dir.path());
        exports.custom_css = Some(String::from("p { color: teal; }"));

        let path = exports.export_html("text").await.unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("teal"));
    }

    #[tokio::test]
    async fn test_exports_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let mut exports = pipeline(dir.path());
        exports.in_flight = true;
        assert!(exports.export_markdown("x").await.is_err());

        exports.in_flight = false;
        assert!(exports.export_markdown("x").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_images_do_not_fail_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let mut exports = pipeline(dir.path());
        let path = exports
            .export_pdf("![gone](missing.png)", PdfMode::Download)
            .await
            .unwrap();
        assert!(std::fs::read(path).unwrap().starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_local_image_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 0]))
            .save(dir.path().join("dot.png"))
            .unwrap();

        let exports = pipeline(dir.path());
        let store = exports.resolve_images("![dot](dot.png)").await;
        assert_eq!(store.len(), 1);
    }
}
