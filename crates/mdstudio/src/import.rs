use std::path::Path;
use std::time::Duration;

/// Where profile READMEs are fetched from. The original service publishes a
/// user's profile README in the repository named after the user, on master.
pub const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";
const GITHUB_BRANCH_PATH: &str = "master/README.md";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Import failures, split so the caller can route validation problems and
/// network problems to the transient message channel with the right text.
#[derive(Debug)]
pub enum ImportError {
    /// No username given - user input validation failure.
    EmptyUsername,
    /// The chosen file is not a `.md` file - user input validation failure.
    NotMarkdown(String),
    /// The README request came back non-2xx.
    ReadmeUnavailable,
    /// Transport-level failure (DNS, TLS, timeout, IO).
    Transport(String),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::EmptyUsername => write!(f, "GitHub username is required"),
            ImportError::NotMarkdown(name) => {
                write!(f, "Select a Markdown (.md) file: {}", name)
            }
            ImportError::ReadmeUnavailable => {
                write!(f, "README not found or repository does not exist")
            }
            ImportError::Transport(detail) => write!(f, "Import failed: {}", detail),
        }
    }
}

impl std::error::Error for ImportError {}

impl ImportError {
    /// Validation failures come from the user's own input; everything else
    /// is an upstream problem.
    pub fn is_validation(&self) -> bool {
        matches!(self, ImportError::EmptyUsername | ImportError::NotMarkdown(_))
    }
}

/// Fetches remote Markdown: profile READMEs and file-backed catalog
/// entries. All fetched text is sanitized before it is handed back.
pub struct GithubImporter {
    client: reqwest::Client,
    base_url: String,
}

impl GithubImporter {
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_RAW_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET `{base}/{username}/{username}/master/README.md`, sanitized.
    pub async fn fetch_profile_readme(&self, username: &str) -> Result<String, ImportError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ImportError::EmptyUsername);
        }

        let url = format!(
            "{}/{}/{}/{}",
            self.base_url, username, username, GITHUB_BRANCH_PATH
        );
        log::info!("Fetching profile README: {}", url);
        self.fetch_markdown(&url).await
    }

    /// Fetch an arbitrary Markdown resource (file-backed example entries).
    pub async fn fetch_markdown(&self, url: &str) -> Result<String, ImportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImportError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            log::warn!("Fetch of {} failed with status {}", url, response.status());
            return Err(ImportError::ReadmeUnavailable);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ImportError::Transport(e.to_string()))?;
        Ok(mdkit::sanitize::clean_markdown(&text))
    }
}

impl Default for GithubImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a local Markdown file. Only names ending in `.md` are accepted;
/// content is sanitized like every other import.
pub async fn read_markdown_file(path: &Path) -> Result<String, ImportError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if !name.ends_with(".md") {
        return Err(ImportError::NotMarkdown(name.to_string()));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ImportError::Transport(format!("{}: {}", path.display(), e)))?;
    log::info!("Imported {} ({} bytes)", path.display(), content.len());
    Ok(mdkit::sanitize::clean_markdown(&content))
}
