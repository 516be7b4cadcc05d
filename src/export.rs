//! Image export.
//!
//! The core treats "render the current view to an image" as an opaque
//! capability. The shipped implementation shells out to a user-configured
//! command (a headless browser or similar) pointed at the mockup's view URL;
//! when no command is configured the capability is simply unavailable and
//! the caller surfaces a notice. Export never touches conversation state.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Errors that can occur while capturing the rendered view.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// No export capability is configured.
    #[error("image export is not configured")]
    Unavailable,

    /// The configured command could not produce an image.
    #[error("export command failed: {0}")]
    CommandFailed(String),

    /// An I/O error occurred while running the command or reading its output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability to snapshot a rendered view into image bytes.
#[async_trait]
pub trait ImageExporter: Send + Sync + std::fmt::Debug {
    /// Capture the page at `view_url` and return encoded image bytes (PNG).
    async fn capture(&self, view_url: &str) -> Result<Vec<u8>, ExportError>;
}

/// Exporter that runs an external command template.
///
/// The template is split on whitespace; `{url}` is replaced with the view
/// URL and `{out}` with a temporary output path the command must write,
/// e.g. `chromium --headless --screenshot={out} {url}`.
#[derive(Debug)]
pub struct CommandExporter {
    template: String,
}

impl CommandExporter {
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    fn output_path() -> PathBuf {
        std::env::temp_dir().join(format!("chatshot-{}.png", Uuid::new_v4()))
    }
}

#[async_trait]
impl ImageExporter for CommandExporter {
    async fn capture(&self, view_url: &str) -> Result<Vec<u8>, ExportError> {
        let out = Self::output_path();
        let out_str = out.to_string_lossy().to_string();

        let mut parts = self
            .template
            .split_whitespace()
            .map(|p| p.replace("{url}", view_url).replace("{out}", &out_str));
        let program = parts.next().ok_or(ExportError::Unavailable)?;

        info!(
            name: "export.capture.started",
            command = %program,
            url = %view_url,
            "Capturing mockup view"
        );

        let status = tokio::process::Command::new(&program)
            .args(parts)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(ExportError::CommandFailed(format!(
                "{program} exited with {status}"
            )));
        }

        let bytes = tokio::fs::read(&out).await.map_err(|_| {
            ExportError::CommandFailed(format!("{program} wrote no output image"))
        })?;
        let _ = tokio::fs::remove_file(&out).await;

        info!(
            name: "export.capture.finished",
            bytes = bytes.len(),
            "Mockup view captured"
        );
        Ok(bytes)
    }
}
