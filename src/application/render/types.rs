use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::inline::InlineError;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Markdown source, optionally led by a YAML front matter block.
    pub markdown: String,
    /// Theme id or name; the pipeline default applies when absent.
    #[serde(default)]
    pub theme: Option<String>,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            theme: None,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    /// Root container markup with every style inlined.
    pub html: String,
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("front matter rejected: {message}")]
    FrontMatter { message: String },
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("unknown theme `{id}`")]
    Theme { id: String },
    #[error(transparent)]
    Inline(#[from] InlineError),
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
