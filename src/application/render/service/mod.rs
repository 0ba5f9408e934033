mod config;
mod highlight;
mod markdown;

use std::time::Instant;

use syntect::{html::ClassStyle, parsing::SyntaxSet};
use tracing::info;

use crate::application::inline;
use crate::application::render::types::{
    RenderError, RenderOutput, RenderRequest, RenderService,
};
use crate::domain::{
    front_matter::split_front_matter,
    themes::{DEFAULT_THEME_ID, Theme, ThemeCatalog},
};

use config::default_options;
use markdown::render_markdown;

/// Inputs the pipeline is assembled from.
#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    pub catalog: ThemeCatalog,
    /// Theme used when a request names none.
    pub default_theme: String,
    /// syntect theme the highlight stylesheet is generated from.
    pub highlight_theme: String,
    /// Applied after the theme and highlight stylesheets, in order.
    pub extra_stylesheets: Vec<String>,
}

impl RenderPipelineConfig {
    pub fn new(catalog: ThemeCatalog) -> Self {
        Self {
            catalog,
            default_theme: DEFAULT_THEME_ID.to_string(),
            highlight_theme: crate::config::DEFAULT_HIGHLIGHT_THEME.to_string(),
            extra_stylesheets: Vec::new(),
        }
    }

    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.extra_stylesheets.push(css.into());
        self
    }
}

/// Comrak-based pipeline: front matter, markdown with syntect highlighting,
/// then inline style projection.
pub struct ComrakRenderService {
    options: comrak::options::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    highlight_css: String,
    catalog: ThemeCatalog,
    default_theme: String,
    extra_stylesheets: Vec<String>,
}

impl ComrakRenderService {
    pub fn new(config: RenderPipelineConfig) -> Result<Self, RenderError> {
        let RenderPipelineConfig {
            catalog,
            default_theme,
            highlight_theme,
            extra_stylesheets,
        } = config;

        if catalog.find(&default_theme).is_none() {
            return Err(RenderError::Theme { id: default_theme });
        }

        Ok(Self {
            options: default_options(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: highlight::CLASS_STYLE,
            highlight_css: highlight::highlight_stylesheet(&highlight_theme)?,
            catalog,
            default_theme,
            extra_stylesheets,
        })
    }

    pub fn catalog(&self) -> &ThemeCatalog {
        &self.catalog
    }

    fn resolve_theme(&self, requested: Option<&str>) -> Result<&Theme, RenderError> {
        let key = requested
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(self.default_theme.as_str());
        self.catalog.find(key).ok_or_else(|| RenderError::Theme {
            id: key.to_string(),
        })
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let started = Instant::now();
        let theme = self.resolve_theme(request.theme.as_deref())?;

        let front_matter =
            split_front_matter(&request.markdown).map_err(|err| RenderError::FrontMatter {
                message: err.to_string(),
            })?;

        let fragment = render_markdown(
            &front_matter.body,
            &self.options,
            &self.syntax_set,
            &self.class_style,
        )?;

        let mut stylesheets: Vec<&str> = Vec::with_capacity(2 + self.extra_stylesheets.len());
        stylesheets.push(&theme.css);
        stylesheets.push(&self.highlight_css);
        stylesheets.extend(self.extra_stylesheets.iter().map(String::as_str));

        let html = inline::convert(&fragment, &stylesheets)?;

        info!(
            target = "application::render",
            theme = %theme.id,
            bytes = html.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "document rendered"
        );

        Ok(RenderOutput {
            title: front_matter.title,
            description: front_matter.description,
            cover: front_matter.cover,
            html,
        })
    }
}
