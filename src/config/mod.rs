//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, Command, LoggingOverrides, RenderArgs, RenderOverrides, ThemesArgs};

use crate::domain::themes::DEFAULT_THEME_ID;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "wenyan";
const ENV_PREFIX: &str = "WENYAN";
pub(crate) const DEFAULT_HIGHLIGHT_THEME: &str = "Solarized (light)";

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub theme: String,
    pub themes_dir: Option<PathBuf>,
    pub highlight_theme: String,
    pub platform_css: Option<PathBuf>,
    pub mac_style: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Render(args) => {
            raw.apply_logging_overrides(&args.logging);
            raw.apply_render_overrides(&args.overrides);
        }
        Command::Themes(args) => {
            raw.apply_logging_overrides(&args.logging);
            if let Some(dir) = args.themes_dir.as_ref() {
                raw.render.themes_dir = Some(dir.clone());
            }
        }
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(theme) = overrides.theme.as_ref() {
            self.render.theme = Some(theme.clone());
        }
        if let Some(dir) = overrides.themes_dir.as_ref() {
            self.render.themes_dir = Some(dir.clone());
        }
        if let Some(name) = overrides.highlight_theme.as_ref() {
            self.render.highlight_theme = Some(name.clone());
        }
        if let Some(path) = overrides.platform_css.as_ref() {
            self.render.platform_css = Some(path.clone());
        }
        if let Some(enabled) = overrides.mac_style {
            self.render.mac_style = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, render } = raw;

        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;

        Ok(Self { logging, render })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let theme = render
        .theme
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_THEME_ID.to_string());

    let highlight_theme = render
        .highlight_theme
        .unwrap_or_else(|| DEFAULT_HIGHLIGHT_THEME.to_string());
    if highlight_theme.trim().is_empty() {
        return Err(LoadError::invalid(
            "render.highlight_theme",
            "theme name must not be empty",
        ));
    }

    let themes_dir = non_empty_path(render.themes_dir, "render.themes_dir")?;
    let platform_css = non_empty_path(render.platform_css, "render.platform_css")?;

    Ok(RenderSettings {
        theme,
        themes_dir,
        highlight_theme,
        platform_css,
        mac_style: render.mac_style.unwrap_or(false),
    })
}

fn non_empty_path(
    path: Option<PathBuf>,
    key: &'static str,
) -> Result<Option<PathBuf>, LoadError> {
    match path {
        Some(path) if path.as_os_str().is_empty() => {
            Err(LoadError::invalid(key, "path must not be empty"))
        }
        other => Ok(other),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    theme: Option<String>,
    themes_dir: Option<PathBuf>,
    highlight_theme: Option<String>,
    platform_css: Option<PathBuf>,
    mac_style: Option<bool>,
}
