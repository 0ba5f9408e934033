use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the wenyan binary.
#[derive(Debug, Parser)]
#[command(
    name = "wenyan",
    version,
    about = "Render Markdown into inline-styled HTML for stylesheet-free platforms"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "WENYAN_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a Markdown file into a self-contained HTML fragment.
    Render(Box<RenderArgs>),
    /// List the available themes as JSON lines.
    Themes(ThemesArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Markdown source file; `-` reads standard input.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Write the HTML here instead of standard output.
    #[arg(long, short = 'o', value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Print title, description, cover and HTML as one JSON object.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: RenderOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ThemesArgs {
    /// Directory of additional `<id>.css` themes.
    #[arg(long = "themes-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub themes_dir: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Theme id or name.
    #[arg(long = "theme", short = 't', value_name = "ID")]
    pub theme: Option<String>,

    /// Directory of additional `<id>.css` themes.
    #[arg(long = "themes-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub themes_dir: Option<PathBuf>,

    /// Syntect theme used to generate the code highlighting stylesheet.
    #[arg(long = "highlight-theme", value_name = "NAME")]
    pub highlight_theme: Option<String>,

    /// Extra stylesheet applied after the theme and highlighting rules.
    #[arg(long = "platform-css", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub platform_css: Option<PathBuf>,

    /// Decorate code blocks with window controls.
    #[arg(
        long = "mac-style",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub mac_style: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
