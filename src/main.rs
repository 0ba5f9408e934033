use std::{path::Path, process};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use wenyan::{
    application::{
        error::AppError,
        render::{ComrakRenderService, RenderPipelineConfig, RenderRequest, RenderService},
    },
    config,
    infra::{error::InfraError, telemetry, themes},
};

const STDIN_PATH: &str = "-";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let messages = error.messages();
    if dispatcher::has_been_set() {
        error!(error = %error, causes = ?messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, causes = ?messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(settings, *args).await,
        config::Command::Themes(_) => run_themes(settings).await,
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let render = &settings.render;
    let markdown = read_source(&args.file).await?;
    let catalog = themes::load_catalog(render.themes_dir.as_deref()).await?;

    let mut pipeline = RenderPipelineConfig::new(catalog);
    pipeline.default_theme = render.theme.clone();
    pipeline.highlight_theme = render.highlight_theme.clone();
    if render.mac_style {
        pipeline = pipeline.with_stylesheet(themes::mac_style_stylesheet()?);
    }
    if let Some(path) = render.platform_css.as_deref() {
        pipeline = pipeline.with_stylesheet(themes::read_stylesheet(path).await?);
    }

    let service = ComrakRenderService::new(pipeline)?;
    let output = service.render(&RenderRequest::new(markdown))?;

    let payload = if args.json {
        serde_json::to_string(&output)
            .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?
    } else {
        output.html
    };

    match args.output.as_deref() {
        Some(path) => {
            tokio::fs::write(path, payload)
                .await
                .map_err(InfraError::from)?;
            info!(
                target = "wenyan::render",
                path = %path.display(),
                "output written"
            );
        }
        None => write_stdout(&payload).await?,
    }

    Ok(())
}

async fn run_themes(settings: config::Settings) -> Result<(), AppError> {
    let catalog = themes::load_catalog(settings.render.themes_dir.as_deref()).await?;

    let mut lines = String::new();
    for theme in catalog.iter() {
        let line = serde_json::to_string(theme)
            .map_err(|err| AppError::unexpected(format!("failed to encode theme: {err}")))?;
        lines.push_str(&line);
        lines.push('\n');
    }

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(lines.as_bytes())
        .await
        .map_err(InfraError::from)?;
    stdout.flush().await.map_err(InfraError::from)?;
    Ok(())
}

async fn read_source(path: &Path) -> Result<String, AppError> {
    if path.as_os_str() == STDIN_PATH {
        let mut markdown = String::new();
        tokio::io::stdin()
            .read_to_string(&mut markdown)
            .await
            .map_err(|err| InfraError::read(path, err))?;
        return Ok(markdown);
    }

    if path.as_os_str().is_empty() {
        return Err(AppError::validation("source path must not be empty"));
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AppError::from(InfraError::read(path, err)))
}

async fn write_stdout(payload: &str) -> Result<(), AppError> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(payload.as_bytes())
        .await
        .map_err(InfraError::from)?;
    if !payload.ends_with('\n') {
        stdout.write_all(b"\n").await.map_err(InfraError::from)?;
    }
    stdout.flush().await.map_err(InfraError::from)?;
    Ok(())
}
