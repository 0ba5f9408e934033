use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert_eq!(settings.render.theme, DEFAULT_THEME_ID);
    assert_eq!(settings.render.highlight_theme, DEFAULT_HIGHLIGHT_THEME);
    assert!(settings.render.platform_css.is_none());
    assert!(!settings.render.mac_style);
    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.render.theme = Some("lapis".to_string());
    raw.logging.level = Some("info".to_string());

    raw.apply_render_overrides(&RenderOverrides {
        theme: Some("purple".to_string()),
        mac_style: Some(true),
        ..Default::default()
    });
    raw.apply_logging_overrides(&LoggingOverrides {
        log_level: Some("debug".to_string()),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.render.theme, "purple");
    assert!(settings.render.mac_style);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_logging_overrides(&LoggingOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_theme_falls_back_to_default() {
    let mut raw = RawSettings::default();
    raw.render.theme = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.render.theme, DEFAULT_THEME_ID);
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "logging.level"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn empty_platform_css_path_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.platform_css = Some(PathBuf::new());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "render.platform_css",
            ..
        })
    ));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "wenyan",
        "render",
        "post.md",
        "--theme",
        "orangeheart",
        "--platform-css",
        "extra.css",
        "--mac-style",
        "true",
        "-o",
        "out.html",
        "--log-json",
        "yes",
    ]);

    match args.command {
        Command::Render(render) => {
            assert_eq!(render.file, PathBuf::from("post.md"));
            assert_eq!(render.output, Some(PathBuf::from("out.html")));
            assert_eq!(render.overrides.theme.as_deref(), Some("orangeheart"));
            assert_eq!(
                render.overrides.platform_css,
                Some(PathBuf::from("extra.css"))
            );
            assert_eq!(render.overrides.mac_style, Some(true));
            assert_eq!(render.logging.log_json, Some(true));
            assert!(!render.json);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_themes_arguments() {
    let args = CliArgs::parse_from(["wenyan", "themes", "--themes-dir", "my-themes"]);
    match args.command {
        Command::Themes(themes) => {
            assert_eq!(themes.themes_dir, Some(PathBuf::from("my-themes")));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn render_requires_a_file() {
    assert!(CliArgs::try_parse_from(["wenyan", "render"]).is_err());
}
