//! Theme stylesheet sources: the embedded bundle and user directories.

use std::path::{Path, PathBuf};

use include_dir::{Dir, include_dir};
use tracing::{debug, warn};

use crate::domain::themes::{BUILTIN_THEMES, Theme, ThemeCatalog};

use super::error::InfraError;

static THEME_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/themes");

const MAC_STYLE_PATH: &str = "platform/mac_style.css";
const USER_THEME_EXTENSION: &str = "css";

/// Catalog of the themes compiled into the binary.
pub fn builtin_catalog() -> Result<ThemeCatalog, InfraError> {
    let themes = BUILTIN_THEMES
        .iter()
        .map(|descriptor| {
            let css = embedded_stylesheet(&format!("{}.css", descriptor.id))?;
            Ok(Theme::from_descriptor(descriptor, css))
        })
        .collect::<Result<Vec<_>, InfraError>>()?;
    Ok(ThemeCatalog::new(themes))
}

/// Stylesheet that decorates code blocks with window controls.
pub fn mac_style_stylesheet() -> Result<&'static str, InfraError> {
    embedded_stylesheet(MAC_STYLE_PATH)
}

fn embedded_stylesheet(path: &str) -> Result<&'static str, InfraError> {
    THEME_ASSETS
        .get_file(path)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| InfraError::configuration(format!("embedded stylesheet `{path}` missing")))
}

/// Built-in catalog extended with every `*.css` file in `themes_dir`. A user
/// theme whose file stem matches a built-in id replaces it.
pub async fn load_catalog(themes_dir: Option<&Path>) -> Result<ThemeCatalog, InfraError> {
    let mut catalog = builtin_catalog()?;
    if let Some(dir) = themes_dir {
        for theme in load_user_themes(dir).await? {
            catalog.insert(theme);
        }
    }
    Ok(catalog)
}

/// Read every `<id>.css` file in `dir`, sorted by id.
pub async fn load_user_themes(dir: &Path) -> Result<Vec<Theme>, InfraError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                target = "infra::themes",
                dir = %dir.display(),
                "themes directory not found; using built-in themes only"
            );
            return Ok(Vec::new());
        }
        Err(err) => return Err(InfraError::read(dir, err)),
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| InfraError::read(dir, err))?
    {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(USER_THEME_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut themes = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let css = read_stylesheet(&path).await?;
        debug!(target = "infra::themes", id, path = %path.display(), "user theme loaded");
        themes.push(Theme::new(
            id,
            id,
            format!("User theme loaded from {}", path.display()),
            css,
        ));
    }
    Ok(themes)
}

pub async fn read_stylesheet(path: &Path) -> Result<String, InfraError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| InfraError::read(path, err))
}
