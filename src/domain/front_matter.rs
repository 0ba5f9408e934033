//! YAML front matter split from the Markdown body.
//!
//! Only `title`, `description` and `cover` are meaningful. A description is
//! also surfaced in the body as a leading quote block so it renders with the
//! theme's blockquote styling.

use serde::Deserialize;
use thiserror::Error;

const FENCE: &str = "---";
const CLOSING_FENCES: [&str; 2] = ["---", "..."];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    #[error("front matter is not valid YAML: {0}")]
    Yaml(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    /// Markdown body with the description quote prepended when present.
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFrontMatter {
    title: Option<String>,
    description: Option<String>,
    cover: Option<String>,
}

/// Split a leading `---` fenced YAML block off `markdown`. Documents without
/// a complete fence are returned unchanged as the body.
pub fn split_front_matter(markdown: &str) -> Result<FrontMatter, FrontMatterError> {
    let content = markdown.strip_prefix('\u{feff}').unwrap_or(markdown);
    let mut lines = content.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return Ok(body_only(markdown));
    };
    if first.trim_end() != FENCE {
        return Ok(body_only(markdown));
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if CLOSING_FENCES.contains(&line.trim_end()) {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return assemble(yaml, body);
        }
        offset += line.len();
    }

    Ok(body_only(markdown))
}

fn assemble(yaml: &str, body: &str) -> Result<FrontMatter, FrontMatterError> {
    let raw = if yaml.trim().is_empty() {
        RawFrontMatter::default()
    } else {
        serde_yaml::from_str::<RawFrontMatter>(yaml)
            .map_err(|err| FrontMatterError::Yaml(err.to_string()))?
    };

    let title = non_empty(raw.title);
    let description = non_empty(raw.description);
    let cover = non_empty(raw.cover);

    let body = match &description {
        Some(description) => format!("> {description}\n\n{body}"),
        None => body.to_string(),
    };

    Ok(FrontMatter {
        title,
        description,
        cover,
        body,
    })
}

fn body_only(markdown: &str) -> FrontMatter {
    FrontMatter {
        body: markdown.to_string(),
        ..FrontMatter::default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
