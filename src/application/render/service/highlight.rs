use syntect::{
    highlighting::ThemeSet,
    html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

/// Class prefix shared by highlighted spans and the generated stylesheet.
pub(crate) const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hljs-" };

const PLAIN_LANGUAGE: &str = "plaintext";

pub(crate) fn highlight_code(
    language: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let lang_token = language.filter(|l| !l.is_empty()).unwrap_or(PLAIN_LANGUAGE);
    let syntax =
        find_syntax(syntax_set, lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: lang_token.to_string(),
                message: err.to_string(),
            })?;
    }

    let highlighted = trim_final_newline(generator.finalize());
    Ok(format!(
        "<pre><code class=\"hljs language-{}\">{highlighted}</code></pre>",
        escape_class(&lang_token.to_ascii_lowercase())
    ))
}

/// Stylesheet for the highlighted spans, generated from a bundled syntect
/// theme.
pub(crate) fn highlight_stylesheet(theme_name: &str) -> Result<String, RenderError> {
    let themes = ThemeSet::load_defaults();
    let theme = themes
        .themes
        .get(theme_name)
        .ok_or_else(|| RenderError::Highlighting {
            language: PLAIN_LANGUAGE.to_string(),
            message: format!("unknown highlight theme `{theme_name}`"),
        })?;
    css_for_theme_with_class_style(theme, CLASS_STYLE).map_err(|err| {
        RenderError::Highlighting {
            language: PLAIN_LANGUAGE.to_string(),
            message: err.to_string(),
        }
    })
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

// The generator closes open spans after the last newline; drop that newline
// so the block does not end in an empty line.
fn trim_final_newline(mut html: String) -> String {
    if let Some(index) = html.rfind('\n')
        && html[index + 1..].replace("</span>", "").is_empty()
    {
        html.remove(index);
    }
    html
}

fn escape_class(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_code_with_language_classes() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let html = highlight_code(Some("Rust"), "let x = 1;\n", &syntax_set, &CLASS_STYLE)
            .expect("highlight");
        assert!(html.starts_with("<pre><code class=\"hljs language-rust\">"));
        assert!(html.contains("hljs-"));
        assert!(html.ends_with("</code></pre>"));
        assert!(!html.contains("\n</code>"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let html = highlight_code(Some("nope"), "a < b", &syntax_set, &CLASS_STYLE)
            .expect("highlight");
        assert!(html.contains("a &lt; b"));
        assert!(html.contains("language-nope"));
    }

    #[test]
    fn stylesheet_uses_prefixed_classes() {
        let css = highlight_stylesheet("Solarized (light)").expect("stylesheet");
        assert!(css.contains(".hljs-"));
        assert!(highlight_stylesheet("No Such Theme").is_err());
    }

    #[test]
    fn trailing_newline_before_closing_spans_is_dropped() {
        assert_eq!(
            trim_final_newline("<span>a\n</span></span>".to_string()),
            "<span>a</span></span>"
        );
        assert_eq!(trim_final_newline("a\nb".to_string()), "a\nb");
    }
}
