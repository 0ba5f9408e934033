use comrak::{
    Arena, format_html,
    nodes::{AstNode, NodeHtmlBlock, NodeValue},
    options::Options,
    parse_document,
};
use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};
use syntect::{html::ClassStyle, parsing::SyntaxSet};

use crate::application::render::types::RenderError;

use super::highlight;

/// Render markdown into the HTML fragment handed to the inline engine.
pub(crate) fn render_markdown(
    markdown: &str,
    options: &Options<'static>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, options);
    rewrite_ast(root, syntax_set, class_style)?;

    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;

    wrap_heading_text(&html)
}

fn rewrite_ast<'a>(
    node: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<(), RenderError> {
    let is_image = matches!(node.data.borrow().value, NodeValue::Image(_));
    if is_image {
        process_image_node(node);
    } else if let Some((info, literal)) = extract_code_block(node) {
        let language = info.split_whitespace().next();
        let html = highlight::highlight_code(language, &literal, syntax_set, class_style)?;
        node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: html,
        });
    }

    let mut child = node.first_child();
    while let Some(next) = child {
        child = next.next_sibling();
        rewrite_ast(next, syntax_set, class_style)?;
    }

    Ok(())
}

fn process_image_node<'a>(node: &'a AstNode<'a>) {
    let (src, title) = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Image(link) => (link.url.clone(), link.title.clone()),
            _ => return,
        }
    };

    let alt = collect_inline_text(node);
    let html = match take_attribute_block(node) {
        Some(attributes) => build_attributed_image(&src, &alt, &attributes),
        None => build_image(&src, &alt, &title),
    };

    node.data.borrow_mut().value = NodeValue::HtmlInline(html);
    while let Some(child) = node.first_child() {
        child.detach();
    }
}

/// Consume a `{key=value ...}` block written directly after an image and
/// return its pairs. Text after the closing brace stays in the document.
fn take_attribute_block<'a>(node: &'a AstNode<'a>) -> Option<Vec<(String, String)>> {
    let sibling = node.next_sibling()?;
    let (inner, rest) = {
        let data = sibling.data.borrow();
        let NodeValue::Text(text) = &data.value else {
            return None;
        };
        let body = text.strip_prefix('{')?;
        let close = body.find('}')?;
        (body[..close].to_string(), body[close + 1..].to_string())
    };

    if rest.is_empty() {
        sibling.detach();
    } else {
        sibling.data.borrow_mut().value = NodeValue::Text(rest.into());
    }

    Some(parse_attribute_pairs(&inner))
}

fn parse_attribute_pairs(inner: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for token in inner.split_whitespace() {
        let mut parts = token.split('=');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let value = value
            .strip_prefix(['"', '\''])
            .unwrap_or(value);
        let value = value.strip_suffix(['"', '\'']).unwrap_or(value);
        match pairs.iter_mut().find(|(existing, _)| existing == key) {
            Some(pair) => pair.1 = value.to_string(),
            None => pairs.push((key.to_string(), value.to_string())),
        }
    }
    pairs
}

fn build_attributed_image(src: &str, alt: &str, attributes: &[(String, String)]) -> String {
    let style = attributes
        .iter()
        .map(|(key, value)| {
            if !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit()) {
                format!("{key}:{value}px")
            } else {
                format!("{key}:{value}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "<img src=\"{}\" alt=\"{}\" style=\"{}\">",
        escape_attribute(src),
        escape_attribute(alt),
        escape_attribute(&style)
    )
}

fn build_image(src: &str, alt: &str, title: &str) -> String {
    let title = if title.is_empty() { alt } else { title };
    format!(
        "<img src=\"{}\" alt=\"{}\" title=\"{}\">",
        escape_attribute(src),
        escape_attribute(alt),
        escape_attribute(title)
    )
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

// Themes style `hN span` separately from the heading box.
fn wrap_heading_text(html: &str) -> Result<String, RenderError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("h1, h2, h3, h4, h5, h6", |el| {
                el.prepend("<span>", ContentType::Html);
                el.append("</span>", ContentType::Html);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::service::{config::default_options, highlight::CLASS_STYLE};

    fn render(markdown: &str) -> String {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        render_markdown(markdown, &default_options(), &syntax_set, &CLASS_STYLE).expect("render")
    }

    #[test]
    fn headings_wrap_their_text_in_a_span() {
        let html = render("## Hello *world*");
        assert_eq!(html.trim(), "<h2><span>Hello <em>world</em></span></h2>");
    }

    #[test]
    fn image_title_defaults_to_alt() {
        let html = render("![A cat](cat.png)");
        assert!(html.contains(r#"<img src="cat.png" alt="A cat" title="A cat">"#));
    }

    #[test]
    fn image_attribute_block_becomes_style() {
        let html = render(r#"![pic](a.png){width=100 height="50%"} after"#);
        assert!(
            html.contains(r#"<img src="a.png" alt="pic" style="width:100px; height:50%">"#),
            "{html}"
        );
        assert!(html.contains(" after"));
        assert!(!html.contains('{'));
    }

    #[test]
    fn code_blocks_are_highlighted() {
        let html = render("```rust\nfn main() {}\n```\n");
        assert!(html.contains("<pre><code class=\"hljs language-rust\">"));
        assert!(html.contains("hljs-"));
    }

    #[test]
    fn attribute_pairs_skip_malformed_tokens() {
        let pairs = parse_attribute_pairs("width=10 broken =5 height='7'");
        assert_eq!(
            pairs,
            vec![
                ("width".to_string(), "10".to_string()),
                ("height".to_string(), "7".to_string())
            ]
        );
    }
}
