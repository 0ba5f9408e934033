//! `::before` / `::after` materialization.
//!
//! The publishing surface drops pseudo-element rules, so their visible effect
//! is rebuilt as a real `section` child carrying the content and the
//! remaining declarations inline.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use cssparser::{Parser, ParserInput, Token};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::{
    dom::{Document, NodeId, StyleMap},
    stylesheet::Stylesheet,
};

/// Block tags that may carry materialized pseudo-elements.
pub const PSEUDO_TAGS: [&str; 8] = ["h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre"];

const PSEUDO_NODE_TAG: &str = "section";
const IMAGE_STYLE: &str = "vertical-align: top";

static SVG_UTF8: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)data:image/svg\+xml;(?:charset=)?utf-?8,(.*</svg>)")
        .expect("utf8 svg pattern is valid")
});

static SVG_BASE64: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"data:image/svg\+xml;base64,([^"')]*)["']?\)"#)
        .expect("base64 svg pattern is valid")
});

static HTTP_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["']?(https?[^"')]*)["']?\)"#).expect("http url pattern is valid")
});

/// Declarations gathered for one tag's pseudo-elements.
#[derive(Debug, Default)]
struct PseudoDeclarations {
    before: StyleMap,
    after: StyleMap,
}

impl PseudoDeclarations {
    fn collect(sheet: &Stylesheet, tag: &str) -> Self {
        let after_marker = format!("{tag}::after");
        let before_marker = format!("{tag}::before");
        let mut collected = Self::default();

        for rule in sheet.rules() {
            let text = rule.selector_text();
            let target = if text.contains(&after_marker) {
                &mut collected.after
            } else if text.contains(&before_marker) {
                &mut collected.before
            } else {
                continue;
            };
            for declaration in &rule.declarations {
                target.set(&declaration.property, &declaration.value);
            }
        }

        collected
    }
}

#[derive(Debug, PartialEq, Eq)]
enum UrlPayload {
    Markup(String),
    Image(String),
}

/// Insert synthetic nodes for every `<tag>::before` / `<tag>::after` rule
/// that applies to an element of one of `tags`.
pub fn materialize_pseudo_elements(doc: &mut Document, sheet: &Stylesheet, tags: &[&str]) {
    let root = doc.root();
    let mut inserted = 0usize;

    for tag in tags {
        let declarations = PseudoDeclarations::collect(sheet, tag);
        if declarations.before.is_empty() && declarations.after.is_empty() {
            continue;
        }

        for element in doc.elements_by_tag(root, tag) {
            if !declarations.after.is_empty() {
                let node = build_pseudo_node(doc, &declarations.after);
                doc.append_child(element, node);
                inserted += 1;
            }
            if !declarations.before.is_empty() {
                let node = build_pseudo_node(doc, &declarations.before);
                doc.prepend_child(element, node);
                inserted += 1;
            }
        }
    }

    debug!(
        target = "application::inline::pseudo",
        inserted, "pseudo-elements materialized"
    );
}

fn build_pseudo_node(doc: &mut Document, declarations: &StyleMap) -> NodeId {
    let node = doc.create_element(PSEUDO_NODE_TAG);
    let mut remaining = declarations.clone();

    if let Some(content) = remaining.remove("content") {
        let text = content_text(&content);
        if !text.is_empty() {
            let text = doc.create_text(text);
            doc.append_child(node, text);
        }
    }

    let mut style = StyleMap::default();
    for (property, value) in remaining.iter() {
        let payload = value
            .contains("url(")
            .then(|| classify_url(value))
            .flatten();
        match payload {
            Some(UrlPayload::Markup(markup)) => doc.append_markup(node, &markup),
            Some(UrlPayload::Image(src)) => {
                let image = doc.create_element("img");
                if let Some(img) = doc.element_mut(image) {
                    img.set_attr("src", &src);
                    img.set_attr("style", IMAGE_STYLE);
                }
                doc.append_child(node, image);
            }
            None => style.set(property, value),
        }
    }

    if !style.is_empty()
        && let Some(element) = doc.element_mut(node)
    {
        element.replace_style(style);
    }
    node
}

/// Text of a `content` value: quoted strings are unescaped and joined,
/// `none`/`normal` yield nothing, anything else loses its quote characters.
fn content_text(raw: &str) -> String {
    let mut input = ParserInput::new(raw);
    let mut parser = Parser::new(&mut input);
    let mut text = String::new();

    while let Ok(token) = parser.next() {
        match token {
            Token::QuotedString(value) => text.push_str(value),
            Token::Ident(keyword)
                if keyword.eq_ignore_ascii_case("none")
                    || keyword.eq_ignore_ascii_case("normal") => {}
            _ => return raw.replace(['\'', '"'], ""),
        }
    }
    text
}

fn classify_url(value: &str) -> Option<UrlPayload> {
    let decoded = percent_decode_str(value).decode_utf8_lossy();
    if let Some(captures) = SVG_UTF8.captures(&decoded) {
        return Some(UrlPayload::Markup(captures[1].to_string()));
    }

    if let Some(captures) = SVG_BASE64.captures(value) {
        return match STANDARD
            .decode(captures[1].trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        {
            Some(markup) => Some(UrlPayload::Markup(markup)),
            None => {
                trace!(
                    target = "application::inline::pseudo",
                    "undecodable base64 svg left in style"
                );
                None
            }
        };
    }

    let captures = HTTP_URL.captures(value)?;
    let candidate = &captures[1];
    match Url::parse(candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Some(UrlPayload::Image(candidate.to_string()))
        }
        _ => None,
    }
}
