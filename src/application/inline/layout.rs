//! Fixed post-inlining rewrites for equations and code blocks, plus the final
//! serialization of the root container.

use tracing::debug;

use super::{
    dom::{Document, NodeId, NodeKind, StyleMap},
    error::InlineError,
};

pub const PROVIDER_ATTR: &str = "data-provider";
pub const PROVIDER: &str = "WenYan";

const EQUATION_CONTAINER: &str = "mjx-container";
const BLOCK_EQUATION_CLASS: &str = "block-equation";
const BLOCK_EQUATION_STYLE: &str = "text-align: center; margin-bottom: 1rem";
const SOLID_STROKE_CLASS: &str = "class=\"mjx-solid\"";
const SOLID_STROKE_ATTRS: &str = "fill=\"none\" stroke-width=\"70\"";
const NBSP: char = '\u{a0}';

/// Replace every equation container with its inner `svg`, moving the
/// graphic's `width`/`height` attributes into its inline style.
pub fn normalize_math(doc: &mut Document) -> Result<(), InlineError> {
    let root = doc.root();
    let containers = doc.elements_by_tag(root, EQUATION_CONTAINER);

    for container in &containers {
        let container = *container;
        let svg = doc
            .elements_by_tag(container, "svg")
            .first()
            .copied()
            .ok_or(InlineError::MissingEquationGraphic)?;

        if let Some(graphic) = doc.element_mut(svg) {
            for dimension in ["width", "height"] {
                if let Some(value) = graphic.remove_attr(dimension) {
                    graphic.set_style(dimension, &pixel_length(&value));
                }
            }
        }

        let parent = doc.parent(container);
        doc.replace_with(container, svg);

        if let Some(parent) = parent
            && let Some(wrapper) = doc.element_mut(parent)
            && wrapper.has_class(BLOCK_EQUATION_CLASS)
        {
            wrapper.replace_style(StyleMap::parse(BLOCK_EQUATION_STYLE));
        }
    }

    debug!(
        target = "application::inline::layout",
        equations = containers.len(),
        "equations normalized"
    );
    Ok(())
}

/// Make whitespace inside `pre code` survive a collapsing renderer: line
/// feeds become `<br>` elements and every other whitespace character a
/// non-breaking space. Existing markup inside the code is kept.
pub fn normalize_code_blocks(doc: &mut Document) {
    let root = doc.root();
    let blocks: Vec<_> = doc
        .elements_by_tag(root, "code")
        .into_iter()
        .filter(|&code| has_pre_ancestor(doc, code))
        .collect();

    for code in &blocks {
        let texts: Vec<_> = doc
            .descendants(*code)
            .into_iter()
            .filter_map(|node| match doc.kind(node) {
                NodeKind::Text(text) => Some((node, text.clone())),
                _ => None,
            })
            .collect();

        for (node, text) in texts {
            for (index, line) in text.split('\n').enumerate() {
                if index > 0 {
                    let br = doc.create_element("br");
                    doc.insert_before(node, br);
                }
                if !line.is_empty() {
                    let preserved: String = line
                        .chars()
                        .map(|c| if c.is_whitespace() { NBSP } else { c })
                        .collect();
                    let piece = doc.create_text(preserved);
                    doc.insert_before(node, piece);
                }
            }
            doc.detach(node);
        }
    }

    debug!(
        target = "application::inline::layout",
        blocks = blocks.len(),
        "code blocks normalized"
    );
}

/// Stamp the provenance attribute and serialize the root container.
pub fn finish(doc: &mut Document) -> Result<String, InlineError> {
    let root = doc.root();
    if let Some(container) = doc.element_mut(root) {
        container.set_attr(PROVIDER_ATTR, PROVIDER);
    }
    let html = doc.outer_html(root)?;
    Ok(html.replace(SOLID_STROKE_CLASS, SOLID_STROKE_ATTRS))
}

fn has_pre_ancestor(doc: &Document, node: NodeId) -> bool {
    let mut current = doc.parent(node);
    while let Some(ancestor) = current {
        if doc
            .element(ancestor)
            .is_some_and(|el| el.local_name() == "pre")
        {
            return true;
        }
        current = doc.parent(ancestor);
    }
    false
}

fn pixel_length(value: &str) -> String {
    let value = value.trim();
    if !value.is_empty() && value.parse::<f64>().is_ok() {
        format!("{value}px")
    } else {
        value.to_string()
    }
}
