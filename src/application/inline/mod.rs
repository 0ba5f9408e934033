//! Stylesheet-to-inline-style projection for surfaces without CSS support.
//!
//! One [`convert`] call owns its own document arena and rule sequence; nothing
//! is shared between calls.

mod cascade;
mod dom;
mod error;
mod layout;
mod pseudo;
mod selector;
mod stylesheet;
mod variables;

use tracing::debug;

pub use cascade::inline_styles;
pub use dom::{Document, ElementData, NodeId, NodeKind, StyleMap};
pub use error::InlineError;
pub use layout::{PROVIDER, PROVIDER_ATTR, finish, normalize_code_blocks, normalize_math};
pub use pseudo::{PSEUDO_TAGS, materialize_pseudo_elements};
pub use selector::{Selector, select};
pub use stylesheet::{Declaration, Rule, Stylesheet};
pub use variables::{MONOSPACE_FONT, SANS_SERIF_FONT, VariableTable, resolve_variables};

/// Id of the wrapping container every converted document lives in.
pub const ROOT_ID: &str = "wenyan";
/// Selector that addresses the wrapping container itself.
pub const ROOT_SELECTOR: &str = "#wenyan";

/// Convert rendered `html` into a self-contained fragment whose styling from
/// `stylesheets` is carried entirely by inline attributes. Later stylesheets
/// take precedence over earlier ones.
pub fn convert<S: AsRef<str>>(html: &str, stylesheets: &[S]) -> Result<String, InlineError> {
    let sheets = stylesheets
        .iter()
        .map(|css| Stylesheet::parse(&resolve_variables(css.as_ref())))
        .collect::<Result<Vec<_>, _>>()?;
    let sheet = Stylesheet::concat(sheets);

    let mut doc = Document::wrap_fragment(html, ROOT_ID);
    inline_styles(&mut doc, &sheet);
    materialize_pseudo_elements(&mut doc, &sheet, &PSEUDO_TAGS);
    normalize_math(&mut doc)?;
    normalize_code_blocks(&mut doc);
    let output = finish(&mut doc)?;

    debug!(
        target = "application::inline",
        rules = sheet.len(),
        bytes = output.len(),
        "inline conversion finished"
    );
    Ok(output)
}
