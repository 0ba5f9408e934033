//! Order-based projection of stylesheet rules onto inline styles.
//!
//! There is no specificity: rules are applied in sequence and each
//! declaration overwrites, so the last matching rule wins per property.

use tracing::{debug, trace};

use super::{
    ROOT_SELECTOR,
    dom::Document,
    selector::{Selector, select},
    stylesheet::Stylesheet,
};

pub fn inline_styles(doc: &mut Document, sheet: &Stylesheet) {
    let root = doc.root();
    let mut applied = 0usize;

    for rule in sheet.rules() {
        for selector_text in &rule.selectors {
            let targets = if selector_text == ROOT_SELECTOR {
                vec![root]
            } else {
                match Selector::parse(selector_text) {
                    Some(selector) => select(doc, root, &selector),
                    None => {
                        debug!(
                            target = "application::inline::cascade",
                            selector = %selector_text,
                            "selector not inlinable; skipped"
                        );
                        continue;
                    }
                }
            };

            if targets.is_empty() {
                trace!(
                    target = "application::inline::cascade",
                    selector = %selector_text,
                    "selector matched nothing"
                );
                continue;
            }

            for target in targets {
                let Some(element) = doc.element_mut(target) else {
                    continue;
                };
                for declaration in &rule.declarations {
                    element.set_style(&declaration.property, &declaration.value);
                }
                applied += 1;
            }
        }
    }

    debug!(
        target = "application::inline::cascade",
        rules = sheet.len(),
        applied,
        "inline styles applied"
    );
}
