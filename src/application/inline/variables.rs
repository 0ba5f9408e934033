//! CSS custom property expansion.
//!
//! Themes declare their palette and font stacks as custom properties on
//! `:root` and reference them through `var(--name)`. The target surface does
//! not understand either, so every reference is replaced by its literal value
//! and the `:root` block is dropped before the stylesheet is parsed.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

pub const SANS_SERIF_FONT: &str = "sans-serif-font";
pub const MONOSPACE_FONT: &str = "monospace-font";

const DEFAULT_SANS_SERIF: &str = "ui-sans-serif, system-ui, 'Apple Color Emoji', 'Segoe UI', 'Segoe UI Symbol', 'Noto Sans', 'Roboto', sans-serif";
const DEFAULT_MONOSPACE: &str = "ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, 'Liberation Mono', 'Roboto Mono', 'Courier New', 'Microsoft YaHei', monospace";

// Value capture accepts one level of nested parentheses so `calc(var(--a) * 2)`
// is taken whole instead of stopping at the inner `;`-free boundary.
static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"--([a-zA-Z0-9\-]+):\s*([^;()]*\((?:[^()]*|\([^()]*\))*\)[^;()]*|[^;]+);",
    )
    .expect("variable definition pattern is valid")
});

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"var\(--([a-zA-Z0-9\-]+)\)").expect("variable reference pattern is valid")
});

static ROOT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":root\s*\{[^}]*\}").expect("root block pattern is valid"));

/// Name → literal value table built from one stylesheet.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    values: HashMap<String, String>,
}

impl VariableTable {
    /// Collect every `--name: value;` definition in `css`. Later definitions
    /// of the same name replace earlier ones.
    pub fn collect(css: &str) -> Self {
        let mut values = HashMap::new();
        for captures in DEFINITION.captures_iter(css) {
            let name = captures[1].to_string();
            let value = captures[2].trim().replace('\n', "");
            values.insert(name, value);
        }

        values
            .entry(SANS_SERIF_FONT.to_string())
            .or_insert_with(|| DEFAULT_SANS_SERIF.to_string());
        values
            .entry(MONOSPACE_FONT.to_string())
            .or_insert_with(|| DEFAULT_MONOSPACE.to_string());

        let mut table = Self { values };
        table.resolve_all();
        table
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn resolve_all(&mut self) {
        let mut names: Vec<String> = self.values.keys().cloned().collect();
        names.sort();
        for name in names {
            let Some(raw) = self.values.get(&name).cloned() else {
                continue;
            };
            let mut visiting = HashSet::new();
            let resolved = self.resolve_value(&raw, &mut visiting);
            self.values.insert(name, resolved);
        }
    }

    /// Substitute nested references in `value`. A value already on the
    /// current resolution path is returned as-is, which terminates cycles
    /// with the unresolved text.
    fn resolve_value(&self, value: &str, visiting: &mut HashSet<String>) -> String {
        if visiting.contains(value) {
            trace!(
                target = "application::inline::variables",
                value,
                "cyclic variable reference left unresolved"
            );
            return value.to_string();
        }
        visiting.insert(value.to_string());

        let resolved = REFERENCE
            .replace_all(value, |captures: &Captures<'_>| {
                match self.values.get(&captures[1]) {
                    Some(next) => self.resolve_value(next, visiting),
                    None => captures[0].to_string(),
                }
            })
            .into_owned();

        visiting.remove(value);
        resolved
    }
}

/// Replace every `var(--name)` in `css` with its resolved literal value and
/// strip `:root { ... }` blocks. Undefined references are kept verbatim.
pub fn resolve_variables(css: &str) -> String {
    let table = VariableTable::collect(css);

    let substituted = REFERENCE.replace_all(css, |captures: &Captures<'_>| {
        match table.get(&captures[1]) {
            Some(value) => value.to_string(),
            None => captures[0].to_string(),
        }
    });

    ROOT_BLOCK.replace_all(&substituted, "").into_owned()
}
