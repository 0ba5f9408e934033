//! Theme catalog: stylesheet identity plus lookup rules.

use serde::Serialize;

pub const DEFAULT_THEME_ID: &str = "default";

/// Static description of a theme shipped with the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const BUILTIN_THEMES: [ThemeDescriptor; 4] = [
    ThemeDescriptor {
        id: "default",
        name: "Default",
        description: "A clean, classic layout ideal for long-form reading.",
    },
    ThemeDescriptor {
        id: "orangeheart",
        name: "OrangeHeart",
        description: "A vibrant and elegant theme in warm orange tones.",
    },
    ThemeDescriptor {
        id: "lapis",
        name: "Lapis",
        description: "A minimal and refreshing theme in cool blue tones.",
    },
    ThemeDescriptor {
        id: "purple",
        name: "Purple",
        description: "Clean and minimalist, with a subtle purple accent.",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub css: String,
}

impl Theme {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        css: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            css: css.into(),
        }
    }

    pub fn from_descriptor(descriptor: &ThemeDescriptor, css: impl Into<String>) -> Self {
        Self::new(descriptor.id, descriptor.name, descriptor.description, css)
    }
}

/// Ordered set of themes keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ThemeCatalog {
    themes: Vec<Theme>,
}

impl ThemeCatalog {
    pub fn new(themes: impl IntoIterator<Item = Theme>) -> Self {
        let mut catalog = Self::default();
        for theme in themes {
            catalog.insert(theme);
        }
        catalog
    }

    /// Add `theme`, replacing any theme that already uses its id.
    pub fn insert(&mut self, theme: Theme) {
        match self.themes.iter_mut().find(|t| t.id == theme.id) {
            Some(existing) => *existing = theme,
            None => self.themes.push(theme),
        }
    }

    /// Resolve a user-supplied theme key. Ids match exactly, names match
    /// case-insensitively and a blank key selects the default theme.
    pub fn find(&self, key: &str) -> Option<&Theme> {
        let key = key.trim();
        let key = if key.is_empty() { DEFAULT_THEME_ID } else { key };
        self.themes
            .iter()
            .find(|theme| theme.id == key)
            .or_else(|| {
                self.themes
                    .iter()
                    .find(|theme| theme.name.eq_ignore_ascii_case(key))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Theme> {
        self.themes.iter()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ThemeCatalog {
        ThemeCatalog::new(
            BUILTIN_THEMES
                .iter()
                .map(|descriptor| Theme::from_descriptor(descriptor, format!("/* {} */", descriptor.id))),
        )
    }

    #[test]
    fn finds_by_id_then_name() {
        let catalog = catalog();
        assert_eq!(catalog.find("lapis").map(|t| t.id.as_str()), Some("lapis"));
        assert_eq!(
            catalog.find("OrangeHeart").map(|t| t.id.as_str()),
            Some("orangeheart")
        );
        assert_eq!(
            catalog.find("PURPLE").map(|t| t.id.as_str()),
            Some("purple")
        );
    }

    #[test]
    fn blank_key_selects_default() {
        let catalog = catalog();
        assert_eq!(catalog.find("  ").map(|t| t.id.as_str()), Some(DEFAULT_THEME_ID));
    }

    #[test]
    fn unknown_key_is_none() {
        assert!(catalog().find("rainbow").is_none());
    }

    #[test]
    fn insert_replaces_same_id() {
        let mut catalog = catalog();
        catalog.insert(Theme::new("lapis", "Lapis", "override", "h1 { color: red; }"));
        assert_eq!(catalog.len(), BUILTIN_THEMES.len());
        assert_eq!(
            catalog.find("lapis").map(|t| t.css.as_str()),
            Some("h1 { color: red; }")
        );
    }

    #[test]
    fn listing_omits_stylesheet() {
        let theme = Theme::new("a", "A", "desc", "p { color: red; }");
        let json = serde_json::to_string(&theme).expect("serialize");
        assert_eq!(json, r#"{"id":"a","name":"A","description":"desc"}"#);
    }
}
