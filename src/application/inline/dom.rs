//! Arena-backed document tree.
//!
//! Markup is parsed with html5ever into an `RcDom` once and copied into a flat
//! arena addressed by [`NodeId`]; every later stage mutates the arena through
//! index links only. Serialization goes back through html5ever's serializer.

use std::{fmt, io};

use html5ever::{
    LocalName, Namespace, ParseOpts, QualName, parse_document,
    serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize},
    tendril::TendrilSink,
};
use cssparser::{Delimiter, ParseError, Parser, ParserInput};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::error::InlineError;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Ordered inline style declarations of one element. Writing an existing
/// property replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: Vec<(String, String)>,
}

impl StyleMap {
    /// Split a `style` attribute into declarations. Pieces without a colon
    /// or with an empty side are dropped.
    pub fn parse(text: &str) -> Self {
        let mut map = Self::default();
        for declaration in split_declarations(text) {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let property = property.trim();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                continue;
            }
            map.set(property, value);
        }
        map
    }

    pub fn set(&mut self, property: &str, value: &str) {
        let property = property.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(name, _)| *name == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((property, value.to_string())),
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value.as_str())
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(property))?;
        Some(self.entries.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Split inline style text on top-level semicolons. Strings, functions and
/// bracketed blocks are single tokens, so a `;` inside a data URI or a quoted
/// font name stays with its declaration.
fn split_declarations<'i>(text: &'i str) -> Vec<&'i str> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut pieces = Vec::new();
    while !parser.is_exhausted() {
        let start = parser.position();
        let _ = parser.parse_until_before(
            Delimiter::Semicolon,
            |piece| -> Result<(), ParseError<'i, ()>> {
                while piece.next_including_whitespace_and_comments().is_ok() {}
                Ok(())
            },
        );
        pieces.push(parser.slice_from(start));
        // Terminating semicolon, if any.
        let _ = parser.next();
    }
    pieces
}

impl fmt::Display for StyleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: QualName,
    /// Attributes in source order. The `style` attribute keeps its slot here
    /// but its content lives in `style`.
    attrs: Vec<(QualName, String)>,
    pub style: StyleMap,
}

impl ElementData {
    fn new(name: QualName, raw_attrs: Vec<(QualName, String)>) -> Self {
        let mut style = StyleMap::default();
        let attrs = raw_attrs
            .into_iter()
            .map(|(name, value)| {
                if is_style_attr(&name) {
                    style = StyleMap::parse(&value);
                    (name, String::new())
                } else {
                    (name, value)
                }
            })
            .collect();
        Self { name, attrs, style }
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| !is_style_attr(name) && name.local.as_ref() == local)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, local: &str, value: &str) {
        if local == "style" {
            self.style = StyleMap::parse(value);
            self.ensure_style_slot();
            return;
        }
        match self
            .attrs
            .iter_mut()
            .find(|(name, _)| name.local.as_ref() == local)
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attrs.push((attr_name(local), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, local: &str) -> Option<String> {
        let index = self
            .attrs
            .iter()
            .position(|(name, _)| !is_style_attr(name) && name.local.as_ref() == local)?;
        Some(self.attrs.remove(index).1)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Write one inline style property, overwriting any previous value.
    pub fn set_style(&mut self, property: &str, value: &str) {
        self.style.set(property, value);
        self.ensure_style_slot();
    }

    pub fn replace_style(&mut self, style: StyleMap) {
        self.style = style;
        self.ensure_style_slot();
    }

    fn ensure_style_slot(&mut self) {
        if !self.attrs.iter().any(|(name, _)| is_style_attr(name)) {
            self.attrs.push((attr_name("style"), String::new()));
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Mutable element tree owned by one conversion call.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Parse `html` wrapped in a root `section` element carrying `root_id`.
    pub fn wrap_fragment(html: &str, root_id: &str) -> Self {
        let mut document = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = document.create_element("section");
        if let Some(section) = document.element_mut(root) {
            section.set_attr("id", root_id);
        }
        document.root = root;
        document.append_markup(root, html);
        document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element siblings preceding `id`, nearest first.
    pub fn previous_element_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let siblings = self.parent(id).map(|p| self.children(p)).unwrap_or(&[]);
        let position = siblings.iter().position(|&s| s == id).unwrap_or(0);
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .filter(|&s| self.element(s).is_some())
    }

    /// Element children of `id`'s parent in document order, `id` included.
    pub fn element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|&s| self.element(s).is_some())
                .collect(),
            None => vec![id],
        }
    }

    /// All descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.element(node).is_some())
            .collect()
    }

    /// Descendant elements of `id` whose local name is `tag`.
    pub fn elements_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendant_elements(id)
            .into_iter()
            .filter(|&node| {
                self.element(node)
                    .is_some_and(|el| el.local_name().eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag));
        self.push(NodeKind::Element(ElementData::new(name, Vec::new())))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, 0, child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Put `replacement` where `target` was and detach `target`.
    pub fn replace_with(&mut self, target: NodeId, replacement: NodeId) {
        let Some(parent) = self.parent(target) else {
            return;
        };
        self.detach(replacement);
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == target)
            .unwrap_or(self.children(parent).len());
        self.detach(target);
        self.insert_child(parent, index, replacement);
    }

    /// Insert `node` immediately before `reference` under the same parent.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == reference)
            .unwrap_or(self.children(parent).len());
        self.insert_child(parent, index, node);
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Parse `markup` as body content and append the resulting nodes to
    /// `parent`.
    pub fn append_markup(&mut self, parent: NodeId, markup: &str) {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(markup);
        if let Some(body) = find_body(&dom.document) {
            for child in body.children.borrow().iter() {
                if let Some(id) = self.import(child) {
                    self.append_child(parent, id);
                }
            }
        }
    }

    /// Serialize `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> Result<String, InlineError> {
        self.serialize_node(id, TraversalScope::IncludeNode)
    }

    pub fn inner_html(&self, id: NodeId) -> Result<String, InlineError> {
        self.serialize_node(id, TraversalScope::ChildrenOnly(None))
    }

    fn serialize_node(&self, id: NodeId, scope: TraversalScope) -> Result<String, InlineError> {
        let mut buffer = Vec::new();
        let opts = SerializeOpts {
            traversal_scope: scope,
            ..Default::default()
        };
        serialize(&mut buffer, &NodeRef { doc: self, id }, opts)
            .map_err(|err| InlineError::Serialize(err.to_string()))?;
        String::from_utf8(buffer).map_err(|err| InlineError::Serialize(err.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    fn import(&mut self, handle: &Handle) -> Option<NodeId> {
        let id = match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let attrs = attrs
                    .borrow()
                    .iter()
                    .map(|attr| (attr.name.clone(), attr.value.to_string()))
                    .collect();
                self.push(NodeKind::Element(ElementData::new(name.clone(), attrs)))
            }
            NodeData::Text { contents } => self.push(NodeKind::Text(contents.borrow().to_string())),
            NodeData::Comment { contents } => self.push(NodeKind::Comment(contents.to_string())),
            _ => return None,
        };

        for child in handle.children.borrow().iter() {
            if let Some(child_id) = self.import(child) {
                self.append_child(id, child_id);
            }
        }
        Some(id)
    }
}

fn find_body(handle: &Handle) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if let NodeData::Element { name, .. } = &child.data {
            if name.local.as_ref() == "body" {
                return Some(child.clone());
            }
            if let Some(found) = find_body(child) {
                return Some(found);
            }
        }
    }
    None
}

fn is_style_attr(name: &QualName) -> bool {
    name.ns.is_empty() && name.local.as_ref() == "style"
}

fn attr_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(local))
}

struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl Serialize for NodeRef<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let node = &self.doc.nodes[self.id.0];
        match (&node.kind, traversal_scope) {
            (NodeKind::Element(data), TraversalScope::IncludeNode) => {
                let style_text = data.style.to_string();
                let attrs = data.attrs.iter().filter_map(|(name, value)| {
                    if is_style_attr(name) {
                        (!style_text.is_empty()).then_some((name, style_text.as_str()))
                    } else {
                        Some((name, value.as_str()))
                    }
                });
                serializer.start_elem(data.name.clone(), attrs)?;
                self.serialize_children(serializer)?;
                serializer.end_elem(data.name.clone())
            }
            (NodeKind::Element(_), TraversalScope::ChildrenOnly(_)) => {
                self.serialize_children(serializer)
            }
            (NodeKind::Text(text), _) => serializer.write_text(text),
            (NodeKind::Comment(text), _) => serializer.write_comment(text),
        }
    }
}

impl NodeRef<'_> {
    fn serialize_children<S: Serializer>(&self, serializer: &mut S) -> io::Result<()> {
        for &child in &self.doc.nodes[self.id.0].children {
            NodeRef { doc: self.doc, id: child }
                .serialize(serializer, TraversalScope::IncludeNode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_fragment_in_root_section() {
        let doc = Document::wrap_fragment("<p>Hello <b>world</b></p>", "wenyan");
        let html = doc.outer_html(doc.root()).expect("serialize");
        assert_eq!(
            html,
            "<section id=\"wenyan\"><p>Hello <b>world</b></p></section>"
        );
    }

    #[test]
    fn existing_style_attribute_keeps_its_slot() {
        let mut doc = Document::wrap_fragment(
            "<img src=\"a.png\" style=\"width:100px; height:200px\" alt=\"x\">",
            "wenyan",
        );
        let img = doc.elements_by_tag(doc.root(), "img")[0];
        doc.element_mut(img)
            .expect("img element")
            .set_style("width", "50px");
        let html = doc.inner_html(doc.root()).expect("serialize");
        assert_eq!(
            html,
            "<img src=\"a.png\" style=\"width: 50px; height: 200px\" alt=\"x\">"
        );
    }

    #[test]
    fn style_parse_ignores_semicolons_inside_values() {
        let style = StyleMap::parse(
            "background: url(data:image/png;base64,AAAA) no-repeat; font-family: \"A;B\", serif;;color:red",
        );
        assert_eq!(
            style.to_string(),
            "background: url(data:image/png;base64,AAAA) no-repeat; font-family: \"A;B\", serif; color: red"
        );
    }

    #[test]
    fn style_attribute_with_data_uri_round_trips() {
        let doc = Document::wrap_fragment(
            "<div style=\"background: url(data:image/png;base64,AAAA) no-repeat\">x</div>",
            "wenyan",
        );
        assert_eq!(
            doc.inner_html(doc.root()).expect("serialize"),
            "<div style=\"background: url(data:image/png;base64,AAAA) no-repeat\">x</div>"
        );
    }

    #[test]
    fn style_attribute_is_appended_when_first_written() {
        let mut doc = Document::wrap_fragment("<h1 class=\"t\">T</h1>", "wenyan");
        let h1 = doc.elements_by_tag(doc.root(), "h1")[0];
        doc.element_mut(h1)
            .expect("h1 element")
            .set_style("color", "red");
        assert_eq!(
            doc.inner_html(doc.root()).expect("serialize"),
            "<h1 class=\"t\" style=\"color: red\">T</h1>"
        );
    }

    #[test]
    fn replace_with_keeps_position() {
        let mut doc = Document::wrap_fragment("<p>a<i>b</i>c</p>", "wenyan");
        let i = doc.elements_by_tag(doc.root(), "i")[0];
        let em = doc.create_element("em");
        let text = doc.create_text("B");
        doc.append_child(em, text);
        doc.replace_with(i, em);
        assert_eq!(
            doc.inner_html(doc.root()).expect("serialize"),
            "<p>a<em>B</em>c</p>"
        );
    }

    #[test]
    fn non_breaking_spaces_serialize_as_entities() {
        let mut doc = Document::wrap_fragment("", "wenyan");
        let root = doc.root();
        let text = doc.create_text("a\u{a0}\u{a0}b");
        doc.append_child(root, text);
        assert_eq!(doc.inner_html(root).expect("serialize"), "a&nbsp;&nbsp;b");
    }

    #[test]
    fn style_map_overwrites_in_place() {
        let mut style = StyleMap::parse("color: red; margin: 0");
        style.set("COLOR", "blue");
        assert_eq!(style.to_string(), "color: blue; margin: 0");
        assert_eq!(style.get("margin"), Some("0"));
    }
}
