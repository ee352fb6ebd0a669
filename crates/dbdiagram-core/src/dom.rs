//! An owned element tree.
//!
//! The host document and the hidden measurement surface are both modelled as
//! trees of [`Element`]s. Attributes keep their insertion order so that
//! serialized output and attribute iteration are deterministic.

use indexmap::IndexMap;

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with a tag name, ordered attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Returns the tag name (local name, without namespace prefix).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// Names of every attribute currently set, in insertion order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Iterates over the element children, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn append_child(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    pub fn append_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Replaces every child with a single text node.
    ///
    /// An empty string leaves the element without children.
    pub fn set_text_content(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Depth-first search for the first element (including `self`) with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.child_elements()
            .find_map(|element| element.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.child_elements_mut()
            .find_map(|element| element.find_by_id_mut(id))
    }

    /// Collects every descendant (including `self`) with the given tag name, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for element in self.child_elements() {
            element.collect_named(name, out);
        }
    }

    /// Returns the first direct or nested child with the given tag name.
    pub fn first_named_mut(&mut self, name: &str) -> Option<&mut Element> {
        if self.name == name {
            return Some(self);
        }
        self.child_elements_mut()
            .find_map(|element| element.first_named_mut(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Element {
        let mut root = Element::new("svg");
        let mut defs = Element::new("defs");
        let mut symbol = Element::new("symbol");
        symbol.set_attribute("id", "pk");
        defs.append_child(symbol);
        root.append_child(defs);

        let mut group = Element::new("g");
        group.set_attribute("id", "table");
        let mut text = Element::new("text");
        text.append_text("Users");
        group.append_child(text);
        root.append_child(group);
        root
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut element = Element::new("text");
        element.set_attribute("visibility", "hidden");
        element.set_attribute("font-size", "12px");
        element.set_attribute("font-family", "Arial");

        let names: Vec<_> = element.attribute_names().collect();
        assert_eq!(names, ["visibility", "font-size", "font-family"]);

        assert_eq!(element.remove_attribute("font-size"), Some("12px".into()));
        let names: Vec<_> = element.attribute_names().collect();
        assert_eq!(names, ["visibility", "font-family"]);
    }

    #[test]
    fn test_set_attribute_overwrites() {
        let mut element = Element::new("rect");
        element.set_attribute("width", "1");
        element.set_attribute("width", "2");
        assert_eq!(element.attribute("width"), Some("2"));
        assert_eq!(element.attribute_names().count(), 1);
    }

    #[test]
    fn test_find_by_id() {
        let tree = sample_tree();
        assert_eq!(tree.find_by_id("pk").map(Element::name), Some("symbol"));
        assert_eq!(tree.find_by_id("table").map(Element::name), Some("g"));
        assert!(tree.find_by_id("missing").is_none());
    }

    #[test]
    fn test_find_by_id_mut() {
        let mut tree = sample_tree();
        tree.find_by_id_mut("pk")
            .expect("symbol exists")
            .set_attribute("width", "16");
        assert_eq!(
            tree.find_by_id("pk").and_then(|e| e.attribute("width")),
            Some("16")
        );
    }

    #[test]
    fn test_text_content() {
        let tree = sample_tree();
        assert_eq!(tree.text_content(), "Users");

        let mut text = Element::new("text");
        text.set_text_content("DUMP");
        assert_eq!(text.text_content(), "DUMP");
        text.set_text_content("");
        assert!(text.children().is_empty());
    }

    #[test]
    fn test_descendants_named() {
        let tree = sample_tree();
        assert_eq!(tree.descendants_named("symbol").len(), 1);
        assert_eq!(tree.descendants_named("svg").len(), 1);
        assert!(tree.descendants_named("style").is_empty());
    }

    #[test]
    fn test_first_named_mut() {
        let mut tree = sample_tree();
        let text = tree.first_named_mut("text").expect("text exists");
        text.set_attribute("x", "4");
        assert_eq!(tree.descendants_named("text")[0].attribute("x"), Some("4"));
    }
}
