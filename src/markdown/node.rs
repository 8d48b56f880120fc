//! Owned HTML tree consumed by the Markdown converter.
//!
//! The converter never touches the parser's own DOM: [`parse_fragment`]
//! copies the html5ever tree produced by `scraper` into this small owned
//! structure. Only elements and text survive the copy; comments, doctypes
//! and processing instructions carry no content worth converting.
//!
//! One tree is built per conversion call and dropped afterwards, so nothing
//! is shared between records.
//!
//! The copy is at most [`MAX_DEPTH`] elements deep. Elements nested below
//! that are flattened to their text, which keeps every walk over the owned
//! tree bounded no matter how deeply the input nests.

use scraper::{ElementRef, Html, Node as ScraperNode};

/// Element nesting kept by [`parse_fragment`], the synthetic root included.
pub const MAX_DEPTH: usize = 128;

/// A node of the parsed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Raw character data, entities already decoded.
    Text(String),
    /// An element with its attributes and children.
    Element(Element),
}

impl Node {
    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// The element behind this node, if it is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Element(el) => el.text_content(),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// How far below an element a search may look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    /// Direct children only.
    Children,
    /// The whole subtree, in document order.
    Subtree,
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element. Tag names are stored lowercase.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Builder-style text child append.
    pub fn with_text(self, text: &str) -> Self {
        self.with_child(Node::text(text))
    }

    /// Append a child node.
    pub fn push(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// Lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value by name, or `""` when absent.
    pub fn attr(&self, name: &str) -> &str {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Child nodes in document order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Element children only.
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Concatenated text of all descendant text nodes, verbatim.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// First descendant (not self) with the given tag, depth-first.
    pub fn find_first(&self, tag: &str) -> Option<&Element> {
        for child in self.element_children() {
            if child.tag == tag {
                return Some(child);
            }
            if let Some(found) = child.find_first(tag) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants whose tag is one of `tags`, in document order.
    ///
    /// With [`SearchDepth::Subtree`] matches nested inside other matches are
    /// returned too.
    pub fn find_all<'a>(&'a self, tags: &[&str], depth: SearchDepth) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_matching(self, tags, depth, &mut found);
        found
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

fn collect_matching<'a>(
    el: &'a Element,
    tags: &[&str],
    depth: SearchDepth,
    found: &mut Vec<&'a Element>,
) {
    for child in el.element_children() {
        if tags.contains(&child.tag.as_str()) {
            found.push(child);
        }
        if depth == SearchDepth::Subtree {
            collect_matching(child, tags, depth, found);
        }
    }
}

/// Parse an HTML fragment into an owned tree.
///
/// The returned element is the synthetic root that wraps the fragment; its
/// children are the fragment's top-level nodes. Malformed markup is repaired
/// by html5ever the same way a browser would.
pub fn parse_fragment(html: &str) -> Element {
    let document = Html::parse_fragment(html);
    copy_element(document.root_element(), 1)
}

fn copy_element(element: ElementRef<'_>, depth: usize) -> Element {
    let value = element.value();
    let mut node = Element::new(value.name());
    for (name, attr_value) in value.attrs() {
        node = node.with_attr(name, attr_value);
    }

    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => node.push(Node::text(&**text)),
            ScraperNode::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                if depth < MAX_DEPTH {
                    node.push(copy_element(child_element, depth + 1));
                } else {
                    let text: String = child_element.text().collect();
                    if !text.is_empty() {
                        node.push(Node::text(text));
                    }
                }
            }
            _ => {}
        }
    }

    node
}
