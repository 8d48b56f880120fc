//! Inline formatter: inline HTML → single-line Markdown.
//!
//! ## Whitespace policy
//!
//! Every run of whitespace inside a text node collapses to one space, and a
//! single space at a text boundary is kept so that adjacent text and markup
//! stay separated (`Hello <strong>world</strong>` → `Hello **world**`).
//! Emphasis and code markers always hug their content: any boundary space
//! inside the element is moved outside the markers. The public entry points
//! trim the assembled string, so formatting is idempotent and never
//! accumulates whitespace.

use super::node::{Element, Node};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Inline element kinds the formatter knows. Everything else is a
/// transparent container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineKind {
    /// `strong` / `b` → `**…**`
    Strong,
    /// `em` / `i` → `_…_`
    Emphasis,
    /// `code` → `` `…` ``
    Code,
    /// `a` → `text [href]`
    Link,
    /// Anything else: children concatenated without markup.
    Other,
}

impl InlineKind {
    /// Classify a lowercase tag name.
    pub fn of(tag: &str) -> Self {
        match tag {
            "strong" | "b" => InlineKind::Strong,
            "em" | "i" => InlineKind::Emphasis,
            "code" => InlineKind::Code,
            "a" => InlineKind::Link,
            _ => InlineKind::Other,
        }
    }
}

/// Format one node as inline Markdown.
pub fn format_inline(node: &Node) -> String {
    render_node(node).trim().to_string()
}

/// Format an element as inline Markdown, the element's own markup included.
pub fn format_element(el: &Element) -> String {
    render_element(el).trim().to_string()
}

/// Format a run of sibling nodes as one inline string.
pub(crate) fn format_run(nodes: &[&Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        append(&mut out, &render_node(node));
    }
    out.trim().to_string()
}

/// Collapse every whitespace run to a single space.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").into_owned()
}

fn render_node(node: &Node) -> String {
    match node {
        Node::Text(t) => collapse_whitespace(t),
        Node::Element(el) => render_element(el),
    }
}

fn render_element(el: &Element) -> String {
    match InlineKind::of(el.tag()) {
        InlineKind::Strong => wrap(&render_children(el), "**"),
        InlineKind::Emphasis => wrap(&render_children(el), "_"),
        InlineKind::Code => wrap(&render_children(el), "`"),
        InlineKind::Link => render_link(el),
        InlineKind::Other => render_children(el),
    }
}

fn render_children(el: &Element) -> String {
    let mut out = String::new();
    for child in el.children() {
        append(&mut out, &render_node(child));
    }
    out
}

fn render_link(el: &Element) -> String {
    let inner = render_children(el);
    let text = inner.trim();
    let href = el.attr("href").trim();

    let body = if href.is_empty() {
        text.to_string()
    } else if text.is_empty() {
        format!("[{href}]")
    } else {
        format!("{text} [{href}]")
    };
    reflank(&inner, &body)
}

/// Wrap trimmed content in `marker`, keeping boundary spaces outside.
fn wrap(inner: &str, marker: &str) -> String {
    let core = inner.trim();
    if core.is_empty() {
        return reflank(inner, "");
    }
    reflank(inner, &format!("{marker}{core}{marker}"))
}

/// Re-attach the boundary spaces of `inner` around `body`.
fn reflank(inner: &str, body: &str) -> String {
    if body.is_empty() {
        return if inner.is_empty() { String::new() } else { " ".to_string() };
    }
    let lead = if inner.starts_with(' ') { " " } else { "" };
    let trail = if inner.ends_with(' ') { " " } else { "" };
    format!("{lead}{body}{trail}")
}

/// Append `piece`, never producing two consecutive boundary spaces.
fn append(out: &mut String, piece: &str) {
    match piece.strip_prefix(' ') {
        Some(rest) if out.ends_with(' ') => out.push_str(rest),
        _ => out.push_str(piece),
    }
}
