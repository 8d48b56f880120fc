//! HTML-to-Markdown conversion engine shared by every content source.
//!
//! ## Data Flow
//!
//! ```text
//! html ──▶ node::parse_fragment ──▶ convert_document ──▶ block ──▶ inline
//!          (scraper/html5ever)       (top level)         (per tag) (per run)
//! ```
//!
//! 1. [`node`]: parse the fragment into an owned tree
//! 2. [`block`]: headings, paragraphs, lists, code blocks, quotes, tables
//! 3. [`inline`]: emphasis, inline code, links, whitespace policy
//!
//! Conversion is total. Anything the engine does not understand degrades to
//! omission or plain text; nothing here returns an error, and no state
//! survives between calls.

pub mod block;
pub mod inline;
pub mod node;

pub use block::{convert_block, BlockKind};
pub use inline::{format_element, format_inline, InlineKind};
pub use node::{parse_fragment, Element, Node, SearchDepth};

/// Convert an HTML fragment to Markdown.
///
/// # Example
/// ```rust
/// use kb_ingest::markdown::html_to_markdown;
///
/// let md = html_to_markdown("<h2>Setup</h2><p>Run <code>make</code></p>");
/// assert_eq!(md, "## Setup\n\nRun `make`");
/// ```
pub fn html_to_markdown(html: &str) -> String {
    convert_document(&parse_fragment(html))
}

/// Convert the top-level children of `root` and join them with blank lines.
///
/// Top-level text is kept as its trimmed content; elements go through the
/// block converter. Empty results are skipped.
pub fn convert_document(root: &Element) -> String {
    root.children()
        .iter()
        .map(|child| match child {
            Node::Text(text) => text.trim().to_string(),
            Node::Element(el) => convert_block(el, 0),
        })
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
