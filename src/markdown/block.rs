//! Block converter: block-level HTML → Markdown blocks.
//!
//! Dispatch is a closed [`BlockKind`] enumeration with an explicit
//! [`BlockKind::Other`] arm; unsupported tags convert to an empty string and
//! are dropped by the caller.
//!
//! `depth` is the list nesting level. It only affects list markers and the
//! indentation of blocks nested inside list items.

use super::inline::{collapse_whitespace, format_element, format_run};
use super::node::{Element, Node, SearchDepth};

/// Block element kinds the converter knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `h1`–`h6`
    Heading(u8),
    /// `p`
    Paragraph,
    /// `li` outside of a list container
    ListItem,
    /// `ul`
    UnorderedList,
    /// `ol`
    OrderedList,
    /// `pre`
    Preformatted,
    /// `blockquote`
    Blockquote,
    /// `table`
    Table,
    /// `code` used as a block
    Code,
    /// Anything else. Converts to nothing.
    Other,
}

impl BlockKind {
    /// Classify a lowercase tag name.
    pub fn of(tag: &str) -> Self {
        match tag {
            "h1" => BlockKind::Heading(1),
            "h2" => BlockKind::Heading(2),
            "h3" => BlockKind::Heading(3),
            "h4" => BlockKind::Heading(4),
            "h5" => BlockKind::Heading(5),
            "h6" => BlockKind::Heading(6),
            "p" => BlockKind::Paragraph,
            "li" => BlockKind::ListItem,
            "ul" => BlockKind::UnorderedList,
            "ol" => BlockKind::OrderedList,
            "pre" => BlockKind::Preformatted,
            "blockquote" => BlockKind::Blockquote,
            "table" => BlockKind::Table,
            "code" => BlockKind::Code,
            _ => BlockKind::Other,
        }
    }

    fn is_list(self) -> bool {
        matches!(self, BlockKind::UnorderedList | BlockKind::OrderedList)
    }
}

/// Convert one block element at the given list depth.
///
/// Returns an empty string for unsupported or empty blocks.
pub fn convert_block(el: &Element, depth: usize) -> String {
    match BlockKind::of(el.tag()) {
        BlockKind::Heading(level) => prefixed(&"#".repeat(level as usize), format_element(el)),
        BlockKind::Paragraph | BlockKind::Code => format_element(el),
        BlockKind::ListItem => render_item(el, depth, "-"),
        BlockKind::UnorderedList => render_list(el, depth, |_| "-".to_string()),
        BlockKind::OrderedList => render_list(el, depth, |i| format!("{}.", i + 1)),
        BlockKind::Preformatted => fenced(el),
        BlockKind::Blockquote => prefixed(">", format_element(el)),
        BlockKind::Table => table(el),
        BlockKind::Other => String::new(),
    }
}

fn prefixed(prefix: &str, content: String) -> String {
    if content.is_empty() {
        String::new()
    } else {
        format!("{prefix} {content}")
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn render_list(el: &Element, depth: usize, marker: impl Fn(usize) -> String) -> String {
    el.find_all(&["li"], SearchDepth::Children)
        .into_iter()
        .enumerate()
        .map(|(i, li)| render_item(li, depth, &marker(i)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_item(li: &Element, depth: usize, marker: &str) -> String {
    let (line, nested) = item_parts(li, depth);
    let mut out = format!("{}{} {}", indent(depth), marker, line);
    out.truncate(out.trim_end().len());
    for block in nested {
        out.push('\n');
        out.push_str(&block);
    }
    out
}

/// Split a list item into its first line and the blocks rendered below it.
///
/// Inline children are formatted as one run; single-line blocks join the
/// first line with a space; lists, code blocks and tables go on their own
/// lines one level deeper.
fn item_parts(li: &Element, depth: usize) -> (String, Vec<String>) {
    let mut line = String::new();
    let mut nested = Vec::new();
    let mut run: Vec<&Node> = Vec::new();

    for child in li.children() {
        let Node::Element(el) = child else {
            run.push(child);
            continue;
        };
        match BlockKind::of(el.tag()) {
            BlockKind::Code | BlockKind::Other => run.push(child),
            kind => {
                push_part(&mut line, format_run(&run));
                run.clear();

                let block = convert_block(el, depth + 1);
                if block.is_empty() {
                    continue;
                }
                match kind {
                    k if k.is_list() || k == BlockKind::ListItem => nested.push(block),
                    BlockKind::Preformatted | BlockKind::Table => {
                        nested.push(indent_lines(&block, depth + 1))
                    }
                    _ => push_part(&mut line, block),
                }
            }
        }
    }
    push_part(&mut line, format_run(&run));

    (line, nested)
}

fn push_part(line: &mut String, part: String) {
    if part.is_empty() {
        return;
    }
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(&part);
}

fn indent_lines(block: &str, depth: usize) -> String {
    let pad = indent(depth);
    block
        .lines()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{pad}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fence the raw text of a `pre` block, preferring a nested `code` element.
fn fenced(el: &Element) -> String {
    let raw = match el.find_first("code") {
        Some(code) => code.text_content(),
        None => el.text_content(),
    };
    let body = raw.trim_end_matches(|c| c == '\n' || c == '\r');
    format!("```\n{body}\n```")
}

fn table(el: &Element) -> String {
    let rows: Vec<Vec<String>> = el
        .find_all(&["tr"], SearchDepth::Subtree)
        .into_iter()
        .map(|tr| {
            tr.find_all(&["td", "th"], SearchDepth::Subtree)
                .into_iter()
                .map(cell_text)
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, cells) in rows.iter().enumerate() {
        lines.push(table_row(cells));
        if i == 0 {
            lines.push(table_row(&vec!["---".to_string(); cells.len()]));
        }
    }
    lines.join("\n")
}

fn cell_text(cell: &Element) -> String {
    collapse_whitespace(&cell.text_content())
        .trim()
        .replace('|', "\\|")
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, text: &str) -> Element {
        Element::new(tag).with_text(text)
    }

    fn list(tag: &str, items: Vec<Element>) -> Element {
        items
            .into_iter()
            .fold(Element::new(tag), |list, li| list.with_child(li))
    }

    #[test]
    fn headings_map_to_hashes() {
        assert_eq!(convert_block(&el("h1", "Title"), 0), "# Title");
        assert_eq!(convert_block(&el("h2", "Sub"), 0), "## Sub");
        assert_eq!(convert_block(&el("h3", "Minor"), 0), "### Minor");
        assert_eq!(convert_block(&el("h6", "Tiny"), 0), "###### Tiny");
    }

    #[test]
    fn heading_content_is_inline_formatted() {
        let h = Element::new("h2")
            .with_text("Use ")
            .with_child(el("code", "cargo"));
        assert_eq!(convert_block(&h, 0), "## Use `cargo`");
    }

    #[test]
    fn empty_heading_is_dropped() {
        assert_eq!(convert_block(&el("h1", "   "), 0), "");
    }

    #[test]
    fn paragraph_has_no_prefix() {
        assert_eq!(convert_block(&el("p", " plain "), 0), "plain");
    }

    #[test]
    fn unordered_list_items() {
        let ul = list("ul", vec![el("li", "A"), el("li", "B")]);
        assert_eq!(convert_block(&ul, 0), "- A\n- B");
    }

    #[test]
    fn ordered_list_numbers_from_one() {
        let ol = list("ol", vec![el("li", "A"), el("li", "B"), el("li", "C")]);
        assert_eq!(convert_block(&ol, 0), "1. A\n2. B\n3. C");
    }

    #[test]
    fn ordered_numbering_ignores_nested_content() {
        let nested = list("ul", vec![el("li", "x"), el("li", "y")]);
        let ol = list(
            "ol",
            vec![el("li", "A").with_child(nested), el("li", "B")],
        );
        let md = convert_block(&ol, 0);
        assert_eq!(md, "1. A\n  - x\n  - y\n2. B");
    }

    #[test]
    fn nested_list_is_indented_under_parent() {
        let inner = list("ul", vec![el("li", "C")]);
        let ul = list("ul", vec![el("li", "A"), el("li", "B").with_child(inner)]);
        assert_eq!(convert_block(&ul, 0), "- A\n- B\n  - C");
    }

    #[test]
    fn deeply_nested_lists_indent_per_level() {
        let level3 = list("ul", vec![el("li", "3")]);
        let level2 = list("ol", vec![el("li", "2").with_child(level3)]);
        let level1 = list("ul", vec![el("li", "1").with_child(level2)]);
        assert_eq!(convert_block(&level1, 0), "- 1\n  1. 2\n    - 3");
    }

    #[test]
    fn list_item_keeps_inline_markup() {
        let li = Element::new("li")
            .with_text("Run ")
            .with_child(el("code", "make"))
            .with_text(" first");
        let ul = list("ul", vec![li]);
        assert_eq!(convert_block(&ul, 0), "- Run `make` first");
    }

    #[test]
    fn list_item_paragraphs_join_with_space() {
        let li = Element::new("li")
            .with_child(el("p", "one"))
            .with_child(el("p", "two"));
        assert_eq!(convert_block(&list("ul", vec![li]), 0), "- one two");
    }

    #[test]
    fn stray_list_item_uses_depth_indent() {
        assert_eq!(convert_block(&el("li", "x"), 0), "- x");
        assert_eq!(convert_block(&el("li", "x"), 2), "    - x");
    }

    #[test]
    fn list_ignores_non_item_children() {
        let ul = Element::new("ul")
            .with_text("\n  ")
            .with_child(el("li", "only"))
            .with_child(el("div", "skipped"));
        assert_eq!(convert_block(&ul, 0), "- only");
    }

    #[test]
    fn empty_list_item_keeps_marker() {
        let ul = list("ul", vec![Element::new("li"), el("li", "b")]);
        assert_eq!(convert_block(&ul, 0), "-\n- b");
    }

    #[test]
    fn pre_with_code_is_fenced_verbatim() {
        let pre = Element::new("pre").with_child(el("code", "x = **1**\n  y\n"));
        assert_eq!(convert_block(&pre, 0), "```\nx = **1**\n  y\n```");
    }

    #[test]
    fn pre_without_code_uses_own_text() {
        let pre = Element::new("pre").with_text("raw  text");
        assert_eq!(convert_block(&pre, 0), "```\nraw  text\n```");
    }

    #[test]
    fn pre_inside_list_item_is_indented() {
        let pre = Element::new("pre").with_child(el("code", "ls"));
        let li = el("li", "Run:").with_child(pre);
        assert_eq!(
            convert_block(&list("ul", vec![li]), 0),
            "- Run:\n  ```\n  ls\n  ```"
        );
    }

    #[test]
    fn blockquote_is_single_line() {
        let bq = Element::new("blockquote").with_child(
            Element::new("p")
                .with_text("quoted ")
                .with_child(el("em", "text")),
        );
        assert_eq!(convert_block(&bq, 0), "> quoted _text_");
    }

    #[test]
    fn block_code_is_inline_code() {
        assert_eq!(convert_block(&el("code", "x"), 0), "`x`");
    }

    #[test]
    fn table_has_header_separator_and_rows() {
        let table = Element::new("table")
            .with_child(
                Element::new("tr")
                    .with_child(el("th", "Name"))
                    .with_child(el("th", "Value")),
            )
            .with_child(
                Element::new("tr")
                    .with_child(el("td", " a "))
                    .with_child(Element::new("td").with_child(el("strong", "b"))),
            );
        let md = convert_block(&table, 0);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines, vec!["| Name | Value |", "| --- | --- |", "| a | b |"]);
    }

    #[test]
    fn table_rows_inside_sections_are_found() {
        let table = Element::new("table").with_child(
            Element::new("tbody")
                .with_child(Element::new("tr").with_child(el("td", "h")))
                .with_child(Element::new("tr").with_child(el("td", "d"))),
        );
        assert_eq!(convert_block(&table, 0), "| h |\n| --- |\n| d |");
    }

    #[test]
    fn table_cell_pipes_are_escaped() {
        let table = Element::new("table")
            .with_child(Element::new("tr").with_child(el("td", "a|b")));
        assert_eq!(convert_block(&table, 0), "| a\\|b |\n| --- |");
    }

    #[test]
    fn empty_table_is_dropped() {
        assert_eq!(convert_block(&Element::new("table"), 0), "");
    }

    #[test]
    fn unknown_blocks_are_dropped() {
        assert_eq!(convert_block(&el("div", "content"), 0), "");
        assert_eq!(convert_block(&el("img", ""), 0), "");
        assert_eq!(BlockKind::of("section"), BlockKind::Other);
    }
}
