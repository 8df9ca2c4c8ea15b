use std::path::Path;
use tree_sitter::{Language as Grammar, Node as TSNode, Parser, Tree};

use crate::error::ParseError;

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn new(grammar: Grammar, path: &Path) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(grammar)
            .map_err(|err| ParseError::new(path, 0, 0, format!("grammar unavailable: {err}")))?;
        Ok(Self { parser })
    }

    /// Parse without judging the tree; ERROR nodes are left in place.
    pub fn parse(&mut self, path: &Path, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| ParseError::new(path, 0, 0, "parser produced no syntax tree"))
    }
}

/// First ERROR or MISSING node in document order.
pub fn first_syntax_error(tree: &Tree, path: &Path, source: &[u8]) -> Option<ParseError> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    let node = find_error_node(root)?;
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let snippet: String = extract_text(&node, source).chars().take(40).collect();
        format!("unexpected `{}`", collapse_whitespace(&snippet))
    };
    Some(ParseError::new(
        path,
        position.row + 1,
        position.column + 1,
        message,
    ))
}

fn find_error_node(node: TSNode) -> Option<TSNode> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<TSNode> = node.children(&mut cursor).collect();
    children.into_iter().find_map(find_error_node)
}

pub fn extract_text<'a>(node: &TSNode, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

/// Runs of whitespace (including newlines) folded into one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Owned, whitespace-collapsed text of an optional node.
pub fn node_text(node: Option<TSNode>, source: &[u8]) -> Option<String> {
    node.map(|n| collapse_whitespace(extract_text(&n, source)))
        .filter(|text| !text.is_empty())
}

/// 1-based first and last line.
pub fn line_span(node: &TSNode) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

pub fn find_child_by_kind<'a>(node: &TSNode<'a>, kind: &str) -> Option<TSNode<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

pub fn find_children_by_kind<'a>(node: &TSNode<'a>, kind: &str) -> Vec<TSNode<'a>> {
    let mut results = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == kind {
            results.push(child);
        }
    }
    results
}

pub fn named_children<'a>(node: &TSNode<'a>) -> Vec<TSNode<'a>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

pub fn children_by_field<'a>(node: &TSNode<'a>, field: &str) -> Vec<TSNode<'a>> {
    let mut cursor = node.walk();
    let children = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// Python docstring: first statement of a block when it is a string literal.
pub fn extract_docstring(body: &TSNode, source: &[u8]) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = first.named_child(0)?;
    if string_node.kind() != "string" {
        return None;
    }
    let literal = strip_string_quotes(extract_text(&string_node, source));
    let doc = clean_docstring(literal);
    (!doc.is_empty()).then_some(doc)
}

fn strip_string_quotes(literal: &str) -> &str {
    let body = literal.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    body
}

/// Dedent the way Python's `inspect.cleandoc` does: the first line is only
/// left-stripped, the common indentation of the rest is removed, and
/// surrounding blank lines are dropped.
pub fn clean_docstring(text: &str) -> String {
    let text = text.replace('\t', "        ");
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines[1..]
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    cleaned.push(lines.remove(0).trim().to_string());
    for line in lines {
        let trimmed = match line.char_indices().nth(margin) {
            Some((offset, _)) if indent_width(line) >= margin => &line[offset..],
            _ => line.trim_start(),
        };
        cleaned.push(trimmed.trim_end().to_string());
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

/// Leading whitespace measured in chars, so multibyte spaces count once.
fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Strip `//`, `/* */` and leading `*` decoration from one comment node.
pub fn strip_comment(text: &str) -> String {
    let text = text.trim();
    if let Some(line) = text.strip_prefix("//") {
        return line.trim_start_matches('/').trim().to_string();
    }
    let inner = text
        .strip_prefix("/*")
        .unwrap_or(text)
        .trim_start_matches('*');
    let inner = inner.strip_suffix("*/").unwrap_or(inner);
    let lines: Vec<String> = inner
        .lines()
        .map(|line| {
            let line = line.trim_start();
            line.strip_prefix('*')
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
                .unwrap_or(line)
                .trim_end()
                .to_string()
        })
        .collect();
    clean_docstring(&lines.join("\n"))
}

fn is_comment(node: &TSNode) -> bool {
    matches!(node.kind(), "comment" | "line_comment" | "block_comment")
}

/// Contiguous comment lines directly above `node` (Go, C, C++).
pub fn comment_block_above(node: &TSNode, source: &[u8]) -> Option<String> {
    let mut parts = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut current = node.prev_named_sibling();
    while let Some(comment) = current {
        if !is_comment(&comment) || comment.end_position().row + 1 < expected_row {
            break;
        }
        parts.push(strip_comment(extract_text(&comment, source)));
        expected_row = comment.start_position().row;
        current = comment.prev_named_sibling();
    }
    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    let doc = parts.join("\n").trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

/// `/** ... */` directly above `node` (Java).
pub fn javadoc_above(node: &TSNode, source: &[u8]) -> Option<String> {
    let comment = node.prev_named_sibling()?;
    if !is_comment(&comment) || comment.end_position().row + 1 < node.start_position().row {
        return None;
    }
    let text = extract_text(&comment, source);
    if !text.starts_with("/**") {
        return None;
    }
    let doc = strip_comment(text);
    (!doc.is_empty()).then_some(doc)
}
