//! Canonicalization of raw SVG markup before comparison
//!
//! Two sources of spurious differences are removed here: line breaks and
//! runs of spaces (collapsed to a single space) and namespace prefixes and
//! declarations (removed from every element and attribute name), so that
//! `<svg:rect xlink:href=".."/>` and `<rect href=".."/>` compare equal.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::xml::{Config, Content, Document, Element, Parser};

/// Turn every `\n` into a space, then squeeze runs of spaces into one
pub fn collapse_whitespace(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut previous_space = false;
    for ch in raw.chars() {
        let ch = if ch == '\n' { ' ' } else { ch };
        if ch == ' ' && previous_space {
            continue;
        }
        previous_space = ch == ' ';
        output.push(ch);
    }
    output
}

/// Collapse whitespace, parse and strip namespaces
pub fn normalize(raw: &str, config: Config) -> Result<Document> {
    let collapsed = collapse_whitespace(raw);
    let mut doc = Parser::with_config(collapsed.as_bytes(), config).parse()?;
    strip_namespaces(&mut doc.root);
    debug!(
        root = %doc.root.name,
        elements = doc.root.element_count(),
        "normalized markup"
    );
    Ok(doc)
}

/// Remove namespace prefixes and `xmlns` declarations from a subtree
///
/// When two attributes share a local name after stripping, the first
/// position is kept and the later value wins.
pub fn strip_namespaces(element: &mut Element) {
    element.name = local_name(&element.name).to_string();

    let attributes = std::mem::take(&mut element.attributes);
    let mut stripped = IndexMap::with_capacity(attributes.len());
    for (name, value) in attributes {
        if is_namespace_declaration(&name) {
            continue;
        }
        stripped.insert(local_name(&name).to_string(), value);
    }
    element.attributes = stripped;

    for child in &mut element.children {
        if let Content::Element(child) = child {
            strip_namespaces(child);
        }
    }
}

fn local_name(name: &str) -> &str {
    match name.rsplit_once(':') {
        // a local part that is not a valid name on its own keeps the prefix
        Some((_, local)) if local.starts_with(|c: char| c.is_alphabetic() || c == '_') => local,
        _ => name,
    }
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}
