//! Deterministic XML emitter
//!
//! Every comparison in this crate is a literal comparison of two strings
//! produced here, so the output depends only on the tree: attributes in
//! insertion order, double quotes, a fixed escaping table and `<name/>` for
//! elements without children.

use crate::xml::model::{Content, Document, Element};

/// Serialize a document, declaration included
pub fn serialize(doc: &Document) -> String {
    let mut output = String::new();
    if let Some(declaration) = &doc.declaration {
        output.push_str("<?xml");
        for (key, value) in declaration {
            push_attribute(key, value, &mut output);
        }
        output.push_str("?>\n");
    }
    serialize_element(&doc.root, &mut output);
    output
}

/// Serialize a single element subtree into `output`
pub fn serialize_element(element: &Element, output: &mut String) {
    output.push('<');
    output.push_str(&element.name);

    for (key, value) in &element.attributes {
        push_attribute(key, value, output);
    }

    if element.children.is_empty() {
        output.push_str("/>");
        return;
    }

    output.push('>');
    for child in &element.children {
        match child {
            Content::Element(child) => serialize_element(child, output),
            Content::Text(text) => escape_into(text, false, output),
            Content::CData(data) => {
                output.push_str("<![CDATA[");
                output.push_str(data);
                output.push_str("]]>");
            }
            Content::Comment(comment) => {
                output.push_str("<!--");
                output.push_str(comment);
                output.push_str("-->");
            }
        }
    }
    output.push_str("</");
    output.push_str(&element.name);
    output.push('>');
}

fn push_attribute(key: &str, value: &str, output: &mut String) {
    output.push(' ');
    output.push_str(key);
    output.push_str("=\"");
    escape_into(value, true, output);
    output.push('"');
}

fn escape_into(input: &str, in_attribute: bool, output: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if in_attribute => output.push_str("&quot;"),
            _ => output.push(ch),
        }
    }
}
