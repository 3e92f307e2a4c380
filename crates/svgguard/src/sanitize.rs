//! Sanitizer seam
//!
//! The comparison logic never decides what is safe on its own. It hands the
//! normalized document to a [`Sanitizer`] and compares against whatever comes
//! back. [`PolicySanitizer`] is the allow-list implementation used in
//! production; tests plug in their own rule sets.

pub mod css;
pub mod policy;

pub use policy::{Policy, PolicyBuilder};

use tracing::debug;

use crate::xml::{serialize, Content, Document, Element};

/// How disallowed elements are removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrubMode {
    /// Delete the element together with its whole subtree
    #[default]
    Prune,
    /// Delete the element but keep its allowed descendants in place
    Strip,
}

/// Capability that turns a document into its allow-listed form
///
/// Implementations must never escape or comment out disallowed content:
/// it is deleted. The input document is not modified.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, doc: &Document, mode: ScrubMode) -> Document;
}

/// Output of the sanitizer adapter: the safe tree and its serialized form
#[derive(Clone, Debug, PartialEq)]
pub struct Sanitized {
    pub document: Document,
    pub markup: String,
}

/// Run `sanitizer` in prune mode and serialize the result
pub fn sanitize_document(sanitizer: &dyn Sanitizer, doc: &Document) -> Sanitized {
    let document = sanitizer.sanitize(doc, ScrubMode::Prune);
    let markup = serialize(&document);
    Sanitized { document, markup }
}

/// Allow-list sanitizer driven by a [`Policy`]
#[derive(Clone, Debug)]
pub struct PolicySanitizer {
    policy: Policy,
}

impl Default for PolicySanitizer {
    fn default() -> Self {
        Self::new(Policy::svg())
    }
}

impl PolicySanitizer {
    pub const fn new(policy: Policy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    fn scrub_element(&self, element: &Element, mode: ScrubMode) -> Element {
        Element {
            name: element.name.clone(),
            attributes: element
                .attributes
                .iter()
                .filter_map(|(name, value)| {
                    let kept = self.scrub_attribute(name, value);
                    if kept.is_none() {
                        debug!(element = %element.name, attribute = %name, "removed attribute");
                    }
                    kept.map(|value| (name.clone(), value))
                })
                .collect(),
            children: self.scrub_children(&element.children, mode),
        }
    }

    fn scrub_children(&self, children: &[Content], mode: ScrubMode) -> Vec<Content> {
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Content::Element(element) if self.policy.allows_element(&element.name) => {
                    kept.push(Content::Element(self.scrub_element(element, mode)));
                }
                Content::Element(element) => {
                    debug!(element = %element.name, ?mode, "removed element");
                    if mode == ScrubMode::Strip {
                        kept.extend(self.scrub_children(&element.children, mode));
                    }
                }
                Content::Comment(_) if !self.policy.allows_comments() => {}
                other => kept.push(other.clone()),
            }
        }
        kept
    }

    fn scrub_attribute(&self, name: &str, value: &str) -> Option<String> {
        if !self.policy.allows_attribute(name) || css::is_script_like(value) {
            return None;
        }
        if self.policy.is_uri_attribute(name) && !css::is_safe_uri(value) {
            return None;
        }
        if !css::references_are_local(value) {
            return None;
        }
        if name == "style" {
            return css::scrub_style(value, &self.policy);
        }
        Some(value.to_string())
    }
}

impl Sanitizer for PolicySanitizer {
    fn sanitize(&self, doc: &Document, mode: ScrubMode) -> Document {
        // the root survives even when disallowed so the result is still a document
        let root = if self.policy.allows_element(&doc.root.name) {
            self.scrub_element(&doc.root, mode)
        } else {
            debug!(element = %doc.root.name, "emptied disallowed root");
            Element::new(doc.root.name.clone())
        };
        let declaration = if self.policy.keeps_declaration() {
            doc.declaration.clone()
        } else {
            None
        };
        Document { declaration, root }
    }
}
