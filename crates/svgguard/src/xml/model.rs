//! XML data model

use indexmap::IndexMap;

/// XML document
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Pseudo-attributes of a leading `<?xml ...?>` declaration, if present
    pub declaration: Option<IndexMap<String, String>>,
    pub root: Element,
}

/// XML element
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Content>,
}

/// XML content node
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            root,
        }
    }

    /// Attach a `<?xml version="..."?>` declaration
    pub fn with_declaration(mut self, version: &str) -> Self {
        let mut pseudo = IndexMap::new();
        pseudo.insert("version".to_string(), version.to_string());
        self.declaration = Some(pseudo);
        self
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<Content>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Child elements, skipping text, CDATA and comments
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            Content::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First element in document order (self included) matching `predicate`
    pub fn find_first_mut<F>(&mut self, predicate: &F) -> Option<&mut Self>
    where
        F: Fn(&Self) -> bool,
    {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            Content::Element(element) => element.find_first_mut(predicate),
            _ => None,
        })
    }

    /// First element in document order (self included) matching `predicate`
    pub fn find_first<F>(&self, predicate: &F) -> Option<&Self>
    where
        F: Fn(&Self) -> bool,
    {
        if predicate(self) {
            return Some(self);
        }
        self.elements()
            .find_map(|element| element.find_first(predicate))
    }

    /// Number of elements in this subtree, self included
    pub fn element_count(&self) -> usize {
        1 + self.elements().map(Self::element_count).sum::<usize>()
    }
}

impl From<Element> for Content {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
