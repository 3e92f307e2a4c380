//! Cosmetic attributes that the sanitizer removes but that carry no risk
//!
//! Design tools routinely export SVGs with `enable-background` inside the
//! root `style` attribute and `xml:space="preserve"` on the root. The
//! sanitizer drops both, which would otherwise turn every such file into a
//! rewrite. Reconciliation removes exactly those pieces from a working copy
//! of the original so the comparison sees through them.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::xml::{Document, Element};

/// One ignorable attribute location
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WhitelistEntry {
    /// Local name of the element carrying the attribute
    pub element: &'static str,
    /// Local name of the attribute
    pub attribute: &'static str,
    /// Literal that marks the whole attribute as removable, and the property
    /// name stripped from `prop:value;` lists otherwise
    pub token: &'static str,
}

/// Entries compiled into the checker
pub const BUILTIN_ENTRIES: &[WhitelistEntry] = &[
    // deprecated filter-effects property, see https://www.w3.org/TR/filter-effects/#AccessBackgroundImage
    WhitelistEntry {
        element: "svg",
        attribute: "style",
        token: "enable-background",
    },
    WhitelistEntry {
        element: "svg",
        attribute: "space",
        token: "preserve",
    },
];

#[derive(Clone, Debug)]
struct Rule {
    entry: WhitelistEntry,
    pattern: Regex,
}

/// Compiled whitelist table
#[derive(Clone, Debug, Default)]
pub struct Whitelist {
    rules: Vec<Rule>,
}

impl Whitelist {
    pub fn new<I>(entries: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = WhitelistEntry>,
    {
        let rules = entries
            .into_iter()
            .map(|entry| {
                let pattern = Regex::new(&format!(r"{}:.*?(;|\z)", regex::escape(entry.token)))?;
                Ok(Rule { entry, pattern })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// The compiled-in table
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<Whitelist> = OnceLock::new();
        // escaped tokens always compile
        BUILTIN.get_or_init(|| Self::new(BUILTIN_ENTRIES.iter().copied()).unwrap_or_default())
    }

    pub fn entries(&self) -> impl Iterator<Item = &WhitelistEntry> {
        self.rules.iter().map(|rule| &rule.entry)
    }

    /// Neutralize whitelisted attributes on `doc`, returning how many were touched
    ///
    /// Only the first element (document order) named `entry.element` that
    /// carries `entry.attribute` is considered for each entry.
    pub fn reconcile(&self, doc: &mut Document) -> usize {
        let mut touched = 0;
        for rule in &self.rules {
            let entry = rule.entry;
            let carrier = |el: &Element| {
                el.name == entry.element && el.attributes.contains_key(entry.attribute)
            };
            let Some(element) = doc.root.find_first_mut(&carrier) else {
                continue;
            };
            let Some(value) = element.attributes.get(entry.attribute) else {
                continue;
            };

            touched += 1;
            if value == entry.token {
                debug!(attribute = entry.attribute, "dropped whitelisted attribute");
                element.attributes.shift_remove(entry.attribute);
                continue;
            }

            let reduced = rule.pattern.replace_all(value, "").into_owned();
            if reduced.is_empty() {
                debug!(attribute = entry.attribute, token = entry.token, "dropped emptied attribute");
                element.attributes.shift_remove(entry.attribute);
            } else {
                debug!(attribute = entry.attribute, token = entry.token, "stripped whitelisted token");
                element
                    .attributes
                    .insert(entry.attribute.to_string(), reduced);
            }
        }
        touched
    }
}
