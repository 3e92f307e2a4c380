//! Equivalence between an original document and its sanitized form

use tracing::debug;

use crate::sanitize::Sanitized;
use crate::whitelist::Whitelist;
use crate::xml::{serialize, Document};

/// Remove one leading `<?xml ...?>` declaration and the whitespace after it
pub fn strip_declaration(markup: &str) -> &str {
    let Some(rest) = markup.strip_prefix("<?xml") else {
        return markup;
    };
    if !rest.starts_with(|ch: char| ch.is_ascii_whitespace() || ch == '?') {
        return markup;
    }
    match rest.find("?>") {
        Some(end) => rest.get(end + 2..).unwrap_or_default().trim_start(),
        None => markup,
    }
}

/// A document whose root has no children never counts as equivalent
///
/// Reconciliation only removes attributes, so this holds before and after it.
/// Such documents go down the remediation path even when byte-identical.
pub fn is_degenerate(doc: &Document) -> bool {
    doc.root.children.is_empty()
}

/// Compare after whitelist reconciliation of a working copy of `original`
///
/// `original` itself is left untouched, as is the sanitized markup.
pub fn equivalent_after_reconcile(
    original: &Document,
    sanitized_markup: &str,
    whitelist: &Whitelist,
) -> bool {
    let mut working = original.clone();
    let touched = whitelist.reconcile(&mut working);

    if is_degenerate(&working) {
        debug!(root = %working.root.name, "degenerate root, not equivalent");
        return false;
    }

    let reconciled = serialize(&working);
    let equivalent = strip_declaration(&reconciled) == strip_declaration(sanitized_markup);
    debug!(touched, equivalent, "compared reconciled markup");
    equivalent
}

/// Decide whether `sanitized` is equivalent to `original`
///
/// `original_markup` must be the emitter's serialization of `original`.
/// Declarations are ignored on both sides and a degenerate root is never
/// equivalent, whichever comparison would have matched.
pub fn are_equivalent(
    original: &Document,
    original_markup: &str,
    sanitized: &Sanitized,
    whitelist: &Whitelist,
) -> bool {
    if is_degenerate(original) {
        debug!(root = %original.root.name, "degenerate root, not equivalent");
        return false;
    }
    strip_declaration(original_markup) == strip_declaration(&sanitized.markup)
        || equivalent_after_reconcile(original, &sanitized.markup, whitelist)
}
