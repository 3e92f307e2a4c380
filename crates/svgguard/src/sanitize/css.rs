//! Attribute value and inline style checks

use super::policy::Policy;

const SCRIPT_MARKERS: &[&str] = &["javascript:", "vbscript:", "expression(", "-moz-binding"];

const RASTER_DATA_URIS: &[&str] = &[
    "data:image/png",
    "data:image/jpeg",
    "data:image/jpg",
    "data:image/gif",
    "data:image/webp",
];

/// Lowercase `value` with whitespace and control characters removed, the
/// form browsers effectively see once they ignore embedded tabs and newlines
fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when the value only references resources inside the document
pub fn references_are_local(value: &str) -> bool {
    let squashed = squash(value);
    let mut rest = squashed.as_str();
    while let Some(start) = rest.find("url(") {
        let target = rest.get(start + 4..).unwrap_or_default();
        let end = target.find(')').unwrap_or(target.len());
        let inner = target
            .get(..end)
            .unwrap_or_default()
            .trim_matches(|ch| ch == '"' || ch == '\'');
        if !inner.starts_with('#') {
            return false;
        }
        rest = target.get(end..).unwrap_or_default();
    }
    true
}

/// True when the value carries a script-capable scheme or CSS hook
pub fn is_script_like(value: &str) -> bool {
    let squashed = squash(value);
    SCRIPT_MARKERS
        .iter()
        .any(|marker| squashed.contains(marker))
}

/// True for `href`-style values that stay inside the document or embed a raster image
pub fn is_safe_uri(value: &str) -> bool {
    let squashed = squash(value);
    squashed.starts_with('#')
        || RASTER_DATA_URIS
            .iter()
            .any(|prefix| squashed.starts_with(prefix))
}

/// Remove disallowed declarations from an inline `style` value
///
/// Returns `None` when nothing survives. When every declaration is kept the
/// value is returned untouched; otherwise the kept declarations are joined
/// as `decl;decl;`.
pub fn scrub_style(value: &str, policy: &Policy) -> Option<String> {
    let mut kept = Vec::new();
    let mut removed = false;

    for declaration in value.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        let allowed = declaration.split_once(':').is_some_and(|(property, data)| {
            policy.allows_css_property(property.trim())
                && !is_script_like(data)
                && references_are_local(data)
        });
        if allowed {
            kept.push(declaration);
        } else {
            removed = true;
        }
    }

    if kept.is_empty() {
        None
    } else if !removed {
        Some(value.to_string())
    } else {
        Some(kept.iter().map(|declaration| format!("{declaration};")).collect())
    }
}
