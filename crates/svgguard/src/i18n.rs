//! Message templates for warnings and validation errors
//!
//! Templates use `%{name}` placeholders filled from a data payload. A
//! catalog is a flat key → template map; extra locales are loaded from JSON
//! and fall back to the built-in English templates for missing keys.

use std::collections::HashMap;
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde_json::Value;

/// Key of the warning emitted for every rewritten SVG
pub const SANITISED_SVG_WARNING: &str = "txt.apps.admin.warning.app_build.sanitised_svg";

const ENGLISH: &[(&str, &str)] = &[
    (
        SANITISED_SVG_WARNING,
        "The markup in %{file} has been edited for security reasons.",
    ),
    (
        "txt.apps.admin.error.app_build.dirty_svg",
        "%{file} contains invalid or unsafe markup that could not be sanitised automatically. Remove scripts, event handlers and external references, then try again.",
    ),
    (
        "txt.apps.admin.error.app_build.unparseable_svg",
        "%{file} could not be parsed as SVG markup: %{reason}",
    ),
    (
        "txt.apps.admin.error.app_build.lint",
        "%{count} lint error(s) in %{file}:%{errors}",
    ),
];

/// Localized message templates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    locale: String,
    templates: HashMap<String, String>,
}

impl Catalog {
    /// The built-in English templates
    pub fn english() -> Self {
        Self {
            locale: "en".to_string(),
            templates: ENGLISH
                .iter()
                .map(|(key, template)| ((*key).to_string(), (*template).to_string()))
                .collect(),
        }
    }

    /// Shared instance of [`Catalog::english`]
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<Catalog> = OnceLock::new();
        BUILTIN.get_or_init(Self::english)
    }

    /// Load `locale` from a flat JSON object, falling back to English
    pub fn from_json_str(locale: &str, json: &str) -> Result<Self, serde_json::Error> {
        let overrides: HashMap<String, String> = serde_json::from_str(json)?;
        let mut catalog = Self::english();
        catalog.locale = locale.to_string();
        catalog.templates.extend(overrides);
        Ok(catalog)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Render `key` with `data`; unknown keys render as `translation missing: <key>`
    pub fn translate(&self, key: &str, data: &IndexMap<String, Value>) -> String {
        match self.templates.get(key) {
            Some(template) => interpolate(template, data),
            None => format!("translation missing: {key}"),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::english()
    }
}

/// Replace `%{name}` placeholders; unknown names are left verbatim
pub fn interpolate(template: &str, data: &IndexMap<String, Value>) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("%{") {
        let (before, tail) = rest.split_at(start);
        output.push_str(before);
        let Some(end) = tail.find('}') else {
            rest = tail;
            break;
        };
        let name = tail.get(2..end).unwrap_or_default();
        match data.get(name) {
            Some(Value::String(text)) => output.push_str(text),
            Some(other) => output.push_str(&other.to_string()),
            None => output.push_str(tail.get(..=end).unwrap_or_default()),
        }
        rest = tail.get(end + 1..).unwrap_or_default();
    }
    output.push_str(rest);
    output
}
