//! Validation errors reported for package files
//!
//! Errors travel between services as JSON objects with a `class`
//! discriminator. Plain errors carry a message `key` and a `data` payload:
//!
//! ```json
//! {"class": "ValidationError", "key": "dirty_svg", "data": {"file": "assets/logo.svg"}}
//! ```
//!
//! Lint errors have their own shape. Deserialization looks the class up in
//! a fixed registry; there is no open-ended type resolution.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::i18n::Catalog;

/// Prefix of every error message key in the catalog
pub const KEY_PREFIX: &str = "txt.apps.admin.error.app_build.";

/// Structured payload interpolated into error messages
pub type ErrorData = IndexMap<String, Value>;

/// Symbolic error kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKey {
    /// Sanitization changed the file and the safe replacement could not be written
    DirtySvg,
    /// The file could not be read or parsed into a tree
    UnparseableSvg,
    Lint,
}

impl ErrorKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirtySvg => "dirty_svg",
            Self::UnparseableSvg => "unparseable_svg",
            Self::Lint => "lint",
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire discriminator of a serialized error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Lint,
}

impl ErrorClass {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Lint => "LintValidationError",
        }
    }
}

/// One finding reported by a linter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintIssue {
    pub line: u32,
    pub reason: String,
}

/// Lint findings for a single file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LintError {
    pub filename: String,
    pub issues: Vec<LintIssue>,
}

/// Error attributed to one file of a package
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationError {
    Keyed { key: ErrorKey, data: ErrorData },
    Lint(LintError),
}

/// Failure to rebuild a [`ValidationError`] from its serialized form
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("cannot deserialize validation error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot deserialize validation error from {0}: expected an object")]
    NotAnObject(String),
    #[error("cannot deserialize validation error: missing class")]
    MissingClass,
    #[error("cannot deserialize validation error: unknown class {0}")]
    UnknownClass(String),
    #[error("cannot deserialize {class}: {source}")]
    Shape {
        class: &'static str,
        source: serde_json::Error,
    },
}

type Vivify = fn(Value) -> Result<ValidationError, DeserializationError>;

/// Class name → constructor for every error shape understood on the wire
const REGISTRY: &[(ErrorClass, Vivify)] = &[
    (ErrorClass::Validation, vivify_keyed),
    (ErrorClass::Lint, vivify_lint),
];

#[derive(Serialize, Deserialize)]
struct KeyedWire {
    class: String,
    key: ErrorKey,
    #[serde(default)]
    data: ErrorData,
}

#[derive(Serialize, Deserialize)]
struct LintWire {
    class: String,
    filename: String,
    #[serde(default)]
    lint_errors: Vec<LintIssue>,
}

fn vivify_keyed(value: Value) -> Result<ValidationError, DeserializationError> {
    let shape = |source| DeserializationError::Shape {
        class: ErrorClass::Validation.name(),
        source,
    };
    let wire: KeyedWire = serde_json::from_value(value).map_err(shape)?;
    // lint errors only travel as LintValidationError
    if wire.key == ErrorKey::Lint {
        return Err(shape(serde::de::Error::custom(
            "key `lint` is reserved for LintValidationError",
        )));
    }
    Ok(ValidationError::Keyed {
        key: wire.key,
        data: wire.data,
    })
}

fn vivify_lint(value: Value) -> Result<ValidationError, DeserializationError> {
    let wire: LintWire =
        serde_json::from_value(value).map_err(|source| DeserializationError::Shape {
            class: ErrorClass::Lint.name(),
            source,
        })?;
    Ok(ValidationError::Lint(LintError {
        filename: wire.filename,
        issues: wire.lint_errors,
    }))
}

impl ValidationError {
    pub fn new(key: ErrorKey, data: ErrorData) -> Self {
        Self::Keyed { key, data }
    }

    /// Sanitized markup could not be persisted for `file`
    pub fn dirty_svg(file: &str) -> Self {
        let mut data = ErrorData::new();
        data.insert("file".to_string(), Value::String(file.to_string()));
        Self::new(ErrorKey::DirtySvg, data)
    }

    /// `file` could not be read or parsed
    pub fn unparseable_svg(file: &str, reason: &str) -> Self {
        let mut data = ErrorData::new();
        data.insert("file".to_string(), Value::String(file.to_string()));
        data.insert("reason".to_string(), Value::String(reason.to_string()));
        Self::new(ErrorKey::UnparseableSvg, data)
    }

    pub fn lint(filename: impl Into<String>, issues: Vec<LintIssue>) -> Self {
        Self::Lint(LintError {
            filename: filename.into(),
            issues,
        })
    }

    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Keyed { .. } => ErrorClass::Validation,
            Self::Lint(_) => ErrorClass::Lint,
        }
    }

    pub const fn key(&self) -> ErrorKey {
        match self {
            Self::Keyed { key, .. } => *key,
            Self::Lint(_) => ErrorKey::Lint,
        }
    }

    /// Payload used for message interpolation
    pub fn data(&self) -> Cow<'_, ErrorData> {
        match self {
            Self::Keyed { data, .. } => Cow::Borrowed(data),
            Self::Lint(lint) => {
                let errors: String = lint
                    .issues
                    .iter()
                    .map(|issue| format!("\n  L{}: {}", issue.line, issue.reason))
                    .collect();
                let mut data = ErrorData::new();
                data.insert("file".to_string(), Value::String(lint.filename.clone()));
                data.insert("errors".to_string(), Value::String(errors));
                data.insert("count".to_string(), Value::from(lint.issues.len()));
                Cow::Owned(data)
            }
        }
    }

    /// The file this error is about, when the payload names one
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Keyed { data, .. } => data.get("file").and_then(Value::as_str),
            Self::Lint(lint) => Some(&lint.filename),
        }
    }

    /// Render the localized message for this error
    pub fn message(&self, catalog: &Catalog) -> String {
        catalog.translate(&format!("{KEY_PREFIX}{}", self.key()), &self.data())
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Rebuild an error from its structured form
    pub fn from_value(value: Value) -> Result<Self, DeserializationError> {
        let Some(object) = value.as_object() else {
            return Err(DeserializationError::NotAnObject(value.to_string()));
        };
        let Some(class) = object.get("class").and_then(Value::as_str) else {
            return Err(DeserializationError::MissingClass);
        };
        let Some((_, vivify)) = REGISTRY.iter().find(|(known, _)| known.name() == class) else {
            return Err(DeserializationError::UnknownClass(class.to_string()));
        };
        vivify(value)
    }

    /// Rebuild an error from a JSON string
    pub fn from_json(json: &str) -> Result<Self, DeserializationError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Keyed { key, data } => KeyedWire {
                class: ErrorClass::Validation.name().to_string(),
                key: *key,
                data: data.clone(),
            }
            .serialize(serializer),
            Self::Lint(lint) => LintWire {
                class: ErrorClass::Lint.name().to_string(),
                filename: lint.filename.clone(),
                lint_errors: lint.issues.clone(),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ValidationError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message(Catalog::builtin()))
    }
}

impl std::error::Error for ValidationError {}
