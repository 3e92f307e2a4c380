//! svgguard - sanitization-equivalence checks for SVG files in app packages
//!
//! Each SVG is normalized, run through an allow-list sanitizer in prune
//! mode and compared with its sanitized form. Files that only differ by
//! known-benign cosmetics are accepted untouched; anything else is replaced
//! by the sanitized markup, or reported when that replacement cannot be
//! written.
//!
//! # Quick Start
//!
//! ```
//! use svgguard::{Checker, PolicySanitizer, Verdict};
//!
//! let sanitizer = PolicySanitizer::default();
//! let checker = Checker::new(&sanitizer);
//!
//! let clean = r#"<svg xml:space="preserve"><rect width="10" height="10"/></svg>"#;
//! assert_eq!(checker.check_markup(clean), Verdict::Clean);
//!
//! let dirty = r#"<svg><rect onclick="steal()"/></svg>"#;
//! assert_eq!(
//!     checker.check_markup(dirty),
//!     Verdict::Dirty { markup: "<svg><rect/></svg>".to_string() }
//! );
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result};

pub mod lexer;
pub mod xml;
pub use xml::{Content, Document, Element};

pub mod normalize;
pub use normalize::normalize;

pub mod sanitize;
pub use sanitize::{sanitize_document, Policy, PolicySanitizer, Sanitized, Sanitizer, ScrubMode};

pub mod whitelist;
pub use whitelist::{Whitelist, WhitelistEntry};

pub mod compare;
pub use compare::{are_equivalent, equivalent_after_reconcile, strip_declaration};

pub mod config;
pub use config::ScanConfig;

pub mod i18n;
pub use i18n::Catalog;

pub mod validation;
pub use validation::{DeserializationError, ErrorKey, LintIssue, ValidationError};

pub mod package;
pub use package::{CandidateFile, DirPackage, Listing, MemoryPackage, Package, WalkFailure};

pub mod controller;
pub use controller::{Checker, Outcome, RejectReason, Verdict};

/// Parse SVG markup with default limits, without normalization
pub fn from_svg_str(s: &str) -> Result<Document> {
    xml::Parser::new(s.as_bytes()).parse()
}

/// Validate every SVG in `package` with the built-in policy and English messages
pub fn validate(package: &dyn Package) -> Vec<ValidationError> {
    let sanitizer = PolicySanitizer::default();
    Checker::new(&sanitizer).validate(package, Catalog::builtin())
}
