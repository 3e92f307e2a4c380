//! Per-file decision: accept, remediate or reject
//!
//! Every candidate file goes through the same pipeline, independently of
//! the others:
//!
//! ```text
//! read -> normalize -> sanitize (prune) -> reconcile -> compare
//!      -> Accepted | write sanitized markup -> Remediated | Rejected
//! ```
//!
//! Nothing is shared between files except the package itself, so files are
//! spread over worker threads and the results are merged after the join.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::compare::are_equivalent;
use crate::config::ScanConfig;
use crate::error::Error;
use crate::i18n::{Catalog, SANITISED_SVG_WARNING};
use crate::normalize::normalize;
use crate::package::{CandidateFile, Package};
use crate::sanitize::{sanitize_document, Sanitizer};
use crate::validation::{ErrorData, ValidationError};
use crate::whitelist::Whitelist;
use crate::xml::serialize;

/// Result of checking markup without touching any file
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Equivalent to its sanitized form
    Clean,
    /// Not equivalent; `markup` is the sanitized replacement
    Dirty { markup: String },
    Unparseable(Error),
}

/// Why a file was rejected
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The file could not be read or parsed
    Unparseable(String),
    /// The sanitized replacement could not be written
    PersistenceFailure(String),
    /// A directory or entry could not be listed, so its files went unchecked
    Unlisted(String),
}

impl RejectReason {
    pub fn to_validation_error(&self, file: &str) -> ValidationError {
        match self {
            Self::Unparseable(reason) | Self::Unlisted(reason) => {
                ValidationError::unparseable_svg(file, reason)
            }
            Self::PersistenceFailure(_) => ValidationError::dirty_svg(file),
        }
    }
}

/// Final decision for one candidate file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    /// The sanitized markup replaced the file (or would have, in a dry run)
    Remediated { markup: String },
    Rejected(RejectReason),
}

/// Runs the check pipeline over single documents or whole packages
#[derive(Clone, Copy)]
pub struct Checker<'a> {
    sanitizer: &'a dyn Sanitizer,
    whitelist: &'a Whitelist,
    config: ScanConfig,
}

impl<'a> Checker<'a> {
    pub fn new(sanitizer: &'a dyn Sanitizer) -> Self {
        Self {
            sanitizer,
            whitelist: Whitelist::builtin(),
            config: ScanConfig::default(),
        }
    }

    pub const fn with_whitelist(mut self, whitelist: &'a Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub const fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Decide whether `raw` markup needs remediation
    pub fn check_markup(&self, raw: &str) -> Verdict {
        let original = match normalize(raw, self.config.parse) {
            Ok(doc) => doc,
            Err(err) => return Verdict::Unparseable(err),
        };
        let original_markup = serialize(&original);
        let sanitized = sanitize_document(self.sanitizer, &original);

        if are_equivalent(&original, &original_markup, &sanitized, self.whitelist) {
            Verdict::Clean
        } else {
            Verdict::Dirty {
                markup: sanitized.markup,
            }
        }
    }

    /// Check one file and persist the sanitized markup when needed
    #[instrument(skip_all, fields(file = %file.relative_path()))]
    pub fn check_file(&self, package: &dyn Package, file: &CandidateFile) -> Outcome {
        let raw = match package.read(file) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "unreadable svg");
                return Outcome::Rejected(RejectReason::Unparseable(err.to_string()));
            }
        };

        match self.check_markup(&raw) {
            Verdict::Clean => {
                debug!("accepted");
                Outcome::Accepted
            }
            Verdict::Unparseable(err) => {
                warn!(%err, "unparseable svg");
                Outcome::Rejected(RejectReason::Unparseable(err.to_string()))
            }
            Verdict::Dirty { markup } if self.config.dry_run => {
                info!("would sanitise svg");
                Outcome::Remediated { markup }
            }
            Verdict::Dirty { markup } => match package.write(file, &markup) {
                Ok(()) => {
                    info!("sanitised svg");
                    Outcome::Remediated { markup }
                }
                Err(err) => {
                    warn!(%err, "could not write sanitised svg");
                    Outcome::Rejected(RejectReason::PersistenceFailure(err.to_string()))
                }
            },
        }
    }

    /// Check every SVG in `package`, in the package's file order
    ///
    /// Parts of the package that could not be listed follow the files as
    /// `Rejected(Unlisted)` outcomes.
    pub fn scan(&self, package: &dyn Package) -> Vec<(CandidateFile, Outcome)> {
        let listing = package.svg_files();
        let mut outcomes = self.check_all(package, &listing.files);
        outcomes.extend(listing.failures.into_iter().map(|failure| {
            (
                CandidateFile::new(failure.relative_path),
                Outcome::Rejected(RejectReason::Unlisted(failure.reason)),
            )
        }));
        outcomes
    }

    fn check_all(
        &self,
        package: &dyn Package,
        files: &[CandidateFile],
    ) -> Vec<(CandidateFile, Outcome)> {
        let jobs = self.config.jobs.clamp(1, files.len().max(1));
        debug!(files = files.len(), jobs, "scanning package");

        if jobs == 1 {
            return files
                .iter()
                .map(|file| (file.clone(), self.check_file(package, file)))
                .collect();
        }

        let next = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(files.len()));
        std::thread::scope(|scope| {
            for _ in 0..jobs {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(file) = files.get(index) else {
                        break;
                    };
                    let outcome = self.check_file(package, file);
                    results.lock().push((index, outcome));
                });
            }
        });

        let mut results = results.into_inner();
        results.sort_by_key(|(index, _)| *index);
        results
            .into_iter()
            .filter_map(|(index, outcome)| files.get(index).cloned().map(|file| (file, outcome)))
            .collect()
    }

    /// Check every SVG, push a warning per remediated file and return all errors
    pub fn validate(&self, package: &dyn Package, catalog: &Catalog) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (file, outcome) in self.scan(package) {
            match outcome {
                Outcome::Accepted => {}
                Outcome::Remediated { .. } => {
                    package.push_warning(sanitised_warning(catalog, file.relative_path()));
                }
                Outcome::Rejected(reason) => {
                    errors.push(reason.to_validation_error(file.relative_path()));
                }
            }
        }
        errors
    }
}

fn sanitised_warning(catalog: &Catalog, file: &str) -> String {
    let mut data = ErrorData::new();
    data.insert("file".to_string(), serde_json::Value::String(file.to_string()));
    catalog.translate(SANITISED_SVG_WARNING, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Listing, MemoryPackage, WalkFailure};
    use crate::sanitize::PolicySanitizer;
    use crate::validation::ErrorKey;

    const CLEAN: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 10 10\">\n  <rect width=\"10\" height=\"10\"/>\n</svg>\n";
    const DIRTY: &str = "<svg><rect onclick=\"steal()\"/></svg>";

    #[test]
    fn test_check_markup_verdicts() {
        let sanitizer = PolicySanitizer::default();
        let checker = Checker::new(&sanitizer);
        assert_eq!(checker.check_markup(CLEAN), Verdict::Clean);
        assert_eq!(
            checker.check_markup(DIRTY),
            Verdict::Dirty {
                markup: "<svg><rect/></svg>".to_string()
            }
        );
        assert!(matches!(
            checker.check_markup("<svg>"),
            Verdict::Unparseable(_)
        ));
    }

    #[test]
    fn test_empty_whitelist_remediates_cosmetics() {
        let sanitizer = PolicySanitizer::default();
        let raw = "<svg xml:space=\"preserve\"><rect/></svg>";
        assert_eq!(Checker::new(&sanitizer).check_markup(raw), Verdict::Clean);

        let none = Whitelist::default();
        let checker = Checker::new(&sanitizer).with_whitelist(&none);
        assert_eq!(
            checker.check_markup(raw),
            Verdict::Dirty {
                markup: "<svg><rect/></svg>".to_string()
            }
        );
    }

    #[test]
    fn test_validate_accumulates_everything() {
        let sanitizer = PolicySanitizer::default();
        let checker = Checker::new(&sanitizer).with_config(ScanConfig::sequential());
        let package = MemoryPackage::new()
            .with_file("a_clean.svg", CLEAN)
            .with_file("b_dirty.svg", DIRTY)
            .with_file("c_locked.svg", DIRTY)
            .with_file("d_broken.svg", "<svg><g></svg>")
            .with_read_only("c_locked.svg");

        let errors = checker.validate(&package, Catalog::builtin());

        assert_eq!(package.content("a_clean.svg").as_deref(), Some(CLEAN));
        assert_eq!(package.content("b_dirty.svg").as_deref(), Some("<svg><rect/></svg>"));
        assert_eq!(package.content("c_locked.svg").as_deref(), Some(DIRTY));
        assert_eq!(
            package.warnings(),
            vec!["The markup in b_dirty.svg has been edited for security reasons.".to_string()]
        );
        let keys: Vec<(ErrorKey, Option<&str>)> =
            errors.iter().map(|err| (err.key(), err.file())).collect();
        assert_eq!(
            keys,
            vec![
                (ErrorKey::DirtySvg, Some("c_locked.svg")),
                (ErrorKey::UnparseableSvg, Some("d_broken.svg")),
            ]
        );
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let sanitizer = PolicySanitizer::default();
        let checker = Checker::new(&sanitizer)
            .with_config(ScanConfig::sequential().with_dry_run(true));
        let package = MemoryPackage::new().with_file("x.svg", DIRTY);
        let outcomes = checker.scan(&package);
        assert_eq!(
            outcomes,
            vec![(
                CandidateFile::new("x.svg"),
                Outcome::Remediated {
                    markup: "<svg><rect/></svg>".to_string()
                }
            )]
        );
        assert_eq!(package.content("x.svg").as_deref(), Some(DIRTY));
    }

    #[test]
    fn test_parallel_scan_matches_sequential() {
        let sanitizer = PolicySanitizer::default();
        let mut package = MemoryPackage::new();
        for i in 0..40 {
            let markup = if i % 3 == 0 { DIRTY } else { CLEAN };
            package = package.with_file(&format!("icons/{i:02}.svg"), markup);
        }
        let sequential = Checker::new(&sanitizer)
            .with_config(ScanConfig::sequential().with_dry_run(true))
            .scan(&package);
        let parallel = Checker::new(&sanitizer)
            .with_config(ScanConfig::sequential().with_dry_run(true).with_jobs(4))
            .scan(&package);
        assert_eq!(sequential.len(), 40);
        assert_eq!(sequential, parallel);
    }

    /// Lists one file and reports one directory it could not enter
    struct PartlyListed(MemoryPackage);

    impl Package for PartlyListed {
        fn svg_files(&self) -> Listing {
            let mut listing = self.0.svg_files();
            listing.failures.push(WalkFailure {
                relative_path: "locked".to_string(),
                reason: "permission denied".to_string(),
            });
            listing
        }

        fn read(&self, file: &CandidateFile) -> std::io::Result<String> {
            self.0.read(file)
        }

        fn write(&self, file: &CandidateFile, markup: &str) -> std::io::Result<()> {
            self.0.write(file, markup)
        }

        fn push_warning(&self, warning: String) {
            self.0.push_warning(warning);
        }
    }

    #[test]
    fn test_walk_failures_follow_file_outcomes() {
        let sanitizer = PolicySanitizer::default();
        let package = PartlyListed(MemoryPackage::new().with_file("ok.svg", CLEAN));
        for jobs in [1, 4] {
            let checker = Checker::new(&sanitizer)
                .with_config(ScanConfig::sequential().with_jobs(jobs));
            assert_eq!(
                checker.scan(&package),
                vec![
                    (CandidateFile::new("ok.svg"), Outcome::Accepted),
                    (
                        CandidateFile::new("locked"),
                        Outcome::Rejected(RejectReason::Unlisted(
                            "permission denied".to_string()
                        ))
                    ),
                ]
            );
        }

        let errors = Checker::new(&sanitizer).validate(&package, Catalog::builtin());
        let keys: Vec<(ErrorKey, Option<&str>)> =
            errors.iter().map(|err| (err.key(), err.file())).collect();
        assert_eq!(keys, vec![(ErrorKey::UnparseableSvg, Some("locked"))]);
    }
}
