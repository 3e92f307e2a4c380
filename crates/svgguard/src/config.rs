//! Scan configuration

use crate::xml::Config as ParseConfig;

const MAX_DEFAULT_JOBS: usize = 8;

/// Settings for a package scan
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    /// Parser safety limits applied to every file
    pub parse: ParseConfig,
    /// Worker threads; 1 processes files on the calling thread
    pub jobs: usize,
    /// Decide outcomes without writing remediated files
    pub dry_run: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|n| n.get().min(MAX_DEFAULT_JOBS))
            .unwrap_or(1);
        Self {
            parse: ParseConfig::default(),
            jobs,
            dry_run: false,
        }
    }
}

impl ScanConfig {
    /// Single-threaded scan with default limits
    pub fn sequential() -> Self {
        Self {
            jobs: 1,
            ..Self::default()
        }
    }

    pub const fn with_parse(mut self, parse: ParseConfig) -> Self {
        self.parse = parse;
        self
    }

    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
