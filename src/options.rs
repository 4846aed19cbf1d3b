//! The resolved, immutable pipeline configuration (spec §9 "Configuration").
//!
//! Built once by the CLI front end (C12) from parsed flags and threaded by shared reference
//! through the loader, reconciler, statistics engine, diff filter and table assembler. No
//! component reads environment variables or `argv` itself.

use std::path::PathBuf;

/// An output format the table assembler's renderers (C13) can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Html,
    Csv,
}

/// Task-reconciliation mode (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Order-preserving union of all run sets' task lists.
    Union,
    /// Tasks common to every run set (`-c/--common`).
    Intersection,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub table_definition: Option<PathBuf>,
    pub outputpath: Option<PathBuf>,
    pub name: Option<String>,
    pub ignore_erroneous_benchmarks: bool,
    pub dump: bool,
    pub ignore_flapping_timeout_regressions: bool,
    pub formats: Vec<Format>,
    pub reconcile_mode: ReconcileMode,
    pub no_diff: bool,
    pub correct_only: bool,
    pub all_columns: bool,
    pub offline: bool,
    pub show: bool,
    pub quiet: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            table_definition: None,
            outputpath: None,
            name: None,
            ignore_erroneous_benchmarks: false,
            dump: false,
            ignore_flapping_timeout_regressions: false,
            formats: vec![Format::Html, Format::Csv],
            reconcile_mode: ReconcileMode::Union,
            no_diff: false,
            correct_only: false,
            all_columns: false,
            offline: false,
            show: false,
            quiet: false,
        }
    }
}
