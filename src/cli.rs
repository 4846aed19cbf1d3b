//! CLI front end (C12, spec §4.12, §6)
//!
//! A `clap::Parser`-derived struct owning the full flag surface, each option additionally
//! readable from a `BENCHTABLE_<OPTION>` environment variable (matching the teacher's convention
//! of exposing CLI flags via `clap`'s `env` feature for CI use).

use std::path::PathBuf;

use anyhow::Result;

use clap::{Parser, ValueEnum};

use crate::error::Error;
use crate::options::{Format as OptFormat, Options, ReconcileMode};
use crate::util::expand_glob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Html,
    Csv,
}

impl From<FormatArg> for OptFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Html => Self::Html,
            FormatArg::Csv => Self::Csv,
        }
    }
}

/// Aggregates benchmark result archives into cross-run HTML and CSV tables.
#[derive(Debug, Parser)]
#[command(name = "benchtable", version, about)]
pub struct Cli {
    /// Result files or globs to aggregate.
    pub inputs: Vec<String>,

    /// Table-definition XML file (§4.11); overrides column discovery for the result files it
    /// names.
    #[arg(short = 'x', long = "xml", env = "BENCHTABLE_XML")]
    pub xml: Option<PathBuf>,

    /// Directory (or `-` for stdout) the output files are written to.
    #[arg(short = 'o', long = "outputpath", env = "BENCHTABLE_OUTPUTPATH")]
    pub outputpath: Option<String>,

    /// Base name used for output files, instead of one derived from the inputs.
    #[arg(short = 'n', long = "name", env = "BENCHTABLE_NAME")]
    pub name: Option<String>,

    /// Drop result files with an `error` attribute instead of failing.
    #[arg(long, env = "BENCHTABLE_IGNORE_ERRONEOUS_BENCHMARKS")]
    pub ignore_erroneous_benchmarks: bool,

    /// Print a `REGRESSIONS`/`STATS` summary to stdout instead of (or as well as) rendering
    /// tables.
    #[arg(short = 'd', long = "dump", env = "BENCHTABLE_DUMP")]
    pub dump: bool,

    /// When counting regressions, a `TIMEOUT -> TIMEOUT -> non-timeout` chain does not count
    /// extra flapping regressions.
    #[arg(long, env = "BENCHTABLE_IGNORE_FLAPPING_TIMEOUT_REGRESSIONS")]
    pub ignore_flapping_timeout_regressions: bool,

    /// Output format(s); repeatable. Defaults to both `html` and `csv`.
    #[arg(short = 'f', long = "format", env = "BENCHTABLE_FORMAT", value_enum)]
    pub format: Vec<FormatArg>,

    /// Keep only tasks common to every run set, instead of their union.
    #[arg(short = 'c', long = "common", env = "BENCHTABLE_COMMON")]
    pub common: bool,

    /// Skip assembling the diff table.
    #[arg(long = "no-diff", env = "BENCHTABLE_NO_DIFF")]
    pub no_diff: bool,

    /// Only populate column values for `correct`-category rows.
    #[arg(long = "correct-only", env = "BENCHTABLE_CORRECT_ONLY")]
    pub correct_only: bool,

    /// Include table-definition columns marked `hidden`.
    #[arg(long = "all-columns", env = "BENCHTABLE_ALL_COLUMNS")]
    pub all_columns: bool,

    /// Force serial execution instead of the worker pool.
    #[arg(long, env = "BENCHTABLE_OFFLINE")]
    pub offline: bool,

    /// Open the rendered HTML file in a browser once written.
    #[arg(long, env = "BENCHTABLE_SHOW")]
    pub show: bool,

    /// Suppress informational log output.
    #[arg(short = 'q', long = "quiet", env = "BENCHTABLE_QUIET")]
    pub quiet: bool,
}

impl Cli {
    /// Builds the resolved [`Options`] struct from parsed flags.
    pub fn options(&self) -> Options {
        let formats: Vec<OptFormat> = self.format.iter().map(|f| (*f).into()).collect();
        Options {
            table_definition: self.xml.clone(),
            outputpath: self.outputpath.as_deref().map(PathBuf::from),
            name: self.name.clone(),
            ignore_erroneous_benchmarks: self.ignore_erroneous_benchmarks,
            dump: self.dump,
            ignore_flapping_timeout_regressions: self.ignore_flapping_timeout_regressions,
            formats: if formats.is_empty() {
                vec![OptFormat::Html, OptFormat::Csv]
            } else {
                formats
            },
            reconcile_mode: if self.common { ReconcileMode::Intersection } else { ReconcileMode::Union },
            no_diff: self.no_diff,
            correct_only: self.correct_only,
            all_columns: self.all_columns,
            offline: self.offline,
            show: self.show,
            quiet: self.quiet,
        }
    }

    /// Expands every positional glob/path to a concrete, sorted, de-duplicated file list.
    ///
    /// A table-definition file (`-x/--xml`) names its own result files, so positional arguments
    /// are only mandatory without one.
    ///
    /// # Errors
    /// Returns [`Error::MissingResultFile`] for any pattern that matches nothing, and
    /// [`Error::InvalidCliArgument`] if no positional arguments were given and no table
    /// definition was supplied either.
    pub fn resolve_input_files(&self) -> Result<Vec<PathBuf>> {
        if self.inputs.is_empty() {
            if self.xml.is_some() {
                return Ok(Vec::new());
            }
            return Err(Error::InvalidCliArgument("no result files given".to_owned()).into());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for pattern in &self.inputs {
            let matched = expand_glob(pattern)?;
            if matched.is_empty() {
                return Err(Error::MissingResultFile(pattern.clone()).into());
            }
            files.extend(matched);
        }

        files.sort();
        files.dedup();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_both_formats_when_none_given() {
        let cli = Cli::parse_from(["benchtable", "a.xml"]);
        let options = cli.options();
        assert_eq!(options.formats, vec![OptFormat::Html, OptFormat::Csv]);
    }

    #[test]
    fn common_flag_selects_intersection_mode() {
        let cli = Cli::parse_from(["benchtable", "--common", "a.xml"]);
        assert_eq!(cli.options().reconcile_mode, ReconcileMode::Intersection);
    }

    #[test]
    fn explicit_format_overrides_default() {
        let cli = Cli::parse_from(["benchtable", "-f", "csv", "a.xml"]);
        assert_eq!(cli.options().formats, vec![OptFormat::Csv]);
    }

    #[test]
    fn resolve_input_files_rejects_empty_input_list() {
        let cli = Cli::parse_from(["benchtable"]);
        assert!(cli.resolve_input_files().is_err());
    }
}
