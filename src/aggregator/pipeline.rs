//! End-to-end orchestration (spec §2 data flow, §6)
//!
//! Wires C1 (reader) → C11 (optional table definition) → C5 (loader, via C10's worker pool) →
//! C6 (reconciler) → C7 (statistics) → C8 (diff) → C9 (table assembler) → C13 (renderers),
//! mirroring the teacher's `run()` entry point: one function the binary calls that returns
//! `anyhow::Result<()>` and does everything up to writing files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::aggregator::column::Column;
use crate::aggregator::driver::Driver;
use crate::aggregator::extractor::ExtractorRegistry;
use crate::aggregator::loader::{PendingRunSetResult, RunSetResult};
use crate::aggregator::reader::{self, ReadOutcome};
use crate::aggregator::reconcile::reconcile;
use crate::aggregator::regression::{dump_counts, regression_count};
use crate::aggregator::render::{render_csv, render_html};
use crate::aggregator::row::get_rows;
use crate::aggregator::stats::compute_statistics;
use crate::aggregator::table::{assemble_table, output_file_name, AssembledTable, TableKind};
use crate::aggregator::tabledef::{load_table_definition, ResultEntry, TableDefinition};
use crate::error::Error;
use crate::options::{Format, Options};
use crate::util::expand_glob;

/// One input to load: a concrete file path, an optional task-id run-set label, a display name,
/// and an optional column override list from a table-definition `<result>`/`<union>` entry.
struct LoadSpec {
    path: PathBuf,
    /// Feeds the task id's `runset` component (§3). Only a table-definition `<union>` gives its
    /// members a shared label here; plain positional files are `None` so the same task in two
    /// different files reconciles into one task across run sets (§4.6) instead of two.
    runset_id: Option<String>,
    /// Display-only run-set name, independent of `runset_id`.
    display_name: Option<String>,
    override_columns: Option<Vec<Column>>,
}

/// Resolves the input specs, either from a table-definition document (C11) or from the
/// positional file/glob list, unioning each `<union>`'s member results into one run set by
/// concatenating their materialized results under a shared label (§4.11 "union").
fn resolve_load_specs(options: &Options, plain_files: &[PathBuf]) -> Result<Vec<Vec<LoadSpec>>> {
    let Some(definition_path) = &options.table_definition else {
        return Ok(plain_files
            .iter()
            .map(|path| {
                vec![LoadSpec {
                    path: path.clone(),
                    runset_id: None,
                    display_name: Some(reader::result_stem(path)),
                    override_columns: None,
                }]
            })
            .collect());
    };

    let definition: TableDefinition = load_table_definition(definition_path)?;
    let definition_dir = definition_path.parent().unwrap_or_else(|| Path::new("."));

    let mut groups: Vec<Vec<LoadSpec>> = Vec::new();

    for result in &definition.results {
        groups.push(expand_result_entry(result, definition_dir, None)?);
    }
    for union in &definition.unions {
        let mut members = Vec::new();
        for result in &union.results {
            members.extend(expand_result_entry(result, definition_dir, union.name.clone())?);
        }
        groups.push(members);
    }

    Ok(groups)
}

fn expand_result_entry(
    result: &ResultEntry,
    definition_dir: &Path,
    runset_id: Option<String>,
) -> Result<Vec<LoadSpec>> {
    let pattern = if Path::new(&result.glob).is_absolute() {
        result.glob.clone()
    } else {
        definition_dir.join(&result.glob).to_string_lossy().into_owned()
    };
    let matched = expand_glob(&pattern)?;
    if matched.is_empty() {
        return Err(Error::MissingResultFile(pattern).into());
    }
    Ok(matched
        .into_iter()
        .map(|path| {
            let display_name = runset_id.clone().unwrap_or_else(|| reader::result_stem(&path));
            LoadSpec {
                path,
                runset_id: runset_id.clone(),
                display_name: Some(display_name),
                override_columns: Some(result.columns.clone()),
            }
        })
        .collect())
}

/// Reads and materializes one group of [`LoadSpec`]s (a plain run set, or a `<union>`'s pooled
/// members) into a single [`RunSetResult`] by concatenating their results under one shared
/// column list. The column list of a union's first member wins; this is a deliberate
/// simplification documented in DESIGN.md rather than full column reconciliation across
/// heterogeneous union members.
fn load_group(group: &[LoadSpec], options: &Options, extractors: &ExtractorRegistry) -> Result<Option<RunSetResult>> {
    let mut merged: Option<RunSetResult> = None;

    for spec in group {
        let outcome = reader::read_result_file(&spec.path, options.ignore_erroneous_benchmarks)
            .with_context(|| format!("reading '{}'", spec.path.display()))?;

        let xml = match outcome {
            ReadOutcome::Parsed(xml) => xml,
            ReadOutcome::Skipped { reason } => {
                warn!("Dropping erroneous result file '{}': {reason}", spec.path.display());
                continue;
            }
        };

        let pending = PendingRunSetResult::from_xml(
            xml,
            spec.path.clone(),
            spec.runset_id.clone(),
            spec.display_name.clone(),
            spec.override_columns.clone(),
            options,
        );
        let materialized = pending.materialize(options, extractors)?;

        merged = Some(match merged {
            None => materialized,
            Some(mut accumulated) => {
                accumulated.results.extend(materialized.results);
                accumulated
            }
        });
    }

    Ok(merged)
}

/// Loads every run set (possibly in parallel via [`Driver`]), dropping any that failed to
/// produce results (e.g. every member file was erroneous-and-ignored).
fn load_all_runsets(options: &Options, plain_files: &[PathBuf]) -> Result<Vec<RunSetResult>> {
    let groups = resolve_load_specs(options, plain_files)?;
    let driver = Driver::new(options.offline)?;

    let tasks: Vec<_> = groups
        .into_iter()
        .map(|group| {
            let options = options.clone();
            move || load_group(&group, &options, &ExtractorRegistry::new())
        })
        .collect();

    let results: Vec<Result<Option<RunSetResult>>> = driver.run_all(tasks);
    let mut runsets = Vec::with_capacity(results.len());
    for result in results {
        if let Some(runset) = result? {
            runsets.push(runset);
        }
    }
    Ok(runsets)
}

struct OutputTarget<'a> {
    outputpath: Option<&'a Path>,
}

impl OutputTarget<'_> {
    fn write(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        match self.outputpath {
            Some(path) if path == Path::new("-") => {
                crate::util::write_all_to_stdout(bytes);
                Ok(())
            }
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating output directory '{}'", dir.display()))?;
                let full = dir.join(file_name);
                std::fs::write(&full, bytes)
                    .map_err(|e| Error::OutputError(full.display().to_string(), e.to_string()))?;
                info!("Wrote '{}'", full.display());
                Ok(())
            }
            None => {
                std::fs::write(file_name, bytes)
                    .map_err(|e| Error::OutputError(file_name.to_owned(), e.to_string()))?;
                info!("Wrote '{file_name}'");
                Ok(())
            }
        }
    }
}

/// Shells out to the platform's default opener for `path`, logged at debug level only (§4.13:
/// not unit-tested, a thin external side effect).
fn open_in_browser(path: &Path) {
    let (command, args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
        ("open", vec![])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C", "start"])
    } else {
        ("xdg-open", vec![])
    };
    debug!("Opening '{}' with '{command}'", path.display());
    if let Err(error) = std::process::Command::new(command)
        .args(&args)
        .arg(path)
        .status()
    {
        debug!("Failed to open '{}': {error}", path.display());
    }
}

/// The library's single pipeline entry point: loads, reconciles, aggregates, assembles and
/// renders every requested table, writing output files per `options`.
pub fn run(options: &Options, plain_files: &[PathBuf]) -> Result<()> {
    let runsets = load_all_runsets(options, plain_files)?;
    if runsets.is_empty() {
        return Err(Error::NoResultsLoaded.into());
    }

    let runset_count = runsets.len();
    let reconciled = reconcile(&runsets, options.reconcile_mode);
    let rows = get_rows(&reconciled);

    if options.dump {
        let regressions = regression_count(&rows, options.ignore_flapping_timeout_regressions);
        println!("REGRESSIONS {regressions}");
        println!("STATS");
        for (correct, wrong, other) in dump_counts(&rows) {
            println!("{correct} {wrong} {other}");
        }
    }

    let footer: Vec<_> = runsets
        .iter()
        .zip(&reconciled)
        .map(|(runset, results)| compute_statistics(&runset.columns, results, options.correct_only))
        .collect();

    let name = options.name.clone().unwrap_or_else(|| {
        plain_files
            .first()
            .map(|p| reader::result_stem(p))
            .unwrap_or_else(|| "results".to_owned())
    });
    let target = OutputTarget {
        outputpath: options.outputpath.as_deref(),
    };

    let table = assemble_table(TableKind::Table, &runsets, rows.clone(), footer.clone());
    write_table(&target, &name, &table, &options.formats, runset_count)?;

    if !options.no_diff && runset_count > 1 {
        let diff_table = assemble_table(TableKind::Diff, &runsets, rows, footer);
        write_table(&target, &name, &diff_table, &options.formats, runset_count)?;

        if options.show {
            if let Some(dir) = target.outputpath.filter(|p| *p != Path::new("-")) {
                let html_name = output_file_name(&name, TableKind::Diff, "html", runset_count);
                open_in_browser(&dir.join(html_name));
            }
        }
    }

    Ok(())
}

fn write_table(
    target: &OutputTarget<'_>,
    name: &str,
    table: &AssembledTable,
    formats: &[Format],
    runset_count: usize,
) -> Result<()> {
    for format in formats {
        match format {
            Format::Csv => {
                let mut buffer = Vec::new();
                render_csv(table, &mut buffer)?;
                let file_name = output_file_name(name, table.kind, "csv", runset_count);
                target.write(&file_name, &buffer)?;
            }
            Format::Html => {
                let html = render_html(table, name)?;
                let file_name = output_file_name(name, table.kind, "html", runset_count);
                target.write(&file_name, html.as_bytes())?;
            }
        }
    }
    Ok(())
}
