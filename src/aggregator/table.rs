//! Table assembler (C9, spec §4.9)
//!
//! Turns reconciled [`Row`]s plus per-run-set [`StatsRow`]s into an [`AssembledTable`]: a header
//! bundle, a body of display-ready rows and a footer of statistics rows, ready for a renderer
//! (C13) to walk without any further business logic.

use std::collections::HashSet;

use crate::aggregator::column::Column;
use crate::aggregator::diff::filter_differing_rows;
use crate::aggregator::loader::RunSetResult;
use crate::aggregator::row::Row;
use crate::aggregator::stats::StatsRow;
use crate::util::{common_prefix, merge_entries_with_common_prefixes};

/// Which table this is: the full reconciled set, or the subset where run sets disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Table,
    Diff,
}

impl TableKind {
    /// The `{kind}` file-name segment, or `None` for the `table` kind when there is only one
    /// run set (§4.9 "Output file naming").
    pub fn segment(self, runset_count: usize) -> Option<&'static str> {
        match self {
            Self::Table if runset_count <= 1 => None,
            Self::Table => Some("table"),
            Self::Diff => Some("diff"),
        }
    }
}

/// One run set's pretty-printed header fields (§4.9).
#[derive(Debug, Clone)]
pub struct RunSetHeader {
    pub nice_name: String,
    pub tool_version: String,
    pub timelimit: Option<String>,
    pub memlimit: Option<String>,
    pub host: Option<String>,
    pub os: Option<String>,
    pub cpu: Option<String>,
    pub cores: Option<String>,
    pub freq: Option<String>,
    pub turbo: Option<String>,
    pub ram: Option<String>,
    pub date: Option<String>,
    pub options: Option<String>,
    pub column_titles: Vec<String>,
}

/// The full header bundle: one [`RunSetHeader`] per run set, plus cross-run-set merges.
#[derive(Debug, Clone)]
pub struct TableHeader {
    pub runsets: Vec<RunSetHeader>,
    /// `host` values merged via common-prefix compaction (§4.9).
    pub host_merged: Vec<String>,
}

fn format_memory(raw: &str) -> String {
    match raw.parse::<i64>() {
        Ok(bytes) => format!("{} MB", bytes / 1_000_000),
        Err(_) => raw.to_owned(),
    }
}

fn format_frequency(raw: &str) -> String {
    match raw.parse::<i64>() {
        Ok(hz) => format!("{} MHz", hz / 1_000_000),
        Err(_) => raw.to_owned(),
    }
}

/// Inserts a space before a trailing `s` unless one is already there (`"900s"` -> `"900 s"`,
/// `"900 s"` unchanged).
fn format_timelimit(raw: &str) -> String {
    match raw.strip_suffix('s') {
        Some(rest) if !rest.is_empty() && !rest.ends_with(' ') => format!("{rest} s"),
        _ => raw.to_owned(),
    }
}

/// Merges `{true, false, mixed, absent}` per-run-set turbo-boost flags to the display vocabulary
/// `{enabled, disabled, mixed, ''}`.
fn merge_turbo<'a, I: IntoIterator<Item = &'a str>>(values: I) -> String {
    let distinct: HashSet<&str> = values.into_iter().collect();
    match distinct.len() {
        0 => String::new(),
        1 => match *distinct.iter().next().unwrap() {
            "true" => "enabled".to_owned(),
            "false" => "disabled".to_owned(),
            _ => String::new(),
        },
        _ => "mixed".to_owned(),
    }
}

/// Builds the header bundle for a set of already-materialized run sets.
pub fn build_header(runsets: &[RunSetResult]) -> TableHeader {
    let headers: Vec<RunSetHeader> = runsets
        .iter()
        .map(|runset| {
            let a = &runset.attributes;
            RunSetHeader {
                nice_name: a.nice_name.clone().unwrap_or_else(|| a.tool.clone()),
                tool_version: format!("{} {}", a.tool, a.version),
                timelimit: a.timelimit.as_deref().map(format_timelimit),
                memlimit: a.memlimit.as_deref().map(format_memory),
                host: a.host.clone(),
                os: a.os.clone(),
                cpu: a.cpu.clone(),
                cores: a.cores.clone(),
                freq: a.freq.as_deref().map(format_frequency),
                turbo: Some(merge_turbo(a.turbo.as_deref().into_iter())),
                ram: a.ram.as_deref().map(format_memory),
                date: a.date.clone(),
                options: a.options.clone(),
                column_titles: runset.columns.iter().map(|c| c.format_title().to_owned()).collect(),
            }
        })
        .collect();

    let host_values: Vec<String> = headers.iter().filter_map(|h| h.host.clone()).collect();
    let host_merged = merge_entries_with_common_prefixes(&host_values);

    TableHeader {
        runsets: headers,
        host_merged,
    }
}

/// Which id-column slots (file name, properties, run-set label) vary across `rows` and thus
/// deserve their own display column. The file-name slot is always relevant (§4.9
/// "select_relevant_id_columns").
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevantIdColumns {
    pub filename: bool,
    pub properties: bool,
    pub runset: bool,
}

pub fn select_relevant_id_columns(rows: &[Row]) -> RelevantIdColumns {
    let properties: HashSet<&str> = rows.iter().map(|r| r.id.properties.as_str()).collect();
    let runsets: HashSet<Option<&str>> = rows.iter().map(|r| r.id.runset.as_deref()).collect();
    RelevantIdColumns {
        filename: true,
        properties: properties.len() > 1,
        runset: runsets.len() > 1,
    }
}

/// One display-ready body row: a short relative filename plus per-run-set, per-column display
/// values (already unit-converted and rounded via [`Column::convert`]).
#[derive(Debug, Clone)]
pub struct TableRow {
    pub short_filename: String,
    pub properties: String,
    pub runset: Option<String>,
    /// `cells[runset_index][column_index]`.
    pub cells: Vec<Vec<Option<String>>>,
}

fn display_row(row: &Row, prefix_len: usize) -> TableRow {
    let short_filename = {
        let name = row.filename();
        if name.len() >= prefix_len && name.is_char_boundary(prefix_len) {
            name[prefix_len..].to_owned()
        } else {
            name.to_owned()
        }
    };
    let cells = row
        .results
        .iter()
        .map(|result| {
            result
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| display_value(column, result.values.get(i).and_then(|v| v.as_deref())))
                .collect()
        })
        .collect();
    TableRow {
        short_filename,
        properties: row.id.properties.clone(),
        runset: row.id.runset.clone(),
        cells,
    }
}

/// Renders one column's raw stored value (unit conversion + rounding for numeric columns; passed
/// through unchanged for text/status columns).
pub fn display_value(column: &Column, raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if !column.column_type.is_numeric() {
        return Some(raw.to_owned());
    }
    let value = crate::decimal::ExtReal::parse(raw)?;
    Some(column.convert(value).to_string())
}

/// The fully assembled table: header, display rows, and one footer [`StatsRow`] list per run
/// set.
#[derive(Debug, Clone)]
pub struct AssembledTable {
    pub kind: TableKind,
    pub header: TableHeader,
    pub relevant_id_columns: RelevantIdColumns,
    pub rows: Vec<TableRow>,
    pub footer: Vec<Vec<StatsRow>>,
}

/// Assembles a table of the given `kind` from reconciled rows and their per-run-set statistics.
/// For [`TableKind::Diff`], `rows` is filtered down via [`filter_differing_rows`] first.
pub fn assemble_table(
    kind: TableKind,
    runsets: &[RunSetResult],
    rows: Vec<Row>,
    footer: Vec<Vec<StatsRow>>,
) -> AssembledTable {
    let rows = match kind {
        TableKind::Table => rows,
        TableKind::Diff => filter_differing_rows(rows),
    };

    let header = build_header(runsets);
    let relevant_id_columns = select_relevant_id_columns(&rows);
    let filenames: Vec<&str> = rows.iter().map(Row::filename).collect();
    // Only the shared *directory* portion is stripped; a common prefix that runs into the final
    // path component (as it trivially does whenever there is only one row, or every row names
    // the same file) must never swallow the whole filename.
    let shared_prefix = common_prefix(filenames);
    let prefix_len = shared_prefix.rfind('/').map_or(0, |i| i + 1);

    let display_rows = rows.iter().map(|row| display_row(row, prefix_len)).collect();

    AssembledTable {
        kind,
        header,
        relevant_id_columns,
        rows: display_rows,
        footer,
    }
}

/// The output file name for a `(kind, extension)` pair (§4.9 "Output file naming").
pub fn output_file_name(name: &str, kind: TableKind, extension: &str, runset_count: usize) -> String {
    match kind.segment(runset_count) {
        Some(segment) => format!("{name}.{segment}.{extension}"),
        None => format!("{name}.{extension}"),
    }
}
