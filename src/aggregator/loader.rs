//! Run-set loader (C5, spec §4.5)
//!
//! Two-phase: [`PendingRunSetResult::from_xml`] does the cheap parse-time work (task ids, column
//! discovery or override), [`PendingRunSetResult::materialize`] does the expensive I/O (log
//! reads, tool-extractor calls) and finalizes column types (§9 "Two-phase run-set init").

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};

use crate::aggregator::archive::LogArchiveCache;
use crate::aggregator::column::{order_column_titles, Column};
use crate::aggregator::extractor::ExtractorRegistry;
use crate::aggregator::reader::{self, ResultFileXml, XmlRun};
use crate::aggregator::run_result::{Category, RunResult};
use crate::aggregator::task::TaskId;
use crate::options::Options;

/// The attributes shared by every result in one run set (§3 `RunSetResult`).
#[derive(Debug, Clone, Default)]
pub struct RunSetAttributes {
    pub tool: String,
    pub version: String,
    pub timelimit: Option<String>,
    pub memlimit: Option<String>,
    pub cores: Option<String>,
    pub host: Option<String>,
    pub os: Option<String>,
    pub ram: Option<String>,
    pub cpu: Option<String>,
    pub freq: Option<String>,
    pub turbo: Option<String>,
    pub date: Option<String>,
    pub options: Option<String>,
    /// The run set's display name: a table-definition `union`/`result` label when one applies,
    /// otherwise derived from the result file's own name. Distinct from any task-id run-set
    /// label (§3); this is display-only and never feeds `TaskId` equality.
    pub nice_name: Option<String>,
    pub benchmarkname: Option<String>,
    pub name: Option<String>,
    /// Per-column values carried directly on the result file's root element, outside any run.
    pub summary: HashMap<String, String>,
}

struct PendingRun {
    task_id: TaskId,
    status: String,
    category: Category,
    category_raw: String,
    logfile: Option<PathBuf>,
    archive_relative_logfile: String,
    xml_values: HashMap<String, String>,
    sourcefiles_exist: bool,
}

/// The cheap, parse-only phase of loading one result file.
pub struct PendingRunSetResult {
    attributes: RunSetAttributes,
    columns: Vec<Column>,
    source_path: PathBuf,
    runs: Vec<PendingRun>,
}

impl PendingRunSetResult {
    /// Builds the pending run set from an already-parsed result file. `override_columns`, when
    /// supplied by the table-definition loader (C11), replaces column discovery entirely.
    ///
    /// `runset_id` feeds the task id's `runset` component (§3) and is only ever `Some` for a
    /// table-definition `<union>`'s members; plain positional result files pass `None` so that
    /// the same task in two different files reconciles into one task instead of two (§4.6).
    /// `nice_name` is the separate, display-only run-set label (defaults to the result file's
    /// stem when the caller has no table-definition label to offer).
    pub fn from_xml(
        xml: ResultFileXml,
        source_path: PathBuf,
        runset_id: Option<String>,
        nice_name: Option<String>,
        override_columns: Option<Vec<Column>>,
        options: &Options,
    ) -> Self {
        let mut seen_tasks: HashSet<TaskId> = HashSet::new();
        let mut runs = Vec::with_capacity(xml.runs.len());
        for run in &xml.runs {
            let task_id = TaskId::new(run.name.clone(), run.properties.clone(), runset_id.clone());
            if !seen_tasks.insert(task_id.clone()) {
                warn!(
                    "Duplicate task '{task_id}' in run set from '{}'; dropping the second occurrence",
                    source_path.display()
                );
                continue;
            }
            runs.push(PendingRun {
                logfile: Some(reader::logfile_locator(&source_path, run)),
                archive_relative_logfile: reader::archive_relative_logfile(run),
                xml_values: run.columns.iter().cloned().collect(),
                sourcefiles_exist: !run.files.is_empty(),
                status: run.status.clone(),
                category: Category::parse(&run.category),
                category_raw: run.category.clone(),
                task_id,
            });
        }

        let columns = match override_columns {
            Some(mut columns) => {
                if !options.all_columns {
                    columns.retain(|c| !c.hidden);
                }
                ensure_main_status(&mut columns);
                columns
            }
            None => discover_columns(&xml.runs),
        };

        let attributes = RunSetAttributes {
            tool: xml.tool,
            version: xml.version,
            timelimit: xml.timelimit,
            memlimit: xml.memlimit,
            cores: xml.cpu_cores.or(xml.systeminfo.cores.clone()),
            host: xml.systeminfo.host.clone(),
            os: xml.systeminfo.os,
            ram: xml.systeminfo.ram,
            cpu: xml.systeminfo.cpu,
            freq: xml.systeminfo.freq,
            turbo: xml.systeminfo.turbo,
            date: xml.date,
            options: xml.options,
            nice_name,
            benchmarkname: xml.benchmarkname,
            name: xml.name,
            summary: xml.summary_columns.into_iter().collect(),
        };

        Self {
            attributes,
            columns,
            source_path,
            runs,
        }
    }

    pub fn task_count(&self) -> usize {
        self.runs.len()
    }

    pub fn column_titles(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.title.as_str()).collect()
    }

    /// The expensive second phase (§9 "collect_data"): reads logs lazily (one read per run,
    /// shared across its columns), calls the tool extractor, and finalizes column type inference
    /// over the collected samples. The [`LogArchiveCache`] opened here is scoped to this call
    /// and is dropped, closing any archive handle, when it returns.
    pub fn materialize(self, options: &Options, extractors: &ExtractorRegistry) -> Result<RunSetResult> {
        let Self {
            attributes,
            columns,
            source_path,
            runs,
        } = self;

        let mut cache = LogArchiveCache::new(source_path);
        let columns = Arc::new(columns);

        if columns.iter().any(|c| c.title.eq_ignore_ascii_case("score")) {
            debug!("No scoring function configured for tool '{}'; 'score' column values will be blank", attributes.tool);
        }

        let mut results = Vec::with_capacity(runs.len());
        for run in &runs {
            let mut values = vec![None; columns.len()];
            let mut log_lines: Option<Option<Vec<String>>> = None;

            for (index, column) in columns.iter().enumerate() {
                values[index] = resolve_value(
                    column,
                    run,
                    &attributes.tool,
                    options,
                    extractors,
                    &mut cache,
                    &mut log_lines,
                );
            }

            let diff_relevant_columns = columns
                .iter()
                .filter(|c| c.relevant_for_diff)
                .map(|c| c.title.clone())
                .collect();

            results.push(RunResult {
                task_id: run.task_id.clone(),
                status: run.status.clone(),
                category: run.category,
                score: None,
                logfile: run.logfile.clone(),
                columns: columns.clone(),
                values,
                diff_relevant_columns,
                sourcefiles_exist: run.sourcefiles_exist,
            });
        }

        let mut columns = Arc::try_unwrap(columns).unwrap_or_else(|arc| (*arc).clone());
        for column in &mut columns {
            let sample: Vec<Option<String>> = results
                .iter()
                .map(|r| r.value_of(&column.title).map(str::to_owned))
                .collect();
            column.infer_type(&sample);
        }
        let columns = Arc::new(columns);
        for result in &mut results {
            result.columns = columns.clone();
        }

        Ok(RunSetResult {
            attributes,
            columns,
            results,
        })
    }
}

/// Implements the §4.5 per-(run, column) precedence rules, in order.
fn resolve_value(
    column: &Column,
    run: &PendingRun,
    tool_module: &str,
    options: &Options,
    extractors: &ExtractorRegistry,
    cache: &mut LogArchiveCache,
    log_lines: &mut Option<Option<Vec<String>>>,
) -> Option<String> {
    if column.title.eq_ignore_ascii_case("score") {
        return None;
    }
    if column.title.eq_ignore_ascii_case("status") {
        return Some(run.status.clone());
    }
    if column.title.eq_ignore_ascii_case("category") {
        return Some(run.category_raw.clone());
    }

    if options.correct_only && run.category != Category::Correct {
        return None;
    }

    if column.pattern.is_none() && column.href.is_none() {
        return run.xml_values.get(&column.title).cloned();
    }

    let pattern = column.pattern.as_deref()?;
    let lines = log_lines.get_or_insert_with(|| {
        let standalone = run.logfile.as_deref().unwrap_or_else(|| Path::new(""));
        match cache.read_log_lines(standalone, &run.archive_relative_logfile) {
            Ok(Some(lines)) => Some(lines),
            Ok(None) => {
                warn!(
                    "Missing log for task '{}': '{}'",
                    run.task_id,
                    standalone.display()
                );
                None
            }
            Err(error) => {
                warn!("Error reading log for task '{}': {error}", run.task_id);
                None
            }
        }
    });

    let lines = lines.as_ref()?;
    let extractor = extractors.get(tool_module)?;
    extractor.extract(lines, pattern)
}

/// Discovers columns as the union of column titles across all runs, respecting the fixed
/// priority order (§4.5). `status` and `category` are always present even if no run's XML
/// carried an explicit `<column>` for them (the reader lifts those two onto dedicated fields).
fn discover_columns(runs: &[XmlRun]) -> Vec<Column> {
    let mut titles: Vec<String> = vec!["status".to_owned(), "category".to_owned()];
    let mut seen: HashSet<String> = titles.iter().cloned().collect();
    for run in runs {
        for (title, _) in &run.columns {
            if seen.insert(title.clone()) {
                titles.push(title.clone());
            }
        }
    }

    order_column_titles(titles)
        .into_iter()
        .map(|title| {
            let mut column = Column::new(title);
            if column.title.eq_ignore_ascii_case("status") {
                column.is_main_status = true;
            }
            column
        })
        .collect()
}

/// Marks the first column titled exactly `status` with no pattern and no `href` as the main
/// status column, per §4.3 rule 1, unless an override column already claims the role.
fn ensure_main_status(columns: &mut [Column]) {
    if columns.iter().any(|c| c.is_main_status) {
        return;
    }
    if let Some(column) = columns
        .iter_mut()
        .find(|c| c.title.eq_ignore_ascii_case("status") && c.pattern.is_none() && c.href.is_none())
    {
        column.is_main_status = true;
    }
}

/// A fully materialized run set: a shared column list and one [`RunResult`] per task.
#[derive(Debug, Clone)]
pub struct RunSetResult {
    pub attributes: RunSetAttributes,
    pub columns: Arc<Vec<Column>>,
    pub results: Vec<RunResult>,
}

impl RunSetResult {
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.results.iter().map(|r| r.task_id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::reader::parse_result_xml;

    const RESULT_XML: &str = r#"<?xml version="1.0"?>
<result tool="generic" version="1.0" name="demo">
  <run name="foo.c" properties="unreach-call.prp" files="[foo.c]">
    <column title="status" value="TRUE"/>
    <column title="category" value="correct"/>
    <column title="cputime" value="1.5"/>
  </run>
  <run name="bar.c" properties="unreach-call.prp" files="[bar.c]">
    <column title="status" value="FALSE(unreach-call)"/>
    <column title="category" value="wrong"/>
    <column title="cputime" value="2.0"/>
  </run>
</result>"#;

    fn load(xml: &str, options: &Options) -> RunSetResult {
        let parsed = parse_result_xml(xml.as_bytes()).unwrap();
        let pending = PendingRunSetResult::from_xml(
            parsed,
            PathBuf::from("/bench/results.xml"),
            None,
            Some("r1".to_owned()),
            None,
            options,
        );
        pending
            .materialize(options, &ExtractorRegistry::new())
            .unwrap()
    }

    #[test]
    fn discovers_columns_with_status_category_first() {
        let options = Options::default();
        let runset = load(RESULT_XML, &options);
        let titles: Vec<&str> = runset.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["status", "category", "cputime"]);
        assert!(runset.columns[0].is_main_status);
    }

    #[test]
    fn materializes_xml_column_values() {
        let options = Options::default();
        let runset = load(RESULT_XML, &options);
        assert_eq!(runset.results.len(), 2);
        assert_eq!(runset.results[0].value_of("cputime"), Some("1.5"));
        assert_eq!(runset.results[0].status, "TRUE");
        assert_eq!(runset.results[1].category, Category::Wrong);
    }

    #[test]
    fn correct_only_blanks_non_status_values_for_non_correct_rows() {
        let options = Options {
            correct_only: true,
            ..Options::default()
        };
        let runset = load(RESULT_XML, &options);
        assert_eq!(runset.results[0].value_of("cputime"), Some("1.5"));
        assert_eq!(runset.results[1].value_of("cputime"), None);
        assert_eq!(runset.results[1].status, "FALSE(unreach-call)");
    }

    #[test]
    fn duplicate_task_in_one_run_set_is_dropped() {
        const DUP: &str = r#"<?xml version="1.0"?>
<result tool="generic" version="1.0">
  <run name="foo.c" properties="" files="[foo.c]">
    <column title="status" value="TRUE"/>
    <column title="category" value="correct"/>
  </run>
  <run name="foo.c" properties="" files="[foo.c]">
    <column title="status" value="FALSE"/>
    <column title="category" value="wrong"/>
  </run>
</result>"#;
        let options = Options::default();
        let runset = load(DUP, &options);
        assert_eq!(runset.results.len(), 1);
        assert_eq!(runset.results[0].status, "TRUE");
    }

    #[test]
    fn cputime_column_is_typed_decimal() {
        let options = Options::default();
        let runset = load(RESULT_XML, &options);
        let cputime = runset.columns.iter().find(|c| c.title == "cputime").unwrap();
        assert_eq!(cputime.column_type, crate::aggregator::column::ColumnType::Decimal);
    }
}
