//! Diff filter (C8, spec §4.8): keeps only the rows where the run sets disagree.

use std::collections::HashSet;

use crate::aggregator::row::Row;

const DEFAULT_DIFF_COLUMN: &str = "status";

/// Retains only rows where at least one diff-relevant column carries two or more distinct
/// (non-null) values across the row's results. A row with fewer than two results never differs.
///
/// Degenerate case (§4.8): if more than one row is under consideration and every single one of
/// them differs, the diff view is a verbatim copy of the main table and adds nothing, so the
/// result is empty rather than that copy. A lone differing row is still informative on its own
/// and is kept (§8 scenario 3).
pub fn filter_differing_rows(rows: Vec<Row>) -> Vec<Row> {
    let total = rows.len();
    let differing: Vec<Row> = rows.into_iter().filter(row_differs).collect();
    if total > 1 && differing.len() == total {
        Vec::new()
    } else {
        differing
    }
}

/// The union of each result's declared diff-relevant columns, falling back to `status` alone
/// when none of them declare any (§4.8 "no column is marked diff-relevant").
fn diff_relevant_titles(row: &Row) -> HashSet<&str> {
    let declared: HashSet<&str> = row
        .results
        .iter()
        .flat_map(|r| r.diff_relevant_columns.iter().map(String::as_str))
        .collect();
    if declared.is_empty() {
        HashSet::from([DEFAULT_DIFF_COLUMN])
    } else {
        declared
    }
}

fn row_differs(row: &Row) -> bool {
    if row.results.len() < 2 {
        return false;
    }
    diff_relevant_titles(row).into_iter().any(|title| {
        let distinct: HashSet<&str> = row.results.iter().filter_map(|r| r.value_of(title)).collect();
        distinct.len() >= 2
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aggregator::column::Column;
    use crate::aggregator::run_result::{Category, RunResult};
    use crate::aggregator::task::TaskId;

    fn result(task: &str, status: &str, diff_relevant: &[&str]) -> RunResult {
        let columns = Arc::new(vec![Column::new("status")]);
        RunResult {
            task_id: TaskId::new(task, "", None),
            status: status.to_owned(),
            category: Category::Correct,
            score: None,
            logfile: None,
            columns,
            values: vec![Some(status.to_owned())],
            diff_relevant_columns: diff_relevant.iter().map(|s| (*s).to_owned()).collect(),
            sourcefiles_exist: true,
        }
    }

    #[test]
    fn row_with_differing_status_is_kept() {
        let row = Row::new(vec![result("t1", "TRUE", &["status"]), result("t1", "FALSE", &["status"])]);
        assert!(row_differs(&row));
    }

    #[test]
    fn row_with_agreeing_status_is_dropped() {
        let rows = vec![Row::new(vec![
            result("t1", "TRUE", &["status"]),
            result("t1", "TRUE", &["status"]),
        ])];
        assert!(filter_differing_rows(rows).is_empty());
    }

    #[test]
    fn single_result_row_never_differs() {
        let row = Row::new(vec![result("t1", "TRUE", &["status"])]);
        assert!(!row_differs(&row));
    }

    #[test]
    fn defaults_to_status_when_nothing_declared() {
        let row = Row::new(vec![result("t1", "TRUE", &[]), result("t1", "FALSE", &[])]);
        assert!(row_differs(&row));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(filter_differing_rows(Vec::new()).is_empty());
    }

    #[test]
    fn every_row_differing_returns_empty() {
        let rows = vec![
            Row::new(vec![result("t1", "TRUE", &["status"]), result("t1", "FALSE", &["status"])]),
            Row::new(vec![result("t2", "TRUE", &["status"]), result("t2", "UNKNOWN", &["status"])]),
        ];
        assert!(filter_differing_rows(rows).is_empty());
    }
}
