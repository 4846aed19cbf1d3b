//! `Row` (§3): all run results for one task id, across all run sets, in run-set order.

use crate::aggregator::run_result::RunResult;
use crate::aggregator::task::TaskId;

#[derive(Debug, Clone)]
pub struct Row {
    pub id: TaskId,
    pub results: Vec<RunResult>,
}

impl Row {
    /// # Panics
    /// Panics if `results` is empty or its elements don't all share the same task id — both are
    /// invariant violations that indicate a bug in the reconciler, not recoverable input errors.
    pub fn new(results: Vec<RunResult>) -> Self {
        assert!(!results.is_empty(), "a Row must contain at least one result");
        let id = results[0].task_id.clone();
        assert!(
            results.iter().all(|r| r.task_id == id),
            "all results in a Row must share the same task id"
        );
        Self { id, results }
    }

    pub fn filename(&self) -> &str {
        &self.id.name
    }

    pub fn properties(&self) -> Vec<&str> {
        self.id.properties_list()
    }
}

/// Zips already-reconciled (same length, same order) run-set result lists into rows.
pub fn get_rows(runset_results: &[Vec<RunResult>]) -> Vec<Row> {
    let Some(len) = runset_results.first().map(Vec::len) else {
        return Vec::new();
    };
    (0..len)
        .map(|i| {
            let results: Vec<RunResult> = runset_results
                .iter()
                .map(|runset| runset[i].clone())
                .collect();
            Row::new(results)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aggregator::column::Column;

    fn result(task: &str) -> RunResult {
        RunResult::missing(TaskId::new(task, "", None), Arc::new(vec![Column::new("status")]))
    }

    #[test]
    #[should_panic(expected = "at least one result")]
    fn new_panics_on_empty() {
        Row::new(Vec::new());
    }

    #[test]
    fn get_rows_zips_by_position() {
        let a = vec![result("t1"), result("t2")];
        let b = vec![result("t1"), result("t2")];
        let rows = get_rows(&[a, b]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].results.len(), 2);
        assert_eq!(rows[0].filename(), "t1");
    }
}
