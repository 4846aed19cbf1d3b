//! Task reconciler (C6, spec §4.6)

use std::collections::{HashMap, HashSet};

use log::{info, warn};

use crate::aggregator::loader::RunSetResult;
use crate::aggregator::run_result::RunResult;
use crate::aggregator::task::TaskId;
use crate::options::ReconcileMode;

/// Merges the per-run-set task lists of `runsets` into one canonical order (union or
/// intersection, per `mode`) and fills tasks missing from a run set with a synthetic "missing"
/// result, returning one result list per run set, each the same length and in the same
/// (canonical) task order.
pub fn reconcile(runsets: &[RunSetResult], mode: ReconcileMode) -> Vec<Vec<RunResult>> {
    let canonical = match mode {
        ReconcileMode::Union => union_order(runsets),
        ReconcileMode::Intersection => intersection_order(runsets),
    };

    runsets.iter().map(|runset| fill(runset, &canonical)).collect()
}

/// A topological-like merge (§4.6 "Union"): walks each run set's tasks in order, tracking a
/// cursor into the canonical list; a new task is inserted just after the cursor and becomes the
/// new cursor, an already-present task moves the cursor to its existing position. The result
/// contains every input task exactly once, and each run set's original order is a subsequence of
/// the canonical order.
fn union_order(runsets: &[RunSetResult]) -> Vec<TaskId> {
    let mut canonical: Vec<TaskId> = Vec::new();
    let mut index_of: HashMap<TaskId, usize> = HashMap::new();

    for runset in runsets {
        let mut cursor: Option<usize> = None;
        for result in &runset.results {
            let id = &result.task_id;
            if let Some(&pos) = index_of.get(id) {
                cursor = Some(pos);
            } else {
                let insert_at = cursor.map_or(0, |c| c + 1);
                canonical.insert(insert_at, id.clone());
                for pos in index_of.values_mut() {
                    if *pos >= insert_at {
                        *pos += 1;
                    }
                }
                index_of.insert(id.clone(), insert_at);
                cursor = Some(insert_at);
            }
        }
    }

    canonical
}

/// Tasks present in the first run set that also appear in every other (§4.6 "Intersection");
/// the result is a subsequence of every input list.
fn intersection_order(runsets: &[RunSetResult]) -> Vec<TaskId> {
    let Some(first) = runsets.first() else {
        return Vec::new();
    };

    let others: Vec<HashSet<&TaskId>> = runsets[1..]
        .iter()
        .map(|runset| runset.results.iter().map(|r| &r.task_id).collect())
        .collect();

    let canonical: Vec<TaskId> = first
        .results
        .iter()
        .map(|r| &r.task_id)
        .filter(|id| others.iter().all(|set| set.contains(id)))
        .cloned()
        .collect();

    if canonical.is_empty() && runsets.len() > 1 {
        warn!(
            "Intersection of {} run sets is empty; no task is common to all of them",
            runsets.len()
        );
    }

    canonical
}

fn fill(runset: &RunSetResult, canonical: &[TaskId]) -> Vec<RunResult> {
    let by_id: HashMap<&TaskId, &RunResult> =
        runset.results.iter().map(|r| (&r.task_id, r)).collect();

    canonical
        .iter()
        .map(|id| match by_id.get(id) {
            Some(result) => (*result).clone(),
            None => {
                info!(
                    "Task '{id}' missing from run set '{}'; filling with a synthetic missing result",
                    runset.attributes.nice_name.as_deref().unwrap_or(&runset.attributes.tool)
                );
                RunResult::missing(id.clone(), runset.columns.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aggregator::column::Column;
    use crate::aggregator::loader::RunSetAttributes;
    use crate::aggregator::run_result::Category;

    fn runset(name: &str, tasks: &[&str]) -> RunSetResult {
        let columns = Arc::new(vec![Column::new("status")]);
        let results = tasks
            .iter()
            .map(|task| RunResult {
                task_id: TaskId::new(*task, "", None),
                status: "TRUE".to_owned(),
                category: Category::Correct,
                score: None,
                logfile: None,
                columns: columns.clone(),
                values: vec![Some("TRUE".to_owned())],
                diff_relevant_columns: Default::default(),
                sourcefiles_exist: true,
            })
            .collect();
        RunSetResult {
            attributes: RunSetAttributes {
                nice_name: Some(name.to_owned()),
                ..Default::default()
            },
            columns,
            results,
        }
    }

    #[test]
    fn union_fills_missing_task_with_synthetic_result() {
        let a = runset("A", &["t1", "t2"]);
        let b = runset("B", &["t1"]);
        let filled = reconcile(&[a, b], ReconcileMode::Union);

        assert_eq!(filled[0].len(), 2);
        assert_eq!(filled[1].len(), 2);
        assert_eq!(filled[0][0].task_id.name, "t1");
        assert_eq!(filled[0][1].task_id.name, "t2");
        assert_eq!(filled[1][1].category, Category::Missing);
        assert!(filled[1][1].values.iter().all(Option::is_none));
    }

    #[test]
    fn union_preserves_each_runsets_relative_order() {
        let a = runset("A", &["t1", "t3"]);
        let b = runset("B", &["t1", "t2", "t3"]);
        let filled = reconcile(&[a, b], ReconcileMode::Union);
        let order: Vec<&str> = filled[1].iter().map(|r| r.task_id.name.as_str()).collect();
        assert_eq!(order, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn union_inserts_new_task_between_existing_neighbors() {
        // A: t1, t3 establishes the canonical skeleton; B inserts t2 between them.
        let a = runset("A", &["t1", "t3"]);
        let b = runset("B", &["t1", "t2", "t3"]);
        let filled = reconcile(&[a, b], ReconcileMode::Union);
        let order: Vec<&str> = filled[0].iter().map(|r| r.task_id.name.as_str()).collect();
        assert_eq!(order, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn intersection_keeps_only_common_tasks_in_first_runsets_order() {
        let a = runset("A", &["t1", "t2", "t3"]);
        let b = runset("B", &["t2", "t3"]);
        let filled = reconcile(&[a, b], ReconcileMode::Intersection);
        let order: Vec<&str> = filled[0].iter().map(|r| r.task_id.name.as_str()).collect();
        assert_eq!(order, vec!["t2", "t3"]);
    }

    #[test]
    fn intersection_of_disjoint_sets_is_empty() {
        let a = runset("A", &["t1"]);
        let b = runset("B", &["t2"]);
        let filled = reconcile(&[a, b], ReconcileMode::Intersection);
        assert!(filled[0].is_empty());
        assert!(filled[1].is_empty());
    }
}
