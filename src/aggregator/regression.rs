//! Regression-count dump (`-d/--dump`, spec §6, §8 scenario 6)
//!
//! Grounded in the prior art's `get_regression_count`/`get_counts`: a row regresses when its two
//! most-recent run sets disagree on status in a way that isn't "the same kind of non-result twice"
//! (flapping timeouts/OOMs), and the dump additionally reports a per-run-set `correct wrong
//! unknown-or-error-or-missing` triple.

use crate::aggregator::row::Row;
use crate::aggregator::run_result::Category;

fn status_is(status: &str, prefix: &str) -> bool {
    status.starts_with(prefix)
}

/// Counts rows whose two right-most run results regressed: the newer one is not `correct` and
/// differs in status from the older one, unless both are some flavor of the same timeout/OOM (or,
/// with `ignore_flapping_timeouts`, the newer is a timeout and any earlier result was also one).
///
/// A row with fewer than two results can never regress, and — matching the source behavior this
/// is grounded on — its presence short-circuits the whole count to zero rather than merely being
/// skipped, since a table with only one run set has nothing to regress against.
pub fn regression_count(rows: &[Row], ignore_flapping_timeouts: bool) -> u64 {
    let mut regressions = 0u64;
    for row in rows {
        if row.results.len() < 2 {
            return 0;
        }

        let new = &row.results[row.results.len() - 1];
        let old = &row.results[row.results.len() - 2];

        if new.category == Category::Correct {
            continue;
        }
        if new.status == old.status {
            continue;
        }
        if status_is(&new.status, "TIMEOUT") && status_is(&old.status, "TIMEOUT") {
            continue;
        }
        if status_is(&new.status, "OUT OF MEMORY") && status_is(&old.status, "OUT OF MEMORY") {
            continue;
        }
        if ignore_flapping_timeouts
            && status_is(&new.status, "TIMEOUT")
            && row.results[..row.results.len() - 2]
                .iter()
                .any(|r| status_is(&r.status, "TIMEOUT"))
        {
            continue;
        }

        regressions += 1;
    }
    regressions
}

/// One `correct wrong unknown-or-error-or-missing` triple per run set, in run-set order.
pub fn dump_counts(rows: &[Row]) -> Vec<(u64, u64, u64)> {
    let Some(runset_count) = rows.first().map(|row| row.results.len()) else {
        return Vec::new();
    };

    (0..runset_count)
        .map(|index| {
            let mut correct = 0u64;
            let mut wrong = 0u64;
            let mut other = 0u64;
            for row in rows {
                match row.results[index].category {
                    Category::Correct => correct += 1,
                    Category::Wrong => wrong += 1,
                    Category::Unknown | Category::Error | Category::Missing => {
                        other += 1;
                    }
                    Category::CorrectUnconfirmed => {}
                }
            }
            (correct, wrong, other)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aggregator::column::Column;
    use crate::aggregator::run_result::RunResult;
    use crate::aggregator::task::TaskId;

    fn result(status: &str, category: Category) -> RunResult {
        RunResult {
            task_id: TaskId::new("t1", "", None),
            status: status.to_owned(),
            category,
            score: None,
            logfile: None,
            columns: Arc::new(vec![Column::new("status")]),
            values: vec![Some(status.to_owned())],
            diff_relevant_columns: Default::default(),
            sourcefiles_exist: true,
        }
    }

    #[test]
    fn regression_with_timeout_history_still_counts_false() {
        let row = Row::new(vec![
            result("TIMEOUT", Category::Unknown),
            result("TIMEOUT", Category::Unknown),
            result("FALSE", Category::Wrong),
        ]);
        assert_eq!(regression_count(&[row], true), 1);
    }

    #[test]
    fn regression_with_true_then_timeout_then_false_still_counts_one() {
        let row = Row::new(vec![
            result("TRUE", Category::Correct),
            result("TIMEOUT", Category::Unknown),
            result("FALSE", Category::Wrong),
        ]);
        assert_eq!(regression_count(&[row], true), 1);
    }

    #[test]
    fn flapping_timeout_to_timeout_is_not_a_regression() {
        let row = Row::new(vec![
            result("TIMEOUT", Category::Unknown),
            result("TRUE", Category::Correct),
            result("TIMEOUT", Category::Unknown),
        ]);
        assert_eq!(regression_count(&[row], true), 0);
    }

    #[test]
    fn same_status_is_not_a_regression() {
        let row = Row::new(vec![result("FALSE", Category::Wrong), result("FALSE", Category::Wrong)]);
        assert_eq!(regression_count(&[row], false), 0);
    }

    #[test]
    fn single_runset_row_short_circuits_to_zero() {
        let row = Row::new(vec![result("TRUE", Category::Correct)]);
        assert_eq!(regression_count(&[row], false), 0);
    }

    #[test]
    fn dump_counts_tallies_per_runset_categories() {
        let rows = vec![
            Row::new(vec![result("TRUE", Category::Correct), result("TRUE", Category::Correct)]),
            Row::new(vec![result("FALSE", Category::Wrong), result("UNKNOWN", Category::Unknown)]),
        ];
        let counts = dump_counts(&rows);
        assert_eq!(counts, vec![(1, 1, 0), (1, 0, 1)]);
    }

    #[test]
    fn dump_counts_excludes_correct_unconfirmed_from_every_bucket() {
        let rows = vec![Row::new(vec![result("TRUE", Category::CorrectUnconfirmed)])];
        let counts = dump_counts(&rows);
        assert_eq!(counts, vec![(0, 0, 0)]);
    }
}
